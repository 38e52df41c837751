use secrecy::Secret;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ROLE: &str = "user";

/// Body of create and full-replace update requests. `password` is plaintext.
#[derive(Debug, Deserialize)]
pub struct UserInput {
    #[serde(default)]
    pub role: String,
    pub firstname: String,
    pub lastname: String,
    pub nickname: String,
    pub password: Secret<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub nickname: String,
    pub password: Secret<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub existing_password: Secret<String>,
    pub new_password: Secret<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "OK".into(),
        }
    }
}
