use std::sync::Arc;

use secrecy::{ExposeSecret, Secret};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{UserInput, DEFAULT_ROLE},
    repo::{User, UserRepository},
};
use crate::{
    auth::{
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_dummy_blocking, verify_password_blocking},
        policy::validate_password,
    },
    error::AppError,
};

/// Entry point for every user operation the HTTP layer exposes.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    keys: JwtKeys,
}

struct Profile {
    role: String,
    firstname: String,
    lastname: String,
    nickname: String,
}

/// Trims the profile fields and rejects empty required ones.
fn required_fields(input: &UserInput) -> Result<Profile, AppError> {
    let field = |name: &str, value: &str| -> Result<String, AppError> {
        let v = value.trim();
        if v.is_empty() {
            return Err(AppError::BadRequest(format!("{name} is required")));
        }
        Ok(v.to_string())
    };
    let role = match input.role.trim() {
        "" => DEFAULT_ROLE.to_string(),
        r => r.to_string(),
    };
    Ok(Profile {
        role,
        firstname: field("firstname", &input.firstname)?,
        lastname: field("lastname", &input.lastname)?,
        nickname: field("nickname", &input.nickname)?,
    })
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("User '{id}' not found"))
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, keys: JwtKeys) -> Self {
        Self { repo, keys }
    }

    #[instrument(skip(self, input), fields(nickname = %input.nickname))]
    pub async fn create_user(&self, input: UserInput) -> Result<User, AppError> {
        let profile = required_fields(&input)?;
        validate_password(input.password.expose_secret())?;
        let password_hash = hash_password_blocking(input.password.expose_secret().clone()).await?;

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            role: profile.role,
            firstname: profile.firstname,
            lastname: profile.lastname,
            nickname: profile.nickname,
            password_hash,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.repo.create(&user).await?;

        let created = self
            .repo
            .get(user.id)
            .await?
            .ok_or_else(|| AppError::Unknown(format!("created user '{}' not readable", user.id)))?;
        info!(user_id = %created.id, "user created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: Uuid) -> Result<User, AppError> {
        self.repo.get(id).await?.ok_or_else(|| not_found(id))
    }

    /// Full replace; the password is always re-hashed.
    #[instrument(skip(self, input))]
    pub async fn update_user(&self, id: Uuid, input: UserInput) -> Result<User, AppError> {
        let profile = required_fields(&input)?;
        validate_password(input.password.expose_secret())?;

        let existing = self.repo.get(id).await?.ok_or_else(|| not_found(id))?;
        let password_hash = hash_password_blocking(input.password.expose_secret().clone()).await?;

        let user = User {
            id,
            role: profile.role,
            firstname: profile.firstname,
            lastname: profile.lastname,
            nickname: profile.nickname,
            password_hash,
            created_at: existing.created_at,
            updated_at: OffsetDateTime::now_utc(),
            deleted_at: None,
        };
        let updated = self.repo.update(&user).await?.ok_or_else(|| not_found(id))?;
        info!(user_id = %id, "user updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> Result<(), AppError> {
        if self.repo.get(id).await?.is_none() {
            return Err(not_found(id));
        }
        self.repo.delete(id).await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    #[instrument(skip(self, existing, new))]
    pub async fn change_password(
        &self,
        id: Uuid,
        existing: Secret<String>,
        new: Secret<String>,
    ) -> Result<(), AppError> {
        validate_password(new.expose_secret())?;

        let stored = self
            .repo
            .get_password_hash(id)
            .await?
            .ok_or_else(|| not_found(id))?;

        if !verify_password_blocking(existing.expose_secret().clone(), stored.clone()).await? {
            warn!(user_id = %id, "change password with wrong existing password");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }
        if verify_password_blocking(new.expose_secret().clone(), stored).await? {
            return Err(AppError::Unauthorized(
                "New password matches the current one, please choose a different password".into(),
            ));
        }

        let password_hash = hash_password_blocking(new.expose_secret().clone()).await?;
        let mut user = self.repo.get(id).await?.ok_or_else(|| not_found(id))?;
        user.password_hash = password_hash;
        user.updated_at = OffsetDateTime::now_utc();
        self.repo.update(&user).await?.ok_or_else(|| not_found(id))?;
        info!(user_id = %id, "password changed");
        Ok(())
    }

    /// Returns a signed bearer token for valid credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, nickname: &str, password: Secret<String>) -> Result<String, AppError> {
        let Some(user) = self.repo.get_by_nickname(nickname).await? else {
            // same argon2 cost as a wrong password
            verify_dummy_blocking(password.expose_secret().clone()).await?;
            return Err(AppError::NotFound(format!(
                "User with nickname '{nickname}' not found"
            )));
        };

        if !verify_password_blocking(password.expose_secret().clone(), user.password_hash).await? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }

        let token = self.keys.issue(user.id)?;
        info!(user_id = %user.id, "user logged in");
        Ok(token)
    }
}
