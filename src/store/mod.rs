use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;

pub mod keeper;
pub mod postgres;

/// Connection handle shared between the keeper (sole writer) and repositories.
///
/// Swaps are atomic: a reader always gets either `None` or a complete `Arc<T>`.
pub struct SharedConn<T>(Arc<ArcSwapOption<T>>);

impl<T> SharedConn<T> {
    pub fn new(conn: T) -> Self {
        Self(Arc::new(ArcSwapOption::from_pointee(conn)))
    }

    #[cfg(test)]
    pub fn empty() -> Self {
        Self(Arc::new(ArcSwapOption::empty()))
    }

    pub fn load(&self) -> Option<Arc<T>> {
        self.0.load_full()
    }

    pub(crate) fn store(&self, conn: T) {
        self.0.store(Some(Arc::new(conn)));
    }

    pub(crate) fn take(&self) -> Option<Arc<T>> {
        self.0.swap(None)
    }
}

impl<T> Clone for SharedConn<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// Knows how to open, probe and close one kind of store connection.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Conn: Send + Sync + 'static;

    async fn connect(&self) -> anyhow::Result<Self::Conn>;

    /// Cheap liveness probe.
    async fn ping(&self, conn: &Self::Conn) -> anyhow::Result<()>;

    async fn close(&self, conn: &Self::Conn);
}
