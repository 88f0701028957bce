use async_trait::async_trait;
use quire_domain::DomainError;

/// Creates and disposes backend connections for one pool.
///
/// Supplied by the persistence layer. `connect` failures are counted by the
/// pool and surfaced to the acquiring caller.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: Send + 'static;

    async fn connect(&self) -> Result<Self::Connection, DomainError>;

    /// Close a connection the pool no longer needs. Dropping is enough for
    /// most backends.
    async fn close(&self, connection: Self::Connection) {
        drop(connection);
    }
}
