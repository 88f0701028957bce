pub mod connection;
pub mod connection_pool;
pub mod manager;
pub mod sqlite;

pub use connection::PooledConnection;
pub use connection_pool::ConnectionPool;
pub use manager::ConnectionPoolManager;
pub use sqlite::SqliteConnectionFactory;
