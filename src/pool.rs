use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Object as PostgresObject, Pool as PostgresPool};
use deadpool_sqlite::{Object as SqliteObject, Pool as SqlitePool};

use crate::error::RecordMapDbError;
use crate::results::ResultSet;
use crate::types::{DatabaseType, SqlValue};
use crate::{postgres, sqlite};

/// Connection-pool tuning forwarded to the backing `deadpool` pool.
///
/// Everything here bounds resource usage only; it has no effect on
/// statement semantics. Unset fields keep the pool's defaults.
#[derive(Debug, Clone, Default)]
pub struct PoolTuning {
    /// Maximum number of open connections.
    pub max_size: Option<usize>,
    /// How long a checkout may wait for a free connection.
    pub wait_timeout: Option<Duration>,
    /// How long establishing a new connection may take.
    pub create_timeout: Option<Duration>,
    /// How long recycling an idle connection may take.
    pub recycle_timeout: Option<Duration>,
}

impl PoolTuning {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    #[must_use]
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn create_timeout(mut self, timeout: Duration) -> Self {
        self.create_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn recycle_timeout(mut self, timeout: Duration) -> Self {
        self.recycle_timeout = Some(timeout);
        self
    }

    pub(crate) fn to_pool_config(&self) -> deadpool::managed::PoolConfig {
        let mut cfg = deadpool::managed::PoolConfig::default();
        if let Some(max_size) = self.max_size {
            cfg.max_size = max_size;
        }
        cfg.timeouts.wait = self.wait_timeout;
        cfg.timeouts.create = self.create_timeout;
        cfg.timeouts.recycle = self.recycle_timeout;
        cfg
    }
}

/// The pool for whichever backend the database was opened against.
#[derive(Debug, Clone)]
pub enum DbPool {
    /// PostgreSQL connection pool
    Postgres(PostgresPool),
    /// SQLite connection pool
    Sqlite(SqlitePool),
}

/// Handle to an open database: the shared pool plus its engine type.
///
/// Construct one per process with [`Database::new_sqlite`] or
/// [`Database::new_postgres`] and clone it into every component that needs
/// access; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct Database {
    /// The connection pool
    pub pool: DbPool,
    /// The database type
    pub db_type: DatabaseType,
}

impl Database {
    /// Check a connection out of the pool.
    ///
    /// # Errors
    ///
    /// Returns a pool error when checkout fails or times out.
    pub async fn connection(&self) -> Result<DbConnection, RecordMapDbError> {
        match &self.pool {
            DbPool::Postgres(pool) => {
                let conn: PostgresObject = pool
                    .get()
                    .await
                    .map_err(RecordMapDbError::PoolErrorPostgres)?;
                Ok(DbConnection::Postgres(conn))
            }
            DbPool::Sqlite(pool) => {
                let conn: SqliteObject = pool
                    .get()
                    .await
                    .map_err(RecordMapDbError::PoolErrorSqlite)?;
                Ok(DbConnection::Sqlite(conn))
            }
        }
    }

    #[must_use]
    pub fn db_type(&self) -> DatabaseType {
        self.db_type
    }
}

/// A connection checked out of the pool.
#[derive(Debug)]
pub enum DbConnection {
    Postgres(PostgresObject),
    Sqlite(SqliteObject),
}

/// The execute/query contract the mapping engine needs from a backend.
#[async_trait]
pub trait DatabaseExecutor {
    /// Execute a batch of statements (no parameters) within a transaction.
    async fn execute_batch(&mut self, sql: &str) -> Result<(), RecordMapDbError>;

    /// Execute a single SELECT and return the result set.
    async fn execute_select(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<ResultSet, RecordMapDbError>;

    /// Execute a single DML statement and return the rows affected.
    async fn execute_dml(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<usize, RecordMapDbError>;
}

#[async_trait]
impl DatabaseExecutor for DbConnection {
    async fn execute_batch(&mut self, sql: &str) -> Result<(), RecordMapDbError> {
        match self {
            DbConnection::Postgres(pg_client) => postgres::execute_batch(pg_client, sql).await,
            DbConnection::Sqlite(sqlite_client) => sqlite::execute_batch(sqlite_client, sql).await,
        }
    }

    async fn execute_select(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<ResultSet, RecordMapDbError> {
        match self {
            DbConnection::Postgres(pg_client) => {
                postgres::execute_select(pg_client, sql, params).await
            }
            DbConnection::Sqlite(sqlite_client) => {
                sqlite::execute_select(sqlite_client, sql, params).await
            }
        }
    }

    async fn execute_dml(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<usize, RecordMapDbError> {
        match self {
            DbConnection::Postgres(pg_client) => {
                postgres::execute_dml(pg_client, sql, params).await
            }
            DbConnection::Sqlite(sqlite_client) => {
                sqlite::execute_dml(sqlite_client, sql, params).await
            }
        }
    }
}
