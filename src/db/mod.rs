//! Database layer
//!
//! Persistence for the blog. Two backends are supported:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The driver is selected in configuration. Repositories write each query
//! once with `?` placeholders and run it against whichever concrete pool
//! `DatabasePool::backend` returns, via [`with_backend!`].

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, MysqlDatabase,
    SqliteDatabase,
};

/// Run the same query code against the SQLite or MySQL pool.
///
/// The body is expanded once per backend, so row decoding inside it works
/// with both `SqliteRow` and `MySqlRow`.
#[macro_export]
macro_rules! with_backend {
    ($pool:expr, |$p:ident| $body:expr) => {
        match $pool.backend() {
            $crate::db::Backend::Sqlite($p) => $body,
            $crate::db::Backend::Mysql($p) => $body,
        }
    };
}

/// Auto-increment id of the row an `INSERT` just created
pub trait InsertedId {
    fn inserted_id(&self) -> i64;
}

impl InsertedId for sqlx::sqlite::SqliteQueryResult {
    fn inserted_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}

impl InsertedId for sqlx::mysql::MySqlQueryResult {
    fn inserted_id(&self) -> i64 {
        self.last_insert_id() as i64
    }
}
