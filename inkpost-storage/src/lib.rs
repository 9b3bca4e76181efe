//! SQLite storage engine for Inkpost.
//!
//! Implements the storage ports from `inkpost-domain` on top of rusqlite:
//! - [`SqliteSessionFactory`] opens one [`SqliteUnitOfWork`] per request
//! - writes are tracked in a pending buffer and flushed by `save_changes`,
//!   which also stamps audit timestamps (`created_at` on insert,
//!   `updated_at` on update)
//! - transactions are explicit `BEGIN IMMEDIATE` / `COMMIT` / `ROLLBACK`
//!   statements on the session's connection
//!
//! Reads go straight to the connection, so inside an open transaction every
//! repository of the session observes the flushed-but-uncommitted writes.

mod repos;
mod schema;
mod session;

pub use session::{SqliteSessionFactory, SqliteUnitOfWork};
