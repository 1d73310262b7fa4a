//! Media attachments of catalog records (courses, batches, benefits,
//! carousel items, icons), stored in redb.

pub mod db;
mod attachments;
pub mod models;
mod tables;

pub use db::{Database, DatabaseError, PurgeStats};
pub use tables::*;
