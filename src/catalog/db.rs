use redb::{Database as RedbDatabase, ReadTransaction, ReadableTable, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::tables::*;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Database error: {0}")]
    RedbDatabase(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
}

macro_rules! boxed_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for DatabaseError {
                fn from(e: $source) -> Self {
                    DatabaseError::$variant(Box::new(e))
                }
            }
        )*
    };
}

boxed_from! {
    redb::CommitError => Commit,
    redb::DatabaseError => RedbDatabase,
    redb::StorageError => Storage,
    redb::TableError => Table,
    redb::TransactionError => Transaction,
}

/// Handle to the catalog attachment store. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    db: Arc<RedbDatabase>,
}

#[derive(Debug, Default)]
pub struct PurgeStats {
    pub attachments: u64,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("catalog-media.redb");
        let db = Arc::new(RedbDatabase::create(db_path)?);

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ATTACHMENTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }

    /// Purge all data - for testing only
    pub fn purge_all(&self) -> Result<PurgeStats, DatabaseError> {
        let write_txn = self.begin_write()?;
        let mut stats = PurgeStats::default();
        {
            let mut table = write_txn.open_table(ATTACHMENTS)?;
            let keys: Vec<String> = table
                .iter()?
                .map(|r| r.map(|(k, _)| k.value().to_string()))
                .collect::<Result<Vec<_>, _>>()?;

            for key in keys {
                table.remove(key.as_str())?;
                stats.attachments += 1;
            }
        }
        write_txn.commit()?;
        Ok(stats)
    }
}
