use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{attachment_key, record_prefix, Attachment, MediaSlot, RecordKind};
use super::tables::*;

impl Database {
    // ========================================================================
    // Attachment operations
    // ========================================================================

    /// Store an attachment, replacing whatever the slot held before.
    /// Keeps the original `created_at` when replacing.
    pub fn attach(&self, attachment: &Attachment) -> Result<Attachment, DatabaseError> {
        debug_assert!(
            !attachment.record_id.is_empty(),
            "record id must not be empty"
        );

        let key = attachment.key();
        let write_txn = self.begin_write()?;
        let stored = {
            let mut table = write_txn.open_table(ATTACHMENTS)?;
            let previous: Option<Attachment> = match table.get(key.as_str())? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };

            let mut stored = attachment.clone();
            if let Some(previous) = previous {
                stored.created_at = previous.created_at;
            }
            let data = rmp_serde::to_vec_named(&stored)?;
            table.insert(key.as_str(), data.as_slice())?;
            stored
        };
        write_txn.commit()?;
        Ok(stored)
    }

    pub fn get_attachment(
        &self,
        kind: RecordKind,
        record_id: &str,
        slot: MediaSlot,
    ) -> Result<Option<Attachment>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ATTACHMENTS)?;

        let key = attachment_key(kind, record_id, slot);
        match table.get(key.as_str())? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// All attachments of one record, ordered by slot key.
    pub fn list_for_record(
        &self,
        kind: RecordKind,
        record_id: &str,
    ) -> Result<Vec<Attachment>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ATTACHMENTS)?;

        let prefix = record_prefix(kind, record_id);
        let mut attachments = Vec::new();
        for result in table.range(prefix.as_str()..)? {
            let (key, value) = result?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            attachments.push(rmp_serde::from_slice(value.value())?);
        }

        Ok(attachments)
    }

    /// All attachments of one record kind.
    pub fn list_for_kind(&self, kind: RecordKind) -> Result<Vec<Attachment>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ATTACHMENTS)?;

        let prefix = format!("{}:", kind.as_str());
        let mut attachments = Vec::new();
        for result in table.range(prefix.as_str()..)? {
            let (key, value) = result?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            attachments.push(rmp_serde::from_slice(value.value())?);
        }

        Ok(attachments)
    }

    /// Remove the attachment in one slot. Returns whether anything was removed.
    pub fn detach(
        &self,
        kind: RecordKind,
        record_id: &str,
        slot: MediaSlot,
    ) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(ATTACHMENTS)?;
            let key = attachment_key(kind, record_id, slot);
            let removed = table.remove(key.as_str())?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }
}
