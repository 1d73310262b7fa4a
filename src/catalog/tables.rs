use redb::TableDefinition;

/// Attachments: `{record_kind}:{record_id}:{slot}` -> Attachment (msgpack)
pub const ATTACHMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("attachments");
