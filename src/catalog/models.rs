use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog record types that carry media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Batch,
    Benefit,
    CarouselItem,
    Course,
    Icon,
}

/// Media column of a catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSlot {
    Banner,
    Brochure,
    Icon,
    Image,
    Thumbnail,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Batch => "batch",
            RecordKind::Benefit => "benefit",
            RecordKind::CarouselItem => "carousel_item",
            RecordKind::Course => "course",
            RecordKind::Icon => "icon",
        }
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "batch" => Ok(RecordKind::Batch),
            "benefit" => Ok(RecordKind::Benefit),
            "carousel_item" => Ok(RecordKind::CarouselItem),
            "course" => Ok(RecordKind::Course),
            "icon" => Ok(RecordKind::Icon),
            other => Err(format!("unknown record kind '{other}'")),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MediaSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaSlot::Banner => "banner",
            MediaSlot::Brochure => "brochure",
            MediaSlot::Icon => "icon",
            MediaSlot::Image => "image",
            MediaSlot::Thumbnail => "thumbnail",
        }
    }
}

/// Coarse media classification derived from a MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Document,
    Image,
    Other,
    Video,
}

impl FileType {
    pub fn from_mime(mime_type: &str) -> Self {
        match mime_type.split_once('/') {
            Some(("image", _)) => FileType::Image,
            Some(("video", _)) => FileType::Video,
            Some(("text", _)) | Some(("application", "pdf")) => FileType::Document,
            _ => FileType::Other,
        }
    }
}

/// A public URL attached to one media slot of one catalog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub record_kind: RecordKind,
    pub record_id: String,
    pub slot: MediaSlot,
    pub public_url: String,
    pub file_type: FileType,
    pub mime_type: String,
    pub byte_size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Attachment {
    pub fn key(&self) -> String {
        attachment_key(self.record_kind, &self.record_id, self.slot)
    }
}

pub fn attachment_key(kind: RecordKind, record_id: &str, slot: MediaSlot) -> String {
    format!("{}{}", record_prefix(kind, record_id), slot.as_str())
}

/// Key prefix shared by every attachment of one record.
pub fn record_prefix(kind: RecordKind, record_id: &str) -> String {
    format!("{}:{}:", kind.as_str(), record_id)
}
