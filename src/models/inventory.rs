use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::enums::ItemStatus;
use super::label::Label;

/// Public location of a stored photo. Both halves are always present:
/// there is no way to build one with an empty url or file id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPhotoRef")]
pub struct PhotoRef {
    url: String,
    file_id: String,
}

#[derive(Deserialize)]
struct RawPhotoRef {
    url: String,
    file_id: String,
}

impl PhotoRef {
    pub fn new(url: impl Into<String>, file_id: impl Into<String>) -> Option<Self> {
        let url = url.into();
        let file_id = file_id.into();
        if url.trim().is_empty() || file_id.trim().is_empty() {
            return None;
        }
        Some(Self { url, file_id })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }
}

impl TryFrom<RawPhotoRef> for PhotoRef {
    type Error = &'static str;

    fn try_from(raw: RawPhotoRef) -> Result<Self, Self::Error> {
        PhotoRef::new(raw.url, raw.file_id).ok_or("image.url and image.file_id must both be set")
    }
}

/// An item placed in the fridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: Label,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PhotoRef>,
    #[serde(with = "iso_z")]
    pub date_placed: DateTime<Utc>,
    #[serde(with = "iso_z")]
    pub expiration_date: DateTime<Utc>,
    pub status: ItemStatus,
}

impl InventoryItem {
    /// Record for a freshly scanned photo. Expiration is the placement
    /// instant: no shelf-life estimate exists yet.
    pub fn scanned(name: Label, image: PhotoRef, now: DateTime<Utc>) -> Self {
        Self {
            name,
            image: Some(image),
            date_placed: now,
            expiration_date: now,
            status: ItemStatus::InFridge,
        }
    }
}

/// A persisted item with its store-assigned identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub item: InventoryItem,
}

/// Selection for inventory reads. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InventoryFilter {
    pub name: Option<String>,
    pub status: Option<ItemStatus>,
}

impl InventoryFilter {
    pub fn matches(&self, item: &InventoryItem) -> bool {
        self.name
            .as_deref()
            .map_or(true, |name| item.name.to_string() == name)
            && self.status.map_or(true, |status| item.status == status)
    }
}

/// Item echoed back by the manual-add path. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualEntry {
    pub name: String,
}

/// Render a UTC timestamp as `2024-05-01T12:30:00.123456Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Serde adapter for 'Z'-suffixed ISO-8601 timestamps.
pub mod iso_z {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_timestamp(&s).map_err(serde::de::Error::custom)
    }
}
