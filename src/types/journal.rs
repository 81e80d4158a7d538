use crate::picker::SelectedPhoto;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Words read per minute for the reading time estimate.
const WORDS_PER_MINUTE: u32 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mood {
    pub emoji: String,
    pub value: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryStats {
    pub word_count: u32,
    /// Seconds, rounded up to whole minutes.
    pub reading_time: u32,
}

impl EntryStats {
    pub fn of(content: Option<&str>) -> Self {
        let word_count = content
            .map(|c| c.split_whitespace().count() as u32)
            .unwrap_or(0);
        Self {
            word_count,
            reading_time: word_count.div_ceil(WORDS_PER_MINUTE) * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub mood: Option<Mood>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub photos: Option<Vec<NewPhoto>>,
    #[serde(default)]
    pub people: Option<Vec<i64>>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub mood: Option<Mood>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub photos: Option<Vec<NewPhoto>>,
    pub people: Option<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub date: DateTime<Utc>,
    pub mood: Option<Mood>,
    pub category: String,
    pub tags: Vec<String>,
    pub stats: EntryStats,
    pub photos: Vec<JournalPhoto>,
    pub people: Vec<Person>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Photo to attach; `position` is a hint, stored positions are always dense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPhoto {
    pub google_photo_id: String,
    #[serde(default)]
    pub media_item_id: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub caption: Option<String>,
}

impl From<SelectedPhoto> for NewPhoto {
    fn from(p: SelectedPhoto) -> Self {
        NewPhoto {
            google_photo_id: p.id,
            media_item_id: Some(p.media_item_id),
            base_url: Some(p.base_url),
            thumbnail_url: Some(p.thumbnail_url),
            filename: Some(p.filename),
            mime_type: Some(p.mime_type),
            width: Some(i64::from(p.width)),
            height: Some(i64::from(p.height)),
            creation_time: p.creation_time,
            position: None,
            caption: p.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JournalPhoto {
    pub id: i64,
    pub entry_id: i64,
    pub google_photo_id: String,
    pub media_item_id: Option<String>,
    pub base_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub creation_time: Option<DateTime<Utc>>,
    pub position: i64,
    pub caption: Option<String>,
}

impl From<&JournalPhoto> for NewPhoto {
    fn from(p: &JournalPhoto) -> Self {
        NewPhoto {
            google_photo_id: p.google_photo_id.clone(),
            media_item_id: p.media_item_id.clone(),
            base_url: p.base_url.clone(),
            thumbnail_url: p.thumbnail_url.clone(),
            filename: p.filename.clone(),
            mime_type: p.mime_type.clone(),
            width: p.width,
            height: p.height,
            creation_time: p.creation_time,
            position: Some(p.position),
            caption: p.caption.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    pub name: String,
    #[serde(default)]
    pub google_contact_id: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub google_contact_id: Option<String>,
    pub avatar: Option<String>,
    pub relationship: Option<String>,
}
