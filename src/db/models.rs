use crate::google_oauth::credentials::GoogleCredential;
use crate::types::journal::{EntryStats, JournalEntry, Mood};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbAccount {
    pub email: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub scopes: Option<String>,
    pub expiry: DateTime<Utc>,
}

impl From<DbAccount> for GoogleCredential {
    fn from(d: DbAccount) -> Self {
        GoogleCredential {
            email: d.email,
            access_token: d.access_token,
            refresh_token: d.refresh_token,
            scopes: d.scopes.and_then(|s| serde_json::from_str(&s).ok()),
            expiry: d.expiry,
        }
    }
}

/// Row of `journal_entries`; photos and people are joined in separately.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbJournalEntry {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub date: DateTime<Utc>,
    pub mood_emoji: Option<String>,
    pub mood_value: Option<i64>,
    pub category: String,
    pub tags: String,
    pub word_count: i64,
    pub reading_time: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbJournalEntry> for JournalEntry {
    fn from(d: DbJournalEntry) -> Self {
        let mood = match (d.mood_emoji, d.mood_value) {
            (Some(emoji), Some(value)) => Some(Mood {
                emoji,
                value: value as i32,
            }),
            _ => None,
        };
        JournalEntry {
            id: d.id,
            title: d.title,
            content: d.content,
            date: d.date,
            mood,
            category: d.category,
            tags: serde_json::from_str(&d.tags).unwrap_or_default(),
            stats: EntryStats {
                word_count: d.word_count as u32,
                reading_time: d.reading_time as u32,
            },
            photos: Vec::new(),
            people: Vec::new(),
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}
