//! SQL DDL for initializing the journal storage.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema with:
/// - `accounts`: the single linked Google account (`id` pinned to 1)
/// - `journal_entries`: tags stored as a JSON array in TEXT
/// - `journal_photos`: attachments, dense `position` per entry, cascade on entry delete
/// - `people` and the `entry_people` junction, cascade on either side
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    email TEXT NULL,
    access_token TEXT NULL,
    refresh_token TEXT NULL,
    scopes TEXT NULL, -- JSON array, serialized as text
    expiry TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS journal_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NULL,
    date TEXT NOT NULL,
    mood_emoji TEXT NULL,
    mood_value INTEGER NULL,
    category TEXT NOT NULL DEFAULT 'general',
    tags TEXT NOT NULL DEFAULT '[]',
    word_count INTEGER NOT NULL DEFAULT 0,
    reading_time INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_journal_entries_date ON journal_entries(date);

CREATE TABLE IF NOT EXISTS journal_photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id INTEGER NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    google_photo_id TEXT NOT NULL,
    media_item_id TEXT NULL,
    base_url TEXT NULL,
    thumbnail_url TEXT NULL,
    filename TEXT NULL,
    mime_type TEXT NULL,
    width INTEGER NULL,
    height INTEGER NULL,
    creation_time TEXT NULL,
    position INTEGER NOT NULL DEFAULT 0,
    caption TEXT NULL,
    UNIQUE (entry_id, position)
);

CREATE TABLE IF NOT EXISTS people (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    google_contact_id TEXT NULL,
    avatar TEXT NULL,
    relationship TEXT NULL
);

CREATE TABLE IF NOT EXISTS entry_people (
    entry_id INTEGER NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    person_id INTEGER NOT NULL REFERENCES people(id) ON DELETE CASCADE,
    PRIMARY KEY (entry_id, person_id)
);
"#;
