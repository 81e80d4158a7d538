use crate::db::models::{DbAccount, DbJournalEntry};
use crate::db::schema::SQLITE_INIT;
use crate::error::JournalError;
use crate::google_oauth::credentials::GoogleCredential;
use crate::types::journal::{
    EntryPatch, EntryStats, JournalEntry, JournalPhoto, NewEntry, NewPerson, NewPhoto, Person,
};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use std::str::FromStr;

pub type SqlitePool = Pool<Sqlite>;

const ENTRY_COLUMNS: &str = "id, title, content, date, mood_emoji, mood_value, category, tags, \
     word_count, reading_time, created_at, updated_at";

/// Entry ids bound per `IN (...)` query; stays below SQLite's variable limit.
const RELATION_BATCH: usize = 500;

const PHOTO_COLUMNS: &str = "id, entry_id, google_photo_id, media_item_id, base_url, \
     thumbnail_url, filename, mime_type, width, height, creation_time, position, caption";

#[derive(Clone)]
pub struct JournalStorage {
    pool: SqlitePool,
}

impl JournalStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) and initialize the database.
    pub async fn connect(database_url: &str) -> Result<Self, JournalError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let mut pool_opts = SqlitePoolOptions::new();
        // Every connection to `:memory:` is its own database; keep exactly one.
        if database_url.contains(":memory:") {
            pool_opts = pool_opts
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_opts.connect_with(connect_opts).await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), JournalError> {
        // execute multiple statements safely (SQLite supports multi-commands but sqlx::query doesn't)
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    // --- linked Google account ---

    pub async fn load_account(&self) -> Result<Option<GoogleCredential>, JournalError> {
        let row: Option<DbAccount> = sqlx::query_as(
            "SELECT email, access_token, refresh_token, scopes, expiry FROM accounts WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn save_account(&self, cred: &GoogleCredential) -> Result<(), JournalError> {
        let scopes_json = cred.scopes.as_ref().map(serde_json::to_string).transpose()?;
        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, access_token, refresh_token, scopes, expiry, updated_at)
            VALUES (1, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                email=excluded.email,
                access_token=excluded.access_token,
                refresh_token=excluded.refresh_token,
                scopes=excluded.scopes,
                expiry=excluded.expiry,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(&cred.email)
        .bind(&cred.access_token)
        .bind(&cred.refresh_token)
        .bind(scopes_json)
        .bind(cred.expiry)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn clear_account(&self) -> Result<(), JournalError> {
        sqlx::query("DELETE FROM accounts")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- entries ---

    pub async fn create_entry(&self, new: NewEntry) -> Result<JournalEntry, JournalError> {
        let now = Utc::now();
        let stats = EntryStats::of(new.content.as_deref());
        let tags = serde_json::to_string(&new.tags)?;
        let (mood_emoji, mood_value) = match new.mood {
            Some(m) => (Some(m.emoji), Some(i64::from(m.value))),
            None => (None, None),
        };

        let mut tx = self.pool.begin().await?;
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO journal_entries (
                title, content, date, mood_emoji, mood_value, category, tags,
                word_count, reading_time, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(new.title)
        .bind(new.content)
        .bind(new.date.unwrap_or(now))
        .bind(mood_emoji)
        .bind(mood_value)
        .bind(new.category.unwrap_or_else(|| "general".to_string()))
        .bind(tags)
        .bind(i64::from(stats.word_count))
        .bind(i64::from(stats.reading_time))
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(photos) = new.photos {
            write_photos(&mut tx, id, photos).await?;
        }
        if let Some(people) = new.people {
            write_people(&mut tx, id, &people).await?;
        }
        tx.commit().await?;

        self.get_entry(id)
            .await?
            .ok_or(JournalError::EntryNotFound(id))
    }

    pub async fn get_entry(&self, id: i64) -> Result<Option<JournalEntry>, JournalError> {
        let row: Option<DbJournalEntry> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut entry: JournalEntry = row.into();
        entry.photos = self.list_photos(id).await?;
        entry.people = self.entry_people(id).await?;
        Ok(Some(entry))
    }

    /// All entries, newest first.
    pub async fn list_entries(&self) -> Result<Vec<JournalEntry>, JournalError> {
        let rows: Vec<DbJournalEntry> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM journal_entries ORDER BY date DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        self.with_relations(rows).await
    }

    /// Case-insensitive substring match on title or content.
    pub async fn search_entries(&self, query: &str) -> Result<Vec<JournalEntry>, JournalError> {
        let pattern = like_pattern(query);
        let rows: Vec<DbJournalEntry> = sqlx::query_as(&format!(
            r#"SELECT {ENTRY_COLUMNS} FROM journal_entries
               WHERE title LIKE ?1 ESCAPE '\' OR content LIKE ?1 ESCAPE '\'
               ORDER BY date DESC, id DESC"#
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        self.with_relations(rows).await
    }

    pub async fn entries_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<JournalEntry>, JournalError> {
        let rows: Vec<DbJournalEntry> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE category = ? ORDER BY date DESC, id DESC"
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        self.with_relations(rows).await
    }

    /// Apply a partial update. Returns `None` when the entry does not exist.
    pub async fn update_entry(
        &self,
        id: i64,
        patch: EntryPatch,
    ) -> Result<Option<JournalEntry>, JournalError> {
        let mut tx = self.pool.begin().await?;
        let current: Option<DbJournalEntry> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(mut row) = current else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            row.title = title;
        }
        if let Some(content) = patch.content {
            let stats = EntryStats::of(Some(&content));
            row.word_count = i64::from(stats.word_count);
            row.reading_time = i64::from(stats.reading_time);
            row.content = Some(content);
        }
        if let Some(date) = patch.date {
            row.date = date;
        }
        if let Some(mood) = patch.mood {
            row.mood_emoji = Some(mood.emoji);
            row.mood_value = Some(i64::from(mood.value));
        }
        if let Some(category) = patch.category {
            row.category = category;
        }
        if let Some(tags) = patch.tags {
            row.tags = serde_json::to_string(&tags)?;
        }

        sqlx::query(
            r#"UPDATE journal_entries SET
                title = ?, content = ?, date = ?, mood_emoji = ?, mood_value = ?,
                category = ?, tags = ?, word_count = ?, reading_time = ?, updated_at = ?
              WHERE id = ?"#,
        )
        .bind(&row.title)
        .bind(&row.content)
        .bind(row.date)
        .bind(&row.mood_emoji)
        .bind(row.mood_value)
        .bind(&row.category)
        .bind(&row.tags)
        .bind(row.word_count)
        .bind(row.reading_time)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(photos) = patch.photos {
            write_photos(&mut tx, id, photos).await?;
        }
        if let Some(people) = patch.people {
            write_people(&mut tx, id, &people).await?;
        }
        tx.commit().await?;
        self.get_entry(id).await
    }

    /// Returns whether a row was deleted. Photos and people links cascade.
    pub async fn delete_entry(&self, id: i64) -> Result<bool, JournalError> {
        let res = sqlx::query("DELETE FROM journal_entries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- photo attachments ---

    pub async fn list_photos(&self, entry_id: i64) -> Result<Vec<JournalPhoto>, JournalError> {
        let photos = sqlx::query_as(&format!(
            "SELECT {PHOTO_COLUMNS} FROM journal_photos WHERE entry_id = ? ORDER BY position"
        ))
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(photos)
    }

    /// Replace an entry's attachments; stored positions become `0..n`.
    pub async fn replace_photos(
        &self,
        entry_id: i64,
        photos: Vec<NewPhoto>,
    ) -> Result<Vec<JournalPhoto>, JournalError> {
        let mut tx = self.pool.begin().await?;
        ensure_entry(&mut tx, entry_id).await?;
        write_photos(&mut tx, entry_id, photos).await?;
        tx.commit().await?;
        self.list_photos(entry_id).await
    }

    /// Append after the existing attachments, keeping positions dense.
    pub async fn append_photos(
        &self,
        entry_id: i64,
        photos: Vec<NewPhoto>,
    ) -> Result<Vec<JournalPhoto>, JournalError> {
        let mut tx = self.pool.begin().await?;
        ensure_entry(&mut tx, entry_id).await?;
        let existing: Vec<JournalPhoto> = sqlx::query_as(&format!(
            "SELECT {PHOTO_COLUMNS} FROM journal_photos WHERE entry_id = ? ORDER BY position"
        ))
        .bind(entry_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut combined: Vec<NewPhoto> = existing.iter().map(NewPhoto::from).collect();
        let offset = combined.len() as i64;
        combined.extend(photos.into_iter().enumerate().map(|(i, mut p)| {
            p.position = Some(offset + i as i64);
            p
        }));
        write_photos(&mut tx, entry_id, combined).await?;
        tx.commit().await?;
        self.list_photos(entry_id).await
    }

    // --- people ---

    pub async fn list_people(&self) -> Result<Vec<Person>, JournalError> {
        let people = sqlx::query_as(
            "SELECT id, name, google_contact_id, avatar, relationship FROM people ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(people)
    }

    pub async fn create_person(&self, new: NewPerson) -> Result<Person, JournalError> {
        let person = sqlx::query_as(
            r#"INSERT INTO people (name, google_contact_id, avatar, relationship)
               VALUES (?, ?, ?, ?)
               RETURNING id, name, google_contact_id, avatar, relationship"#,
        )
        .bind(new.name)
        .bind(new.google_contact_id)
        .bind(new.avatar)
        .bind(new.relationship)
        .fetch_one(&self.pool)
        .await?;
        Ok(person)
    }

    async fn entry_people(&self, entry_id: i64) -> Result<Vec<Person>, JournalError> {
        let people = sqlx::query_as(
            r#"SELECT p.id, p.name, p.google_contact_id, p.avatar, p.relationship
               FROM people p JOIN entry_people ep ON ep.person_id = p.id
               WHERE ep.entry_id = ? ORDER BY p.name"#,
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(people)
    }

    /// Attach photos and people to a batch of rows, querying only the
    /// relations of those rows.
    async fn with_relations(
        &self,
        rows: Vec<DbJournalEntry>,
    ) -> Result<Vec<JournalEntry>, JournalError> {
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut photos_by_entry: HashMap<i64, Vec<JournalPhoto>> = HashMap::new();
        let mut people_by_entry: HashMap<i64, Vec<Person>> = HashMap::new();

        for batch in ids.chunks(RELATION_BATCH) {
            let mut query = QueryBuilder::<Sqlite>::new(format!(
                "SELECT {PHOTO_COLUMNS} FROM journal_photos WHERE entry_id IN ("
            ));
            push_ids(&mut query, batch);
            query.push(") ORDER BY entry_id, position");
            let photos: Vec<JournalPhoto> =
                query.build_query_as().fetch_all(&self.pool).await?;
            for photo in photos {
                photos_by_entry.entry(photo.entry_id).or_default().push(photo);
            }

            let mut query = QueryBuilder::<Sqlite>::new(
                r#"SELECT ep.entry_id, p.id, p.name, p.google_contact_id, p.avatar, p.relationship
                   FROM entry_people ep JOIN people p ON p.id = ep.person_id
                   WHERE ep.entry_id IN ("#,
            );
            push_ids(&mut query, batch);
            query.push(") ORDER BY p.name");
            let links: Vec<(i64, i64, String, Option<String>, Option<String>, Option<String>)> =
                query.build_query_as().fetch_all(&self.pool).await?;
            for (entry_id, id, name, google_contact_id, avatar, relationship) in links {
                people_by_entry.entry(entry_id).or_default().push(Person {
                    id,
                    name,
                    google_contact_id,
                    avatar,
                    relationship,
                });
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut entry: JournalEntry = row.into();
                entry.photos = photos_by_entry.remove(&entry.id).unwrap_or_default();
                entry.people = people_by_entry.remove(&entry.id).unwrap_or_default();
                entry
            })
            .collect())
    }
}

fn push_ids(query: &mut QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
}

async fn ensure_entry(conn: &mut SqliteConnection, entry_id: i64) -> Result<(), JournalError> {
    let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM journal_entries WHERE id = ?")
        .bind(entry_id)
        .fetch_optional(&mut *conn)
        .await?;
    found
        .map(|_| ())
        .ok_or(JournalError::EntryNotFound(entry_id))
}

/// Replace all attachment rows of an entry inside the caller's transaction.
async fn write_photos(
    conn: &mut SqliteConnection,
    entry_id: i64,
    photos: Vec<NewPhoto>,
) -> Result<(), JournalError> {
    sqlx::query("DELETE FROM journal_photos WHERE entry_id = ?")
        .bind(entry_id)
        .execute(&mut *conn)
        .await?;

    for (position, photo) in dense_positions(photos).into_iter().enumerate() {
        sqlx::query(
            r#"INSERT INTO journal_photos (
                entry_id, google_photo_id, media_item_id, base_url, thumbnail_url,
                filename, mime_type, width, height, creation_time, position, caption
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(entry_id)
        .bind(photo.google_photo_id)
        .bind(photo.media_item_id)
        .bind(photo.base_url)
        .bind(photo.thumbnail_url)
        .bind(photo.filename)
        .bind(photo.mime_type)
        .bind(photo.width)
        .bind(photo.height)
        .bind(photo.creation_time)
        .bind(position as i64)
        .bind(photo.caption)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn write_people(
    conn: &mut SqliteConnection,
    entry_id: i64,
    people: &[i64],
) -> Result<(), JournalError> {
    sqlx::query("DELETE FROM entry_people WHERE entry_id = ?")
        .bind(entry_id)
        .execute(&mut *conn)
        .await?;
    for person_id in people {
        let known: Option<(i64,)> = sqlx::query_as("SELECT id FROM people WHERE id = ?")
            .bind(person_id)
            .fetch_optional(&mut *conn)
            .await?;
        if known.is_none() {
            return Err(JournalError::BadRequest(format!(
                "unknown person id {person_id}"
            )));
        }
        sqlx::query("INSERT OR IGNORE INTO entry_people (entry_id, person_id) VALUES (?, ?)")
            .bind(entry_id)
            .bind(person_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Order by the requested position (input order when absent), ties kept stable.
fn dense_positions(photos: Vec<NewPhoto>) -> Vec<NewPhoto> {
    let mut keyed: Vec<(i64, usize, NewPhoto)> = photos
        .into_iter()
        .enumerate()
        .map(|(i, p)| (p.position.unwrap_or(i as i64), i, p))
        .collect();
    keyed.sort_by_key(|(pos, i, _)| (*pos, *i));
    keyed
        .into_iter()
        .enumerate()
        .map(|(dense, (_, _, mut p))| {
            p.position = Some(dense as i64);
            p
        })
        .collect()
}

fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
