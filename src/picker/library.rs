use crate::picker::fixture::sample_library;
use crate::picker::session::{Resizing, SelectedPhoto};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Shortest word of an entry's text that is used to match photos.
const MIN_KEYWORD_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub title: String,
    pub product_url: String,
    pub cover_photo_base_url: Option<String>,
    pub media_items_count: u32,
}

/// Browsable photo library backing the date, suggestion, album and search
/// endpoints in fixture mode. Live mode has no equivalent: the Picker API
/// only exposes what the user picked in a session.
#[derive(Clone)]
pub struct SampleLibrary {
    photos: Arc<[SelectedPhoto]>,
    albums: Arc<[Album]>,
}

impl SampleLibrary {
    pub fn new(thumbnail_size: u32) -> Self {
        let photos: Vec<SelectedPhoto> = sample_library()
            .into_iter()
            .map(|item| SelectedPhoto::normalize(item, Resizing::QueryParams, thumbnail_size))
            .collect();
        Self {
            photos: photos.into(),
            albums: sample_albums().into(),
        }
    }

    /// Photos taken on `day` (UTC).
    pub fn by_date(&self, day: NaiveDate) -> Vec<SelectedPhoto> {
        self.photos
            .iter()
            .filter(|p| p.creation_time.is_some_and(|t| t.date_naive() == day))
            .cloned()
            .collect()
    }

    /// Case-insensitive substring match on filename and description.
    pub fn search(&self, query: &str) -> Vec<SelectedPhoto> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.photos
            .iter()
            .filter(|p| searchable_text(p).contains(&needle))
            .cloned()
            .collect()
    }

    /// The day's photos first, then photos matching any keyword of `content`,
    /// without duplicates.
    pub fn suggested(&self, day: NaiveDate, content: Option<&str>) -> Vec<SelectedPhoto> {
        let mut photos = self.by_date(day);
        let keywords: Vec<String> = content
            .unwrap_or_default()
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|w| w.chars().count() >= MIN_KEYWORD_CHARS)
            .collect();
        if keywords.is_empty() {
            return photos;
        }

        let mut seen: HashSet<String> = photos.iter().map(|p| p.id.clone()).collect();
        for photo in self.photos.iter() {
            let text = searchable_text(photo);
            if keywords.iter().any(|k| text.contains(k.as_str())) && seen.insert(photo.id.clone())
            {
                photos.push(photo.clone());
            }
        }
        photos
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }
}

fn searchable_text(photo: &SelectedPhoto) -> String {
    format!(
        "{} {}",
        photo.filename,
        photo.description.as_deref().unwrap_or_default()
    )
    .to_lowercase()
}

fn sample_albums() -> Vec<Album> {
    const ALBUMS: &[(&str, &str, &str, u32)] = &[
        ("album-1", "Summer 2024", "photo-1507003211169-0a1dd7228f2d", 150),
        ("album-2", "Family activities", "photo-1511895426328-dc8714191300", 89),
        ("album-3", "Sports and training", "photo-1566479360739-a7e0b7a1c5ff", 45),
    ];
    ALBUMS
        .iter()
        .map(|(id, title, cover, count)| Album {
            id: id.to_string(),
            title: title.to_string(),
            product_url: format!("https://photos.google.com/album/{id}"),
            cover_photo_base_url: Some(format!("https://images.unsplash.com/{cover}")),
            media_items_count: *count,
        })
        .collect()
}
