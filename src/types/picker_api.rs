//! Wire shapes of the Google Photos Picker API (`photospicker.googleapis.com/v1`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `sessions` resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResource {
    pub id: String,
    #[serde(default)]
    pub picker_uri: Option<String>,
    #[serde(default)]
    pub media_items_set: bool,
    #[serde(default)]
    pub polling_config: Option<ProviderPollingConfig>,
    #[serde(default)]
    pub expire_time: Option<DateTime<Utc>>,
}

/// Durations are protobuf JSON strings such as `"5s"` or `"1799.5s"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPollingConfig {
    #[serde(default)]
    pub poll_interval: Option<String>,
    #[serde(default)]
    pub timeout_in: Option<String>,
}

impl ProviderPollingConfig {
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval.as_deref().and_then(parse_duration)
    }

    pub fn timeout_in(&self) -> Option<Duration> {
        self.timeout_in.as_deref().and_then(parse_duration)
    }
}

/// `mediaItems.list` response page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItemsPage {
    #[serde(default)]
    pub media_items: Vec<PickedMediaItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickedMediaItem {
    pub id: String,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub media_file: PickedMediaFile,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickedMediaFile {
    pub base_url: String,
    pub mime_type: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub media_file_metadata: Option<MediaFileMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFileMetadata {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Parse a protobuf JSON duration (`"<seconds>s"`).
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().strip_suffix('s')?.parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_parse_whole_and_fractional_seconds() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("1799s"), Some(Duration::from_secs(1799)));
        assert_eq!(parse_duration("5"), None);
        assert_eq!(parse_duration("-1s"), None);
    }

    #[test]
    fn out_of_range_durations_are_rejected() {
        assert_eq!(parse_duration("1e30s"), None);
        assert_eq!(parse_duration("NaNs"), None);
        assert_eq!(parse_duration("infs"), None);
    }

    #[test]
    fn session_resource_decodes_provider_json() {
        let raw = r#"{
            "id": "abc-123",
            "pickerUri": "https://photos.google.com/picker/abc-123",
            "pollingConfig": {"pollInterval": "5s", "timeoutIn": "1800s"},
            "expireTime": "2026-10-17T12:00:00Z"
        }"#;
        let session: SessionResource = serde_json::from_str(raw).unwrap();
        assert!(!session.media_items_set);
        let polling = session.polling_config.unwrap();
        assert_eq!(polling.poll_interval(), Some(Duration::from_secs(5)));
        assert_eq!(polling.timeout_in(), Some(Duration::from_secs(1800)));
    }

    #[test]
    fn media_item_decodes_nested_file_metadata() {
        let raw = r#"{
            "id": "m1",
            "createTime": "2024-08-24T09:30:00Z",
            "type": "PHOTO",
            "mediaFile": {
                "baseUrl": "https://lh3.googleusercontent.com/abc",
                "mimeType": "image/jpeg",
                "filename": "IMG_0001.jpg",
                "mediaFileMetadata": {"width": 4032, "height": 3024}
            }
        }"#;
        let item: PickedMediaItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.kind.as_deref(), Some("PHOTO"));
        let meta = item.media_file.media_file_metadata.unwrap();
        assert_eq!((meta.width, meta.height), (Some(4032), Some(3024)));
    }
}
