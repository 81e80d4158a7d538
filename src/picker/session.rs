use crate::types::picker_api::{PickedMediaItem, SessionResource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub timeout_ms: u64,
}

impl PollingConfig {
    pub const DEFAULT_INTERVAL_MS: u64 = 2_000;
    pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Provider hints win for the interval; the timeout never exceeds ours.
    pub fn resolve(resource: &SessionResource, defaults: PollingConfig) -> Self {
        let Some(hints) = resource.polling_config.as_ref() else {
            return defaults;
        };
        let timeout_ms = hints
            .timeout_in()
            .map(|d| millis(d).min(defaults.timeout_ms))
            .unwrap_or(defaults.timeout_ms);
        // An interval longer than the whole window would never tick.
        let interval_ms = hints
            .poll_interval()
            .map(millis)
            .filter(|ms| *ms > 0 && *ms <= timeout_ms)
            .unwrap_or(defaults.interval_ms);
        Self {
            interval_ms,
            timeout_ms,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: Self::DEFAULT_INTERVAL_MS,
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
        }
    }
}

/// One interactive picking flow, as last reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerSession {
    pub id: String,
    pub picker_uri: String,
    /// The user finished picking and the selection can be listed.
    pub media_items_set: bool,
    pub polling_config: PollingConfig,
}

impl PickerSession {
    pub fn from_resource(resource: SessionResource, defaults: PollingConfig) -> Self {
        let polling_config = PollingConfig::resolve(&resource, defaults);
        Self {
            picker_uri: resource.picker_uri.unwrap_or_default(),
            media_items_set: resource.media_items_set,
            id: resource.id,
            polling_config,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedPhoto {
    pub id: String,
    pub media_item_id: String,
    pub base_url: String,
    pub thumbnail_url: String,
    pub filename: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub creation_time: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// How a provider's base URLs can be asked for a smaller rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resizing {
    /// Google `baseUrl` sizing parameters (`=w200-h200-c`).
    GoogleParams,
    /// Query-string sizing, honoured only by image CDNs known to support it.
    QueryParams,
    None,
}

const QUERY_RESIZE_HOSTS: &[&str] = &["images.unsplash.com"];

impl Resizing {
    pub fn thumbnail_url(self, base_url: &str, size: u32) -> String {
        match self {
            Resizing::GoogleParams => format!("{base_url}=w{size}-h{size}-c"),
            Resizing::QueryParams if supports_query_resize(base_url) => {
                let sep = if base_url.contains('?') { '&' } else { '?' };
                format!("{base_url}{sep}w={size}&h={size}&fit=crop")
            }
            Resizing::QueryParams | Resizing::None => base_url.to_string(),
        }
    }
}

fn supports_query_resize(base_url: &str) -> bool {
    url::Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .is_some_and(|host| QUERY_RESIZE_HOSTS.contains(&host.as_str()))
}

impl SelectedPhoto {
    pub fn normalize(item: PickedMediaItem, resizing: Resizing, thumbnail_size: u32) -> Self {
        let metadata = item.media_file.media_file_metadata.unwrap_or_default();
        let thumbnail_url = resizing.thumbnail_url(&item.media_file.base_url, thumbnail_size);
        Self {
            media_item_id: item.id.clone(),
            id: item.id,
            base_url: item.media_file.base_url,
            thumbnail_url,
            filename: item
                .media_file
                .filename
                .unwrap_or_else(|| "Unknown".to_string()),
            mime_type: item.media_file.mime_type,
            width: metadata.width.unwrap_or(0),
            height: metadata.height.unwrap_or(0),
            creation_time: item.create_time,
            description: item.description,
        }
    }
}
