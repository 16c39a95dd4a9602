use base64::prelude::*;
use serde::{Deserialize, Serialize};

use super::models::TrackInfo;

/// Opaque track identifier exchanged with clients: base64 of JSON
/// `{id, title}`, plus `url` for handles kept inside the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackHandle {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TrackDecodeError {
    #[error("track id is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("track id does not hold a track handle: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrackHandle {
    /// Builds the handle for `info`. `internal` handles also carry the
    /// playback page url and must not be handed to untrusted callers.
    pub fn from_info(info: &TrackInfo, internal: bool) -> Self {
        Self {
            id: info.identifier.clone(),
            title: info.title.clone(),
            url: internal.then(|| info.url.clone()),
        }
    }

    pub fn is_internal(&self) -> bool {
        self.url.is_some()
    }

    /// What the resolver should look up to play this track.
    pub fn lookup_target(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.id)
    }

    pub fn encode(&self) -> String {
        let value = match &self.url {
            Some(url) => serde_json::json!({ "id": self.id, "title": self.title, "url": url }),
            None => serde_json::json!({ "id": self.id, "title": self.title }),
        };
        BASE64_STANDARD.encode(value.to_string())
    }

    pub fn decode(encoded: &str) -> Result<Self, TrackDecodeError> {
        let bytes = BASE64_STANDARD.decode(encoded.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
