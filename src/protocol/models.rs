use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Metadata of one search result, as returned by `GET /search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub title: String,
    pub identifier: String,
    pub url: String,
    pub length_ms: u64,
    pub author: String,
    pub author_id: Option<String>,
    pub thumbnail: Option<String>,
    pub is_live: bool,
}

/// One entry of the search response: the public track handle plus its info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTrack {
    pub id: String,
    pub info: TrackInfo,
}

/// Query parameters of `GET /search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchSource {
    Youtube,
    Soundcloud,
    Niconico,
    Bilibili,
    /// Query is passed to the resolver untouched (URLs, direct ids).
    #[default]
    None,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid search source '{0}'")]
pub struct InvalidSource(pub String);

impl SearchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Soundcloud => "soundcloud",
            Self::Niconico => "niconico",
            Self::Bilibili => "bilibili",
            Self::None => "none",
        }
    }

    /// Resolver query prefix, e.g. `ytsearch10:`.
    pub fn prefix(&self, max_results: u16) -> String {
        match self {
            Self::Youtube => format!("ytsearch{}:", max_results),
            Self::Soundcloud => format!("scsearch{}:", max_results),
            Self::Niconico => format!("nicosearch{}:", max_results),
            Self::Bilibili => format!("bilisearch{}:", max_results),
            Self::None => String::new(),
        }
    }
}

impl FromStr for SearchSource {
    type Err = InvalidSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "youtube" => Ok(Self::Youtube),
            "soundcloud" => Ok(Self::Soundcloud),
            "niconico" => Ok(Self::Niconico),
            "bilibili" => Ok(Self::Bilibili),
            "none" => Ok(Self::None),
            other => Err(InvalidSource(other.to_string())),
        }
    }
}

impl fmt::Display for SearchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
