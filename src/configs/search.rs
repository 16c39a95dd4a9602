use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: u16,
    pub ytdlp_path: String,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 10,
            ytdlp_path: "yt-dlp".to_string(),
            timeout_secs: 30,
        }
    }
}
