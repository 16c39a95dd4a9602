use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    /// Require the `Authorization` header on REST routes as well.
    pub search_requires_auth: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3555,
            password: "helloworld!".to_string(),
            search_requires_auth: false,
        }
    }
}
