use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationMethod {
    #[default]
    Banned,
    Nanosecond,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct RotationConfig {
    pub enabled: bool,
    pub method: RotationMethod,
    pub blocks: Vec<String>,
    pub excluded_ips: Vec<String>,
}
