use serde::{Deserialize, Serialize};

/// Backend connection targets for the two pools
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// URL the write pool connects to (default: "sqlite://./quire.db")
    #[serde(default = "default_write_url")]
    pub write_url: String,

    /// URL the read pool connects to. Falls back to `write_url` opened read-only.
    #[serde(default)]
    pub read_url: Option<String>,
}

impl DatabaseConfig {
    pub fn effective_read_url(&self) -> &str {
        self.read_url.as_deref().unwrap_or(&self.write_url)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            write_url: default_write_url(),
            read_url: None,
        }
    }
}

fn default_write_url() -> String {
    "sqlite://./quire.db".to_string()
}
