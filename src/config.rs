use std::collections::HashMap;
use std::env;
use std::fs;

const DEFAULT_LM_STUDIO_URL: &str = "http://localhost:1234/v1";
const DEFAULT_LM_STUDIO_MODEL: &str = "local-model";
const DEFAULT_BIND_PORT: u16 = 8000;
const DEFAULT_USER_ID: i64 = 1;

/// Key-value settings from an env-style file, with process environment
/// variables as fallback for every key.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(format!("Invalid config line {}: {}", idx + 1, line));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            // A lone quote character satisfies both ends; only strip a pair.
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .cloned()
            .or_else(|| env::var(key).ok())
    }

    pub fn run_mode(&self) -> String {
        self.get("RUN_MODE").unwrap_or_else(|| "cli".to_string())
    }

    pub fn lm_studio_url(&self) -> String {
        self.get("LM_STUDIO_URL")
            .unwrap_or_else(|| DEFAULT_LM_STUDIO_URL.to_string())
    }

    pub fn lm_studio_api_key(&self) -> String {
        self.get("LM_STUDIO_API_KEY").unwrap_or_default()
    }

    pub fn lm_studio_model(&self) -> String {
        self.get("LM_STUDIO_MODEL")
            .unwrap_or_else(|| DEFAULT_LM_STUDIO_MODEL.to_string())
    }

    pub fn bind_port(&self) -> u16 {
        self.get("BIND_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_BIND_PORT)
    }

    pub fn default_user_id(&self) -> i64 {
        self.get("DEFAULT_USER_ID")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_USER_ID)
    }
}
