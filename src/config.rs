use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::bot::reddit::Credentials;

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    /// A required credential is blank.
    MissingField(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Parse { path, source } => write!(f, "{} is not a valid config: {source}", path.display()),
            Self::MissingField(name) => write!(f, "`{name}` must be set and non-empty"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::MissingField(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    reddit_username: String,
    reddit_password: String,
    client_id: String,
    client_secret: String,
    #[serde(default = "default_user_agent")]
    user_agent: String,
    /// Directory for state files (ledger, logs). Defaults to current directory.
    data_dir: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

fn default_user_agent() -> String {
    "WORD OF THE DAY BOT".to_string()
}

pub struct Config {
    pub credentials: Credentials,
    /// Directory for state files (ledger, logs).
    pub data_dir: PathBuf,
    /// Log matches without replying or touching the ledger.
    pub dry_run: bool,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::Read { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse { path: config_path.clone(), source: e })?;

        let required = [
            ("reddit_username", &file.reddit_username),
            ("reddit_password", &file.reddit_password),
            ("client_id", &file.client_id),
            ("client_secret", &file.client_secret),
            ("user_agent", &file.user_agent),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(name));
            }
        }

        // Reddit shows names as u/name; the API wants the bare name
        let username = file.reddit_username.trim().trim_start_matches("u/").to_string();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            credentials: Credentials {
                username,
                password: file.reddit_password,
                client_id: file.client_id,
                client_secret: file.client_secret,
                user_agent: file.user_agent,
            },
            data_dir,
            dry_run: file.dry_run,
        })
    }

    /// Path of the replied-comment ledger inside the data directory.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(crate::bot::LEDGER_FILE)
    }
}
