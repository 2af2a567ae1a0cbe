// Configuration: where the uploader gets its credentials and upload target.
// Values come from environment variables first and fall back to a small
// JSON file in the user's home directory (`~/.ikupload.json`).

use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_UPLOAD_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";
const CREDENTIALS_FILE: &str = ".ikupload.json";

const ENV_PRIVATE_KEY: &str = "IMAGEKIT_PRIVATE_KEY";
const ENV_PUBLIC_KEY: &str = "IMAGEKIT_PUBLIC_KEY";
const ENV_URL_ENDPOINT: &str = "IMAGEKIT_URL_ENDPOINT";
const ENV_UPLOAD_URL: &str = "IMAGEKIT_UPLOAD_URL";
const ENV_FOLDER: &str = "IMAGEKIT_FOLDER";
const ENV_STRICT: &str = "IKUPLOAD_STRICT";

/// Key pair and delivery endpoint of the ImageKit account.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub private_key: String,
    pub public_key: Option<String>,
    pub url_endpoint: Option<String>,
}

// Never print the private key.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .field("url_endpoint", &self.url_endpoint)
            .finish()
    }
}

/// Everything the binary needs to run one upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub credentials: Credentials,
    pub upload_url: String,
    pub folder: Option<String>,
    /// Exit non-zero when the upload does not succeed.
    pub strict: bool,
}

/// On-disk shape of `~/.ikupload.json`. Every field is optional so the file
/// can hold only what the environment does not provide.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct CredentialsFile {
    pub private_key: Option<String>,
    pub public_key: Option<String>,
    pub url_endpoint: Option<String>,
    pub upload_url: Option<String>,
    pub folder: Option<String>,
    pub strict: Option<bool>,
}

impl CredentialsFile {
    /// Read and parse a credentials file. A missing file is not an error and
    /// yields `None`.
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::ReadFile {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|source| ConfigError::ParseFile {
                path: path.display().to_string(),
                source,
            })
    }
}

/// Default location of the credentials file.
pub fn credentials_path() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(CREDENTIALS_FILE)
}

impl Settings {
    /// Load settings from the process environment and `~/.ikupload.json`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = credentials_path();
        let file = CredentialsFile::read(&path)?;
        if file.is_some() {
            log::debug!("loaded credentials file {}", path.display());
        }
        Self::resolve(|key| std::env::var(key).ok(), file.unwrap_or_default(), &path)
    }

    /// Merge environment lookups over file values. Empty environment values
    /// count as unset.
    pub fn resolve<F>(env: F, file: CredentialsFile, file_path: &Path) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let private_key = lookup(ENV_PRIVATE_KEY)
            .or(file.private_key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                var: ENV_PRIVATE_KEY,
                field: "private_key",
                file: file_path.display().to_string(),
            })?;

        let strict = match lookup(ENV_STRICT) {
            Some(v) => parse_flag(&v),
            None => file.strict.unwrap_or(false),
        };

        Ok(Settings {
            credentials: Credentials {
                private_key,
                public_key: lookup(ENV_PUBLIC_KEY).or(file.public_key),
                url_endpoint: lookup(ENV_URL_ENDPOINT).or(file.url_endpoint),
            },
            upload_url: lookup(ENV_UPLOAD_URL)
                .or(file.upload_url)
                .unwrap_or_else(|| DEFAULT_UPLOAD_URL.to_string()),
            folder: lookup(ENV_FOLDER).or(file.folder),
            strict,
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
