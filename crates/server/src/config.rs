use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use catalog::client::DEFAULT_API_BASE;
use catalog::description::DEFAULT_LASTFM_BASE;
use catalog::token::DEFAULT_TOKEN_URL;
use catalog::{CatalogSettings, Credentials};
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub version: u32,
    pub port: u16,
    pub data_path: String,
    pub session_ttl_secs: u64,
    pub cors_origin: String,
    pub secure_cookies: bool,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_api_base: String,
    pub spotify_token_url: String,
    pub lastfm_api_key: String,
    pub lastfm_api_base: String,
    pub upstream_timeout_secs: u64,
    pub upstream_retries: u32,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_callback_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            port: 3000,
            data_path: "bandline.redb".to_string(),
            session_ttl_secs: 60 * 60 * 24 * 7,
            cors_origin: "http://localhost:5173".to_string(),
            secure_cookies: false,
            spotify_client_id: String::new(),
            spotify_client_secret: String::new(),
            spotify_api_base: DEFAULT_API_BASE.to_string(),
            spotify_token_url: DEFAULT_TOKEN_URL.to_string(),
            lastfm_api_key: String::new(),
            lastfm_api_base: DEFAULT_LASTFM_BASE.to_string(),
            upstream_timeout_secs: 10,
            upstream_retries: 2,
            google_client_id: String::new(),
            google_client_secret: String::new(),
            google_callback_url: "http://localhost:3000/auth/google/callback".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.max(1))
    }

    pub fn session_ttl(&self) -> Duration {
        if self.session_ttl_secs == 0 {
            Duration::from_secs(60 * 60 * 24 * 7)
        } else {
            Duration::from_secs(self.session_ttl_secs)
        }
    }

    pub fn catalog_settings(&self) -> CatalogSettings {
        CatalogSettings {
            api_base: self.spotify_api_base.clone(),
            token_url: self.spotify_token_url.clone(),
            credentials: Credentials {
                client_id: self.spotify_client_id.clone(),
                client_secret: self.spotify_client_secret.clone(),
            },
            timeout: self.upstream_timeout(),
            retries: self.upstream_retries,
        }
    }

    pub fn google_configured(&self) -> bool {
        !self.google_client_id.trim().is_empty()
            && !self.google_client_secret.trim().is_empty()
            && !self.google_callback_url.trim().is_empty()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "io error: {}", err),
            ConfigError::Yaml(err) => write!(f, "yaml error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

pub fn config_path_from_env() -> PathBuf {
    match env::var("BANDLINE_CONFIG") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => default_config_path(),
    }
}

fn default_config_path() -> PathBuf {
    match env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(|dir| dir.join("config.yaml"))
            .unwrap_or_else(|| PathBuf::from("config.yaml")),
        Err(_) => PathBuf::from("config.yaml"),
    }
}

pub fn load_or_create_config(path: &Path) -> Result<(ServerConfig, bool), ConfigError> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let mut config: ServerConfig = serde_yaml::from_str(&contents)?;
        if config.version < CONFIG_VERSION {
            config.version = CONFIG_VERSION;
        }
        if config.port == 0 {
            config.port = 3000;
        }
        if config.data_path.trim().is_empty() {
            config.data_path = "bandline.redb".to_string();
        }
        if config.spotify_api_base.trim().is_empty() {
            config.spotify_api_base = DEFAULT_API_BASE.to_string();
        }
        if config.spotify_token_url.trim().is_empty() {
            config.spotify_token_url = DEFAULT_TOKEN_URL.to_string();
        }
        if config.lastfm_api_base.trim().is_empty() {
            config.lastfm_api_base = DEFAULT_LASTFM_BASE.to_string();
        }
        return Ok((config, false));
    }

    let config = ServerConfig::default();
    save_config(path, &config)?;
    Ok((config, true))
}

pub fn save_config(path: &Path, config: &ServerConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Secrets usually live in the environment; non-empty values win over the file.
pub fn apply_env_overrides<F>(config: &mut ServerConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(port) = value("PORT").and_then(|port| port.trim().parse::<u16>().ok()) {
        config.port = port;
    }
    let strings: [(&str, &mut String); 6] = [
        ("SPOTIFY_CLIENT_ID", &mut config.spotify_client_id),
        ("SPOTIFY_CLIENT_SECRET", &mut config.spotify_client_secret),
        ("LASTFM_API_KEY", &mut config.lastfm_api_key),
        ("GOOGLE_CLIENT_ID", &mut config.google_client_id),
        ("GOOGLE_CLIENT_SECRET", &mut config.google_client_secret),
        ("GOOGLE_CALLBACK_URL", &mut config.google_callback_url),
    ];
    for (key, slot) in strings {
        if let Some(found) = value(key) {
            *slot = found.trim().to_string();
        }
    }
}

pub fn resolve_path(config_path: &Path, value: &str) -> PathBuf {
    let raw = PathBuf::from(value);
    if raw.is_absolute() {
        return raw;
    }
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    base.join(raw)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;

    use super::{apply_env_overrides, load_or_create_config, resolve_path, ServerConfig};

    #[test]
    fn creates_default_config_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let (config, created) = load_or_create_config(&path).unwrap();
        assert!(created);
        assert!(path.exists());
        assert_eq!(config.port, 3000);

        let (again, created) = load_or_create_config(&path).unwrap();
        assert!(!created);
        assert_eq!(again.data_path, "bandline.redb");
    }

    #[test]
    fn partial_file_is_filled_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "port: 0\nlastfm_api_key: abc\nspotify_api_base: ''\n").unwrap();
        let (config, _) = load_or_create_config(&path).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.lastfm_api_key, "abc");
        assert_eq!(config.spotify_api_base, "https://api.spotify.com/v1");
        assert_eq!(config.upstream_retries, 2);
    }

    #[test]
    fn environment_overrides_non_empty_values() {
        let env: HashMap<&str, &str> = [
            ("PORT", "8080"),
            ("SPOTIFY_CLIENT_ID", "cid"),
            ("SPOTIFY_CLIENT_SECRET", "  "),
            ("LASTFM_API_KEY", "key"),
        ]
        .into_iter()
        .collect();
        let mut config = ServerConfig {
            spotify_client_secret: "from-file".to_string(),
            ..ServerConfig::default()
        };
        apply_env_overrides(&mut config, |key| env.get(key).map(|value| value.to_string()));
        assert_eq!(config.port, 8080);
        assert_eq!(config.spotify_client_id, "cid");
        assert_eq!(config.spotify_client_secret, "from-file");
        assert_eq!(config.lastfm_api_key, "key");
        assert!(!config.google_configured());
    }

    #[test]
    fn relative_paths_resolve_next_to_config() {
        let resolved = resolve_path(Path::new("/etc/bandline/config.yaml"), "bandline.redb");
        assert_eq!(resolved, Path::new("/etc/bandline/bandline.redb"));
        assert_eq!(
            resolve_path(Path::new("config.yaml"), "/data/x.redb"),
            Path::new("/data/x.redb")
        );
    }
}
