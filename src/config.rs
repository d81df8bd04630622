use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::git;

const APP_NAME: &str = "hk";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_API_URL: &str = "https://api.heroku.com";
const API_URL_ENV: &str = "HEROKU_API_URL";
const API_KEY_ENV: &str = "HEROKU_API_KEY";
const APP_ENV: &str = "HKAPP";
const APP_REMOTE: &str = "heroku";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
        }
    }
}

impl Config {
    /// Loads the config file, then lets `.env` and the environment override it.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::load_from(&get_config_path()?)?;
        config.apply_overrides(env::var(API_URL_ENV).ok(), env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn apply_overrides(&mut self, api_url: Option<String>, api_key: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.is_empty()) {
            self.api_url = url;
        }
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
    }
}

fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Failed to determine config directory")?
        .join(APP_NAME);
    Ok(config_dir.join(CONFIG_FILE))
}

/// Picks the app to operate on: the `-a` flag, then `$HKAPP`, then the
/// `heroku` git remote of the working directory.
pub fn resolve_app(flag: Option<&str>) -> Result<String> {
    let env_app = env::var(APP_ENV).ok();
    let remote_app = || git::remote_url(APP_REMOTE).and_then(|url| app_from_remote_url(&url));
    pick_app(flag, env_app.as_deref(), remote_app)
}

fn pick_app<F>(flag: Option<&str>, env_app: Option<&str>, remote_app: F) -> Result<String>
where
    F: FnOnce() -> Option<String>,
{
    flag.filter(|a| !a.is_empty())
        .or(env_app.filter(|a| !a.is_empty()))
        .map(str::to_string)
        .or_else(remote_app)
        .context("must specify app")
}

/// Extracts the app name from a git remote such as
/// `https://git.heroku.com/myapp.git` or `git@heroku.com:myapp.git`.
pub fn app_from_remote_url(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/');
    let path = url.strip_suffix(".git").unwrap_or(url);
    let name = path.rsplit(|c| c == '/' || c == ':').next()?;
    if name.is_empty() || name == path {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_load_nonexistent() -> Result<()> {
        let temp = assert_fs::TempDir::new()?;
        let config_file = temp.child(CONFIG_FILE);

        assert!(!config_file.exists());
        let config = Config::load_from(config_file.path())?;
        assert_eq!(config, Config::default());
        assert_eq!(config.api_url, "https://api.heroku.com");
        Ok(())
    }

    #[test]
    fn test_load_partial_file() -> Result<()> {
        let temp = assert_fs::TempDir::new()?;
        let config_file = temp.child(CONFIG_FILE);
        config_file.write_str(r#"{"api_key": "secret"}"#)?;

        let config = Config::load_from(config_file.path())?;
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        Ok(())
    }

    #[test]
    fn test_load_invalid_file() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "not json")?;

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
        Ok(())
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(Some("http://localhost:5000".to_string()), Some(String::new()));
        assert_eq!(config.api_url, "http://localhost:5000");
        assert_eq!(config.api_key, None);

        config.apply_overrides(None, Some("token".to_string()));
        assert_eq!(config.api_url, "http://localhost:5000");
        assert_eq!(config.api_key.as_deref(), Some("token"));
    }

    #[test]
    fn test_app_from_remote_url() {
        assert_eq!(
            app_from_remote_url("https://git.heroku.com/myapp.git").as_deref(),
            Some("myapp")
        );
        assert_eq!(
            app_from_remote_url("git@heroku.com:myapp.git\n").as_deref(),
            Some("myapp")
        );
        assert_eq!(
            app_from_remote_url("ssh://git@heroku.com/my-app.git").as_deref(),
            Some("my-app")
        );
        assert_eq!(app_from_remote_url("myapp"), None);
        assert_eq!(app_from_remote_url(""), None);
    }

    #[test]
    fn test_pick_app_precedence() -> Result<()> {
        let remote = || Some("from-remote".to_string());
        assert_eq!(pick_app(Some("flag"), Some("env"), remote)?, "flag");
        assert_eq!(pick_app(Some(""), Some("env"), remote)?, "env");
        assert_eq!(pick_app(None, None, remote)?, "from-remote");

        let err = pick_app(None, Some(""), || None).unwrap_err();
        assert_eq!(err.to_string(), "must specify app");
        Ok(())
    }
}
