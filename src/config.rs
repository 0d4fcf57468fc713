// src/config.rs

//! Connection settings: `millbook.toml`, then environment overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::db::Database;
use crate::errors::MillError;
use crate::remote::firestore::DEFAULT_FIRESTORE_HOST;
use crate::remote::{FirestoreClient, RealtimeClient};
use crate::store::{DocumentStore, TreeStore};

pub const DEFAULT_CONFIG_FILE: &str = "millbook.toml";
const DEFAULT_CREDENTIALS_FILE: &str = "./serviceAccountKey.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// SQLite file on disk.
    #[default]
    Local,
    /// The hosted stores over REST.
    Rest,
}

impl Backend {
    pub fn parse(s: &str) -> Result<Self, MillError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "sqlite" => Ok(Backend::Local),
            "rest" | "remote" => Ok(Backend::Rest),
            other => Err(MillError::Config(format!(
                "unknown backend '{other}' (expected local or rest)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    pub project_id: Option<String>,
    /// Realtime tree root; derived from the project id when unset.
    pub database_url: Option<String>,
    pub firestore_host: String,
    pub api_key: Option<String>,
    pub auth_token: Option<String>,
    pub local_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Local,
            project_id: None,
            database_url: None,
            firestore_host: DEFAULT_FIRESTORE_HOST.into(),
            api_key: None,
            auth_token: None,
            local_path: "millbook.sqlite3".into(),
        }
    }
}

#[derive(Deserialize)]
struct ServiceAccount {
    project_id: Option<String>,
}

impl Config {
    /// Load from `path` (which must exist) or from `millbook.toml` in the
    /// working directory when present, then apply the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, MillError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;

        if config.project_id.is_none() {
            let creds = credentials_path(|key| std::env::var(key).ok());
            config.project_id = project_id_from_credentials(&creds)?;
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, MillError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MillError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, MillError> {
        toml::from_str(text).map_err(|e| MillError::Config(format!("invalid config: {e}")))
    }

    /// Environment variables win over the file.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<(), MillError> {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = get("MILLBOOK_BACKEND") {
            self.backend = Backend::parse(&backend)?;
        }
        if let Some(v) = get("MILLBOOK_DATABASE_URL") {
            self.database_url = Some(v);
        }
        if let Some(v) = get("MILLBOOK_PROJECT_ID") {
            self.project_id = Some(v);
        }
        if let Some(v) = get("MILLBOOK_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = get("MILLBOOK_AUTH_TOKEN") {
            self.auth_token = Some(v);
        }
        if let Some(v) = get("MILLBOOK_LOCAL_PATH") {
            self.local_path = v;
        }
        Ok(())
    }

    pub fn database_url(&self) -> Result<String, MillError> {
        match (&self.database_url, &self.project_id) {
            (Some(url), _) => Ok(url.clone()),
            (None, Some(project)) => Ok(format!("https://{project}-default-rtdb.firebaseio.com")),
            (None, None) => Err(MillError::Config(
                "no database url or project id configured; set MILLBOOK_DATABASE_URL \
                 or MILLBOOK_PROJECT_ID"
                    .into(),
            )),
        }
    }

    pub fn open_tree(&self) -> Result<Box<dyn TreeStore>, MillError> {
        match self.backend {
            Backend::Local => Ok(Box::new(Database::new(self.local_path.clone()))),
            Backend::Rest => {
                let url = self.database_url()?;
                log::debug!("realtime tree at {url}");
                Ok(Box::new(RealtimeClient::new(&url, self.auth_token.clone())?))
            }
        }
    }

    pub fn open_documents(&self) -> Result<Box<dyn DocumentStore>, MillError> {
        match self.backend {
            Backend::Local => Ok(Box::new(Database::new(self.local_path.clone()))),
            Backend::Rest => {
                let project = self
                    .project_id
                    .as_deref()
                    .ok_or_else(|| MillError::Config("MILLBOOK_PROJECT_ID is not set".into()))?;
                Ok(Box::new(FirestoreClient::new(
                    &self.firestore_host,
                    project,
                    self.api_key.clone(),
                    self.auth_token.clone(),
                )?))
            }
        }
    }
}

/// `FIREBASE_ADMIN_CREDENTIALS`, then `GOOGLE_APPLICATION_CREDENTIALS`, then
/// `./serviceAccountKey.json`.
pub fn credentials_path(get: impl Fn(&str) -> Option<String>) -> PathBuf {
    let get = |key: &str| get(key).filter(|p| !p.trim().is_empty());
    get("FIREBASE_ADMIN_CREDENTIALS")
        .or_else(|| get("GOOGLE_APPLICATION_CREDENTIALS"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_FILE))
}

/// The project id named in a service-account file. A missing file is not an
/// error; an unreadable one is.
pub fn project_id_from_credentials(path: &Path) -> Result<Option<String>, MillError> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)?;
    let account: ServiceAccount = serde_json::from_str(&text).map_err(|e| {
        MillError::Config(format!("invalid credentials file {}: {e}", path.display()))
    })?;
    log::debug!("project id taken from {}", path.display());
    Ok(account.project_id)
}
