use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};
use uuid::Uuid;

use crate::{
    core::utils::{ensure_dir, tmp_path, PathResolver},
    errors::{ClubError, Result},
};

/// Which document store backend the CLI opens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Json,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub locale: String,
    pub club_name: String,
    pub sender_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treasurer_email: Option<String>,
    /// Member on whose behalf wizards commit (registrations, expenses).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acting_member: Option<Uuid>,
    #[serde(default)]
    pub store: StoreKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "de-CH".into(),
            club_name: "FC Example".into(),
            sender_email: "noreply@example.org".into(),
            treasurer_email: None,
            acting_member: None,
            store: StoreKind::Json,
        }
    }
}

impl Config {
    /// Applies a `key value` pair from the `config set` command.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "locale" => self.locale = value.to_string(),
            "club_name" => self.club_name = value.to_string(),
            "sender_email" => self.sender_email = value.to_string(),
            "treasurer_email" => {
                self.treasurer_email = (!value.is_empty()).then(|| value.to_string())
            }
            "acting_member" => {
                self.acting_member = if value.is_empty() {
                    None
                } else {
                    Some(Uuid::parse_str(value).map_err(|err| {
                        ClubError::Config(format!("acting_member must be a UUID: {err}"))
                    })?)
                }
            }
            "store" => {
                self.store = match value.to_ascii_lowercase().as_str() {
                    "json" => StoreKind::Json,
                    "memory" => StoreKind::Memory,
                    other => {
                        return Err(ClubError::Config(format!(
                            "unknown store `{other}` (expected json or memory)"
                        )))
                    }
                }
            }
            other => return Err(ClubError::Config(format!("unknown config key `{other}`"))),
        }
        Ok(())
    }

    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("locale", self.locale.clone()),
            ("club_name", self.club_name.clone()),
            ("sender_email", self.sender_email.clone()),
            (
                "treasurer_email",
                self.treasurer_email.clone().unwrap_or_default(),
            ),
            (
                "acting_member",
                self.acting_member.map(|id| id.to_string()).unwrap_or_default(),
            ),
            (
                "store",
                match self.store {
                    StoreKind::Json => "json".into(),
                    StoreKind::Memory => "memory".into(),
                },
            ),
        ]
    }
}

pub struct ConfigManager {
    base: PathBuf,
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
            base,
        })
    }

    pub fn load(&self) -> Result<Config> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
