//! Platform registry and label resolution
//!
//! Platforms are declared in a YAML file keyed by label:
//!
//! ```yaml
//! platforms:
//!   fb api:
//!     ad_account_id: ${FB_AD_ACCOUNT_ID}
//!     page_id: "1234"
//!     access_token: ${FB_ACCESS_TOKEN}
//!   fb api 2:
//!     ...
//! ```
//!
//! `${VAR}` placeholders are substituted once at startup. When the file does
//! not exist the registry holds a single `fb api` platform built from the
//! `facebook` config section.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use shared::PlatformConfig;

use crate::config::EnvLookup;
use crate::error::{UploaderError, UploaderResult};

/// Label used when a row names no platform
pub const DEFAULT_PLATFORM: &str = "fb api";

pub const DEFAULT_API_VERSION: &str = "v22.0";

/// Unresolved platform entry as written in YAML
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlatformEntry {
    pub ad_account_id: Option<String>,
    pub page_id: Option<String>,
    pub pixel_id: Option<String>,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub access_token: Option<String>,
    pub api_version: Option<String>,
    #[serde(alias = "instagram_actor_id")]
    pub pbia: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PlatformsFile {
    #[serde(default)]
    platforms: BTreeMap<String, PlatformEntry>,
}

/// Immutable label -> credentials map
#[derive(Debug, Clone, Default)]
pub struct PlatformRegistry {
    platforms: BTreeMap<String, PlatformConfig>,
}

impl PlatformRegistry {
    /// Load the platforms file, falling back to the single default platform
    pub fn load(path: &Path, fallback: &PlatformEntry, lookup: EnvLookup<'_>) -> UploaderResult<Self> {
        if !path.exists() {
            warn!(
                "Platforms file {} not found, using '{}' from config",
                path.display(),
                DEFAULT_PLATFORM
            );
            let mut entries = BTreeMap::new();
            entries.insert(DEFAULT_PLATFORM.to_string(), fallback.clone());
            return Self::from_entries(entries, lookup);
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content, lookup)
    }

    pub fn from_yaml(content: &str, lookup: EnvLookup<'_>) -> UploaderResult<Self> {
        let file: PlatformsFile = serde_yaml::from_str(content)?;
        if file.platforms.is_empty() {
            return Err(UploaderError::config("platforms file declares no platforms"));
        }
        Self::from_entries(file.platforms, lookup)
    }

    /// Resolve and validate every entry; any bad entry fails the whole load
    pub fn from_entries(
        entries: BTreeMap<String, PlatformEntry>,
        lookup: EnvLookup<'_>,
    ) -> UploaderResult<Self> {
        let mut platforms = BTreeMap::new();
        let mut problems = Vec::new();

        for (label, entry) in entries {
            let key = normalize_label(&label);
            match resolve_entry(&key, &entry, lookup) {
                Ok(config) => {
                    if platforms.insert(key.clone(), config).is_some() {
                        problems.push(format!("platform '{key}' is declared twice"));
                    }
                }
                Err(problem) => problems.push(problem),
            }
        }

        if !problems.is_empty() {
            return Err(UploaderError::config(problems.join("; ")));
        }

        info!(
            "Loaded {} platform(s): {}",
            platforms.len(),
            platforms.keys().cloned().collect::<Vec<_>>().join(", ")
        );
        Ok(Self { platforms })
    }

    /// Credentials for a label; blank means the default platform
    pub fn resolve(&self, label: &str) -> UploaderResult<&PlatformConfig> {
        let key = if label.trim().is_empty() {
            DEFAULT_PLATFORM.to_string()
        } else {
            normalize_label(label)
        };
        self.platforms
            .get(&key)
            .ok_or(UploaderError::UnknownPlatform { label: key })
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.platforms.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}

/// Trimmed, lower-cased, inner whitespace collapsed
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Replace `${VAR}` placeholders; unknown variables are left in place
pub fn substitute_env_vars(value: &str, lookup: EnvLookup<'_>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match lookup(name) {
                    Some(resolved) => out.push_str(&resolved),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve_field(value: &Option<String>, lookup: EnvLookup<'_>) -> Option<String> {
    value
        .as_deref()
        .map(|v| substitute_env_vars(v.trim(), lookup))
        .filter(|v| !v.is_empty() && !v.contains("${"))
}

fn resolve_entry(label: &str, entry: &PlatformEntry, lookup: EnvLookup<'_>) -> Result<PlatformConfig, String> {
    let mut missing = Vec::new();
    let mut required = |name: &'static str, value: &Option<String>| {
        let resolved = resolve_field(value, lookup);
        if resolved.is_none() {
            missing.push(name);
        }
        resolved.unwrap_or_default()
    };

    let ad_account_id = required("ad_account_id", &entry.ad_account_id);
    let page_id = required("page_id", &entry.page_id);
    let access_token = required("access_token", &entry.access_token);

    if !missing.is_empty() {
        return Err(format!(
            "platform '{}' is missing or has unresolved {}",
            label,
            missing.join(", ")
        ));
    }

    let ad_account_id = if ad_account_id.starts_with("act_") {
        ad_account_id
    } else {
        format!("act_{ad_account_id}")
    };

    Ok(PlatformConfig {
        label: label.to_string(),
        ad_account_id,
        page_id,
        pixel_id: resolve_field(&entry.pixel_id, lookup),
        app_id: resolve_field(&entry.app_id, lookup),
        app_secret: resolve_field(&entry.app_secret, lookup),
        access_token,
        api_version: resolve_field(&entry.api_version, lookup)
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        instagram_actor_id: resolve_field(&entry.pbia, lookup),
    })
}
