//! Settings loading.
//!
//! Layers are merged with `figment`: compiled defaults, then the JSON file
//! (skipped when absent), then `MURMUR_*` environment variables. The result
//! is validated before it is returned.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use tracing::debug;

use crate::errors::Result;
use crate::types::MurmurSettings;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "MURMUR_";

/// Resolve the path to the settings file (`~/.murmur/settings.json`).
pub fn settings_path() -> PathBuf {
    murmur_home().join("settings.json")
}

/// Root of murmur's per-user state (`~/.murmur`).
pub fn murmur_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".murmur")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<MurmurSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file is not an error; malformed JSON or a type mismatch in any
/// layer is.
pub fn load_settings_from_path(path: &Path) -> Result<MurmurSettings> {
    if path.exists() {
        debug!(?path, "loading settings from file");
    } else {
        debug!(?path, "settings file not found, using defaults");
    }

    let settings: MurmurSettings = Figment::from(Serialized::defaults(MurmurSettings::default()))
        .merge(Json::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    settings.validate()?;
    Ok(settings)
}
