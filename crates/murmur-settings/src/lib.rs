//! # murmur-settings
//!
//! Configuration for the relay and the chat client.
//!
//! Settings are layered (later layers win):
//! 1. **Compiled defaults** - [`MurmurSettings::default()`]
//! 2. **User file** - `~/.murmur/settings.json`, or an explicit path
//! 3. **Environment** - `MURMUR_*` variables, sections split on `__`
//!    (`MURMUR_SERVER__PORT=4000`, `MURMUR_LOGGING__LEVEL=debug`)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton.
static SETTINGS: OnceLock<MurmurSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from the default path with env var
/// overrides. If loading fails, returns compiled defaults.
pub fn get_settings() -> &'static MurmurSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// Returns the value back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: MurmurSettings) -> std::result::Result<(), MurmurSettings> {
    SETTINGS.set(settings)
}
