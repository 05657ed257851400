//! Package-level constants and protocol limits.

/// Current version of murmur (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "murmur";

/// Minimum username length, in characters, after trimming.
pub const USERNAME_MIN_CHARS: usize = 2;

/// Maximum username length, in characters, after trimming.
pub const USERNAME_MAX_CHARS: usize = 20;

/// Messages kept per conversation thread on the client.
pub const THREAD_CAPACITY: usize = 50;

/// Idle time after the last keystroke before "stopped typing" is sent.
pub const TYPING_IDLE_MS: u64 = 2_000;
