//! Process-wide codec switches.
//!
//! These are read by individual element types (currently only the float types)
//! and never by the array machinery.

use once_cell::sync::Lazy;
use parking_lot::RwLock;

static CONFIG: Lazy<RwLock<CodecConfig>> = Lazy::new(|| RwLock::new(CodecConfig::new()));

/// Codec configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Accept and produce `NaN`, `Infinity` and `-Infinity` in the float text format.
    pub nan_infinity_aware: bool,
}

impl CodecConfig {
    /// Create a configuration with the defaults.
    pub fn new() -> Self {
        Self {
            nan_infinity_aware: false,
        }
    }

    /// Set whether non-finite floats are valid text values.
    pub fn nan_infinity_aware(mut self, enable: bool) -> Self {
        self.nan_infinity_aware = enable;
        self
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the active configuration.
pub fn current() -> CodecConfig {
    *CONFIG.read()
}

/// Replace the active configuration, returning the previous one.
pub fn set(config: CodecConfig) -> CodecConfig {
    std::mem::replace(&mut *CONFIG.write(), config)
}

pub fn set_nan_infinity_aware(enable: bool) {
    CONFIG.write().nan_infinity_aware = enable;
}

pub fn nan_infinity_aware() -> bool {
    CONFIG.read().nan_infinity_aware
}
