//! Codec configuration.
//!
//! Capabilities that depend on the blob format version are resolved once,
//! when a [`CodecConfig`] is built, instead of being re-derived on every
//! encode. The process-wide default reads `FRAMESTORE_FORMAT_VERSION` on first
//! use.

use lazy_static::lazy_static;

use crate::codec::flatten::DEFAULT_SEPARATOR;
use crate::limits::{FORMAT_VERSION, MIN_FORMAT_VERSION, UNIT_TAGGED_VERSION};

/// Environment variable selecting the blob format version to write.
pub const FORMAT_VERSION_ENV: &str = "FRAMESTORE_FORMAT_VERSION";

lazy_static! {
    static ref DEFAULT_CONFIG: CodecConfig = {
        let raw = std::env::var(FORMAT_VERSION_ENV).ok();
        CodecConfig::for_format_version(detect_format_version(raw.as_deref()))
    };
}

/// Settings shared by the text and binary codecs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Blob format version to write.
    pub format_version: u8,
    /// Reject timestamp columns that are not in nanoseconds before encoding.
    ///
    /// Set whenever the format version cannot record a time unit.
    pub precision_enforced: bool,
    /// Separator joining the components of multi-level labels.
    pub separator: String,
    /// zstd level for blob compression; `None` writes uncompressed blobs.
    pub compression_level: Option<i32>,
}

impl CodecConfig {
    /// Builds the configuration for writing the given format version.
    pub fn for_format_version(format_version: u8) -> Self {
        Self {
            format_version,
            precision_enforced: format_version < UNIT_TAGGED_VERSION,
            separator: DEFAULT_SEPARATOR.to_string(),
            compression_level: None,
        }
    }

    /// Returns the process-wide default configuration.
    pub fn global() -> &'static CodecConfig {
        &DEFAULT_CONFIG
    }

    /// Enables zstd compression at the given level.
    pub fn with_compression(mut self, level: i32) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Sets the multi-level label separator.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self::for_format_version(FORMAT_VERSION)
    }
}

/// Resolves the format version from an optional override string.
///
/// Unparseable or unsupported values fall back to [`FORMAT_VERSION`].
pub fn detect_format_version(raw: Option<&str>) -> u8 {
    let Some(raw) = raw else {
        return FORMAT_VERSION;
    };
    match raw.trim().parse::<u8>() {
        Ok(version) if (MIN_FORMAT_VERSION..=FORMAT_VERSION).contains(&version) => {
            log::debug!("using blob format version {version} from {FORMAT_VERSION_ENV}");
            version
        }
        _ => {
            log::warn!(
                "ignoring {FORMAT_VERSION_ENV}={raw:?}, falling back to format version {FORMAT_VERSION}"
            );
            FORMAT_VERSION
        }
    }
}
