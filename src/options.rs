//! Construction options for file sources and sinks.
//!
//! Both stages take a plain options struct with defaults, validated once at
//! construction. Validation never touches the filesystem: a bad start
//! offset, buffer capacity, or encoding name is rejected before any
//! descriptor is opened.

use crate::encoding::Encoding;
use crate::error::{Result, SiphonError};

/// Default permission bits applied when creating the destination (Unix).
pub const DEFAULT_PERMISSIONS: u32 = 0o666;

/// Default capacity of the shared chunk buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Write mode for the destination descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Create if missing, truncate if present.
    #[default]
    Truncate,
    /// Create if missing, append to the end if present.
    Append,
    /// Create; fail if the path already exists.
    CreateNew,
}

/// Options accepted at source construction.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Initial read offset. Validated non-negative at construction.
    pub start: i64,
    /// Close the origin descriptor when the chain completes.
    pub auto_close: bool,
    /// Encoding name, validated against the known set.
    pub encoding: String,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            start: 0,
            auto_close: true,
            encoding: "utf8".to_string(),
        }
    }
}

impl SourceOptions {
    pub(crate) fn validate(&self) -> Result<Encoding> {
        if self.start < 0 {
            return Err(SiphonError::OutOfRange { start: self.start });
        }
        Encoding::parse(&self.encoding)
    }
}

/// Options accepted at sink construction.
#[derive(Debug, Clone)]
pub struct SinkOptions {
    /// Write mode for the destination.
    pub mode: WriteMode,
    /// Permission bits applied when creating the destination (Unix).
    pub permissions: u32,
    /// Initial write offset. Validated non-negative at construction.
    /// Ignored for positioning in append mode.
    pub start: i64,
    /// Close the destination descriptor when the chain completes.
    pub auto_close: bool,
    /// Encoding name, validated against the known set.
    pub encoding: String,
    /// Capacity of the shared chunk buffer. Must be non-zero.
    pub buffer_size: usize,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            mode: WriteMode::default(),
            permissions: DEFAULT_PERMISSIONS,
            start: 0,
            auto_close: true,
            encoding: "utf8".to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl SinkOptions {
    pub(crate) fn validate(&self) -> Result<Encoding> {
        if self.start < 0 {
            return Err(SiphonError::OutOfRange { start: self.start });
        }
        if self.buffer_size == 0 {
            return Err(SiphonError::InvalidArgument(
                "buffer_size must be non-zero".to_string(),
            ));
        }
        Encoding::parse(&self.encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_defaults() {
        let options = SourceOptions::default();
        assert_eq!(options.start, 0);
        assert!(options.auto_close);
        assert_eq!(options.validate().unwrap(), Encoding::Utf8);
    }

    #[test]
    fn sink_defaults() {
        let options = SinkOptions::default();
        assert_eq!(options.mode, WriteMode::Truncate);
        assert_eq!(options.permissions, DEFAULT_PERMISSIONS);
        assert_eq!(options.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(options.validate().unwrap(), Encoding::Utf8);
    }

    #[test]
    fn negative_start_is_out_of_range() {
        let options = SourceOptions {
            start: -1,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(SiphonError::OutOfRange { start: -1 })
        ));

        let options = SinkOptions {
            start: -7,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(SiphonError::OutOfRange { start: -7 })
        ));
    }

    #[test]
    fn zero_buffer_size_rejected() {
        let options = SinkOptions {
            buffer_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(SiphonError::InvalidArgument(_))
        ));
    }

    #[test]
    fn unknown_encoding_rejected() {
        let options = SinkOptions {
            encoding: "ebcdic".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(SiphonError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn encoding_alias_accepted() {
        let options = SourceOptions {
            encoding: "UTF-8".to_string(),
            ..Default::default()
        };
        assert_eq!(options.validate().unwrap(), Encoding::Utf8);
    }
}
