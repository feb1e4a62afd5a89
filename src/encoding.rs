//! Text encoding names accepted by source and sink options.
//!
//! The copy path moves raw bytes; the encoding is part of the construction
//! surface and is validated against the known set below. Names are matched
//! case-insensitively, with the usual aliases.

use crate::error::{Result, SiphonError};

/// A validated text encoding name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8 (default). Alias: `utf-8`.
    #[default]
    Utf8,
    /// 7-bit ASCII.
    Ascii,
    /// Latin-1. Alias: `binary`.
    Latin1,
    /// UTF-16 little-endian. Aliases: `utf-16le`, `ucs2`, `ucs-2`.
    Utf16Le,
    /// Base64.
    Base64,
    /// URL-safe Base64.
    Base64Url,
    /// Hexadecimal.
    Hex,
}

impl Encoding {
    /// Parse an encoding name, case-insensitively.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "ascii" => Ok(Self::Ascii),
            "latin1" | "binary" => Ok(Self::Latin1),
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Ok(Self::Utf16Le),
            "base64" => Ok(Self::Base64),
            "base64url" => Ok(Self::Base64Url),
            "hex" => Ok(Self::Hex),
            other => Err(SiphonError::UnknownEncoding(other.to_string())),
        }
    }

    /// Canonical lower-case name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Ascii => "ascii",
            Self::Latin1 => "latin1",
            Self::Utf16Le => "utf16le",
            Self::Base64 => "base64",
            Self::Base64Url => "base64url",
            Self::Hex => "hex",
        }
    }
}
