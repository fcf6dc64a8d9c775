//! Response decoding.
//!
//! The wire carries opaque bytes.  Callers that know the peer speaks a legacy
//! text encoding (Shift_JIS, EUC-KR, GBK, ...) can ask for the response to be
//! transcoded to UTF-8 before it reaches the observer.

use encoding_rs::Encoding;

use crate::error::ConnError;

/// How the accumulated response is turned into the success payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Decoding {
    /// Deliver the bytes exactly as received.
    #[default]
    Raw,
    /// Decode as text in the given encoding and deliver UTF-8.
    Text(&'static Encoding),
}

/// What to do when [`Decoding::Text`] meets malformed input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnDecodeError {
    /// Report `ProtocolDecode` as the request's error outcome.
    #[default]
    Report,
    /// Report success with an empty payload.
    EmptySuccess,
}

impl Decoding {
    pub fn shift_jis() -> Self {
        Self::Text(encoding_rs::SHIFT_JIS)
    }

    pub fn utf8() -> Self {
        Self::Text(encoding_rs::UTF_8)
    }

    /// Look up a decoding by name.
    ///
    /// `raw` and `binary` select [`Decoding::Raw`]; anything else is resolved
    /// as a WHATWG encoding label (`shift_jis`, `sjis`, `utf-8`, `euc-kr`, ...).
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("raw") || label.eq_ignore_ascii_case("binary") {
            return Some(Self::Raw);
        }
        Encoding::for_label(label.as_bytes()).map(Self::Text)
    }

    /// Name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Text(encoding) => encoding.name(),
        }
    }

    /// Decode `bytes` into the success payload.
    pub fn decode(&self, bytes: Vec<u8>) -> Result<Vec<u8>, ConnError> {
        match self {
            Self::Raw => Ok(bytes),
            Self::Text(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(&bytes)
                .map(|text| text.into_owned().into_bytes())
                .ok_or(ConnError::ProtocolDecode {
                    encoding: encoding.name(),
                    len: bytes.len(),
                }),
        }
    }
}
