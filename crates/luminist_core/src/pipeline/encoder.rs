//! Prompt text encoder for the prompt-edit directive family.
//!
//! # Responsibility
//! - Turn free-form prompt text into a directive whose raw form is safe to
//!   embed in a `tr:` segment.
//! - Decode prompt directives back into text.
//!
//! # Invariants
//! - Encoded output never contains `/`, `:` or `,` unescaped.
//! - Decoding an encoded payload yields the input text byte for byte.

use crate::model::directive::Directive;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Punctuation allowed in a plain payload besides alphanumerics.
const PLAIN_SAFE_PUNCTUATION: &str = "-_.~!*'()";

/// Escape set matching `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Prompt encoder/decoder failures.
#[derive(Debug)]
pub enum EncoderError {
    EmptyPrompt,
    /// Decode was asked for a directive outside the prompt-edit family.
    NotPromptEdit(String),
    InvalidPercentEncoding(std::str::Utf8Error),
    InvalidBase64(base64::DecodeError),
    InvalidUtf8(std::string::FromUtf8Error),
}

impl Display for EncoderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPrompt => write!(f, "prompt text must not be empty"),
            Self::NotPromptEdit(raw) => write!(f, "not a prompt edit directive: `{raw}`"),
            Self::InvalidPercentEncoding(err) => write!(f, "invalid percent encoding: {err}"),
            Self::InvalidBase64(err) => write!(f, "invalid base64 payload: {err}"),
            Self::InvalidUtf8(err) => write!(f, "decoded prompt is not UTF-8: {err}"),
        }
    }
}

impl Error for EncoderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPercentEncoding(err) => Some(err),
            Self::InvalidBase64(err) => Some(err),
            Self::InvalidUtf8(err) => Some(err),
            Self::EmptyPrompt | Self::NotPromptEdit(_) => None,
        }
    }
}

/// Returns whether `text` has to take the base64 path.
///
/// Anything other than ASCII alphanumerics, whitespace and
/// `PLAIN_SAFE_PUNCTUATION` is reserved: the protocol delimiters (`/`, `:`,
/// `,`) and every character a URL path would escape.
pub fn requires_escaping(text: &str) -> bool {
    text.chars().any(|c| {
        !(c.is_ascii_alphanumeric() || c.is_whitespace() || PLAIN_SAFE_PUNCTUATION.contains(c))
    })
}

/// Builds a prompt-edit directive from free-form text.
///
/// Plain path: trim, collapse whitespace runs to `_`. Escaped path: the text
/// as given is base64-encoded then percent-encoded.
pub fn encode_prompt(text: &str) -> Result<Directive, EncoderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(EncoderError::EmptyPrompt);
    }

    if requires_escaping(text) {
        let base64 = STANDARD.encode(text.as_bytes());
        return Ok(Directive::PromptEdit {
            payload: utf8_percent_encode(&base64, COMPONENT).to_string(),
            encoded: true,
        });
    }

    Ok(Directive::PromptEdit {
        payload: WHITESPACE_RE.replace_all(trimmed, "_").into_owned(),
        encoded: false,
    })
}

/// Recovers prompt text from a prompt-edit directive.
///
/// Encoded payloads decode to the exact original text. Plain payloads are
/// lossy: every `_` becomes a space, so `snake_case` reads back as
/// `snake case` and collapsed whitespace runs stay collapsed. Use the result
/// for display only on that path.
pub fn decode_prompt(directive: &Directive) -> Result<String, EncoderError> {
    match directive {
        Directive::PromptEdit {
            payload,
            encoded: true,
        } => {
            let base64 = percent_decode_str(payload)
                .decode_utf8()
                .map_err(EncoderError::InvalidPercentEncoding)?;
            let bytes = STANDARD
                .decode(base64.as_bytes())
                .map_err(EncoderError::InvalidBase64)?;
            String::from_utf8(bytes).map_err(EncoderError::InvalidUtf8)
        }
        Directive::PromptEdit {
            payload,
            encoded: false,
        } => Ok(payload.replace('_', " ")),
        other => Err(EncoderError::NotPromptEdit(other.raw())),
    }
}
