//! Extraction of JSON payloads from LLM response text.
//!
//! Models frequently wrap their JSON in prose ("Here is the class you
//! asked for: {...} Let me know..."), so decoding starts by slicing
//! from the first `{` to the last `}` inclusive and parsing only that
//! window. Callers deserialize the slice into their kind-specific
//! shapes.

use serde::de::DeserializeOwned;

/// Errors that can occur while pulling JSON out of a response.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The text contained no `{...}` window at all.
    #[error("response contains no JSON object")]
    NoJsonObject,

    /// The extracted window was not valid JSON of the expected shape.
    #[error("JSON decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Slice the response from the first `{` to the last `}`, inclusive.
///
/// Returns `None` when either brace is missing or they are inverted
/// (a stray `}` before the first `{` and nothing after).
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}

/// Extract the JSON window and deserialize it into `T`.
///
/// # Errors
///
/// Returns [`ParseError::NoJsonObject`] when no window exists and
/// [`ParseError::Decode`] when the window does not deserialize.
pub fn decode_response<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let window = extract_json_object(text).ok_or(ParseError::NoJsonObject)?;
    Ok(serde_json::from_str(window)?)
}
