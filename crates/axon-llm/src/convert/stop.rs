use regex::Regex;

use crate::error::LlmError;

/// Cut text at the first occurrence of any stop sequence
///
/// # Errors
///
/// Returns [`LlmError::Configuration`] if the stop sequences cannot be
/// compiled into a pattern
pub fn enforce_stop_tokens(text: &str, stop: &[String]) -> Result<String, LlmError> {
    let sequences: Vec<_> = stop.iter().filter(|s| !s.is_empty()).map(|s| regex::escape(s)).collect();
    if sequences.is_empty() {
        return Ok(text.to_owned());
    }

    let pattern = Regex::new(&sequences.join("|"))
        .map_err(|e| LlmError::Configuration(format!("invalid stop sequences: {e}")))?;

    Ok(pattern
        .find(text)
        .map_or(text, |found| &text[..found.start()])
        .to_owned())
}
