use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

/// Failure while expanding `{{ env.VAR }}` placeholders
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpandError {
    /// Referenced variable is unset and has no default
    #[error("environment variable not found: `{0}`")]
    MissingVar(String),
    /// Placeholder is not scoped with `env.`
    #[error("only variables scoped with 'env.' are supported: `{0}`")]
    UnsupportedScope(String),
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `{{ env.VAR }}` or `{{ env.VAR | default("fallback") }}`
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([A-Za-z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
            .expect("placeholder regex must compile")
    })
}

/// Expand `{{ env.VAR }}` placeholders in raw TOML text
///
/// Comment lines are left untouched so commented-out secrets never have to
/// resolve. A trailing newline in the input is preserved.
pub fn expand_env(input: &str) -> Result<String, ExpandError> {
    let expanded = input
        .split('\n')
        .map(|line| {
            if line.trim_start().starts_with('#') {
                Ok(line.to_owned())
            } else {
                expand_line(line)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(expanded.join("\n"))
}

fn expand_line(line: &str) -> Result<String, ExpandError> {
    let mut failure = None;

    let replaced = placeholder().replace_all(line, |caps: &Captures<'_>| {
        match resolve(&caps[1], caps.get(2).map(|m| m.as_str())) {
            Ok(value) => value,
            Err(e) => {
                failure.get_or_insert(e);
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(replaced.into_owned()),
    }
}

fn resolve(key: &str, default: Option<&str>) -> Result<String, ExpandError> {
    let Some(var_name) = key.strip_prefix("env.").filter(|rest| !rest.contains('.')) else {
        return Err(ExpandError::UnsupportedScope(key.to_owned()));
    };

    match (std::env::var(var_name), default) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(fallback)) => Ok(fallback.to_owned()),
        (Err(_), None) => Err(ExpandError::MissingVar(var_name.to_owned())),
    }
}
