//! Human/Assistant turn formatting for legacy Claude text completion

use std::fmt;

pub const HUMAN_PROMPT: &str = "\n\nHuman:";
pub const ASSISTANT_PROMPT: &str = "\n\nAssistant:";

const HUMAN: &str = "Human:";
const ASSISTANT: &str = "Assistant:";

/// Turn marker found in a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Human,
    Assistant,
}

impl fmt::Display for Turn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Human => f.write_str("Human"),
            Self::Assistant => f.write_str("Assistant"),
        }
    }
}

/// Out-of-order turn marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlternationWarning {
    /// Byte offset of the marker in the formatted text
    pub position: usize,
    /// Marker found where the other one was expected
    pub found: Turn,
}

impl fmt::Display for AlternationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "prompt must alternate between Human and Assistant turns, found {} at byte {}",
            self.found, self.position
        )
    }
}

/// Formatted prompt with any advisory warnings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedPrompt {
    pub text: String,
    pub warnings: Vec<AlternationWarning>,
}

/// Rewrite a prompt into strictly alternating `\n\nHuman:` / `\n\nAssistant:` turns
///
/// A prompt without a human turn, or opening on an assistant turn, gets a
/// human turn prepended. A trailing assistant turn is appended when missing
/// or when the turns end on a human. Markers are normalized to exactly two
/// leading newlines. Turns that break alternation are left in place and
/// reported as warnings.
pub fn format_alternation(input: &str) -> FormattedPrompt {
    let mut text = input.to_owned();

    let opens_on_assistant = match (text.find(HUMAN), text.find(ASSISTANT)) {
        (Some(human), Some(assistant)) => human > assistant,
        (None, _) => true,
        (Some(_), None) => false,
    };
    if opens_on_assistant {
        text = format!("{HUMAN_PROMPT} {text}");
    }

    if !text.contains(ASSISTANT) {
        text.push_str(ASSISTANT_PROMPT);
    }

    if text.starts_with(HUMAN) {
        text.insert_str(0, "\n\n");
    }

    for marker in [HUMAN, ASSISTANT] {
        text = text.replace(marker, &format!("\n\n{marker}"));
        let over = format!("\n\n\n{marker}");
        let exact = format!("\n\n{marker}");
        for _ in 0..2 {
            text = text.replace(&over, &exact);
        }
    }

    let mut markers: Vec<(usize, Turn)> = text
        .match_indices(HUMAN_PROMPT)
        .map(|(position, _)| (position, Turn::Human))
        .chain(
            text.match_indices(ASSISTANT_PROMPT)
                .map(|(position, _)| (position, Turn::Assistant)),
        )
        .collect();
    markers.sort_unstable_by_key(|(position, _)| *position);

    let mut turns = 0usize;
    let mut warnings = Vec::new();
    for (position, found) in markers {
        let expected = if turns % 2 == 0 { Turn::Human } else { Turn::Assistant };
        if found == expected {
            turns += 1;
        } else {
            let warning = AlternationWarning { position, found };
            tracing::warn!(position, found = %found, "{warning}");
            warnings.push(warning);
        }
    }

    if turns % 2 == 1 {
        text.push_str(ASSISTANT_PROMPT);
    }

    FormattedPrompt { text, warnings }
}
