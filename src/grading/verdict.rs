/// Score awarded when every fixture passes
pub const FULL_SCORE: u32 = 100;

// Length of the extension stripped from a fixture name, dot included
const EXTENSION_LEN: usize = 4;

/// Outcome of a session that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    /// Captured stdout of the first fixture that failed
    Failed { output: Vec<u8> },
}

impl Verdict {
    pub fn score(&self) -> u32 {
        match self {
            Self::Passed => FULL_SCORE,
            Self::Failed { .. } => 0,
        }
    }

    pub fn output(&self) -> Option<&[u8]> {
        match self {
            Self::Passed => None,
            Self::Failed { output } => Some(output),
        }
    }
}

/// The fixture name with its last four characters removed.
///
/// Names of four characters or fewer give an empty token.
pub fn expected_token(file_name: &str) -> &str {
    let keep = file_name.chars().count().saturating_sub(EXTENSION_LEN);
    let end = file_name
        .char_indices()
        .nth(keep)
        .map_or(file_name.len(), |(idx, _)| idx);
    &file_name[..end]
}

/// Loose containment check: passes if `token` appears anywhere in `output`.
///
/// This is deliberately not an exact match. `"not hello"` passes for token
/// `"hello"`.
pub fn output_contains_token(output: &[u8], token: &str) -> bool {
    let token = token.as_bytes();
    if token.is_empty() {
        return true;
    }
    output.windows(token.len()).any(|window| window == token)
}
