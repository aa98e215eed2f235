//! Textual pre-submission check.
//!
//! This is a plain substring scan over the raw source. It knows nothing about
//! program structure and is bypassed by string concatenation, reflection tricks
//! or encodings, so it only stops the obvious cases early. It is not an
//! isolation boundary.

use crate::constants::GUARD_REJECTED_MSG;

/// Process-spawning and runtime-introspection APIs. Matched case-sensitively.
pub const DENYLIST: &[&str] = &[
    "Runtime.getRuntime",
    "ProcessBuilder",
    "ProcessHandle",
    "java.lang.reflect",
];

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{}", GUARD_REJECTED_MSG)]
pub struct GuardRejection {
    /// Denylist entry that matched. Logged, never shown to the submitter.
    pub pattern: &'static str,
}

impl GuardRejection {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

pub fn check(source: &str) -> Result<(), GuardRejection> {
    match DENYLIST.iter().copied().find(|pattern| source.contains(pattern)) {
        Some(pattern) => {
            tracing::warn!(pattern, "Source rejected by pre-submission guard");
            Err(GuardRejection { pattern })
        }
        None => Ok(()),
    }
}
