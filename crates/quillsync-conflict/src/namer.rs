//! Conflict naming
//!
//! Generates the `" - conflicting"` names given to local copies that must
//! move aside for a remote version, with numbered fallbacks when the
//! first candidate is already taken.

/// Suffix appended to conflicting local copies
pub const CONFLICT_SUFFIX: &str = " - conflicting";

/// Generates conflict names for renamed local copies
pub struct ConflictNamer;

impl ConflictNamer {
    /// Produces the base conflict name: `"Projects"` becomes
    /// `"Projects - conflicting"`.
    pub fn generate(original_name: &str) -> String {
        format!("{original_name}{CONFLICT_SUFFIX}")
    }

    /// Produces a conflict name that the `exists` probe rejects, trying
    /// `"name - conflicting"`, then `"name - conflicting (2)"` and so on.
    pub fn generate_unique<F>(original_name: &str, mut exists: F) -> String
    where
        F: FnMut(&str) -> bool,
    {
        let candidate = Self::generate(original_name);
        if !exists(&candidate) {
            return candidate;
        }

        let mut i = 2u32;
        loop {
            let numbered = format!("{candidate} ({i})");
            if !exists(&numbered) {
                return numbered;
            }
            i += 1;
        }
    }
}
