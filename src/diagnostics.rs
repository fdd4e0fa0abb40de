//! One-time warning sink
//!
//! Owned by whoever needs it (the solver holds one) instead of living in a
//! global, so two worlds never silence each other's warnings.

use std::collections::HashSet;

/// Collects warnings and forwards each distinct key to `log` only once.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    seen: HashSet<String>,
    emitted: u32,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `message` at warn level unless `key` was already reported.
    ///
    /// Returns true if the warning was emitted by this call.
    pub fn warn_once(&mut self, key: &str, message: impl FnOnce() -> String) -> bool {
        if self.seen.contains(key) {
            return false;
        }
        self.seen.insert(key.to_owned());
        self.emitted += 1;
        log::warn!("{}", message());
        true
    }

    /// Whether a warning with this key has been reported
    pub fn has_warned(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    /// Number of distinct warnings emitted so far
    pub fn emitted(&self) -> u32 {
        self.emitted
    }

    /// Forget every reported key
    pub fn reset(&mut self) {
        self.seen.clear();
        self.emitted = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warns_once_per_key() {
        let mut diag = Diagnostics::new();
        assert!(diag.warn_once("bias", || "unknown bias".into()));
        assert!(!diag.warn_once("bias", || "unknown bias".into()));
        assert!(diag.warn_once("nan", || "non-finite correction".into()));
        assert_eq!(diag.emitted(), 2);
        assert!(diag.has_warned("bias"));

        diag.reset();
        assert!(!diag.has_warned("bias"));
    }
}
