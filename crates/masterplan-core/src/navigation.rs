//! Current-level pointer plus a strict LIFO of the levels that were left.
//!
//! Forward pushes the level being left; back pops the most recently left one. The stack does
//! not reconstruct tree paths: forward navigations from anywhere simply stack up.

use crate::model::MASTER_LEVEL_ID;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationStack {
    current: String,
    history: Vec<String>,
}

impl Default for NavigationStack {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationStack {
    /// At the root with empty history.
    pub fn new() -> Self {
        Self::from_persisted(MASTER_LEVEL_ID.to_string(), Vec::new())
    }

    pub fn from_persisted(current: String, history: Vec<String>) -> Self {
        Self { current, history }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn forward(&mut self, target: &str) {
        let left = std::mem::replace(&mut self.current, target.to_string());
        self.history.push(left);
    }

    /// Restores the most recently left level. `None` (no-op) at the bottom of the stack.
    pub fn back(&mut self) -> Option<&str> {
        let previous = self.history.pop()?;
        self.current = previous;
        Some(&self.current)
    }

    /// Back to the root, forgetting the history.
    pub fn reset(&mut self) {
        self.current = MASTER_LEVEL_ID.to_string();
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn back_at_root_is_noop() {
        let mut nav = NavigationStack::new();
        assert!(nav.back().is_none());
        assert_eq!(nav.current(), MASTER_LEVEL_ID);
        assert!(nav.is_empty());
    }

    #[test]
    fn forward_then_back_restores() {
        let mut nav = NavigationStack::new();
        nav.forward("dist-1");
        assert_eq!(nav.history(), ["master"]);
        assert_eq!(nav.current(), "dist-1");
        assert_eq!(nav.back(), Some("master"));
        assert!(nav.is_empty());
    }

    #[test]
    fn stack_is_plain_lifo() {
        let mut nav = NavigationStack::new();
        nav.forward("dist-1");
        nav.forward("bldg-31");
        nav.back();
        nav.forward("dist-2");
        assert_eq!(nav.history(), ["master", "dist-1"]);
        assert_eq!(nav.back(), Some("dist-1"));
        assert_eq!(nav.back(), Some("master"));
        assert!(nav.back().is_none());
    }

    #[test]
    fn forward_to_same_level_still_pushes() {
        let mut nav = NavigationStack::new();
        nav.forward("master");
        assert_eq!(nav.len(), 1);
        assert_eq!(nav.current(), "master");
    }
}
