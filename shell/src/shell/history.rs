/// Command history ring.
///
/// Fixed capacity, oldest first. A line equal to the newest entry is not
/// stored again; when full, the oldest entry is dropped.
use heapless::{Deque, String};

use crate::config::{HISTORY_CAP, LINE_MAX};

pub type HistoryLine = String<LINE_MAX>;

pub struct History {
    ring: Deque<HistoryLine, HISTORY_CAP>,
}

impl History {
    pub const fn new() -> Self {
        Self { ring: Deque::new() }
    }

    pub fn push(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        if self.ring.back().map(|last| last.as_str()) == Some(line) {
            return;
        }
        let mut entry = HistoryLine::new();
        if entry.push_str(line).is_err() {
            // Wider than the editor could have produced; not worth keeping.
            return;
        }
        if self.ring.is_full() {
            self.ring.pop_front();
        }
        let _ = self.ring.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Entry `back` steps from the newest; 0 is the newest.
    pub fn recent(&self, back: usize) -> Option<&str> {
        let idx = self.ring.len().checked_sub(back + 1)?;
        self.ring.iter().nth(idx).map(|s| s.as_str())
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ring.iter().map(|s| s.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_exceeds_capacity() {
        let mut h = History::new();
        for i in 0..HISTORY_CAP * 3 {
            h.push(&std::format!("cmd {}", i));
            assert!(h.len() <= HISTORY_CAP);
        }
        assert_eq!(h.len(), HISTORY_CAP);
        assert_eq!(h.recent(0), Some(std::format!("cmd {}", HISTORY_CAP * 3 - 1).as_str()));
        assert_eq!(h.iter().next(), Some(std::format!("cmd {}", HISTORY_CAP * 2).as_str()));
    }

    #[test]
    fn adjacent_duplicate_not_stored() {
        let mut h = History::new();
        h.push("ls");
        h.push("ls");
        assert_eq!(h.len(), 1);
        h.push("pwd");
        h.push("ls");
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn empty_line_ignored() {
        let mut h = History::new();
        h.push("");
        assert!(h.is_empty());
    }

    #[test]
    fn recent_counts_back_from_newest() {
        let mut h = History::new();
        h.push("a");
        h.push("b");
        h.push("c");
        assert_eq!(h.recent(0), Some("c"));
        assert_eq!(h.recent(2), Some("a"));
        assert_eq!(h.recent(3), None);
    }
}
