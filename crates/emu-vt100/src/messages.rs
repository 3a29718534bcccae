//! Operator message log.

use std::collections::VecDeque;

use tracing::info;

/// Messages kept for the UI.
pub const CAPACITY: usize = 200;

/// Bounded log of operator-visible messages, oldest dropped first.
#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    lines: VecDeque<String>,
}

impl MessageLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "emu_vt100::operator", "{message}");
        if self.lines.len() == CAPACITY {
            self.lines.pop_front();
        }
        self.lines.push_back(message);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator {
        self.lines.iter().map(String::as_str)
    }

    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_when_full() {
        let mut log = MessageLog::new();
        for i in 0..=CAPACITY {
            log.push(format!("m{i}"));
        }
        assert_eq!(log.len(), CAPACITY);
        assert_eq!(log.iter().next(), Some("m1"));
        assert_eq!(log.last(), Some(format!("m{CAPACITY}").as_str()));
    }
}
