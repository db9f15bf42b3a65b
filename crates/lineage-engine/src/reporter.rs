//! Debounced error reporting
//!
//! A message reported again within the window of its last occurrence is
//! swallowed, so a watch loop retriggering on the same broken template does
//! not flood the output. Expired records are evicted lazily on each report.

use lineage_core::PluginError;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Last sighting of one error message.
#[derive(Debug, Clone, Copy)]
pub struct ErrorRecord {
    pub last_seen_at: Instant,
    pub occurrences: u32,
}

#[derive(Debug)]
pub struct ErrorReporter {
    window: Duration,
    seen: HashMap<String, ErrorRecord>,
}

impl ErrorReporter {
    pub fn new(window: Duration) -> Self {
        ErrorReporter {
            window,
            seen: HashMap::new(),
        }
    }

    /// Report `message` now. Returns the error to emit, or `None` when suppressed.
    pub fn report(&mut self, message: impl Into<String>) -> Option<PluginError> {
        self.report_at(message, Instant::now())
    }

    /// Report `message` as seen at `now`.
    pub fn report_at(&mut self, message: impl Into<String>, now: Instant) -> Option<PluginError> {
        let message = message.into();
        self.evict_expired(now);

        match self.seen.get_mut(&message) {
            Some(record) => {
                record.last_seen_at = now;
                record.occurrences += 1;
                tracing::debug!("Suppressed repeated error ({}x): {}", record.occurrences, message);
                None
            }
            None => {
                self.seen.insert(
                    message.clone(),
                    ErrorRecord {
                        last_seen_at: now,
                        occurrences: 1,
                    },
                );
                Some(PluginError::new(message))
            }
        }
    }

    /// Messages currently inside their suppression window.
    pub fn pending(&self) -> usize {
        self.seen.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn evict_expired(&mut self, now: Instant) {
        let window = self.window;
        self.seen
            .retain(|_, record| now.saturating_duration_since(record.last_seen_at) < window);
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}
