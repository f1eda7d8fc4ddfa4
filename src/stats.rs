//! Named counters for splitter statistics.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A monotonically increasing counter. Clones are cheap and all observe
/// the same value, so a scraper may read what the splitter bumps.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicU64>);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Registry of counters keyed by name. Counters are created on first use.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    counters: RefCell<HashMap<String, Counter>>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        StatsRegistry::default()
    }

    /// Fetch the counter with the given name, creating it if needed.
    pub fn counter(&self, name: &str) -> Counter {
        self.counters
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    /// Current value of a counter, or zero if it was never created.
    pub fn value(&self, name: &str) -> u64 {
        self.counters
            .borrow()
            .get(name)
            .map(Counter::get)
            .unwrap_or(0)
    }

    /// Names of every registered counter, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.counters.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}
