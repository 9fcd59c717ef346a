use std::collections::VecDeque;

pub const HISTORY_CAPACITY: usize = 20;

/// Sliding window of the most recent gas values, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryWindow {
    values: VecDeque<i64>,
}

impl HistoryWindow {
    pub fn new() -> Self {
        Self {
            values: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
        }
    }

    pub fn append(&mut self, value: i64) {
        self.values.push_back(value);

        while self.values.len() > HISTORY_CAPACITY {
            self.values.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<i64> {
        self.values.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
