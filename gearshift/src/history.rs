use crate::progress_bar::ProgressBarState;

/// Number of frames kept for sustained-state detection.
pub const HISTORY_CAPACITY: usize = 4;

/// Fixed-capacity ring buffer of the most recent states, oldest evicted first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentStates {
    slots: [Option<ProgressBarState>; HISTORY_CAPACITY],
    next: usize,
    len: usize,
}

impl RecentStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, state: ProgressBarState) {
        self.slots[self.next] = Some(state);
        self.next = (self.next + 1) % HISTORY_CAPACITY;
        self.len = (self.len + 1).min(HISTORY_CAPACITY);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == HISTORY_CAPACITY
    }

    pub fn last(&self) -> Option<ProgressBarState> {
        if self.is_empty() {
            return None;
        }
        self.slots[(self.next + HISTORY_CAPACITY - 1) % HISTORY_CAPACITY]
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = ProgressBarState> + '_ {
        let start = (self.next + HISTORY_CAPACITY - self.len) % HISTORY_CAPACITY;
        (0..self.len).filter_map(move |i| self.slots[(start + i) % HISTORY_CAPACITY])
    }

    /// Returns `true` if the buffer is full and every entry equals `state`.
    pub fn all_equal(&self, state: ProgressBarState) -> bool {
        self.is_full() && self.iter().all(|s| s == state)
    }
}
