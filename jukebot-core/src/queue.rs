use std::collections::VecDeque;

use crate::track::Track;

/// Pending tracks plus the stack of tracks that already played.
///
/// The queue is FIFO (append at the tail, take from the head) and allows
/// duplicates. History is LIFO: the most recently finished track is popped
/// first by "back".
#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    items: VecDeque<Track>,
    history: Vec<Track>,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track at the tail
    pub fn enqueue(&mut self, track: Track) {
        log::debug!("Queued {} ({} pending)", track, self.items.len() + 1);
        self.items.push_back(track);
    }

    /// Append tracks at the tail, keeping their order
    pub fn enqueue_many(&mut self, tracks: impl IntoIterator<Item = Track>) {
        let before = self.items.len();
        self.items.extend(tracks);
        log::debug!("Queued {} tracks ({} pending)", self.items.len() - before, self.items.len());
    }

    /// Take the next track to play
    pub fn dequeue_head(&mut self) -> Option<Track> {
        self.items.pop_front()
    }

    /// Put a track back in front of everything else
    pub fn requeue_front(&mut self, track: Track) {
        self.items.push_front(track);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Copy of the first `n` pending tracks, for display
    pub fn snapshot_head(&self, n: usize) -> Vec<Track> {
        self.items.iter().take(n).cloned().collect()
    }

    pub fn push_history(&mut self, track: Track) {
        self.history.push(track);
    }

    pub fn pop_history(&mut self) -> Option<Track> {
        self.history.pop()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// History, oldest first
    pub fn history(&self) -> &[Track] {
        &self.history
    }

    /// Empty both the queue and the history
    pub fn clear(&mut self) {
        self.items.clear();
        self.history.clear();
    }
}
