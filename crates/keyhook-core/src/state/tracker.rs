// Keyhook Key Tracker
// Held-modifier and held-key bookkeeping for the hook callback

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::modifier::classify;
use crate::{Key, ModifierSet};

#[derive(Debug, Default)]
struct TrackerState {
    modifiers: ModifierSet,
    held: HashSet<Key>,
}

/// Tracks which modifier categories and raw keys are currently down.
///
/// Only the hook thread updates it, but the state sits behind a mutex so the
/// manager can read a snapshot from other threads.
#[derive(Debug, Default)]
pub struct KeyTracker {
    state: Mutex<TrackerState>,
}

impl KeyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key-down.
    ///
    /// Returns the modifiers held once this key is down when this is a fresh
    /// press, or `None` when the key was already held (an OS auto-repeat).
    /// A modifier key counts its own category, so `Ctrl` pressed alone
    /// reports `{Control}`.
    pub fn key_down(&self, key: Key) -> Option<ModifierSet> {
        let mut state = self.state.lock();

        if let Some(modifier) = classify(key) {
            state.modifiers.insert(modifier);
        }

        if state.held.insert(key) {
            Some(state.modifiers)
        } else {
            None
        }
    }

    /// Record a key-up
    pub fn key_up(&self, key: Key) {
        let mut state = self.state.lock();
        if let Some(modifier) = classify(key) {
            state.modifiers.remove(modifier);
        }
        state.held.remove(&key);
    }

    /// Modifiers currently held
    pub fn held_modifiers(&self) -> ModifierSet {
        self.state.lock().modifiers
    }

    /// Whether a key is currently down
    pub fn is_held(&self, key: Key) -> bool {
        self.state.lock().held.contains(&key)
    }

    /// Number of keys currently down
    pub fn held_count(&self) -> usize {
        self.state.lock().held.len()
    }

    /// Forget all held keys and modifiers
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.modifiers = ModifierSet::empty();
        state.held.clear();
    }
}
