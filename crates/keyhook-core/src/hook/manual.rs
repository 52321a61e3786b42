// Keyhook Manual Hook
// In-process adapter fed by the host application or by tests

use std::sync::Arc;

use parking_lot::Mutex;

use super::{HookAdapter, HookCallback, HookError, HookHandle, KeyEvent};
use crate::Key;

#[derive(Default)]
struct ManualState {
    installed: Option<(u64, HookCallback)>,
    next_id: u64,
    fail_next_install: Option<String>,
    install_count: usize,
}

/// Hook adapter whose events come from [`ManualHook::feed`].
///
/// Clones share the same state, so one clone can be handed to a manager
/// while another keeps feeding events. Events are delivered sequentially on
/// the feeding thread.
#[derive(Clone, Default)]
pub struct ManualHook {
    state: Arc<Mutex<ManualState>>,
}

impl ManualHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to the installed callback.
    ///
    /// Returns the suppress decision, or `None` when no callback is
    /// installed (the event passes through untouched).
    pub fn feed(&self, event: KeyEvent) -> Option<bool> {
        let mut state = self.state.lock();
        let (_, callback) = state.installed.as_mut()?;
        Some(callback(event))
    }

    /// Feed a key-down
    pub fn press(&self, key: Key) -> Option<bool> {
        self.feed(KeyEvent::down(key))
    }

    /// Feed a key-up
    pub fn release(&self, key: Key) -> Option<bool> {
        self.feed(KeyEvent::up(key))
    }

    /// Feed a sequence of events and collect the decisions
    pub fn feed_all(&self, events: impl IntoIterator<Item = KeyEvent>) -> Vec<Option<bool>> {
        events.into_iter().map(|event| self.feed(event)).collect()
    }

    pub fn is_installed(&self) -> bool {
        self.state.lock().installed.is_some()
    }

    /// How many times a callback has been installed successfully
    pub fn install_count(&self) -> usize {
        self.state.lock().install_count
    }

    /// Make the next `install` fail with the given reason
    pub fn fail_next_install(&self, reason: impl Into<String>) {
        self.state.lock().fail_next_install = Some(reason.into());
    }
}

impl HookAdapter for ManualHook {
    fn install(&mut self, callback: HookCallback) -> Result<HookHandle, HookError> {
        let mut state = self.state.lock();
        if let Some(reason) = state.fail_next_install.take() {
            return Err(HookError::Install(reason));
        }
        if state.installed.is_some() {
            return Err(HookError::AlreadyInstalled);
        }

        state.next_id += 1;
        let id = state.next_id;
        state.installed = Some((id, callback));
        state.install_count += 1;
        Ok(HookHandle::new(id))
    }

    fn uninstall(&mut self, handle: HookHandle) {
        let mut state = self.state.lock();
        if matches!(state.installed, Some((id, _)) if id == handle.id()) {
            state.installed = None;
        }
    }
}
