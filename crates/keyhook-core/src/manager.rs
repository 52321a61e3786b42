// Keyhook Manager
// Hook lifecycle, hotkey registration and the per-event hook callback

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::dispatch::{DispatchError, Dispatcher, FailureHandler, DEFAULT_WORKERS};
use crate::hook::{HookAdapter, HookError, HookHandle, KeyEvent, Transition};
use crate::registry::{HotkeyAction, HotkeyId, Registry, RegistryError};
use crate::state::KeyTracker;
use crate::{Combo, ModifierSet};

/// Errors that can occur in the manager
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("failed to install keyboard hook: {0}")]
    HookInstall(#[from] HookError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("hotkey manager has been disposed")]
    Disposed,
}

struct Lifecycle<H> {
    adapter: H,
    active: Option<ActiveHook>,
    disposed: bool,
}

struct ActiveHook {
    handle: HookHandle,
    tracker: Arc<KeyTracker>,
}

impl<H: HookAdapter> Lifecycle<H> {
    fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            let id = active.handle.id();
            self.adapter.uninstall(active.handle);
            log::debug!("Hotkey manager stopped (hook {})", id);
        }
    }
}

/// Global hotkey manager.
///
/// Created stopped. `start` installs the hook adapter, `stop` removes it
/// while keeping every registration, and `dispose` stops for good. Hotkeys
/// can be registered and removed from any thread at any time.
pub struct HotkeyManager<H: HookAdapter> {
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,
    lifecycle: Mutex<Lifecycle<H>>,
}

impl<H: HookAdapter> HotkeyManager<H> {
    /// Create a manager with the default number of dispatch workers
    pub fn new(adapter: H) -> Result<Self, ManagerError> {
        Self::with_workers(adapter, DEFAULT_WORKERS)
    }

    /// Create a manager with `workers` dispatch threads
    pub fn with_workers(adapter: H, workers: usize) -> Result<Self, ManagerError> {
        Ok(Self::with_dispatcher(adapter, Dispatcher::new(workers)?))
    }

    pub fn with_dispatcher(adapter: H, dispatcher: Dispatcher) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            dispatcher: Arc::new(dispatcher),
            lifecycle: Mutex::new(Lifecycle {
                adapter,
                active: None,
                disposed: false,
            }),
        }
    }

    /// Install the hook. Does nothing if already started.
    ///
    /// On failure the manager stays stopped; the caller may retry.
    pub fn start(&self) -> Result<(), ManagerError> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.disposed {
            return Err(ManagerError::Disposed);
        }
        if lifecycle.active.is_some() {
            return Ok(());
        }

        let tracker = Arc::new(KeyTracker::new());
        let callback = {
            let registry = self.registry.clone();
            let dispatcher = self.dispatcher.clone();
            let tracker = tracker.clone();
            Box::new(move |event: KeyEvent| {
                panic::catch_unwind(AssertUnwindSafe(|| {
                    handle_event(&registry, &dispatcher, &tracker, event)
                }))
                .unwrap_or_else(|_| {
                    log::error!("Hook callback panicked on {:?}; passing event through", event);
                    false
                })
            })
        };

        let handle = lifecycle.adapter.install(callback)?;
        log::debug!("Hotkey manager started (hook {})", handle.id());
        lifecycle.active = Some(ActiveHook { handle, tracker });
        Ok(())
    }

    /// Uninstall the hook. Registered hotkeys are kept.
    pub fn stop(&self) {
        self.lifecycle.lock().stop();
    }

    /// Stop and mark the manager unusable. Safe to call repeatedly.
    pub fn dispose(&self) {
        // One guard, so no start() can slip in between stop and disposal
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.stop();
        if !lifecycle.disposed {
            lifecycle.disposed = true;
            log::debug!("Hotkey manager disposed");
        }
    }

    pub fn is_started(&self) -> bool {
        self.lifecycle.lock().active.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle.lock().disposed
    }

    /// Register a non-blocking hotkey; `None` if the combo is taken
    pub fn register_hotkey<C, F>(&self, combo: C, action: F) -> Option<HotkeyId>
    where
        C: Into<Combo>,
        F: Fn() + Send + Sync + 'static,
    {
        self.register(combo, false, action).ok()
    }

    /// Register a hotkey whose triggering key-down is swallowed; `None` if
    /// the combo is taken
    pub fn register_blocking_hotkey<C, F>(&self, combo: C, action: F) -> Option<HotkeyId>
    where
        C: Into<Combo>,
        F: Fn() + Send + Sync + 'static,
    {
        self.register(combo, true, action).ok()
    }

    /// Register a hotkey, reporting why registration failed
    pub fn register<C, F>(&self, combo: C, blocking: bool, action: F) -> Result<HotkeyId, RegistryError>
    where
        C: Into<Combo>,
        F: Fn() + Send + Sync + 'static,
    {
        self.register_action(combo.into(), blocking, Arc::new(action))
    }

    /// Register a hotkey with an already shared action
    pub fn register_action(
        &self,
        combo: Combo,
        blocking: bool,
        action: HotkeyAction,
    ) -> Result<HotkeyId, RegistryError> {
        let result = self.registry.register(combo, blocking, action);
        match &result {
            Ok(id) => log::debug!("Registered {} as {} (blocking={})", combo, id, blocking),
            Err(e) => log::debug!("Rejected registration: {}", e),
        }
        result
    }

    /// Remove the hotkey for an exact combo
    pub fn unregister_hotkey<C: Into<Combo>>(&self, combo: C) -> bool {
        self.registry.unregister(&combo.into())
    }

    /// Remove the hotkey with the given id
    pub fn unregister_hotkey_id(&self, id: HotkeyId) -> bool {
        self.registry.unregister_id(id)
    }

    /// Remove every hotkey
    pub fn unregister_all(&self) {
        self.registry.clear();
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Modifiers the running hook currently sees as held
    pub fn held_modifiers(&self) -> ModifierSet {
        self.lifecycle
            .lock()
            .active
            .as_ref()
            .map(|active| active.tracker.held_modifiers())
            .unwrap_or_default()
    }

    /// Observe actions that panic (the default logs them)
    pub fn set_failure_handler<F>(&self, handler: F)
    where
        F: Fn(&crate::ActionFailure) + Send + Sync + 'static,
    {
        let handler: FailureHandler = Arc::new(handler);
        self.dispatcher.set_failure_handler(handler);
    }
}

impl<H: HookAdapter> Drop for HotkeyManager<H> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Per-event work done on the hook thread; returns the suppress decision.
///
/// Only fresh key-downs are matched, against the modifiers held once the key
/// is down (a modifier key includes its own category). Key-ups and repeats
/// always pass through.
fn handle_event(
    registry: &Registry,
    dispatcher: &Dispatcher,
    tracker: &KeyTracker,
    event: KeyEvent,
) -> bool {
    match event.transition {
        Transition::Up => {
            tracker.key_up(event.key);
            false
        }
        Transition::Down => {
            let Some(modifiers) = tracker.key_down(event.key) else {
                return false;
            };
            let Some(binding) = registry.lookup(modifiers, event.key) else {
                return false;
            };

            log::trace!("Hotkey {} matched", binding.combo());
            let blocking = binding.blocking();
            if let Err(e) = dispatcher.submit(binding) {
                log::warn!("Could not dispatch hotkey action: {}", e);
            }
            blocking
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::ManualHook;
    use crate::{Key, Modifier};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn manager() -> (HotkeyManager<ManualHook>, ManualHook) {
        let hook = ManualHook::new();
        let manager = HotkeyManager::with_workers(hook.clone(), 1).unwrap();
        (manager, hook)
    }

    fn wait_for(counter: &AtomicUsize, expected: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if counter.load(Ordering::SeqCst) == expected {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_new_manager_is_stopped() {
        let (manager, hook) = manager();
        assert!(!manager.is_started());
        assert!(!manager.is_disposed());
        assert!(!hook.is_installed());
    }

    #[test]
    fn test_start_is_idempotent() {
        let (manager, hook) = manager();
        manager.start().unwrap();
        manager.start().unwrap();
        assert!(manager.is_started());
        assert_eq!(hook.install_count(), 1);
    }

    #[test]
    fn test_stop_is_idempotent_and_keeps_hotkeys() {
        let (manager, hook) = manager();
        manager.register_hotkey(Key::F1, || {}).unwrap();
        manager.stop();
        manager.start().unwrap();
        manager.stop();
        manager.stop();
        assert!(!hook.is_installed());
        assert_eq!(manager.registry().len(), 1);
    }

    #[test]
    fn test_install_failure_leaves_manager_stopped() {
        let (manager, hook) = manager();
        hook.fail_next_install("permission denied");
        let err = manager.start().unwrap_err();
        assert!(matches!(err, ManagerError::HookInstall(HookError::Install(_))));
        assert!(!manager.is_started());

        manager.start().unwrap();
        assert!(manager.is_started());
    }

    #[test]
    fn test_dispose_is_terminal_and_idempotent() {
        let (manager, hook) = manager();
        manager.start().unwrap();
        manager.dispose();
        manager.dispose();
        assert!(manager.is_disposed());
        assert!(!hook.is_installed());
        assert!(matches!(manager.start(), Err(ManagerError::Disposed)));
    }

    #[test]
    fn test_dispose_races_with_start() {
        let (manager, hook) = manager();
        let manager = Arc::new(manager);

        let starters: Vec<_> = (0..4)
            .map(|_| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let _ = manager.start();
                    }
                })
            })
            .collect();
        std::thread::sleep(Duration::from_millis(1));
        manager.dispose();
        for starter in starters {
            starter.join().unwrap();
        }

        assert!(manager.is_disposed());
        assert!(!manager.is_started());
        assert!(!hook.is_installed());
    }

    #[test]
    fn test_drop_uninstalls_hook() {
        let (manager, hook) = manager();
        manager.start().unwrap();
        drop(manager);
        assert!(!hook.is_installed());
    }

    #[test]
    fn test_restart_begins_with_empty_key_state() {
        let (manager, hook) = manager();
        manager.start().unwrap();
        hook.press(Key::LEFT_CTRL);
        assert_eq!(manager.held_modifiers(), Modifier::Control.into());

        manager.stop();
        assert!(manager.held_modifiers().is_empty());
        manager.start().unwrap();
        assert!(manager.held_modifiers().is_empty());
    }

    #[test]
    fn test_modifier_key_matches_with_own_category() {
        let (manager, hook) = manager();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        manager
            .register_blocking_hotkey((Modifier::Control, Key::LEFT_CTRL), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        manager.register_blocking_hotkey(Key::LEFT_META, || {}).unwrap();
        manager.start().unwrap();

        assert_eq!(hook.press(Key::LEFT_CTRL), Some(true));
        assert!(wait_for(&hits, 1));
        // Meta pressed alone is {Meta}+LEFT_META, not the bare combo
        assert_eq!(hook.press(Key::LEFT_META), Some(false));
    }

    #[test]
    fn test_unmatched_events_never_suppressed() {
        let (manager, hook) = manager();
        manager.register_blocking_hotkey((Modifier::Control, Key::K), || {}).unwrap();
        manager.start().unwrap();

        assert_eq!(hook.press(Key::K), Some(false));
        assert_eq!(hook.release(Key::K), Some(false));
    }

    #[test]
    fn test_registration_while_running() {
        let (manager, hook) = manager();
        let hits = Arc::new(AtomicUsize::new(0));
        manager.start().unwrap();

        assert_eq!(hook.press(Key::F4), Some(false));
        hook.release(Key::F4);

        let counter = hits.clone();
        manager
            .register_blocking_hotkey(Key::F4, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(hook.press(Key::F4), Some(true));
        assert!(wait_for(&hits, 1));
    }

    #[test]
    fn test_handle_event_blocks_only_fresh_match() {
        let registry = Registry::new();
        let dispatcher = Dispatcher::new(1).unwrap();
        let tracker = KeyTracker::new();
        registry.register(Combo::bare(Key::F3), true, Arc::new(|| {})).unwrap();

        assert!(handle_event(&registry, &dispatcher, &tracker, KeyEvent::down(Key::F3)));
        // repeat of a held key is not fresh
        assert!(!handle_event(&registry, &dispatcher, &tracker, KeyEvent::down(Key::F3)));
        assert!(!handle_event(&registry, &dispatcher, &tracker, KeyEvent::up(Key::F3)));
    }

    #[test]
    fn test_failure_handler_receives_panics() {
        let (manager, hook) = manager();
        let failures = Arc::new(AtomicUsize::new(0));
        let counter = failures.clone();
        manager.set_failure_handler(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        manager.register_hotkey(Key::F6, || panic!("action failed")).unwrap();
        manager.start().unwrap();

        hook.press(Key::F6);
        assert!(wait_for(&failures, 1));
    }
}
