// Keyhook Registry
// Combo -> binding storage shared between the control thread and the hook thread

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{Combo, Key, ModifierSet};

/// Callable run when a hotkey fires
pub type HotkeyAction = Arc<dyn Fn() + Send + Sync + 'static>;

/// Opaque handle returned by registration, used to unregister later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HotkeyId(Uuid);

impl HotkeyId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for HotkeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered hotkey: the combo, its action and whether the triggering
/// key event is swallowed.
#[derive(Clone)]
pub struct Binding {
    id: HotkeyId,
    combo: Combo,
    action: HotkeyAction,
    blocking: bool,
}

impl Binding {
    pub fn id(&self) -> HotkeyId {
        self.id
    }

    pub fn combo(&self) -> Combo {
        self.combo
    }

    /// Whether the key-down that triggers this binding is suppressed
    pub fn blocking(&self) -> bool {
        self.blocking
    }

    /// Run the action on the current thread
    pub fn invoke(&self) {
        (self.action)()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("combo", &self.combo)
            .field("blocking", &self.blocking)
            .finish_non_exhaustive()
    }
}

/// Errors that can occur when registering hotkeys
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("combination {0} is already registered")]
    DuplicateCombination(Combo),
}

#[derive(Default)]
struct RegistryInner {
    by_combo: IndexMap<Combo, Binding>,
    by_id: HashMap<HotkeyId, Combo>,
}

/// Hotkey registry
///
/// At most one binding exists per combo and the first registrant wins. All
/// operations take the internal lock, so the hook thread can look up combos
/// while another thread registers or unregisters.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action for a combo.
    ///
    /// Fails with [`RegistryError::DuplicateCombination`] when the combo is
    /// already taken; the existing binding is left untouched.
    pub fn register(
        &self,
        combo: Combo,
        blocking: bool,
        action: HotkeyAction,
    ) -> Result<HotkeyId, RegistryError> {
        let mut inner = self.inner.write();
        if inner.by_combo.contains_key(&combo) {
            return Err(RegistryError::DuplicateCombination(combo));
        }

        let id = HotkeyId::generate();
        inner.by_combo.insert(
            combo,
            Binding {
                id,
                combo,
                action,
                blocking,
            },
        );
        inner.by_id.insert(id, combo);
        Ok(id)
    }

    /// Remove the binding for an exact combo
    pub fn unregister(&self, combo: &Combo) -> bool {
        let mut inner = self.inner.write();
        match inner.by_combo.shift_remove(combo) {
            Some(binding) => {
                inner.by_id.remove(&binding.id);
                true
            }
            None => false,
        }
    }

    /// Remove the binding with the given id
    pub fn unregister_id(&self, id: HotkeyId) -> bool {
        let mut inner = self.inner.write();
        match inner.by_id.remove(&id) {
            Some(combo) => inner.by_combo.shift_remove(&combo).is_some(),
            None => false,
        }
    }

    /// Remove every binding
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.by_combo.clear();
        inner.by_id.clear();
    }

    /// Find the binding for exactly these held modifiers and key
    #[inline]
    pub fn lookup(&self, modifiers: ModifierSet, key: Key) -> Option<Binding> {
        self.inner
            .read()
            .by_combo
            .get(&Combo::new(modifiers, key))
            .cloned()
    }

    pub fn contains(&self, combo: &Combo) -> bool {
        self.inner.read().by_combo.contains_key(combo)
    }

    /// Resolve an id back to its combo
    pub fn combo_for(&self, id: HotkeyId) -> Option<Combo> {
        self.inner.read().by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_combo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().by_combo.is_empty()
    }

    /// Snapshot of all bindings in registration order
    pub fn bindings(&self) -> Vec<Binding> {
        self.inner.read().by_combo.values().cloned().collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("bindings", &self.bindings())
            .finish()
    }
}
