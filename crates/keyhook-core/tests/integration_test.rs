// Keyhook Integration Tests
// Config loading, registration from many threads and manager lifecycle

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use keyhook_core::{
    Combo, Config, ConfigError, HookError, HotkeyManager, Key, ManagerError, ManualHook, Modifier,
    Registry, RegistryError,
};

mod config_tests {
    use super::*;

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[dispatch]
workers = 3

[[hotkey]]
keys = "Ctrl+Alt+T"
blocking = true
message = "terminal"
"#
        )
        .unwrap();

        let config = Config::from_toml_path(file.path()).unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.source_path.as_deref(), Some(file.path()));
        assert_eq!(config.hotkeys.len(), 1);
        assert_eq!(
            config.hotkeys[0].combo,
            Combo::new([Modifier::Control, Modifier::Alt], Key::T)
        );
        assert!(config.hotkeys[0].blocking);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::from_toml_path(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[hotkey]\nkeys = ").unwrap();
        assert!(matches!(
            Config::from_toml_path(file.path()),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_config_drives_manager() {
        let config = Config::from_toml(
            r#"
[[hotkey]]
keys = "Shift+F3"
blocking = true
"#,
        )
        .unwrap();

        let hook = ManualHook::new();
        let manager = HotkeyManager::with_workers(hook.clone(), config.workers).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        for entry in &config.hotkeys {
            let counter = hits.clone();
            manager
                .register(entry.combo, entry.blocking, move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        manager.start().unwrap();

        hook.press(Key::RIGHT_SHIFT);
        assert_eq!(hook.press(Key::F3), Some(true));
    }
}

mod registry_tests {
    use super::*;

    #[test]
    fn test_concurrent_registration_single_winner() {
        let registry = Arc::new(Registry::new());
        let combo = Combo::new(Modifier::Control, Key::Q);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || registry.register(combo, false, Arc::new(|| {})).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_distinct_registrations() {
        let registry = Arc::new(Registry::new());
        let keys = [Key::A, Key::B, Key::C, Key::D, Key::E, Key::F];

        let handles: Vec<_> = keys
            .iter()
            .map(|&key| {
                let registry = registry.clone();
                thread::spawn(move || registry.register(Combo::bare(key), false, Arc::new(|| {})))
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
        assert_eq!(registry.len(), keys.len());
    }

    #[test]
    fn test_duplicate_error_names_combo() {
        let registry = Registry::new();
        let combo = Combo::new(Modifier::Alt, Key::X);
        registry.register(combo, false, Arc::new(|| {})).unwrap();
        match registry.register(combo, true, Arc::new(|| {})) {
            Err(RegistryError::DuplicateCombination(existing)) => assert_eq!(existing, combo),
            other => panic!("expected duplicate error, got {:?}", other.map(|id| id.to_string())),
        }
    }
}

mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_registration_survives_restart() {
        let hook = ManualHook::new();
        let manager = HotkeyManager::with_workers(hook.clone(), 1).unwrap();
        let (tx, rx) = mpsc::channel();
        manager
            .register_hotkey(Key::F8, move || {
                let _ = tx.send(());
            })
            .unwrap();

        manager.start().unwrap();
        manager.stop();
        manager.start().unwrap();

        hook.press(Key::F8);
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_unregister_by_combo_while_running() {
        let hook = ManualHook::new();
        let manager = HotkeyManager::new(hook.clone()).unwrap();
        manager.register_blocking_hotkey((Modifier::Control, Key::W), || {}).unwrap();
        manager.start().unwrap();

        hook.press(Key::LEFT_CTRL);
        assert_eq!(hook.press(Key::W), Some(true));
        hook.release(Key::W);

        assert!(manager.unregister_hotkey((Modifier::Control, Key::W)));
        assert!(!manager.unregister_hotkey((Modifier::Control, Key::W)));
        assert_eq!(hook.press(Key::W), Some(false));
    }

    #[test]
    fn test_unregister_all() {
        let manager = HotkeyManager::new(ManualHook::new()).unwrap();
        manager.register_hotkey(Key::F1, || {}).unwrap();
        manager.register_hotkey(Key::F2, || {}).unwrap();
        manager.unregister_all();
        assert!(manager.registry().is_empty());
    }

    #[test]
    fn test_start_failure_is_reported() {
        let hook = ManualHook::new();
        let manager = HotkeyManager::new(hook.clone()).unwrap();
        hook.fail_next_install("no access");

        match manager.start() {
            Err(ManagerError::HookInstall(HookError::Install(reason))) => {
                assert_eq!(reason, "no access")
            }
            other => panic!("unexpected start result: {:?}", other),
        }
        assert!(!manager.is_started());
        assert!(!hook.is_installed());
    }

    #[test]
    fn test_registry_usable_after_dispose() {
        let manager = HotkeyManager::new(ManualHook::new()).unwrap();
        manager.dispose();
        assert!(manager.register_hotkey(Key::F12, || {}).is_some());
        assert!(matches!(manager.start(), Err(ManagerError::Disposed)));
    }
}
