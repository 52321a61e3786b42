// Keyhook CLI
// Runs configured global hotkeys on top of the native keyboard hook

#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "cli")]
use std::sync::Arc;
#[cfg(feature = "cli")]
use std::time::Duration;

#[cfg(feature = "cli")]
use anyhow::{bail, Context, Result};
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
use keyhook_core::{Config, HotkeyManager, NativeHook};

/// Global keyboard hotkeys
#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "keyhook")]
#[command(version)]
#[command(about = "Global keyboard hotkey daemon", long_about = None)]
struct Args {
    /// TOML configuration file (defaults to ~/.config/keyhook/config.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Devices to hook by name or path (can be used multiple times)
    #[arg(short, long, value_name = "DEVICE")]
    devices: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// List available keyboard devices
    #[arg(long)]
    list_devices: bool,
}

/// Main application state
#[cfg(feature = "cli")]
struct Application {
    config: Config,
    args: Args,
    /// Set by SIGINT/SIGTERM
    shutdown: Arc<AtomicBool>,
}

#[cfg(feature = "cli")]
impl Application {
    fn new(args: Args) -> Result<Self> {
        let config = match &args.config {
            Some(path) => Config::from_toml_path(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => Config::load_default().context("failed to load default config")?,
        };

        Ok(Self {
            config,
            args,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    fn validate(&self) -> Result<()> {
        if self.config.hotkeys.is_empty() {
            bail!("configuration defines no hotkeys");
        }
        println!(
            "Configuration is valid: {} hotkey(s), {} worker(s)",
            self.config.hotkeys.len(),
            self.config.workers
        );
        for entry in &self.config.hotkeys {
            let mode = if entry.blocking { "blocking" } else { "pass-through" };
            println!("  {} ({})", entry.combo, mode);
        }
        Ok(())
    }

    /// CLI --devices > config [hook].devices > autodetect
    fn device_filter(&self) -> Vec<String> {
        if !self.args.devices.is_empty() {
            self.args.devices.clone()
        } else {
            self.config.devices.clone()
        }
    }

    #[cfg(target_os = "linux")]
    fn native_hook(&self) -> NativeHook {
        NativeHook::with_filter(self.device_filter())
    }

    #[cfg(windows)]
    fn native_hook(&self) -> NativeHook {
        if !self.device_filter().is_empty() {
            log::warn!("Device filters are ignored by the Windows hook");
        }
        NativeHook::new()
    }

    #[cfg(target_os = "linux")]
    fn list_devices() -> Result<()> {
        let devices = NativeHook::list_devices().context("error finding keyboard devices")?;
        println!("Found {} keyboard device(s):", devices.len());
        for device in &devices {
            match &device.path {
                Some(path) => println!("  {}: {} ({})", device.index, device.name, path),
                None => println!("  {}: {}", device.index, device.name),
            }
        }
        Ok(())
    }

    #[cfg(windows)]
    fn list_devices() -> Result<()> {
        println!("The Windows hook listens to every keyboard; there is nothing to list.");
        Ok(())
    }

    fn run(&self) -> Result<()> {
        let manager = HotkeyManager::with_workers(self.native_hook(), self.config.workers)
            .context("failed to start dispatch workers")?;

        manager.set_failure_handler(|failure| {
            log::error!("{}", failure);
        });

        for entry in &self.config.hotkeys {
            let combo = entry.combo;
            let message = entry.message.clone();
            let result = manager.register(combo, entry.blocking, move || {
                log::info!("Hotkey {} fired", combo);
                match &message {
                    Some(text) => println!("{}", text),
                    None => println!("{} pressed", combo),
                }
            });
            if let Err(e) = result {
                log::warn!("Skipping hotkey: {}", e);
            }
        }

        for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
            signal_hook::flag::register(signal, self.shutdown.clone())
                .context("failed to install signal handler")?;
        }

        manager.start().context("failed to install keyboard hook")?;
        log::info!(
            "keyhook is running with {} hotkey(s). Press Ctrl+C to exit.",
            manager.registry().len()
        );

        while !self.shutdown.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(100));
        }

        log::info!("Received signal, shutting down");
        manager.dispose();
        Ok(())
    }
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // Handle list-devices flag (doesn't require config)
    if args.list_devices {
        return Application::list_devices();
    }

    let app = Application::new(args)?;

    if app.args.check_config {
        return app.validate();
    }

    app.run()
}

// Stub for when the cli feature is not enabled
#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("Error: the keyhook binary requires the 'cli' feature to be enabled.");
    eprintln!("Please build with: cargo build --release --features cli --bin keyhook");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    #[cfg(feature = "cli")]
    use super::*;

    #[test]
    #[cfg(feature = "cli")]
    fn test_args_parsing() {
        let args = Args::parse_from(["keyhook", "--config", "/tmp/test.toml"]);

        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
        assert!(args.devices.is_empty());
        assert!(!args.verbose);
        assert!(!args.check_config);
        assert!(!args.list_devices);
    }

    #[test]
    #[cfg(feature = "cli")]
    fn test_args_with_devices() {
        let args = Args::parse_from([
            "keyhook",
            "--verbose",
            "--devices",
            "/dev/input/event0",
            "-d",
            "AT Translated Set 2 keyboard",
        ]);

        assert!(args.verbose);
        assert_eq!(args.config, None);
        assert_eq!(
            args.devices,
            vec!["/dev/input/event0", "AT Translated Set 2 keyboard"]
        );
    }

    #[test]
    #[cfg(feature = "cli")]
    fn test_args_list_devices() {
        let args = Args::parse_from(["keyhook", "--list-devices"]);
        assert!(args.list_devices);
    }

    #[test]
    #[cfg(feature = "cli")]
    fn test_cli_devices_override_config() {
        let app = Application {
            config: Config {
                devices: vec!["from-config".to_string()],
                ..Config::default()
            },
            args: Args::parse_from(["keyhook", "-d", "from-cli"]),
            shutdown: Arc::new(AtomicBool::new(false)),
        };
        assert_eq!(app.device_filter(), vec!["from-cli"]);

        let app = Application {
            args: Args::parse_from(["keyhook"]),
            ..app
        };
        assert_eq!(app.device_filter(), vec!["from-config"]);
    }

    #[test]
    #[cfg(feature = "cli")]
    fn test_check_config_rejects_empty() {
        let app = Application {
            config: Config::default(),
            args: Args::parse_from(["keyhook", "--check-config"]),
            shutdown: Arc::new(AtomicBool::new(false)),
        };
        assert!(app.validate().is_err());
    }
}
