//! `themesync` - a terminal theme switch.
//!
//! Reads the OS color-scheme preference, keeps a manual override in a JSON
//! preferences file and prints the resulting theme. Every invocation is one
//! coordinator lifetime: initialize, apply the command, persist.

mod commands;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use themesync::env::Platform;
use themesync::system::{set_scheme_detector, SystemColorScheme};
use themesync::{CoordinatorConfig, FileStore, Theme, ThemeCoordinator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "themesync")]
#[command(version)]
#[command(about = "Show or switch the light/dark theme")]
struct Cli {
    /// Preferences file holding the manual override
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    /// YAML configuration (storage key, malformed-value policy, ...)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Pretend the OS prefers this theme instead of asking it
    #[arg(long, global = true, value_enum)]
    os: Option<ThemeArg>,

    /// Print the state as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current theme (default)
    Show,

    /// Choose a theme explicitly
    Set {
        #[arg(value_enum)]
        theme: ThemeArg,
    },

    /// Switch to the other theme
    Toggle,

    /// Forget the manual choice and follow the OS again
    Reset,

    /// Follow OS preference changes until interrupted
    Watch {
        /// Polling interval in milliseconds
        #[arg(long, default_value = "1000")]
        interval: u64,

        /// Stop after this many polls
        #[arg(long)]
        iterations: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_store_path() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("themesync").join("prefs.json")
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<CoordinatorConfig> {
    let Some(path) = path else {
        return Ok(CoordinatorConfig::default());
    };
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    CoordinatorConfig::from_yaml(&yaml)
        .with_context(|| format!("parsing config {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.os {
        Some(ThemeArg::Dark) => set_scheme_detector(|| Ok(true)),
        Some(ThemeArg::Light) => set_scheme_detector(|| Ok(false)),
        None => {}
    }

    let config = load_config(cli.config.as_ref())?;
    let store_path = cli.store.unwrap_or_else(default_store_path);
    tracing::debug!(store = %store_path.display(), "using preferences file");

    let platform = Platform::headless()
        .with_scheme(SystemColorScheme)
        .with_store(FileStore::new(store_path));
    let coordinator = ThemeCoordinator::new(platform, config);
    coordinator.initialize();

    let snapshot = match cli.command.unwrap_or(Commands::Show) {
        Commands::Show => commands::show(&coordinator),
        Commands::Set { theme } => commands::set(&coordinator, theme.into()),
        Commands::Toggle => commands::toggle(&coordinator),
        Commands::Reset => commands::reset(&coordinator),
        Commands::Watch {
            interval,
            iterations,
        } => {
            return commands::follow(
                &coordinator,
                Duration::from_millis(interval),
                iterations,
                cli.json,
                |line| println!("{line}"),
            );
        }
    };

    println!("{}", commands::render(&snapshot, cli.json)?);
    Ok(())
}
