use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use quickcast::config::{format_duration, DEFAULT_SETTINGS_FILE};
use quickcast::{keys, Engine, Settings, SettingsStore};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qcast")]
#[command(author, version, about = "Quick-cast, auto-cast and macros for DirectX games", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the engine and run until Ctrl-C
    Run {
        /// Path to the settings file
        #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
        config: PathBuf,

        /// Use high-level synthetic input instead of scan codes
        #[arg(long)]
        high_level: bool,
    },

    /// Write a settings file with default values
    Init {
        /// Path to the settings file
        #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
        config: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a settings file and list its bindings
    Check {
        /// Path to the settings file
        #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
        config: PathBuf,
    },

    /// List the key names the scan-code backend knows
    Keys,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { config, high_level } => run(&config, high_level).await,
        Commands::Init { config, force } => init(&config, force),
        Commands::Check { config } => check(&config),
        Commands::Keys => {
            list_keys();
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "quickcast=debug,qcast=debug" } else { "quickcast=info,qcast=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(path: &Path, high_level: bool) -> Result<()> {
    let store = SettingsStore::open(path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    print_settings(store.settings());

    let mut engine = Engine::new(store).context("failed to create engine")?;
    if high_level {
        engine.set_backend_preference(false);
    }
    engine
        .start()
        .context("failed to start engine")?;

    let status = engine.status();
    println!(
        "{} Engine running with {} backend",
        "✓".green().bold(),
        status.backend.cyan()
    );
    println!(
        "Press {} to pause/resume, {} to quit\n",
        engine.settings().global_hotkey.yellow().bold(),
        "Ctrl-C".yellow().bold()
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    info!("shutting down");
    engine.stop();
    println!("{} Stopped", "✓".green());
    Ok(())
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists, pass --force to overwrite",
            path.display()
        );
    }

    SettingsStore::new(path)
        .save()
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("{} Wrote default settings to {}", "✓".green(), path.display());
    Ok(())
}

fn check(path: &Path) -> Result<()> {
    println!("{} Checking {}", "→".cyan(), path.display());
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("invalid path encoding"))?;
    let settings = Settings::from_file(path_str)?;
    print_settings(&settings);

    let mut warnings = Vec::new();
    for binding in settings.unknown_bindings() {
        warnings.push(format!("hotkey '{binding}' is not a recognized key and will never fire"));
    }
    #[cfg(not(windows))]
    for binding in settings.bindings() {
        if let Err(e) = quickcast::hotkey_listener::parse_hotkey(&binding) {
            warnings.push(format!("hotkey '{binding}' cannot be registered: {e}"));
        }
    }
    for key in settings.unknown_action_keys() {
        warnings.push(format!("key '{key}' cannot be injected and will be skipped"));
    }

    if warnings.is_empty() {
        println!("{} {}", "✓".green().bold(), "Settings are valid".bold());
    } else {
        for warning in warnings {
            println!("{} {}", "⚠".yellow(), warning);
        }
    }
    Ok(())
}

fn print_settings(settings: &Settings) {
    println!("{}", "Bindings".bold());
    println!("  {:<14} {}", "toggle".dimmed(), settings.global_hotkey.yellow());

    let state = |on: bool| if on { "on".green() } else { "off".red() };

    println!("  quick-cast {}", state(settings.quick_cast.enabled));
    for (slot, hotkey) in &settings.quick_cast.hotkeys {
        println!("    {:<12} {}", slot.dimmed(), hotkey.yellow());
    }

    println!(
        "  auto-cast {} every {}",
        state(settings.auto_cast.enabled),
        format_duration(settings.auto_cast.interval)
    );
    for skill in &settings.auto_cast.skills {
        let interval = skill
            .interval
            .map(format_duration)
            .unwrap_or_else(|| "default".to_string());
        println!("    {:<12} {}", skill.hotkey.yellow(), interval.dimmed());
    }

    println!("  macros ({})", settings.macros.len());
    for m in &settings.macros {
        println!(
            "    {:<12} {} ({} actions)",
            m.name.cyan(),
            m.hotkey.yellow(),
            m.actions.len()
        );
    }
    println!();
}

fn list_keys() {
    println!("{}", "Named keys".bold());
    for chunk in keys::KEY_NAMES.chunks(12) {
        println!("  {}", chunk.join(" "));
    }
    println!(
        "\nAny other single printable character is mapped through the keyboard layout."
    );
}
