//! plymouth-theme-preview - preview and select Plymouth boot splash themes
//!
//! With no command the GTK window opens. The subcommands cover the same
//! operations from a terminal, plus installing the package's system files.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use plymouth_theme_preview::client::HelperClient;
use plymouth_theme_preview::config::{clamp_duration, Config};
use plymouth_theme_preview::daemon_conf;
use plymouth_theme_preview::installer::{self, InstallAction, InstallOptions};
use plymouth_theme_preview::paths;
use plymouth_theme_preview::theme::{discover_themes, find_theme, Theme};
use plymouth_theme_preview::ui;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "plymouth-theme-preview")]
#[command(about = "Preview and select Plymouth boot splash themes")]
#[command(version)]
struct Cli {
    /// Configuration file (default: system config with per-user overrides)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List installed themes, marking the default with `*`
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the current default theme
    Current {
        /// Ask the helper instead of reading plymouthd.conf
        #[arg(long)]
        helper: bool,
    },

    /// Show a theme on the boot splash
    Preview {
        theme: String,

        /// Seconds to show the splash for (default from config)
        #[arg(short, long, value_name = "SECS")]
        duration: Option<u32>,
    },

    /// Make a theme the boot default
    SetDefault {
        theme: String,

        /// Rebuild the initramfs afterwards
        #[arg(short = 'R', long)]
        rebuild_initrd: bool,

        /// Skip confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Install the binaries, D-Bus files and polkit policy
    Install(LayoutArgs),

    /// Check an installation against this build
    Verify(LayoutArgs),

    /// Remove installed files
    Uninstall(LayoutArgs),
}

#[derive(Args, Debug)]
struct LayoutArgs {
    /// Directory with the D-Bus and polkit files (default: built-in copies)
    #[arg(long, value_name = "DIR")]
    source_dir: Option<PathBuf>,

    /// Directory with the built binaries (default: this binary's directory)
    #[arg(long, value_name = "DIR")]
    bin_dir: Option<PathBuf>,

    /// Staging root for packaging
    #[arg(long, value_name = "DIR")]
    destdir: Option<PathBuf>,

    /// Prefix for the front-end binary
    #[arg(long, value_name = "DIR", default_value = paths::install::PREFIX)]
    prefix: PathBuf,
}

impl LayoutArgs {
    fn into_options(self) -> Result<InstallOptions> {
        let bin_dir = match self.bin_dir {
            Some(dir) => dir,
            None => {
                let exe = std::env::current_exe().context("Cannot locate this executable")?;
                exe.parent()
                    .map(PathBuf::from)
                    .context("Executable has no parent directory")?
            }
        };

        Ok(InstallOptions {
            data_dir: self.source_dir,
            bin_dir,
            destdir: self.destdir,
            prefix: self.prefix,
        })
    }
}

// Console helper for output control
struct Console {
    verbose: bool,
}

impl Console {
    fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn log(&self, msg: impl std::fmt::Display) {
        println!("{}", msg);
    }

    fn verbose(&self, msg: impl std::fmt::Display) {
        if self.verbose {
            println!("  {}", msg);
        }
    }

    fn success(&self, msg: impl std::fmt::Display) {
        println!("✅ {}", msg);
    }

    fn warn(&self, msg: impl std::fmt::Display) {
        eprintln!("⚠️  {}", msg);
    }

    fn error(&self, msg: impl std::fmt::Display) {
        eprintln!("❌ {}", msg);
    }
}

fn main() {
    let cli = Cli::parse();

    let _ = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();

    let console = Console::new(cli.verbose);

    if let Err(e) = run(cli, &console) {
        console.error(format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli, console: &Console) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default()?,
    };
    debug!("Themes directory: {}", config.plymouth.themes_dir.display());

    let Some(command) = cli.command else {
        return run_gui(config);
    };

    match command {
        Commands::List { json } => cmd_list(&config, json),
        Commands::Current { helper } => cmd_current(&config, helper, console),
        Commands::Preview { theme, duration } => {
            let seconds = clamp_duration(duration.unwrap_or(config.preview.duration_secs));
            cmd_preview(&config, &theme, seconds, console)
        }
        Commands::SetDefault {
            theme,
            rebuild_initrd,
            yes,
        } => cmd_set_default(&config, &theme, rebuild_initrd, yes, console),
        Commands::Install(layout) => cmd_install(layout.into_options()?, console),
        Commands::Verify(layout) => cmd_verify(layout.into_options()?, console),
        Commands::Uninstall(layout) => cmd_uninstall(layout.into_options()?, console),
    }
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let rt = tokio::runtime::Runtime::new().context("Failed to initialize async runtime")?;
    Ok(rt.block_on(future))
}

#[derive(Serialize)]
struct ListedTheme<'a> {
    #[serde(flatten)]
    theme: &'a Theme,
    default: bool,
}

fn cmd_list(config: &Config, json: bool) -> Result<()> {
    let themes = discover_themes(&config.plymouth.themes_dir)?;
    let current =
        daemon_conf::current_theme(&config.plymouth.daemon_conf, &config.plymouth.daemon_defaults);
    let is_default = |t: &Theme| current.as_deref() == Some(t.name.as_str());

    if json {
        let listed: Vec<_> = themes
            .iter()
            .map(|theme| ListedTheme {
                theme,
                default: is_default(theme),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    if themes.is_empty() {
        println!("No themes found in {}", config.plymouth.themes_dir.display());
        return Ok(());
    }

    let width = themes.iter().map(|t| t.name.len()).max().unwrap_or(0);
    for theme in &themes {
        let marker = if is_default(theme) { '*' } else { ' ' };
        println!(
            "{} {:<width$}  {}",
            marker,
            theme.name,
            theme.display_name,
            width = width
        );
    }
    Ok(())
}

fn cmd_current(config: &Config, from_helper: bool, console: &Console) -> Result<()> {
    let current = if from_helper {
        block_on(async {
            let client = HelperClient::connect().await?;
            console.verbose(format!("Helper v{}", client.helper_version().await?));
            client.default_theme().await
        })??
    } else {
        let conf =
            daemon_conf::effective(&config.plymouth.daemon_conf, &config.plymouth.daemon_defaults);
        if let Some(delay) = conf.show_delay {
            console.verbose(format!("ShowDelay: {}s", delay));
        }
        if let Some(timeout) = conf.device_timeout {
            console.verbose(format!("DeviceTimeout: {}s", timeout));
        }
        conf.theme
    };

    match current {
        Some(name) => {
            println!("{}", name);
            Ok(())
        }
        None => anyhow::bail!("No default theme is configured"),
    }
}

fn cmd_preview(config: &Config, theme: &str, seconds: u32, console: &Console) -> Result<()> {
    // Fail early on typos instead of waiting for polkit
    let theme = find_theme(&config.plymouth.themes_dir, theme)?;
    info!("Previewing {} ({}) for {}s", theme.name, theme.module, seconds);

    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_style(
        indicatif::ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .context("Invalid progress template")?,
    );
    spinner.set_message(format!("Previewing {}...", theme.display_name));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = block_on(async {
        let client = HelperClient::connect().await?;
        client.preview_and_wait(&theme.name, seconds).await
    })?;

    match outcome {
        Ok(outcome) if outcome.success => {
            spinner.finish_and_clear();
            console.success(format!("Preview of {} finished", theme.name));
            Ok(())
        }
        Ok(outcome) => {
            spinner.finish_and_clear();
            anyhow::bail!("Preview of {} failed: {}", theme.name, outcome.message)
        }
        Err(e) => {
            spinner.finish_and_clear();
            Err(e)
        }
    }
}

fn cmd_set_default(
    config: &Config,
    theme: &str,
    rebuild_initrd: bool,
    yes: bool,
    console: &Console,
) -> Result<()> {
    let theme = find_theme(&config.plymouth.themes_dir, theme)?;

    if !yes {
        let prompt = if rebuild_initrd {
            format!("Make {} the default boot splash and rebuild the initramfs?", theme.name)
        } else {
            format!("Make {} the default boot splash?", theme.name)
        };
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;

        if !confirmed {
            console.log("Cancelled.");
            return Ok(());
        }
    }

    if rebuild_initrd {
        console.log("Rebuilding the initramfs, this can take a while...");
    }

    block_on(async {
        let client = HelperClient::connect().await?;
        client.set_default_theme(&theme.name, rebuild_initrd).await
    })??;

    console.success(format!("{} is now the default boot splash", theme.name));
    if !rebuild_initrd {
        console.warn("The initramfs was not rebuilt; the old theme may still show at boot.");
    }
    Ok(())
}

fn cmd_install(opts: InstallOptions, console: &Console) -> Result<()> {
    let report = block_on(installer::install(&opts))??;

    for file in &report.files {
        let label = match file.action {
            InstallAction::Installed => "installed",
            InstallAction::Replaced => "replaced",
            InstallAction::Unchanged => "unchanged",
        };
        console.verbose(format!("{:<9} {}", label, file.destination.display()));
    }

    console.success(format!(
        "{} of {} files changed",
        report.changed(),
        report.files.len()
    ));
    Ok(())
}

fn cmd_verify(opts: InstallOptions, console: &Console) -> Result<()> {
    let issues = block_on(installer::verify(&opts))??;

    if issues.is_empty() {
        console.success("Installation matches this build");
        return Ok(());
    }

    for issue in &issues {
        console.warn(issue);
    }
    anyhow::bail!("{} installed file(s) differ", issues.len())
}

fn cmd_uninstall(opts: InstallOptions, console: &Console) -> Result<()> {
    let removed = block_on(installer::uninstall(&opts))??;

    for path in &removed {
        console.verbose(format!("removed {}", path.display()));
    }
    console.success(format!("Removed {} files", removed.len()));
    Ok(())
}

fn run_gui(config: Config) -> Result<()> {
    if std::env::var("DISPLAY").is_err() && std::env::var("WAYLAND_DISPLAY").is_err() {
        anyhow::bail!(
            "No display server detected (X11 or Wayland).\n\
             Use the subcommands instead, see `plymouth-theme-preview --help`."
        );
    }

    gtk::init().context("Failed to initialize GTK4")?;
    adw::init().context("Failed to initialize Libadwaita")?;

    let app = ui::PreviewApplication::new(config);
    let exit_code = app.run();

    std::process::exit(exit_code.into());
}
