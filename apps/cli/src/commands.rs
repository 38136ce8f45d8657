//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use mealiesync_core::{Reconciler, Scheduler};
use mealiesync_mealie::{ClientOptions, MealieClient};
use mealiesync_shared::{
    ASSIGNMENTS_ENV, AppConfig, ReconcileConfig, apply_assignments_override, init_config,
    load_config, load_config_from, resolve_token, validate_config,
};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// mealiesync — keep Mealie categories and tags in line with your rules.
#[derive(Parser)]
#[command(
    name = "mealiesync",
    version,
    about = "Assign Mealie recipe categories and tags from declarative filter queries.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Path to the config file (defaults to ~/.mealiesync/mealiesync.toml).
    #[arg(long, env = "MEALIESYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Mealie base URL, overriding `mealie.url` from the config file.
    #[arg(long, env = "MEALIE_URL", global = true)]
    pub mealie_url: Option<String>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    /// Run reconciliation cycles on the configured interval until interrupted.
    Run,

    /// Run a single reconciliation cycle and print its summary.
    Once,

    /// Verify the Mealie connection and validate every assignment, changing nothing.
    Check,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "mealiesync=info",
        1 => "mealiesync=debug",
        _ => "mealiesync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Run => cmd_run(&cli).await,
        Command::Once => cmd_once(&cli).await,
        Command::Check => cmd_check(&cli).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&cli).await,
        },
    }
}

/// Load the config file and apply flag and `MA_QUERY_ASSIGNMENTS` overrides, without validating.
fn resolve_config(cli: &Cli, assignments_json: Option<&str>) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    if let Some(url) = &cli.mealie_url {
        config.mealie.url = url.clone();
    }

    apply_assignments_override(&mut config, assignments_json)?;
    Ok(config)
}

fn resolve_config_from_env(cli: &Cli) -> Result<AppConfig> {
    let raw = std::env::var(ASSIGNMENTS_ENV).ok();
    resolve_config(cli, raw.as_deref())
}

fn load_runtime_config(cli: &Cli) -> Result<AppConfig> {
    let config = resolve_config_from_env(cli)?;
    validate_config(&config)?;
    Ok(config)
}

/// Build a client from `config` and wait for the server to answer.
async fn connect(config: &AppConfig) -> Result<MealieClient> {
    let token = resolve_token(&config.mealie)?;

    let mut opts = ClientOptions::default();
    if config.query_assignments.timeout_secs > 0 {
        opts.timeout_secs = config.query_assignments.timeout_secs;
    }

    let client = MealieClient::new(&config.mealie.url, token, &opts)?;
    let user = client
        .wait_until_reachable(config.mealie.startup_grace_secs)
        .await?;
    info!(url = %config.mealie.url, user = %user, "connected to mealie");
    Ok(client)
}

fn reconciler(client: MealieClient, config: &AppConfig) -> Reconciler {
    Reconciler::new(
        Arc::new(client),
        config.query_assignments.assignments.clone(),
        ReconcileConfig::from(config),
    )
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(cli: &Cli) -> Result<()> {
    let config = load_runtime_config(cli)?;
    if config.query_assignments.assignments.is_empty() {
        info!("no query assignments configured, nothing to do");
        return Ok(());
    }

    let client = connect(&config).await?;
    let reconciler = Arc::new(reconciler(client, &config));

    info!(
        assignments = reconciler.assignments().len(),
        repeat_secs = reconciler.config().repeat_interval.as_secs(),
        "starting query assignment scheduler"
    );
    let handle = Scheduler::new(reconciler).start();

    shutdown_signal().await?;
    info!("shutdown requested, waiting for the current cycle to finish");
    handle.cancel();

    let cycles = handle.join().await?;
    info!(cycles, "mealiesync stopped");
    Ok(())
}

async fn cmd_once(cli: &Cli) -> Result<()> {
    let config = load_runtime_config(cli)?;
    if config.query_assignments.assignments.is_empty() {
        info!("no query assignments configured, nothing to do");
        return Ok(());
    }

    let client = connect(&config).await?;
    let report = reconciler(client, &config).run_cycle().await?;
    println!("{report}");
    Ok(())
}

async fn cmd_check(cli: &Cli) -> Result<()> {
    let config = load_runtime_config(cli)?;
    let client = connect(&config).await?;
    let report = reconciler(client, &config).check().await?;

    for (assignment, missing) in &report.invalid {
        for term in missing {
            println!(
                "assignment {assignment}: unknown {} '{}' in {}",
                term.kind.singular(),
                term.name,
                term.list.as_str()
            );
        }
    }

    if !report.is_ok() {
        return Err(eyre!(
            "{} of {} assignment(s) reference unknown terms",
            report.invalid.len(),
            report.assignments
        ));
    }
    println!("{} assignment(s) valid", report.assignments);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(cli: &Cli) -> Result<()> {
    let config = resolve_config_from_env(cli)?;
    if let Err(e) = validate_config(&config) {
        warn!(error = %e, "configuration is not valid");
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

/// Resolve on Ctrl-C, or on SIGTERM where available.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mealiesync").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_subcommands() {
        assert_eq!(parse(&["run"]).command, Command::Run);
        assert_eq!(parse(&["once"]).command, Command::Once);
        assert_eq!(parse(&["check"]).command, Command::Check);
        assert_eq!(
            parse(&["config", "show"]).command,
            Command::Config {
                action: ConfigAction::Show
            }
        );
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = parse(&["once", "-vv", "--log-format", "json", "--config", "/tmp/m.toml"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/m.toml")));
    }

    fn write_config(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("mealiesync-cli-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("mealiesync.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn mealie_url_flag_overrides_file() {
        let path = write_config("url", "[mealie]\nurl = \"http://file:9000\"\n");

        let cli = parse(&[
            "check",
            "--config",
            path.to_str().unwrap(),
            "--mealie-url",
            "https://flag.example",
        ]);
        let config = resolve_config(&cli, None).unwrap();
        assert_eq!(config.mealie.url, "https://flag.example");

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn assignments_json_replaces_file_block() {
        let path = write_config(
            "json",
            "[query_assignments]\nrepeat_secs = 60\ntimeout_secs = 5\n",
        );
        let cli = parse(&["once", "--config", path.to_str().unwrap()]);

        let json = r#"{"repeat-secs": 600, "timeout-secs": 20, "assignments": [{"queries": []}]}"#;
        let config = resolve_config(&cli, Some(json)).unwrap();
        assert_eq!(config.query_assignments.repeat_secs, 600);
        assert_eq!(config.query_assignments.assignments.len(), 1);
        assert_eq!(ReconcileConfig::from(&config).repeat_interval.as_secs(), 600);

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["mealiesync", "serve"]).is_err());
    }
}
