use std::env;
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{LevelFilter, debug, error, info, warn};
use tokio::net::TcpListener;

use marquee::account::{AccountRepository, AccountStore, JsonFileAccountStore};
use marquee::api::{self, AppState};
use marquee::auth::{self, AuthConfig, AuthState, PLACEHOLDER_JWT_SECRET};
use marquee::catalog::CatalogRepository;
use marquee::config::{self as app_config, APP_NAME, AccountSource, AppConfig};
use marquee::db::Database;

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_serve(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    handle_serve(ctx, cmd).await
}

#[tokio::main]
async fn async_accounts(ctx: RuntimeContext, cmd: AccountsCommand) -> Result<()> {
    handle_accounts(&ctx, cmd).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging()?;
    debug!("config file: {}", ctx.config_file.display());

    match cli.command {
        Command::Serve(cmd) => async_serve(ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::HashPassword(cmd) => handle_hash_password(cmd),
        Command::GenerateSecret => {
            println!("{}", AuthConfig::generate_jwt_secret());
            Ok(())
        }
        Command::Accounts { command } => async_accounts(ctx, command),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Marquee - movie catalog API server.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Enable debug logging (equivalent to -vv)
    #[arg(long, global = true)]
    debug: bool,
    /// Enable trace logging (overrides other levels)
    #[arg(long, global = true)]
    trace: bool,
    /// Output machine readable JSON
    #[arg(long, global = true)]
    json: bool,
    /// Disable ANSI colors in output
    #[arg(long = "no-color", global = true, conflicts_with = "color")]
    no_color: bool,
    /// Control color output (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    color: ColorOption,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorOption {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeCommand),
    /// Inspect and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Print the bcrypt hash of a password
    HashPassword(HashPasswordCommand),
    /// Print a random secret suitable for `auth.jwt_secret`
    GenerateSecret,
    /// Manage accounts in the database
    Accounts {
        #[command(subcommand)]
        command: AccountsCommand,
    },
}

#[derive(Debug, Clone, Args)]
struct ServeCommand {
    /// Host address to bind to
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,
    /// Application environment (development|production)
    #[arg(long = "env", env = "APP_ENV")]
    environment: Option<String>,
    /// Token signing secret
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
    /// Token issuer
    #[arg(long, env = "JWT_ISS")]
    jwt_iss: Option<String>,
    /// Comma-separated token audiences
    #[arg(long, env = "JWT_AUD")]
    jwt_aud: Option<String>,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Output the effective configuration
    Show,
    /// Print the resolved config file path
    Path,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Args)]
struct HashPasswordCommand {
    /// Password to hash
    password: String,
    /// bcrypt cost factor
    #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
    cost: u32,
}

#[derive(Debug, Subcommand)]
enum AccountsCommand {
    /// Create an account
    Add {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MARQUEE_ACCOUNT_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    config_file: PathBuf,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let config_file = app_config::config_file_path(common.config.clone())?;
        let config = AppConfig::load(&config_file)?;
        Ok(Self {
            common,
            config_file,
            config,
        })
    }

    fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        if self.common.quiet {
            log::set_max_level(LevelFilter::Off);
            return Ok(());
        }

        let level = match self.effective_log_level() {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        };

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{APP_NAME}={level},tower_http={level}")));

        if self.common.json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .ok();
        } else {
            let force_color = matches!(self.common.color, ColorOption::Always)
                || env::var_os("FORCE_COLOR").is_some();
            let disable_color = self.common.no_color
                || matches!(self.common.color, ColorOption::Never)
                || env::var_os("NO_COLOR").is_some()
                || (!force_color && !io::stderr().is_terminal());

            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_ansi(!disable_color))
                .try_init()
                .ok();
        }

        // log crate users (the auth module) when no tracing bridge is active
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
        builder.filter_level(self.effective_log_level());
        builder.try_init().ok();

        Ok(())
    }

    fn effective_log_level(&self) -> LevelFilter {
        if self.common.trace {
            LevelFilter::Trace
        } else if self.common.debug {
            LevelFilter::Debug
        } else {
            match self.common.verbose {
                0 => LevelFilter::Info,
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

impl ServeCommand {
    /// Command line flags win over file and `MARQUEE__*` settings.
    fn apply(self, config: &mut AppConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(environment) = self.environment {
            config.server.env = environment;
        }
        if let Some(secret) = self.jwt_secret.filter(|s| !s.is_empty()) {
            config.auth.jwt_secret = Some(secret);
        }
        if let Some(issuer) = self.jwt_iss.filter(|s| !s.is_empty()) {
            config.auth.issuer = issuer;
        }
        if let Some(audiences) = self.jwt_aud.filter(|s| !s.is_empty()) {
            config.auth.audiences = audiences;
        }
    }
}

async fn handle_serve(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    let mut config = ctx.config;
    cmd.apply(&mut config);

    info!("Starting {} in {} mode", APP_NAME, config.server.env);

    let auth_config = config.auth.clone();
    auth_config
        .validate(config.server.is_production())
        .context("Invalid auth configuration")?;
    if auth_config.jwt_secret.as_deref() == Some(PLACEHOLDER_JWT_SECRET) {
        warn!("auth.jwt_secret is the placeholder value; run `{APP_NAME} generate-secret`");
    }
    let auth_state = AuthState::new(auth_config).context("Invalid auth configuration")?;
    info!(
        "Token issuer: {}, accepted audience: {}",
        auth_state.issuer(),
        auth_state.accepted_audience()
    );
    tokio::task::spawn_blocking(auth::prepare_dummy_hash)
        .await
        .context("preparing signin hash")?;

    let db_path = config.database_path()?;
    info!("Database path: {}", db_path.display());
    let database = Database::new(&db_path).await?;

    let accounts: Arc<dyn AccountStore> = match config.accounts.source {
        AccountSource::Database => Arc::new(AccountRepository::new(database.pool().clone())),
        AccountSource::File => {
            let path = config.accounts_file()?;
            if !path.exists() {
                warn!("Accounts file {} does not exist yet", path.display());
            }
            info!("Accounts file: {}", path.display());
            Arc::new(JsonFileAccountStore::new(path))
        }
    };

    let state = AppState::new(
        auth_state,
        accounts,
        CatalogRepository::new(database.pool().clone()),
        config.server.env.clone(),
    );
    let app = api::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;
    info!("Listening on http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .context("binding to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running server")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let shown = redacted(&ctx.config);
            if ctx.common.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&shown).context("serializing config to JSON")?
                );
            } else {
                print!(
                    "{}",
                    toml::to_string_pretty(&shown).context("serializing config to TOML")?
                );
            }
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.config_file.display());
            Ok(())
        }
        ConfigCommand::Init { force } => init_config(&ctx.config_file, force),
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        ));
    }
    app_config::write_default_config(path)?;
    info!("Wrote default config to {}", path.display());
    Ok(())
}

/// Literal secrets are masked; `env:VAR` references are shown as is.
fn redacted(config: &AppConfig) -> AppConfig {
    let mut shown = config.clone();
    let literal = shown
        .auth
        .jwt_secret
        .as_deref()
        .is_some_and(|secret| !secret.starts_with("env:"));
    if literal {
        shown.auth.jwt_secret = Some("<redacted>".to_string());
    }
    shown
}

fn handle_hash_password(cmd: HashPasswordCommand) -> Result<()> {
    let hash = bcrypt::hash(&cmd.password, cmd.cost).context("hashing password")?;
    println!("{hash}");
    Ok(())
}

async fn handle_accounts(ctx: &RuntimeContext, command: AccountsCommand) -> Result<()> {
    match command {
        AccountsCommand::Add { email, password } => {
            let email = email.trim().to_string();
            if email.is_empty() {
                return Err(anyhow!("email must not be empty"));
            }
            if password.is_empty() {
                return Err(anyhow!("password must not be empty"));
            }

            let database = Database::new(&ctx.config.database_path()?).await?;
            let repo = AccountRepository::new(database.pool().clone());

            let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
                .await
                .context("hashing task failed")?
                .context("hashing password")?;

            let account = repo.create(&email, &hash).await?;
            if ctx.config.accounts.source == AccountSource::File {
                warn!("accounts.source is \"file\"; this database account is not used for signin");
            }
            println!("Created account {} ({})", account.id, account.email);
            Ok(())
        }
    }
}
