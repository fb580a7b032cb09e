//! StartSmart - command-line client for the StartSmart e-book catalog.

mod app;
mod commands;
mod notifier;

use std::path::PathBuf;
use std::process::ExitCode;

use app::{App, AppResult};
use backend_api::Edition;
use clap::{Parser, Subcommand};
use startsmart_config_and_utils::{init_logging, Config, Paths};

/// StartSmart command-line interface.
#[derive(Parser)]
#[command(name = "startsmart")]
#[command(about = "Browse the StartSmart catalog and manage your account")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (storage, logs, config). Defaults to ~/.startsmart
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Also print logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List every grade
    Grades,
    /// List the books on one grade shelf
    Books {
        #[arg(short, long)]
        grade: String,
        /// annual, term or semester
        #[arg(short, long)]
        edition: Edition,
    },
    /// Show one book
    Book {
        #[arg(short, long)]
        title: String,
    },
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "STARTSMART_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "STARTSMART_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in with a Google ID token
    GoogleLogin {
        #[arg(long, default_value = "")]
        id_token: String,
        /// Create a backend profile when none exists
        #[arg(long)]
        signup: bool,
    },
    /// Send a password reset email
    ResetPassword {
        #[arg(short, long, default_value = "")]
        email: String,
    },
    /// Show who is signed in
    Whoami,
    /// Refresh and show the backend profile
    Profile,
    /// Change the display name
    SetName { name: String },
    /// Change the phone number (10 digits)
    SetPhone { phone: String },
    /// Sign out
    Logout,
}

async fn run(cli: Cli, app: &App) -> AppResult<ExitCode> {
    match cli.command {
        Commands::Grades => commands::grades(app).await,
        Commands::Books { grade, edition } => commands::books(app, &grade, edition).await,
        Commands::Book { title } => commands::book(app, &title).await,
        Commands::Login { email, password } => commands::login(app, &email, &password).await,
        Commands::Signup {
            name,
            email,
            password,
        } => commands::signup(app, &name, &email, &password).await,
        Commands::GoogleLogin { id_token, signup } => {
            commands::google_login(app, &id_token, signup).await
        }
        Commands::ResetPassword { email } => commands::reset_password(app, &email).await,
        Commands::Whoami => commands::whoami(app).await,
        Commands::Profile => commands::profile(app).await,
        Commands::SetName { name } => commands::set_name(app, &name).await,
        Commands::SetPhone { phone } => commands::set_phone(app, &phone).await,
        Commands::Logout => commands::logout(app).await,
    }
}

#[tokio::main]
async fn main() -> AppResult<ExitCode> {
    let cli = Cli::parse();

    let paths = match &cli.base_dir {
        Some(base) => Paths::with_base_dir(base.clone()),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    init_logging(&level, Some(&paths.log_file()), cli.verbose);
    tracing::debug!(api = %config.api_base_url, "Configuration loaded");

    let app = App::init(config, paths).await?;
    run(cli, &app).await
}
