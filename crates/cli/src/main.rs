// hubsync CLI - pull analysis profile bundles from the Hub

mod exit_codes;
mod hub;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::{hub_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use hubsync_client::HubError;

#[derive(Parser)]
#[command(name = "hubsync")]
#[command(about = "Sync analysis profiles for an application from the Hub")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// More output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to the Hub and store the credential
    #[command(after_help = "\
Examples:
  hubsync login --host https://hub.example.com --user alice
  HUBSYNC_PASSWORD=... hubsync login --host https://hub.example.com --user alice")]
    Login {
        /// Hub base URL
        #[arg(long, env = "HUBSYNC_HOST")]
        host: Option<String>,

        /// User name (prompted when omitted on a TTY)
        #[arg(long, short = 'u', env = "HUBSYNC_USER")]
        user: Option<String>,

        /// Password (prompted when omitted on a TTY)
        #[arg(long, env = "HUBSYNC_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Remove the stored credential
    Logout,

    /// Show the stored credential and whether its token is still usable
    Status,

    /// Download and unpack every analysis profile of one application
    #[command(after_help = "\
Examples:
  hubsync sync --url https://git.example.com/app.git:main -o .
  hubsync sync --binary com.example:app:1.0 -o ./app
  hubsync sync --url https://git.example.com/app.git --host http://localhost:8080")]
    Sync {
        /// Repository URL, optionally suffixed with :BRANCH
        #[arg(long, value_name = "URL[:BRANCH]")]
        url: Option<String>,

        /// Binary identifier of the application
        #[arg(long, value_name = "ID")]
        binary: Option<String>,

        /// Base directory that receives the profiles (must exist)
        #[arg(long, short = 'o', default_value = ".")]
        output: PathBuf,

        /// Talk to this Hub without credentials
        #[arg(long)]
        host: Option<String>,

        /// Profiles directory under the base (default from settings)
        #[arg(long, value_name = "DIR")]
        profiles_dir: Option<String>,

        /// Print the sync report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: hubsync <command> [options]");
            eprintln!("       hubsync --help for more information");
            Ok(())
        }
        Some(Commands::Login { host, user, password }) => hub::cmd_login(host, user, password),
        Some(Commands::Logout) => hub::cmd_logout(),
        Some(Commands::Status) => hub::cmd_status(),
        Some(Commands::Sync {
            url,
            binary,
            output,
            host,
            profiles_dir,
            json,
        }) => hub::cmd_sync(url, binary, output, host, profiles_dir, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from hub error with proper exit code.
    pub fn hub(err: HubError) -> Self {
        let code = hub_exit_code(&err);
        let hint = match &err {
            HubError::NotAuthenticated => Some("run `hubsync login` first".to_string()),
            HubError::Http { status: 401, .. } | HubError::Http { status: 403, .. } => {
                Some("the Hub rejected the credential; run `hubsync login` again".to_string())
            }
            HubError::Ambiguous { .. } => {
                Some("narrow the lookup, e.g. add :BRANCH to --url".to_string())
            }
            HubError::Network(_) => Some("check the Hub URL and your connection".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
