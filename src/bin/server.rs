use authgate::auth::password::hash_password;
use authgate::config::Config;
use authgate::start_server_with_config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "authgate", version, about = "Login gateway with pluggable verifiers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the login gateway
    Serve {
        /// TOML configuration file, merged with AUTHGATE_* environment variables
        #[arg(short, long, default_value = "authgate.toml")]
        config: PathBuf,

        /// Emit logs as JSON lines
        #[arg(long)]
        json_logs: bool,
    },
    /// Print the hash to put in a `password_hash` setting
    HashPassword { password: String },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("authgate=info,tower_http=info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::HashPassword { password } => {
            println!("{}", hash_password(&password));
            Ok(())
        }
        Command::Serve { config, json_logs } => {
            init_tracing(json_logs);
            let config = Config::load(&config)?;

            let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = shutdown_tx.send(());
                }
            });

            start_server_with_config(config, shutdown_rx).await
        }
    }
}
