use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lks")]
#[command(about = "Lock sync operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Reconcile every configured credential against the remote
    Sync {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Keep state in memory instead of Postgres
        #[arg(long, default_value_t = false)]
        memory: bool,

        /// Run a single pass and exit
        #[arg(long, default_value_t = false)]
        once: bool,

        /// Log every replayed history event
        #[arg(long = "log-events", default_value_t = false)]
        log_events: bool,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env.local is optional; deployments inject env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = lks_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = lks_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_snapshots_table={}",
                        s.ok, s.has_snapshots_table
                    );
                }
                DbCmd::Migrate => {
                    lks_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = lks_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Sync {
            config_paths,
            memory,
            once,
            log_events,
        } => {
            commands::sync::run(commands::sync::SyncArgs {
                config_paths,
                memory,
                once,
                log_events,
            })
            .await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
