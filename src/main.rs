//! Binary entrypoint for the netbbs CLI.
//!
//! Commands:
//! - `start [--port <n>]` - run the bulletin board server
//! - `init` - create a starter `config.toml`
//!
//! See the library crate docs for module-level details: `netbbs::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};

use netbbs::bbs::BbsServer;
use netbbs::config::Config;

#[derive(Parser)]
#[command(name = "netbbs")]
#[command(about = "A multi-user bulletin board server for TCP networks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bulletin board server
    Start {
        /// Listening port (overrides the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Initialize a new server configuration
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { port } => {
            let (mut config, load_err) = match Config::load(&cli.config).await {
                Ok(config) => (config, None),
                Err(err) => (Config::default(), Some(err)),
            };
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting netbbs v{}", env!("CARGO_PKG_VERSION"));
            if let Some(err) = load_err {
                warn!("{}; starting with defaults", err);
            }

            // CLI port overrides the configured port when present.
            if let Some(port) = port {
                config.server.port = port;
            }

            BbsServer::new(config).run().await?;
        }
        Commands::Init => {
            init_logging(&None, cli.verbose);
            info!("Initializing new server configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();

    // CLI verbosity overrides the configured level.
    let level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);

    let file = config.as_ref().and_then(|cfg| {
        let path = cfg.logging.file.as_ref()?;
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    match file {
        Some(file) => {
            let sink = std::sync::Mutex::new(file);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = sink.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                writeln!(fmt, "{}", line)
            });
        }
        None => {
            builder.format(|fmt, record| {
                writeln!(
                    fmt,
                    "{} [{}] {}",
                    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                    record.level(),
                    record.args()
                )
            });
        }
    }

    let _ = builder.try_init();
}
