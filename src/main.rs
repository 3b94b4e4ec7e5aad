use clap::Parser;
use expense_sheet::args::{Args, Command};
use expense_sheet::{commands, Config, Mode, Result, Synchronizer};
use std::process::ExitCode;
use tracing::{debug, error, info, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    // This allows for testing the program without hitting the Google APIs. When
    // EXPENSE_SHEET_IN_TEST_MODE is set and non-zero in length, then the mode will be
    // Mode::Testing, otherwise it will be Mode::Google.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.client_secret(), init_args.sheet_url())
                .await?
                .print()
        }

        Command::Auth(auth_args) => {
            let config = Config::load(home).await?;
            if auth_args.verify() {
                commands::auth_verify(&config).await?.print()
            } else {
                commands::auth(&config).await?.print()
            }
        }

        Command::Add(add_args) => {
            let sync = connect(home, mode).await?;
            commands::add_expense(&sync, add_args).await?.print()
        }

        Command::Categories(categories_args) => {
            let sync = connect(home, mode).await?;
            commands::categories(&sync, categories_args.query())
                .await?
                .print()
        }

        Command::Resync => {
            let sync = connect(home, mode).await?;
            commands::resync(&sync).await?.print()
        }

        // stdout belonged to the MCP client, so the closing message is only logged.
        Command::Mcp => {
            let out = commands::mcp(Config::load(home).await?, mode).await?;
            info!("{}", out.message())
        }
    };
    Ok(())
}

async fn connect(home: &std::path::Path, mode: Mode) -> Result<Synchronizer> {
    let config = Config::load(home).await?;
    Synchronizer::connect(&config, mode).await
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME").replace('-', "_"),
                level
            ))
        }
    };

    // stdout belongs to the MCP transport.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
