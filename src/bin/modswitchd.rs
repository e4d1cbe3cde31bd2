//! modswitchd - publish the DIP switch state to shared memory

use clap::{ArgAction, Parser};
use modswitch::config::DEFAULT_CONFIG_FILE;
use modswitch::gpio::DEFAULT_GPIOCHIP;
use modswitch::lock::DEFAULT_LOCK_FILE;
use modswitch::signal::install_fault_handlers;
use modswitch::{CancelToken, Publisher, PublisherOptions, Result, SwitchConfig, DEFAULT_CHANNEL_NAME};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "modswitchd")]
#[command(about = "2-position DIP switch daemon publishing its state to shared memory", long_about = None)]
#[command(version, disable_version_flag = true)]
struct Cli {
    /// modswitch config file
    #[arg(short = 'c', long = "config", value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Run as a background daemon (SysVinit)
    #[arg(short = 'D', long)]
    daemon: bool,

    /// Instance lock file
    #[arg(long, value_name = "FILE", default_value = DEFAULT_LOCK_FILE)]
    lock_file: PathBuf,

    /// Shared memory object to publish into
    #[arg(long, value_name = "NAME", default_value = DEFAULT_CHANNEL_NAME)]
    shm_name: String,

    /// GPIO character device
    #[arg(long, value_name = "DEV", default_value = DEFAULT_GPIOCHIP)]
    gpiochip: PathBuf,

    /// Show version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: (),

    /// Unexpected non-option arguments (ignored)
    #[arg(hide = true)]
    extra: Vec<String>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // RUST_LOG=debug to see every switch change
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    for arg in &cli.extra {
        tracing::warn!(argument = %arg, "got non-option argument, ignoring");
    }

    let config = SwitchConfig::load(&cli.config)?;
    tracing::debug!(path = %cli.config.display(), ?config, "configuration loaded");

    // Handlers go in before anything is acquired
    let token = CancelToken::on_termination()?;
    install_fault_handlers(Some(&cli.shm_name))?;

    let options = PublisherOptions {
        config,
        lock_file: cli.lock_file,
        channel_name: cli.shm_name,
        gpiochip: cli.gpiochip,
        daemonize: cli.daemon,
    };

    let mut publisher = Publisher::start_gpio(&options)?;
    let outcome = publisher.run(&token);

    publisher.shutdown();
    outcome
}
