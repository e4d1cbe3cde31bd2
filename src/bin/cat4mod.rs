//! cat4mod - print the DIP switch state published by modswitchd

use clap::{ArgAction, Parser};
use modswitch::config::{parse_delay_us, parse_target};
use modswitch::reader::DEFAULT_POLL_DELAY_US;
use modswitch::signal::install_fault_handlers;
use modswitch::{CancelToken, ReadMode, Reader, Result, SwitchState, DEFAULT_CHANNEL_NAME};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "cat4mod")]
#[command(about = "Read the 2-position DIP switch state published by modswitchd", long_about = None)]
#[command(version, disable_version_flag = true)]
struct Cli {
    /// Loop until the state changes
    #[arg(short = 'l', long = "loop")]
    loop_until: bool,

    /// With -l, loop until the state equals this char instead
    #[arg(short = 'c', long = "char", value_name = "CHAR", value_parser = parse_target)]
    target: Option<SwitchState>,

    /// Delay in µs between reads
    #[arg(
        short = 's',
        long = "delay",
        value_name = "US",
        value_parser = parse_delay_us,
        default_value_t = DEFAULT_POLL_DELAY_US
    )]
    delay_us: u64,

    /// Shared memory object to read
    #[arg(long, value_name = "NAME", default_value = DEFAULT_CHANNEL_NAME)]
    shm_name: String,

    /// Show version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: (),
}

impl Cli {
    fn mode(&self) -> ReadMode {
        match (self.loop_until, self.target) {
            (false, _) => ReadMode::Single,
            (true, Some(target)) => ReadMode::UntilState(target),
            (true, None) => ReadMode::UntilChange,
        }
    }
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

    // Quiet by default: stdout carries only the state
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(state) => {
            println!("{state}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<SwitchState> {
    install_fault_handlers(None)?;

    let mode = cli.mode();
    let cancel = match mode {
        ReadMode::Single => CancelToken::new(),
        _ => CancelToken::on_termination()?,
    };

    let reader = Reader::attach(&cli.shm_name)?;
    match mode {
        ReadMode::Single => reader.read(),
        _ => reader.wait(mode, Duration::from_micros(cli.delay_us), &cancel),
    }
}
