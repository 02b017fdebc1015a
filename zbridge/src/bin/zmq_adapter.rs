use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing::{error, info};
use zbridge::cli::Args;
use zbridge::core::shutdown::Shutdown;
use zbridge::{dev_tracing, signals, Supervisor};

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
        // --help and --version
        Err(e) => e.exit(),
    };

    dev_tracing::init(args.debug);

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("{}", Args::command().render_usage());
            return ExitCode::FAILURE;
        }
    };

    let (trigger, shutdown) = Shutdown::pair();
    let signals = match signals::install(trigger) {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "[SUPERVISOR] cannot install signal handlers");
            return ExitCode::FAILURE;
        }
    };

    info!(mode = ?config.mode.roles(), framer = %config.framer, "[SUPERVISOR] starting");
    let result = Supervisor::new(config).run(&shutdown);
    signals.close();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if !e.is_fatal() => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "[SUPERVISOR] exiting");
            ExitCode::FAILURE
        }
    }
}
