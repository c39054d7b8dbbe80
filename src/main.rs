use clap::Parser;
use watermark::{cli, logger};

fn main() -> std::process::ExitCode {
    // Run log (overwrites the previous run's log)
    logger::init();

    let args = cli::CliArgs::parse();
    cli::run(args)
}
