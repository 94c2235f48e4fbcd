#[macro_use]
extern crate log;

use std::process::ExitCode;

use clap::Parser;
use log::Level;
use utils::results_uploader::{ResultHandler, ResultIgnorer, ResultsUploader};

mod config;
mod experiments;
mod utils;

/// Run both Cognac variants and report the one that forgets best
///
/// Every option of the shared training configuration is forwarded to
/// `hp_tune.py` and `main.py`, with `--unlearning_model` set per variant.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    config: config::ExperimentConfig,

    #[command(flatten)]
    control: experiments::cognac_best::ControlArgs,
}

fn main() -> anyhow::Result<ExitCode> {
    // init logging
    simple_logger::init_with_level(Level::Info)?;

    // parse command line arguments
    let args = Args::parse();

    // results handler
    let handler: Box<dyn ResultHandler> = match &args.control.push_results_url {
        Some(url) => Box::new(ResultsUploader::new(url.clone())),
        None => Box::new(ResultIgnorer::new()),
    };

    match experiments::cognac_best::run(&args.config, &args.control, handler.as_ref()) {
        Some(_) => Ok(ExitCode::SUCCESS),
        None => Ok(ExitCode::FAILURE),
    }
}
