mod adapters;
mod cli;
mod logging;

use clap::Parser;

use crate::cli::Args;

fn main() -> std::io::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level);
    adapters::bridge::run(args)
}
