use clap::Parser;
use dualmom::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
