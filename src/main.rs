//! CLI binary for `todo_assistant`.
//!
//! This binary is a thin wrapper that parses arguments and delegates to the library.

use clap::Parser;
use std::process::ExitCode;
use todo_assistant::cli::{run, Cli};
use todo_assistant::logging;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_stderr(if cli.verbose { "debug" } else { logging::DEFAULT_LEVEL });

    let output = run(cli);

    for msg in output.stdout {
        println!("{msg}");
    }
    for msg in output.stderr {
        eprintln!("{msg}");
    }

    output.exit_code
}
