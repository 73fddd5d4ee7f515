//! plantree - hierarchical project plans from the command line

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = plantree::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
