use std::process::ExitCode;

use ownergraph::ui::output;

fn main() -> ExitCode {
    match ownergraph::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
