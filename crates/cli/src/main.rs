use std::process::ExitCode;

fn main() -> ExitCode {
    platano_cli::run()
}
