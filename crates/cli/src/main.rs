use std::process::ExitCode;

fn main() -> ExitCode {
    issuepilot_cli::run()
}
