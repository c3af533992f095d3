use std::process::ExitCode;

fn main() -> ExitCode {
    devteam_cli::run()
}
