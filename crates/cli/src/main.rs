use std::process::ExitCode;

fn main() -> ExitCode {
    codbot_cli::run()
}
