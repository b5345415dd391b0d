use std::process::ExitCode;

fn main() -> ExitCode {
    bakehouse_cli::run()
}
