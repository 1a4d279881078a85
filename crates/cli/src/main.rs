use std::process::ExitCode;

fn main() -> ExitCode {
    carlot_cli::run()
}
