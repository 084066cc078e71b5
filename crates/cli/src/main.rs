use std::process::ExitCode;

fn main() -> ExitCode {
    farecast_cli::run()
}
