use std::process::ExitCode;

fn main() -> ExitCode {
    match madym_lite::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mlite: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
