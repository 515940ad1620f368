use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_env("DEPSCAN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .without_time()
        .with_target(false)
        .init();

    let exit_code = match depscan::run::run() {
        Ok(code) => code,
        Err(err) => {
            println!("depscan: error: {}", err);
            1
        }
    };
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
