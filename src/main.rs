use clap::Parser;
use std::io::BufReader;
use std::sync::Once;
use storage_reduce::config::{CliArgs, ReducerConfig};
use storage_reduce::driver;
use storage_reduce::error::fatal;

static INIT_TRACING: Once = Once::new();

fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(std::io::stderr).try_init();
    });
}

fn main() {
    init_tracing();

    let args = CliArgs::parse();
    let config = match ReducerConfig::from_cli(args) {
        Ok(config) => config,
        Err(e) => fatal(e),
    };

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let input = BufReader::new(stdin.lock());
    let output = stdout.lock();

    match driver::run(input, output, &config) {
        Ok(_) => {}
        Err(e) => fatal(e),
    }
}
