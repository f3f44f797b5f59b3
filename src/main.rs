use bazaar::cli::{parse_args, run_cli_command, CliCommand, USAGE, VERSION};

use color_eyre::Result;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let command = match parse_args(std::env::args()) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("bazaar: {}\n\n{}", message, USAGE);
            std::process::exit(2);
        }
    };

    // Handle --version before any initialization
    if command == CliCommand::Version {
        println!("bazaar {}", VERSION);
        return Ok(());
    }

    color_eyre::install()?;
    init_tracing();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_cli_command(command))
}
