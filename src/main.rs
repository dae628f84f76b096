use clap::Parser;
use cli::{Cli, Command};
use tracing::Level;

// executable-specific modules
mod cli;
mod driver;

pub fn interface() -> driver::Result {
    let Cli { verbose, command } = Cli::parse();
    init_tracing(verbose);

    match command {
        Command::Check { input } => driver::check(&input),
        Command::Build { input, root } => driver::build(&input, &root),
        Command::Types { input } => driver::types(&input),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    match interface() {
        Ok(()) => (),
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    }
}
