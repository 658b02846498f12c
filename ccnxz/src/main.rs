//! `ccnxz`: a CCNx 1.0 publisher (`server`) and consumer (`client`) over a
//! single UDP socket each.
//!
//! Grounded on `original_source/CCNxz/CCNxzGenServer.py` (`CCNxzGenServer`,
//! `ParserThread`, `LookupThread`) and `CCNxzGenClient.py`
//! (`CCNxzGenClient`'s wiring of the flow controller behind the manifest
//! processor).

mod client;
mod error;
mod server;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(name = "ccnxz", about = "CCNx 1.0 publisher/consumer")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve a directory of files under a name prefix.
    Server(server::ServerArgs),
    /// Fetch one file by name from a publisher.
    Client(client::ClientArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let result = match Cli::parse().command {
        Command::Server(args) => server::run(args).await,
        Command::Client(args) => client::run(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ccnxz: {e}");
            ExitCode::from(1)
        }
    }
}
