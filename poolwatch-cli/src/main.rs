use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

mod board;
mod config;
mod dashboard;
#[cfg(test)]
mod status_server;
mod watch;

#[derive(Parser)]
#[command(name = "poolwatch")]
#[command(about = "Live pool size monitor for a conductor status endpoint")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: config::GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Long-poll the status endpoint and print pool sizes as they change
    Watch {
        #[command(flatten)]
        poll: config::PollArgs,
    },
    /// Long-poll the status endpoint and serve live charts over HTTP
    Serve {
        #[command(flatten)]
        poll: config::PollArgs,
        /// Dashboard bind address
        #[arg(short, long)]
        bind: Option<std::net::SocketAddr>,
    },
    /// Fetch the current status once and print the raw response
    Status {
        #[command(flatten)]
        poll: config::PollArgs,
    },
}

fn init_tracing(verbose: u8, json: bool) {
    let default = if verbose > 0 {
        "poolwatch=debug,poolwatch_client=debug,poolwatch_common=debug"
    } else {
        "poolwatch=info,poolwatch_client=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose, cli.global.log_json);

    let result = match &cli.command {
        Commands::Watch { poll } => watch::handle_watch(&cli.global, poll).await,
        Commands::Serve { poll, bind } => dashboard::handle_serve(&cli.global, poll, *bind).await,
        Commands::Status { poll } => watch::handle_status(&cli.global, poll).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
