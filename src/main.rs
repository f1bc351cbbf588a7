use std::{path::PathBuf, time::Duration};

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use chatserver::{config, error, server, types::StateMode};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the relay server
    Serve(ServeOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct ServeOptions {
    /// Address to listen on (overrides SERVER_ADDRESS)
    #[clap(long)]
    pub address: Option<String>,

    /// Load environment from this file instead of the default locations
    #[clap(long)]
    pub env_file: Option<PathBuf>,

    /// Only accept OAuth callbacks carrying a state issued by /login
    #[clap(long)]
    pub strict_state: bool,

    /// Close websocket sessions idle for this many seconds (0 disables)
    #[clap(long)]
    pub ws_idle_timeout: Option<u64>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(opt) => {
            if let Err(e) = config::load_env(opt.env_file.as_deref()).await {
                error!("Cannot load environment. Err: {}", e);
            }

            let mut config = match config::Config::from_env() {
                Ok(config) => config,
                Err(e) => error!("Invalid configuration. Err: {}", e),
            };

            if let Some(address) = opt.address {
                config.server_address = address;
            }
            if opt.strict_state {
                config.state_mode = StateMode::Strict;
            }
            if let Some(secs) = opt.ws_idle_timeout {
                config.ws_idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
            }

            if let Err(e) = server::start_api_server(config).await {
                error!("Server failed. Err: {}", e);
            }
        }
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
