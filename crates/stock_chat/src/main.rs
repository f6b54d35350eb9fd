mod cli;
mod client;
mod config;
mod logging;
mod persistence;
mod render;
mod server;

use crate::cli::{Args, Command, SessionsAction};
use crate::client::GatewayClient;
use crate::config::{GatewayConfig, GatewayOverrides};
use agent::ChatRequest;
use anyhow::Result;
use logging::{setup_logging, setup_logging_for_terminal};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before reading any configuration from the environment
    dotenv::dotenv().ok();

    let args = Args::parse();

    match args.command {
        Command::Serve {
            port,
            agent_url,
            market_url,
            data_dir,
            timeout_secs,
        } => {
            setup_logging(args.verbose);
            let config = GatewayConfig::load(GatewayOverrides {
                port,
                agent_url,
                market_url,
                data_dir,
                timeout_secs,
            })?;
            server::run(config).await
        }

        Command::Ask {
            message,
            symbol,
            session,
            mode,
            profile,
            show_thinking,
            gateway_url,
        } => {
            setup_logging_for_terminal(args.verbose);
            let client = GatewayClient::new(config::gateway_url(gateway_url));
            let request = ChatRequest {
                message: Some(message),
                stock_symbol: symbol,
                session_id: session,
                mode,
                profile,
            };

            let mut stdout = std::io::stdout();
            let store = client::ask(&client, request, show_thinking, &mut stdout).await?;
            if let Some(error) = store.error() {
                anyhow::bail!("{error}");
            }
            Ok(())
        }

        Command::Sessions {
            action,
            gateway_url,
        } => {
            setup_logging_for_terminal(args.verbose);
            let client = GatewayClient::new(config::gateway_url(gateway_url));
            let mut stdout = std::io::stdout();
            match action {
                SessionsAction::List => {
                    let sessions = client.list_sessions().await?;
                    client::print_sessions(&sessions, &mut stdout)
                }
                SessionsAction::New => {
                    let session = client.create_session().await?;
                    println!("{}", serde_json::to_string_pretty(&session)?);
                    Ok(())
                }
                SessionsAction::Show { id, show_thinking } => {
                    client::show_session(&client, &id, show_thinking, &mut stdout).await
                }
            }
        }

        Command::History { gateway_url } => {
            setup_logging_for_terminal(args.verbose);
            let client = GatewayClient::new(config::gateway_url(gateway_url));
            let records = client.history().await?;
            client::print_history(&records, &mut std::io::stdout())
        }
    }
}
