use agent::{AnalysisMode, RiskProfile};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP gateway
    Serve {
        /// Port to listen on [env: PORT]
        #[arg(long)]
        port: Option<u16>,

        /// Base URL of the AI agent service [env: AI_AGENT_URL]
        #[arg(long)]
        agent_url: Option<String>,

        /// Base URL of the market data provider [env: MARKET_DATA_URL]
        #[arg(long)]
        market_url: Option<String>,

        /// Directory for the message log [env: STOCK_CHAT_DATA_DIR]
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Upper bound for one agent response, in seconds [env: AGENT_TIMEOUT_SECS]
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Send one message through the gateway and print the answer
    Ask {
        /// The question to ask
        message: String,

        /// Stock symbol to focus on
        #[arg(short, long)]
        symbol: Option<String>,

        /// Continue an existing agent session
        #[arg(long)]
        session: Option<String>,

        #[arg(long)]
        mode: Option<AnalysisMode>,

        #[arg(long)]
        profile: Option<RiskProfile>,

        /// Print the full reasoning block instead of a summary line
        #[arg(long)]
        show_thinking: bool,

        /// Gateway base URL [env: GATEWAY_URL]
        #[arg(long)]
        gateway_url: Option<String>,
    },

    /// Manage agent chat sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,

        /// Gateway base URL [env: GATEWAY_URL]
        #[arg(long, global = true)]
        gateway_url: Option<String>,
    },

    /// Print the stored message log
    History {
        /// Gateway base URL [env: GATEWAY_URL]
        #[arg(long)]
        gateway_url: Option<String>,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum SessionsAction {
    /// List all sessions
    List,
    /// Create a new session
    New,
    /// Show the messages of one session
    Show {
        id: String,

        #[arg(long)]
        show_thinking: bool,
    },
}

/// Define the application arguments
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl Args {
    pub fn parse() -> Self {
        <Args as Parser>::parse()
    }
}
