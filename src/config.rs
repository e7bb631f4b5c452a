use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;

use crate::models::MatchInput;

/// Live chase win-probability service for T20 cricket
#[derive(Parser, Debug, Clone)]
#[command(name = "chase-winprob", version, about)]
pub struct Config {
    /// Path to the JSON classifier model file
    #[arg(
        long,
        env = "MODEL_PATH",
        default_value = "models/win_model.json",
        global = true
    )]
    pub model_path: String,

    /// API listen address
    #[arg(
        long,
        env = "API_ADDR",
        default_value = "0.0.0.0:8080",
        global = true
    )]
    pub addr: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the prediction API (default)
    Serve,
    /// Predict a single match state and print the result as JSON
    Predict(PredictArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PredictArgs {
    #[arg(long)]
    pub batting_team: String,

    #[arg(long)]
    pub bowling_team: String,

    #[arg(long, default_value = "")]
    pub venue: String,

    /// Runs required to win (first-innings score + 1)
    #[arg(long)]
    pub target: i32,

    #[arg(long)]
    pub current_score: i32,

    /// Overs bowled so far, e.g. 12.0
    #[arg(long)]
    pub overs_completed: f64,

    #[arg(long, default_value = "0")]
    pub wickets_out: i32,
}

impl From<PredictArgs> for MatchInput {
    fn from(args: PredictArgs) -> Self {
        MatchInput {
            batting_team: args.batting_team,
            bowling_team: args.bowling_team,
            venue: args.venue,
            target: args.target,
            current_score: args.current_score,
            overs_completed: args.overs_completed,
            wickets_out: args.wickets_out,
        }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.model_path.trim().is_empty() {
            anyhow::bail!("MODEL_PATH must not be empty");
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.addr
            .parse()
            .map_err(|_| anyhow::anyhow!("API_ADDR '{}' is not a valid socket address", self.addr))
    }

    /// The subcommand to run; `serve` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}
