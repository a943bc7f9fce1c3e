// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! droverd: console and agent processes

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use drover_comm::Connector;
use drover_core::Message;
use drover_daemon::{logging, send_control, Agent, Config, Console};
use drover_wire::ConnectionType;
use tracing::info;

#[derive(Parser)]
#[command(name = "droverd", version, about = "Drover console and agent daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Coordinate barriers and broadcast control to agents
    Console,
    /// Relay console control to the workers on this host
    Agent {
        /// Tell workers to wait for `start` before running
        #[arg(long)]
        wait_for_start: bool,
    },
    /// Ask the console to broadcast a control message
    Send {
        #[arg(value_enum)]
        control: Control,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Control {
    Start,
    Reset,
    Stop,
}

impl From<Control> for Message {
    fn from(control: Control) -> Self {
        match control {
            Control::Start => Message::Start,
            Control::Reset => Message::Reset,
            Control::Stop => Message::Stop,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Command::Console => {
            let _guard = logging::init(&config, "console")?;
            let console = Console::start(&config).await?;
            tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
            info!("interrupted");
            console.shutdown().await;
        }
        Command::Agent { wait_for_start } => {
            let _guard = logging::init(&config, "agent")?;
            let agent = Agent::start(&config, wait_for_start).await?;
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal.context("waiting for ctrl-c")?;
                    info!("interrupted");
                }
                _ = agent.console_closed() => info!("console connection closed"),
            }
            agent.shutdown().await;
        }
        Command::Send { control } => {
            let _guard = logging::init(&config, "send")?;
            let connector = Connector::new(&config.console_host, config.console_port, ConnectionType::ConsoleClient)
                .connect_timeout(config.connect_timeout);
            let message = Message::from(control);
            send_control(&connector, &message)
                .await
                .with_context(|| format!("sending {} to {}", message.kind(), connector.address()))?;
        }
    }
    Ok(())
}
