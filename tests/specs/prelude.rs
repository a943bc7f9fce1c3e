// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness: a console with agents on loopback ports.

#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

pub use drover_comm::Connector;
pub use drover_core::{Message, ProcessState, ThreadCounter, WorkerIdentity};
pub use drover_daemon::{send_control, Agent, Config, Console};
pub use drover_sync::{Barrier, WaitOutcome, WorkerContext};
pub use drover_wire::ConnectionType;

/// Generous bound for anything that should happen promptly.
pub const PROMPT: Duration = Duration::from_secs(5);

pub fn config(console_port: u16, use_console: bool) -> Config {
    Config {
        console_host: "127.0.0.1".to_string(),
        console_bind: "127.0.0.1".to_string(),
        console_port,
        agent_port: 0,
        connect_timeout: Duration::from_secs(2),
        handshake_timeout: Duration::from_secs(2),
        use_console,
        log_dir: None,
        log_filter: "info".to_string(),
    }
}

/// Fail the test if `future` does not finish promptly.
pub async fn prompt<F: Future>(what: &str, future: F) -> F::Output {
    match tokio::time::timeout(PROMPT, future).await {
        Ok(output) => output,
        Err(_) => panic!("timed out: {what}"),
    }
}

pub async fn eventually(what: &str, check: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + PROMPT;
    while !check() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// A console and its agents.
pub struct Cluster {
    pub console: Console,
    pub agents: Vec<Agent>,
}

impl Cluster {
    pub async fn start(agents: usize, wait_for_start: bool) -> Self {
        let console = Console::start(&config(0, true)).await.unwrap();
        let port = console.local_addr().port();
        let mut started = Vec::with_capacity(agents);
        for _ in 0..agents {
            started.push(Agent::start(&config(port, true), wait_for_start).await.unwrap());
        }
        eventually("agents to join the console", || console.agents() == agents).await;
        Self { console, agents: started }
    }

    pub fn console_port(&self) -> u16 {
        self.console.local_addr().port()
    }

    /// Start worker `n` under agent `agent`.
    pub async fn worker(&self, agent: usize, n: u32) -> WorkerContext {
        let identity = WorkerIdentity::new("e2e", agent as u32, n);
        connect_worker(&self.agents[agent], self.console_port(), identity).await
    }

    /// Wait until every agent serves `per_agent` workers.
    pub async fn workers_joined(&self, per_agent: usize) {
        eventually("workers to join their agents", || self.agents.iter().all(|a| a.workers() == per_agent)).await;
    }

    /// Wait until the console counts `capacity` barriers named `name`.
    pub async fn barriers_registered(&self, name: &str, capacity: u64) {
        let coordinator = self.console.coordinator();
        eventually("barriers to register", || coordinator.snapshot(name).map(|(c, _)| c) == Some(capacity)).await;
    }

    pub async fn shutdown(self) {
        for agent in &self.agents {
            agent.shutdown().await;
        }
        self.console.shutdown().await;
    }
}

pub async fn connect_worker(agent: &Agent, console_port: u16, identity: WorkerIdentity) -> WorkerContext {
    let to_agent = Connector::new("127.0.0.1", agent.local_addr().port(), ConnectionType::Worker);
    let to_console = Connector::new("127.0.0.1", console_port, ConnectionType::Report);
    WorkerContext::connect(identity, &to_agent, &to_console, ThreadCounter::new()).await.unwrap()
}
