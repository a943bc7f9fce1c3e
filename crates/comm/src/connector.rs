// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound TCP connections

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use drover_wire::ConnectionType;
use tokio::net::{lookup_host, TcpStream};
use tracing::debug;

use crate::error::CommunicationError;

/// Opens TCP connections of one [`ConnectionType`] to one address.
///
/// Every stream returned by [`connect`](Connector::connect) has already had
/// its connection-type tag written.
#[derive(Debug, Clone)]
pub struct Connector {
    host: String,
    port: u16,
    connection_type: ConnectionType,
    connect_timeout: Option<Duration>,
}

impl Connector {
    pub fn new(host: impl Into<String>, port: u16, connection_type: ConnectionType) -> Self {
        Self { host: host.into(), port, connection_type, connect_timeout: None }
    }

    drover_core::setters! {
        option { connect_timeout: Duration }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    /// Resolve, connect, and write the connection-type tag.
    ///
    /// Resolved addresses are tried in order; the last failure is returned.
    pub async fn connect(&self) -> Result<TcpStream, CommunicationError> {
        let address = self.address();
        let addrs: Vec<SocketAddr> = lookup_host(&address)
            .await
            .map_err(|source| CommunicationError::Resolve { address: address.clone(), source })?
            .collect();
        if addrs.is_empty() {
            return Err(CommunicationError::Resolve {
                address,
                source: io::Error::new(io::ErrorKind::NotFound, "no addresses"),
            });
        }

        let mut last_error = None;
        for addr in addrs {
            match self.connect_addr(addr).await {
                Ok(mut stream) => {
                    stream
                        .set_nodelay(true)
                        .map_err(|source| CommunicationError::Connect { address: address.clone(), source })?;
                    self.connection_type.write_to(&mut stream).await?;
                    debug!("connected to {} ({}) as {}", address, addr, self.connection_type);
                    return Ok(stream);
                }
                Err(e) => {
                    debug!("connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }
        Err(CommunicationError::Connect {
            address,
            source: last_error
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses")),
        })
    }

    async fn connect_addr(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        match self.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, TcpStream::connect(addr))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))?,
            None => TcpStream::connect(addr).await,
        }
    }
}

#[cfg(test)]
#[path = "connector_tests.rs"]
mod tests;
