// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP client endpoints

use tokio::net::TcpStream;

use crate::connector::Connector;
use crate::error::CommunicationError;
use crate::receiver::StreamReceiver;
use crate::sender::StreamSender;

/// Sender over a connection opened by a [`Connector`].
pub type ClientSender = StreamSender<TcpStream>;

/// Receiver over a connection opened by a [`Connector`].
pub type ClientReceiver = StreamReceiver<TcpStream>;

impl StreamSender<TcpStream> {
    pub async fn connect(connector: &Connector) -> Result<Self, CommunicationError> {
        Ok(Self::new(connector.connect().await?))
    }
}

impl StreamReceiver<TcpStream> {
    pub async fn connect(connector: &Connector) -> Result<Self, CommunicationError> {
        Ok(Self::new(connector.connect().await?))
    }
}
