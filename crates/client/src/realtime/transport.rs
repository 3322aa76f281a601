// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for the realtime socket.
//!
//! The connection loop drives a [`Transport`]; production uses
//! [`WebSocketTransport`], tests use a scripted mock.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use till_core::CloseSignal;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Close code reported when the peer closed without a status.
const NO_STATUS_RECEIVED: u16 = 1005;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The server answered the upgrade request with an HTTP error.
    #[error("handshake rejected with HTTP {status}")]
    HandshakeRejected { status: u16 },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// What the socket produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(String),
    Pong,
    /// The connection ended. Transport errors surface as an abnormal closure.
    Closed(CloseSignal),
}

pub trait Transport: Send + Sync {
    /// Opens the socket, presenting `access_token` as a bearer credential.
    fn connect<'a>(&'a mut self, url: &'a str, access_token: &'a str) -> TransportFuture<'a, ()>;

    fn disconnect(&mut self) -> TransportFuture<'_, ()>;

    fn send_text(&mut self, text: String) -> TransportFuture<'_, ()>;

    fn ping(&mut self) -> TransportFuture<'_, ()>;

    /// Waits for the next event. Fails with `ConnectionClosed` if not connected.
    fn recv(&mut self) -> TransportFuture<'_, TransportEvent>;

    fn is_connected(&self) -> bool;
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct WebSocketConnection {
    sink: SplitSink<Socket, Message>,
    stream: SplitStream<Socket>,
}

/// WebSocket transport using tokio-tungstenite.
#[derive(Default)]
pub struct WebSocketTransport {
    ws: Option<WebSocketConnection>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    async fn write(&mut self, message: Message) -> TransportResult<()> {
        let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;
        if let Err(e) = ws.sink.send(message).await {
            self.ws = None;
            return Err(TransportError::SendFailed(e.to_string()));
        }
        Ok(())
    }
}

impl Transport for WebSocketTransport {
    fn connect<'a>(&'a mut self, url: &'a str, access_token: &'a str) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            let mut request = url
                .into_client_request()
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            let bearer = HeaderValue::from_str(&format!("Bearer {access_token}"))
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, bearer);

            let (socket, _) = tokio_tungstenite::connect_async(request).await.map_err(|e| match e {
                tungstenite::Error::Http(response) => TransportError::HandshakeRejected {
                    status: response.status().as_u16(),
                },
                other => TransportError::ConnectionFailed(other.to_string()),
            })?;

            let (sink, stream) = socket.split();
            self.ws = Some(WebSocketConnection { sink, stream });
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(mut ws) = self.ws.take() {
                let _ = ws.sink.close().await;
            }
            Ok(())
        })
    }

    fn send_text(&mut self, text: String) -> TransportFuture<'_, ()> {
        Box::pin(self.write(Message::Text(text.into())))
    }

    fn ping(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(self.write(Message::Ping(Default::default())))
    }

    fn recv(&mut self) -> TransportFuture<'_, TransportEvent> {
        Box::pin(async move {
            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;
            loop {
                match ws.stream.next().await {
                    Some(Ok(Message::Text(text))) => return Ok(TransportEvent::Message(text.to_string())),
                    Some(Ok(Message::Pong(_))) => return Ok(TransportEvent::Pong),
                    Some(Ok(Message::Close(frame))) => {
                        self.ws = None;
                        let signal = frame.map_or_else(
                            || CloseSignal::new(NO_STATUS_RECEIVED, ""),
                            |f| CloseSignal::new(u16::from(f.code), f.reason.to_string()),
                        );
                        return Ok(TransportEvent::Closed(signal));
                    }
                    // Pings are answered by tungstenite; binary frames are not part of the protocol.
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "socket error");
                        self.ws = None;
                        return Ok(TransportEvent::Closed(CloseSignal::abnormal()));
                    }
                    None => {
                        self.ws = None;
                        return Ok(TransportEvent::Closed(CloseSignal::abnormal()));
                    }
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.ws.is_some()
    }
}
