//! Broker server listener
//!
//! Handles the TCP accept loop, spawns a session per connection and drains
//! sessions on shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::registry::SubscriberRegistry;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::stats::SessionStats;

/// Publish/subscribe broker server
pub struct BrokerServer {
    config: ServerConfig,
    listener: TcpListener,
    registry: Arc<SubscriberRegistry>,
    next_session_id: AtomicU64,
}

impl BrokerServer {
    /// Bind the listening socket
    ///
    /// Binding to port 0 picks an ephemeral port; see [`local_addr`](Self::local_addr).
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;

        Ok(Self {
            config,
            listener,
            registry: Arc::new(SubscriberRegistry::new()),
            next_session_id: AtomicU64::new(1),
        })
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Address the listener is actually bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server until the process is stopped
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server until interrupted with Ctrl-C
    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to install Ctrl-C handler");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run the server with graceful shutdown
    ///
    /// When `shutdown` completes, every session is cancelled and given
    /// `shutdown_timeout` to finish its teardown before being aborted. The
    /// listening socket is released when this returns.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        tracing::info!(addr = %addr, "Broker listening");

        let token = CancellationToken::new();
        let mut sessions = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => {
                        self.handle_connection(socket, peer_addr, &token, &mut sessions);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                    }
                },
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    log_session_exit(joined);
                }
            }
        }

        self.shutdown_sessions(token, sessions).await;
        drop(self.listener);
        tracing::info!(addr = %addr, "Broker stopped");

        Ok(())
    }

    fn handle_connection(
        &self,
        socket: TcpStream,
        peer_addr: SocketAddr,
        token: &CancellationToken,
        sessions: &mut JoinSet<SessionStats>,
    ) {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        let registry = Arc::clone(&self.registry);
        let token = token.child_token();

        sessions.spawn(async move {
            let connection = Connection::from_tcp(session_id, socket, peer_addr, registry);
            connection.run(token).await
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }

    async fn shutdown_sessions(&self, token: CancellationToken, mut sessions: JoinSet<SessionStats>) {
        token.cancel();

        let active = sessions.len();
        if active == 0 {
            return;
        }
        tracing::info!(sessions = active, "Waiting for sessions to close");

        let drain = async {
            while let Some(joined) = sessions.join_next().await {
                log_session_exit(joined);
            }
        };

        if tokio::time::timeout(self.config.shutdown_timeout, drain)
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = sessions.len(),
                timeout_ms = self.config.shutdown_timeout.as_millis() as u64,
                "Sessions did not close in time, aborting"
            );
            sessions.shutdown().await;
        }
    }
}

fn log_session_exit(joined: std::result::Result<SessionStats, JoinError>) {
    match joined {
        Ok(stats) => {
            tracing::debug!(
                messages = stats.messages_routed,
                bytes = stats.bytes_routed,
                duration_ms = stats.duration.as_millis() as u64,
                "Session task finished"
            );
        }
        Err(e) if e.is_panic() => {
            tracing::error!(error = %e, "Session task panicked");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Session task aborted");
        }
    }
}
