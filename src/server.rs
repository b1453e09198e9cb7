use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::connection::{Outcome, handle_connection};
use crate::error::RouteError;
use crate::handlers::Handler;
use crate::recorder::Recorder;
use crate::router::Router;
use crate::signals::Signals;

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// The route table plus everything a connection needs while it is served.
///
/// Routes are registered up front; once [`App::serve`] starts the table is
/// read-only.
#[derive(Default)]
pub struct App {
    router: Router,
    recorder: Recorder,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. Patterns are regular expressions matched against the
    /// whole path, in registration order.
    pub fn route(mut self, pattern: &str, handler: impl Handler) -> Result<Self, RouteError> {
        self.router.register(pattern, handler)?;
        Ok(self)
    }

    pub fn with_recorder(mut self, recorder: Recorder) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Serves until SIGTERM or SIGINT arrives.
    pub async fn serve(self, host: &str, port: u16) -> Result<()> {
        let signals = Signals::install().context("installing signal handlers")?;
        let (server, shutdown) = HttpServer::bind((host, port), self).await?;
        info!(addr = %server.local_addr()?, "listening");
        server.listen_until(signals, shutdown).await
    }
}

/// Stops a running [`HttpServer`]. Dropping the handle stops it as well.
#[derive(Debug)]
pub struct ShutdownHandle(oneshot::Sender<()>);

impl ShutdownHandle {
    pub fn trigger(self) {
        self.0.send(()).ok();
    }
}

pub struct HttpServer {
    listener: TcpListener,
    app: App,
    close_conn_rx: oneshot::Receiver<()>,
}

impl HttpServer {
    pub async fn bind(addr: impl ToSocketAddrs, app: App) -> Result<(Self, ShutdownHandle)> {
        let listener = TcpListener::bind(addr).await.context("binding listener")?;
        let (tx, rx) = oneshot::channel::<()>();
        Ok((Self { listener, app, close_conn_rx: rx }, ShutdownHandle(tx)))
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs [`HttpServer::listen`] and stops it on the first signal `signals`
    /// reports.
    pub async fn listen_until(self, mut signals: Signals, shutdown: ShutdownHandle) -> Result<()> {
        tokio::spawn(async move {
            match signals.recv().await {
                Ok(name) => info!(signal = name, "shutdown signal received"),
                Err(e) => error!(cause = %e, "signal handling failed"),
            }
            shutdown.trigger();
        });
        self.listen().await
    }

    /// Accepts connections one at a time and serves each to completion before
    /// accepting the next. Shutdown abandons a connection that is still being
    /// served.
    pub async fn listen(mut self) -> Result<()> {
        let mut failed_accepts = 0;
        loop {
            tokio::select! {
                biased;
                _ = &mut self.close_conn_rx => break,
                result = self.listener.accept() => {
                    let (conn, addr) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            failed_accepts += 1;
                            let delay = accept_backoff(failed_accepts);
                            warn!(cause = %e, attempt = failed_accepts, ?delay, "failed to accept");
                            tokio::select! {
                                biased;
                                _ = &mut self.close_conn_rx => break,
                                _ = tokio::time::sleep(delay) => {}
                            }
                            continue;
                        }
                    };
                    failed_accepts = 0;
                    tokio::select! {
                        biased;
                        _ = &mut self.close_conn_rx => {
                            info!(%addr, "abandoning connection");
                            break;
                        }
                        _ = Self::handle(conn, addr, &self.app) => {}
                    }
                }
            };
        }
        info!("gracefully shutting down server");
        Ok(())
    }

    async fn handle(conn: tokio::net::TcpStream, addr: SocketAddr, app: &App) {
        info!(%addr, "accepted connection");
        match handle_connection(conn, &app.router, &app.recorder).await {
            Ok(Outcome::Responded { status_code }) => info!(%addr, status_code, "terminating connection"),
            Ok(Outcome::Dropped(_)) => info!(%addr, "terminating connection without response"),
            Err(e) => warn!(%addr, cause = %e, "connection error"),
        }
    }
}

/// Delay before retrying after `attempt` consecutive accept failures, doubling
/// from 10ms up to one second.
fn accept_backoff(attempt: u32) -> Duration {
    let base = ACCEPT_BACKOFF_BASE.saturating_mul(1 << attempt.saturating_sub(1).min(16));
    base.min(ACCEPT_BACKOFF_MAX)
}
