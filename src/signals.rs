//! OS termination signals.
//!
//! Handlers are installed up front so a failure surfaces before the server
//! binds. Receiving a signal only reports it; stopping the accept loop is the
//! caller's job.

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

pub struct Signals {
    #[cfg(unix)]
    terminate: Signal,
}

impl Signals {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Resolves with the name of the first SIGTERM or SIGINT received.
    pub async fn recv(&mut self) -> std::io::Result<&'static str> {
        #[cfg(unix)]
        let terminate = async {
            self.terminate.recv().await;
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            res = tokio::signal::ctrl_c() => res.map(|_| "SIGINT"),
            _ = terminate => Ok("SIGTERM"),
        }
    }
}
