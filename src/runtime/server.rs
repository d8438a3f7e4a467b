//! Server runtime: control thread plus TX thread.
//!
//! # Architecture
//!
//! The server spawns two threads:
//! - **Control thread**: owns the command socket, parses CONNECT/DISCONNECT
//!   messages, sends handshake acknowledgements, updates the target slot.
//! - **TX thread**: reads the target slot on a fixed period and, while a
//!   target is set, sends one sine sample per tick from the data socket.
//!
//! The threads share exactly two things: the [`TargetSlot`] and the stop
//! flag. The data socket is shared as well (`Arc`; UDP sockets are
//! thread-safe for concurrent sends) so the control thread can send
//! acknowledgements from the same source port the samples come from.
//!
//! # Example
//!
//! ```no_run
//! use sinestream::{Server, ServerConfig};
//!
//! let server = Server::spawn(ServerConfig::default())?;
//! // ... serve until told otherwise ...
//! server.shutdown();
//! # Ok::<(), sinestream::ServerError>(())
//! ```

mod control_thread;
mod tx_thread;

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::net::{Endpoint, UdpSocket};
use crate::sample::SineWave;
use crate::sync::TargetSlot;

use control_thread::ControlThread;
use tx_thread::{SendRate, TxThread};

/// Default control port, shared with the client-side tooling.
pub const DEFAULT_CMD_PORT: u16 = 47268;

/// Bounded wait when joining a thread at shutdown.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the control socket to.
    pub bind_addr: Endpoint,
    /// Frequency of the generated sine wave, in Hz.
    pub sine_freq_hz: f64,
    /// Sample send rate in Hz; clamped to [1, 200] at spawn.
    pub send_rate_hz: f64,
    /// Amplitude of the generated sine wave.
    pub amplitude: f64,
    /// Variable name tagged onto each sample line.
    pub var_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: Endpoint::any(DEFAULT_CMD_PORT),
            sine_freq_hz: 1.0,
            send_rate_hz: 30.0,
            amplitude: 1.0,
            var_name: "sin".to_string(),
        }
    }
}

/// Error spawning the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind the control socket. Fatal: nothing to serve without it.
    #[error("failed to bind control socket: {0}")]
    Bind(#[source] io::Error),
    /// Failed to set up the data socket or the readiness poll.
    #[error("I/O setup failed: {0}")]
    Io(#[from] io::Error),
    /// Invalid configuration (CLI surface).
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Handle to a running server.
///
/// Dropping the handle signals the threads to stop but does not wait for
/// them. Use [`Server::shutdown`] for a graceful stop with a bounded join.
pub struct Server {
    stop_flag: Arc<AtomicBool>,
    cmd_addr: Endpoint,
    control_handle: Option<JoinHandle<()>>,
    tx_handle: Option<JoinHandle<()>>,
}

impl Server {
    /// Binds both sockets and spawns the control and TX threads.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the control port cannot be bound
    /// (e.g., address in use) and [`ServerError::Io`] if the data socket or
    /// the poll registration fails. No recovery is attempted.
    ///
    /// # Panics
    ///
    /// Panics if thread spawning fails.
    pub fn spawn(config: ServerConfig) -> Result<Self, ServerError> {
        let cmd_socket = UdpSocket::bind(config.bind_addr).map_err(|e| {
            error!(bind_addr = %config.bind_addr, error = %e, "failed to bind control socket");
            ServerError::Bind(e)
        })?;
        let cmd_addr = cmd_socket.local_addr().map_err(ServerError::Io)?;

        // Replies and samples both leave from this socket, so the client
        // sees one consistent server source port on the data plane.
        let data_socket = Arc::new(UdpSocket::bind(Endpoint::any(0)).map_err(ServerError::Io)?);

        let stop_flag = Arc::new(AtomicBool::new(false));
        let target = TargetSlot::new();

        info!(
            cmd_addr = %cmd_addr,
            sine_freq_hz = config.sine_freq_hz,
            send_rate_hz = config.send_rate_hz,
            amplitude = config.amplitude,
            var_name = %config.var_name,
            "server starting"
        );

        let mut tx = TxThread::new(
            Arc::clone(&data_socket),
            target.clone(),
            SineWave::new(config.amplitude, config.sine_freq_hz),
            config.var_name.clone(),
            SendRate::clamped(config.send_rate_hz),
            Arc::clone(&stop_flag),
        );
        debug!("spawning TX thread");
        let tx_handle = thread::Builder::new()
            .name("sinestream-tx".into())
            .spawn(move || {
                debug!("TX thread started");
                tx.run();
                debug!("TX thread exiting");
            })
            .expect("failed to spawn TX thread");

        let mut control = ControlThread::new(
            cmd_socket,
            data_socket,
            target,
            cmd_addr.port(),
            Arc::clone(&stop_flag),
        )?;
        debug!("spawning control thread");
        let control_handle = thread::Builder::new()
            .name("sinestream-control".into())
            .spawn(move || {
                debug!("control thread started");
                control.run();
                debug!("control thread exiting");
            })
            .expect("failed to spawn control thread");

        Ok(Self {
            stop_flag,
            cmd_addr,
            control_handle: Some(control_handle),
            tx_handle: Some(tx_handle),
        })
    }

    /// The bound control address. With a port-0 bind this carries the port
    /// the OS assigned.
    #[must_use]
    pub fn cmd_addr(&self) -> Endpoint {
        self.cmd_addr
    }

    /// Returns a clone of the stop flag for external signal handling.
    #[must_use]
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_flag)
    }

    /// Initiates a graceful stop and joins both threads with a bounded
    /// wait. Sockets close when the threads drop them.
    pub fn shutdown(mut self) {
        info!("server shutdown initiated");
        self.stop_flag.store(true, Ordering::Relaxed);

        if let Some(handle) = self.control_handle.take() {
            join_bounded(handle, JOIN_TIMEOUT, "control");
        }
        if let Some(handle) = self.tx_handle.take() {
            join_bounded(handle, JOIN_TIMEOUT, "tx");
        }

        info!("server shutdown complete");
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        // Signal-only: shutdown() is the graceful path with joins.
        self.stop_flag.store(true, Ordering::Relaxed);
    }
}

/// Joins a thread, giving up after `timeout` and detaching it.
fn join_bounded(handle: JoinHandle<()>, timeout: Duration, name: &str) {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!(thread = name, "join timed out, detaching");
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    if handle.join().is_err() {
        warn!(thread = name, "thread panicked before shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            bind_addr: Endpoint::localhost(0),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn spawn_assigns_ephemeral_port() {
        let server = Server::spawn(test_config()).unwrap();
        assert_ne!(server.cmd_addr().port(), 0);
        server.shutdown();
    }

    #[test]
    fn shutdown_joins_promptly() {
        let server = Server::spawn(test_config()).unwrap();
        let started = Instant::now();
        server.shutdown();
        // Both loops re-check the stop flag at sub-second intervals.
        assert!(started.elapsed() < JOIN_TIMEOUT);
    }

    #[test]
    fn bind_conflict_is_fatal() {
        let first = Server::spawn(test_config()).unwrap();
        let conflicting = ServerConfig {
            bind_addr: first.cmd_addr(),
            ..ServerConfig::default()
        };
        match Server::spawn(conflicting).map(|s| s.shutdown()) {
            Err(ServerError::Bind(_)) => {}
            Ok(()) => panic!("second bind unexpectedly succeeded"),
            Err(e) => panic!("expected bind error, got {e}"),
        }
        first.shutdown();
    }
}
