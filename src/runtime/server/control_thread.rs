//! Control thread runtime.
//!
//! Responsibilities:
//! - Own the command socket and its readiness poll.
//! - Parse CONNECT/DISCONNECT messages; ignore everything else.
//! - Send handshake acknowledgements from the shared data socket.
//! - Keep the target slot current (last CONNECT wins, DISCONNECT clears).

use std::io::{self, ErrorKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mio::{Events, Interest, Poll, Token};
use tracing::{debug, info, trace, warn};

use crate::net::{Endpoint, UdpSocket, outbound_ip};
use crate::protocol::{ControlMessage, ControlReply, ParseError};
use crate::sync::TargetSlot;

const CMD_TOKEN: Token = Token(0);

/// Readiness wait per loop iteration; bounds how long a stop request can go
/// unnoticed.
const RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// Control messages are short text lines; anything bigger is truncated.
const MAX_CONTROL_DATAGRAM: usize = 4096;

/// Control thread state and event loop.
pub struct ControlThread {
    socket: UdpSocket,
    poll: Poll,
    events: Events,
    /// Shared with the TX thread; acknowledgements leave from here so the
    /// client sees the data-plane source port.
    data_socket: Arc<UdpSocket>,
    target: TargetSlot,
    cmd_port: u16,
    stop_flag: Arc<AtomicBool>,
    recv_buf: Vec<u8>,
}

impl ControlThread {
    /// Creates the control thread state, registering the command socket
    /// with a fresh poll.
    ///
    /// # Errors
    ///
    /// Returns an error if the poll cannot be created or the socket cannot
    /// be registered.
    pub fn new(
        mut socket: UdpSocket,
        data_socket: Arc<UdpSocket>,
        target: TargetSlot,
        cmd_port: u16,
        stop_flag: Arc<AtomicBool>,
    ) -> io::Result<Self> {
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut socket, CMD_TOKEN, Interest::READABLE)?;

        Ok(Self {
            socket,
            poll,
            events: Events::with_capacity(4),
            data_socket,
            target,
            cmd_port,
            stop_flag,
            recv_buf: vec![0u8; MAX_CONTROL_DATAGRAM],
        })
    }

    /// Runs the control loop until the stop flag is set.
    pub fn run(&mut self) {
        while !self.stop_flag.load(Ordering::Relaxed) {
            match self.poll.poll(&mut self.events, Some(RECV_TIMEOUT)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "control poll failed");
                    std::thread::sleep(RECV_TIMEOUT);
                    continue;
                }
            }
            self.drain_socket();
        }
    }

    /// Receives every pending datagram on the command socket.
    fn drain_socket(&mut self) {
        loop {
            match self.socket.try_recv_from(&mut self.recv_buf) {
                Ok(Some((len, from))) => {
                    let msg = String::from_utf8_lossy(&self.recv_buf[..len]).into_owned();
                    self.handle_datagram(msg.trim(), from);
                }
                Ok(None) => return,
                // A previous send can elicit an ICMP port-unreachable that
                // surfaces as a reset on the next receive. Not fatal; keep
                // draining.
                Err(e) if e.kind() == ErrorKind::ConnectionReset => {
                    warn!(error = %e, "connection reset on control socket");
                }
                Err(e) => {
                    warn!(error = %e, "control receive failed");
                    return;
                }
            }
        }
    }

    fn handle_datagram(&self, msg: &str, from: Endpoint) {
        debug!(from = %from, msg = %msg, "control message received");

        match ControlMessage::parse(msg) {
            Ok(ControlMessage::Connect(endpoint)) => self.handle_connect(endpoint),
            Ok(ControlMessage::Disconnect(explicit)) => self.handle_disconnect(explicit),
            Err(ParseError::UnknownCommand) => {
                trace!(from = %from, "ignoring unrecognized control message");
            }
            Err(e) => {
                warn!(from = %from, msg = %msg, error = %e, "malformed control message");
            }
        }
    }

    /// Handles a CONNECT: acknowledge to the declared data endpoint, then
    /// make it the active target.
    fn handle_connect(&self, endpoint: Endpoint) {
        let reply = ControlReply::Connected {
            server_ip: outbound_ip(endpoint.ip()),
            cmd_port: self.cmd_port,
        };
        self.send_reply(reply, endpoint);

        self.target.set(endpoint);
        info!(client = %endpoint, "client connected, streaming to data port");
    }

    /// Handles a DISCONNECT: notify the explicit target if one was given,
    /// else the stored one; clear the slot unconditionally either way.
    fn handle_disconnect(&self, explicit: Option<Endpoint>) {
        let notify = explicit.or_else(|| self.target.get());

        if let Some(endpoint) = notify {
            let reply = ControlReply::Disconnect {
                server_ip: outbound_ip(endpoint.ip()),
                cmd_port: self.cmd_port,
            };
            self.send_reply(reply, endpoint);
        }

        self.target.clear();
        info!("client disconnected, transmission stopped");
    }

    /// Best-effort reply send from the data socket.
    fn send_reply(&self, reply: ControlReply, to: Endpoint) {
        match self.data_socket.try_send_to(reply.to_string().as_bytes(), to) {
            Ok(Some(_)) => debug!(to = %to, reply = %reply, "sent acknowledgement"),
            Ok(None) => warn!(to = %to, reply = %reply, "data socket not ready, acknowledgement dropped"),
            Err(e) => warn!(to = %to, reply = %reply, error = %e, "failed to send acknowledgement"),
        }
    }
}
