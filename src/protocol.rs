//! Control-plane wire protocol.
//!
//! Colon-delimited UTF-8 text over UDP:
//!
//! | Direction | Message |
//! |-----------|---------|
//! | client → server | `CONNECT:<ip>:<port>` |
//! | client → server | `DISCONNECT` or `DISCONNECT:<ip>:<port>` |
//! | server → client | `CONNECTED:<server_ip>:<cmd_port>` |
//! | server → client | `DISCONNECT:<server_ip>:<cmd_port>` |
//!
//! A malformed CONNECT is an error (the caller logs and ignores it). A
//! malformed explicit DISCONNECT target degrades to "no explicit target" so
//! the stored endpoint can still be notified and cleared. Anything else is
//! [`ParseError::UnknownCommand`] and is dropped silently.

use std::fmt;
use std::net::IpAddr;

use thiserror::Error;

use crate::net::Endpoint;
use crate::net::endpoint::FieldError;

/// A control message received on the command port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Client asks to receive the stream at the given data-plane endpoint.
    Connect(Endpoint),
    /// Client asks to stop the stream, optionally naming the endpoint to
    /// notify. `None` means "notify whoever is currently connected".
    Disconnect(Option<Endpoint>),
}

/// Errors while parsing a control message.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Not a CONNECT or DISCONNECT; silently ignored by the server.
    #[error("unrecognized control command")]
    UnknownCommand,
    /// CONNECT did not have exactly three colon-separated fields.
    #[error("CONNECT expects 3 colon-separated fields, got {0}")]
    ConnectFieldCount(usize),
    /// The CONNECT IP field is not an IP address.
    #[error("invalid IP address in CONNECT")]
    InvalidIp,
    /// The CONNECT port field is not a UDP port.
    #[error("invalid port in CONNECT")]
    InvalidPort,
}

impl ControlMessage {
    /// Parses a control datagram. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] for malformed CONNECTs and for anything
    /// that is not a control command at all.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let msg = input.trim();

        if msg == "DISCONNECT" {
            return Ok(Self::Disconnect(None));
        }
        if let Some(rest) = msg.strip_prefix("DISCONNECT:") {
            return Ok(Self::Disconnect(parse_target(rest)));
        }
        if let Some(rest) = msg.strip_prefix("CONNECT:") {
            let mut fields = rest.split(':');
            let (ip, port) = match (fields.next(), fields.next(), fields.next()) {
                (Some(ip), Some(port), None) => (ip, port),
                _ => return Err(ParseError::ConnectFieldCount(msg.split(':').count())),
            };
            let endpoint = Endpoint::from_fields(ip, port).map_err(|e| match e {
                FieldError::Ip => ParseError::InvalidIp,
                FieldError::Port => ParseError::InvalidPort,
            })?;
            return Ok(Self::Connect(endpoint));
        }

        Err(ParseError::UnknownCommand)
    }
}

/// Best-effort parse of an explicit `<ip>:<port>` DISCONNECT target.
fn parse_target(rest: &str) -> Option<Endpoint> {
    let mut fields = rest.split(':');
    let (ip, port) = match (fields.next(), fields.next(), fields.next()) {
        (Some(ip), Some(port), None) => (ip, port),
        _ => return None,
    };
    Endpoint::from_fields(ip, port).ok()
}

/// A reply sent from the data socket to the client's data port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlReply {
    /// Handshake acknowledgement: `CONNECTED:<server_ip>:<cmd_port>`.
    Connected { server_ip: IpAddr, cmd_port: u16 },
    /// Disconnect acknowledgement: `DISCONNECT:<server_ip>:<cmd_port>`.
    Disconnect { server_ip: IpAddr, cmd_port: u16 },
}

impl fmt::Display for ControlReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected {
                server_ip,
                cmd_port,
            } => write!(f, "CONNECTED:{server_ip}:{cmd_port}"),
            Self::Disconnect {
                server_ip,
                cmd_port,
            } => write!(f, "DISCONNECT:{server_ip}:{cmd_port}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn parse_connect() {
        let msg = ControlMessage::parse("CONNECT:192.168.0.5:9999").unwrap();
        assert_eq!(
            msg,
            ControlMessage::Connect(Endpoint::new(
                IpAddr::V4(Ipv4Addr::new(192, 168, 0, 5)),
                9999
            ))
        );
    }

    #[test]
    fn parse_connect_trims_whitespace() {
        let msg = ControlMessage::parse("  CONNECT: 10.0.0.1 :80 \n").unwrap();
        assert_eq!(
            msg,
            ControlMessage::Connect(Endpoint::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 80))
        );
    }

    #[test]
    fn parse_connect_wrong_field_count() {
        assert_eq!(
            ControlMessage::parse("CONNECT:onlyonefield"),
            Err(ParseError::ConnectFieldCount(2))
        );
        assert_eq!(
            ControlMessage::parse("CONNECT:1.2.3.4:5:6"),
            Err(ParseError::ConnectFieldCount(4))
        );
    }

    #[test]
    fn parse_connect_bad_fields() {
        assert_eq!(
            ControlMessage::parse("CONNECT:somehost:9999"),
            Err(ParseError::InvalidIp)
        );
        assert_eq!(
            ControlMessage::parse("CONNECT:127.0.0.1:port"),
            Err(ParseError::InvalidPort)
        );
    }

    #[test]
    fn parse_bare_disconnect() {
        assert_eq!(
            ControlMessage::parse("DISCONNECT"),
            Ok(ControlMessage::Disconnect(None))
        );
    }

    #[test]
    fn parse_disconnect_with_target() {
        assert_eq!(
            ControlMessage::parse("DISCONNECT:127.0.0.1:4000"),
            Ok(ControlMessage::Disconnect(Some(Endpoint::localhost(4000))))
        );
    }

    #[test]
    fn parse_disconnect_malformed_target_degrades() {
        // A bad explicit target still disconnects, falling back to the
        // stored endpoint for the notification.
        assert_eq!(
            ControlMessage::parse("DISCONNECT:nothost:4000"),
            Ok(ControlMessage::Disconnect(None))
        );
        assert_eq!(
            ControlMessage::parse("DISCONNECT:1:2:3"),
            Ok(ControlMessage::Disconnect(None))
        );
    }

    #[test]
    fn parse_unknown_command() {
        assert_eq!(
            ControlMessage::parse("PING"),
            Err(ParseError::UnknownCommand)
        );
        // Prefix rules are exact: no colon means no command.
        assert_eq!(
            ControlMessage::parse("CONNECT"),
            Err(ParseError::UnknownCommand)
        );
        assert_eq!(
            ControlMessage::parse("DISCONNECTED"),
            Err(ParseError::UnknownCommand)
        );
    }

    #[test]
    fn reply_wire_format() {
        let connected = ControlReply::Connected {
            server_ip: IpAddr::V4(Ipv4Addr::new(192, 168, 0, 2)),
            cmd_port: 47268,
        };
        assert_eq!(connected.to_string(), "CONNECTED:192.168.0.2:47268");

        let bye = ControlReply::Disconnect {
            server_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            cmd_port: 47268,
        };
        assert_eq!(bye.to_string(), "DISCONNECT:127.0.0.1:47268");
    }
}
