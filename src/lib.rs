//! UDP handshake-and-stream test server.
//!
//! A client sends `CONNECT:<ip>:<port>` to the control port; the server
//! acknowledges with `CONNECTED:<server_ip>:<cmd_port>` and then streams
//! timestamped sine-wave samples to the declared data-plane address until a
//! `DISCONNECT` arrives or the process stops. Delivery is best-effort UDP;
//! the only state is the single active target endpoint.

pub mod logging;
pub mod net;
pub mod protocol;
pub mod runtime;
pub mod sample;
pub mod sync;

pub use runtime::server::{Server, ServerConfig, ServerError};
