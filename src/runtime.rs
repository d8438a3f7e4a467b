//! Threaded server runtime.

pub mod server;
