//! Sine stream server daemon.
//!
//! Binds the UDP control port, waits for a `CONNECT:<ip>:<port>` handshake,
//! and streams sine samples to the declared data-plane address until a
//! `DISCONNECT` arrives or the process is interrupted.
//!
//! # Usage
//!
//! ```sh
//! sinestream-server --port 47268 --freq 1.0 --rate 30 --amp 1.0 --var sin
//! ```
//!
//! # Signals
//!
//! `SIGINT` (Ctrl-C): graceful shutdown, sockets closed.

use std::sync::atomic::Ordering;
use std::time::Duration;

use sinestream::logging;
use sinestream::net::Endpoint;
use sinestream::{Server, ServerConfig, ServerError};

fn main() {
    if let Err(e) = run() {
        eprintln!("sinestream-server: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), ServerError> {
    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args)?;
    logging::init(cli.quiet);

    let server = Server::spawn(cli.config)?;
    eprintln!("sinestream-server: listening on {}", server.cmd_addr());

    // Interrupt sets the same flag the threads watch.
    let stop_flag = server.stop_flag();
    let signal_flag = stop_flag.clone();
    ctrlc::set_handler(move || {
        signal_flag.store(true, Ordering::Relaxed);
    })
    .expect("failed to set interrupt handler");

    while !stop_flag.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));
    }

    eprintln!("\nsinestream-server: shutting down...");
    server.shutdown();
    eprintln!("sinestream-server: stopped");

    Ok(())
}

/// Parsed command line.
struct Cli {
    config: ServerConfig,
    quiet: bool,
}

/// Parses command line arguments into a server configuration.
fn parse_args(args: &[String]) -> Result<Cli, ServerError> {
    let mut config = ServerConfig::default();
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                let port = take_value(args, &mut i, "--port")?
                    .parse()
                    .map_err(|_| ServerError::Config("invalid --port value".into()))?;
                config.bind_addr = Endpoint::any(port);
            }
            "--freq" | "-f" => {
                config.sine_freq_hz = take_value(args, &mut i, "--freq")?
                    .parse()
                    .map_err(|_| ServerError::Config("invalid --freq value".into()))?;
            }
            "--rate" | "-r" => {
                config.send_rate_hz = take_value(args, &mut i, "--rate")?
                    .parse()
                    .map_err(|_| ServerError::Config("invalid --rate value".into()))?;
            }
            "--amp" | "-a" => {
                config.amplitude = take_value(args, &mut i, "--amp")?
                    .parse()
                    .map_err(|_| ServerError::Config("invalid --amp value".into()))?;
            }
            "--var" | "-v" => {
                config.var_name = take_value(args, &mut i, "--var")?.to_string();
            }
            "--quiet" | "-q" => {
                quiet = true;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            arg => {
                return Err(ServerError::Config(format!("unknown argument: {arg}")));
            }
        }
        i += 1;
    }

    Ok(Cli { config, quiet })
}

/// Advances past a flag and returns its value.
fn take_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, ServerError> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| ServerError::Config(format!("missing value for {flag}")))
}

fn print_usage() {
    eprintln!(
        r#"sinestream-server - UDP handshake-and-stream test server

USAGE:
    sinestream-server [OPTIONS]

OPTIONS:
    -p, --port <PORT>    Control port to listen on (default: 47268)
    -f, --freq <HZ>      Sine wave frequency (default: 1.0)
    -r, --rate <HZ>      Sample send rate, clamped to [1, 200] (default: 30.0)
    -a, --amp <VALUE>    Sine wave amplitude (default: 1.0)
    -v, --var <NAME>     Variable name on the sample line (default: sin)
    -q, --quiet          Warnings and errors only
    -h, --help           Print this help message

SIGNALS:
    SIGINT               Graceful shutdown

EXAMPLE:
    sinestream-server --port 47268 --rate 60 --var temperature
"#
    );
}
