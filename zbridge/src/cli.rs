//! Command line of the `zmq_adapter` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use zbridge_core::config::BridgeConfig;
use zbridge_core::error::ConfigError;
use zbridge_core::framer::FramerKind;

#[derive(Parser, Debug, Clone)]
#[command(name = "zmq_adapter")]
#[command(version)]
#[command(about = "Bridge a serial device or TCP connection to ZeroMQ sockets")]
pub struct Args {
    /// PUB socket address(es); data read from the byte stream is published
    #[arg(short = 'p', long = "pub", value_name = "ADDR")]
    pub publish: Option<String>,

    /// SUB socket address(es); received messages are written to the byte stream
    #[arg(short = 's', long = "sub", value_name = "ADDR")]
    pub subscribe: Option<String>,

    /// REQ socket address(es); byte-stream requests are forwarded through it
    #[arg(short = 'r', long = "req", value_name = "ADDR")]
    pub request: Option<String>,

    /// REP socket address(es); incoming requests are answered by the byte stream
    #[arg(short = 'y', long = "rep", value_name = "ADDR")]
    pub reply: Option<String>,

    /// Framer for the byte stream: none, sbp, length-prefixed
    #[arg(short = 'f', long = "framer", value_name = "FRAMER", default_value = "none")]
    pub framer: FramerKind,

    /// File or device to bridge
    #[arg(long = "file", value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Listen on a TCP port and bridge each accepted connection
    #[arg(long = "tcp-l", value_name = "PORT")]
    pub tcp_listen: Option<u16>,

    /// Reply timeout in milliseconds before a REP socket is reset
    #[arg(long = "rep-timeout", value_name = "MS", default_value_t = 10_000)]
    pub rep_timeout_ms: u64,

    /// Debug-level logging
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// Validate the options into a bridge configuration.
    pub fn into_config(self) -> Result<BridgeConfig, ConfigError> {
        let mut builder = BridgeConfig::builder()
            .with_framer(self.framer)
            .with_reply_timeout(Duration::from_millis(self.rep_timeout_ms))
            .with_debug(self.debug);

        if let Some(addr) = self.publish {
            builder = builder.with_publish(addr);
        }
        if let Some(addr) = self.subscribe {
            builder = builder.with_subscribe(addr);
        }
        if let Some(addr) = self.request {
            builder = builder.with_request(addr);
        }
        if let Some(addr) = self.reply {
            builder = builder.with_reply(addr);
        }
        if let Some(path) = self.file {
            builder = builder.with_file(path);
        }
        if let Some(port) = self.tcp_listen {
            builder = builder.with_tcp_listen(port);
        }

        builder.build()
    }
}
