use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// webspecs: host metrics with threshold alerts and email digests
///
/// Samples CPU, memory, swap and disk counters, streams them to live
/// clients, and mails a periodic digest of threshold breaches.
#[derive(Parser, Debug)]
#[command(name = "webspecs")]
#[command(version, about, long_about)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to custom config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the sampler, the digest scheduler and the HTTP server
    #[command(alias = "d")]
    Daemon {
        /// Listen address override (e.g. 0.0.0.0:8000)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Take one sample and print it
    #[command(alias = "s")]
    Sample {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or change alert thresholds
    #[command(alias = "t")]
    Thresholds {
        #[command(subcommand)]
        action: ThresholdAction,
    },

    /// Subscribe an address to the alert digest
    Subscribe {
        /// Email address
        email: String,
    },

    /// Set the sender account used to send the digest
    Relay {
        /// Sender address (also the SMTP login)
        #[arg(long)]
        sender: String,

        /// SMTP password or app token
        #[arg(long)]
        credential: String,
    },

    /// Send the digest for the trailing period now
    Digest,
}

#[derive(Subcommand, Debug)]
pub enum ThresholdAction {
    /// Print the current thresholds as JSON
    Show,

    /// Merge a partial JSON tree into the thresholds
    Patch {
        /// e.g. '{"cpu":{"percent":{"core_1":90}}}'
        changes: String,
    },

    /// Add default thresholds for metrics that appeared after bootstrap
    Extend,
}
