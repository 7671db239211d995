use clap::Parser;
use std::path::PathBuf;

use crate::session::SecurityMode;

/// Audit a single FTP/FTPS service for anonymous access and loose permissions.
#[derive(Parser, Debug)]
#[command(name = "ftpaudit", version, about)]
pub struct Cli {
    /// Target hostname or IP address; prompted for when omitted.
    pub host: Option<String>,

    /// FTP control port.
    #[arg(short, long, default_value_t = 21)]
    pub port: u16,

    /// Username; omit it to try the anonymous convention.
    #[arg(short, long)]
    pub user: Option<String>,

    /// Password for the given user.
    #[arg(long)]
    pub password: Option<String>,

    /// Per-operation timeout in seconds.
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,

    /// TLS handling for the control channel.
    #[arg(long, value_enum, default_value = "auto")]
    pub security: SecurityMode,

    /// Verify the server certificate instead of accepting any.
    #[arg(long)]
    pub verify_tls: bool,

    /// Descend this many directory levels below the login directory.
    #[arg(long, default_value_t = 0)]
    pub max_depth: usize,

    /// Cap on audited entries; 0 disables the cap.
    #[arg(long, default_value_t = 0)]
    pub max_entries: usize,

    /// Print results as JSON instead of the console report.
    #[arg(long)]
    pub json: bool,

    /// Write results as JSON to this file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
