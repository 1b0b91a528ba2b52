use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(version = "0.1.0")]
#[command(about = "Single-host service supervisor with error-log burst alerting")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config directory path
    #[arg(short, long, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the supervision loop
    Run,
    /// One-shot liveness report for every service assigned to this host
    Status,
    /// One-shot error-log window scan for every service on this host
    Check,
}
