//! Configuration and CLI argument handling

use clap::Parser;

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "coffee-countdown")]
#[command(about = "A coffee-themed countdown timer service")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "8337")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Initial countdown hours
    #[arg(long, default_value = "0")]
    pub hours: u64,

    /// Initial countdown minutes
    #[arg(short, long, default_value = "5")]
    pub minutes: u64,

    /// Initial countdown seconds
    #[arg(short, long, default_value = "0")]
    pub seconds: u64,

    /// Restart the countdown automatically after reaching zero
    #[arg(short, long = "loop")]
    pub loop_enabled: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
