//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Score ideas against a domain context using configurable providers
#[derive(Parser)]
#[command(name = "ideascore")]
#[command(about = "Score ideas with rule-based, local-model and HTTP providers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Runtime config (YAML). Without one, only the rule-based provider is used.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a single idea and print the result as JSON
    Analyze {
        /// Idea text. Read from stdin when omitted.
        idea: Option<String>,

        /// Domain context file (YAML or JSON) with goals, strategies and anti_patterns
        #[arg(long)]
        context: Option<PathBuf>,

        /// Route to this provider instead of the configured primary
        #[arg(long)]
        provider: Option<String>,

        /// Surface the primary's error instead of trying other providers
        #[arg(long)]
        no_fallback: bool,

        /// Print per-provider statistics to stderr afterwards
        #[arg(long)]
        stats: bool,
    },

    /// Probe every provider and print availability
    Health {
        /// Keep probing at manager.health_check_interval and print each round until interrupted
        #[arg(long)]
        watch: bool,
    },

    /// List registered providers with their statistics and cache state
    Providers,

    /// Load and validate the config, then exit
    Check,
}
