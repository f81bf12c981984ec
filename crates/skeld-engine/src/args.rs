//! Command-line flags.

use clap::Parser;

/// Options parsed from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "skeld-engine")]
#[command(about = "Run the Skeld social-deduction simulation")]
pub struct EngineArgs {
    /// Start a fresh game after each game over.
    #[arg(long = "loop")]
    pub restart: bool,
    /// Stop after this many loop ticks.
    #[arg(long = "ticks", value_name = "N")]
    pub max_ticks: Option<u64>,
}
