//! Command pattern interfaces
//!
//! Each CLI subcommand is a `Command` object built by a `CommandFactory`
//! from the parsed arguments and the layered configuration.

use crate::config::ExtentConfig;
use crate::error::ExtentResult;

/// An executable CLI operation
pub trait Command {
    /// Execute the command
    ///
    /// # Returns
    /// The process exit code, or an error for fatal failures
    fn execute(&self) -> ExtentResult<i32>;
}

/// Builds the command selected on the command line
pub trait CommandFactory {
    /// Create the command for a parsed invocation
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `config` - Configuration with every layer applied
    fn create_command(&self, args: &clap::ArgMatches, config: ExtentConfig) -> ExtentResult<Box<dyn Command>>;
}
