//! Area of a single grid, printed without touching the results table

use std::path::PathBuf;

use crate::commands::command_traits::Command;
use crate::config::ExtentConfig;
use crate::error::ExtentResult;
use crate::pipeline;

pub struct ExtractCommand {
    input: PathBuf,
    config: ExtentConfig,
}

impl ExtractCommand {
    pub fn new(input: impl Into<PathBuf>, config: ExtentConfig) -> Self {
        ExtractCommand {
            input: input.into(),
            config,
        }
    }
}

impl Command for ExtractCommand {
    fn execute(&self) -> ExtentResult<i32> {
        let report = pipeline::extract_area(&self.input, &self.config)?;
        println!("{}", report);
        Ok(0)
    }
}
