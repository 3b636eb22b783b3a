//! Batch extraction over every matching grid

use log::info;

use crate::batch::{self, CancellationToken};
use crate::commands::command_traits::Command;
use crate::config::ExtentConfig;
use crate::error::ExtentResult;
use crate::table::{CsvResultTable, ResultTable};

pub struct RunCommand {
    config: ExtentConfig,
    cancel: CancellationToken,
}

impl RunCommand {
    pub fn new(config: ExtentConfig) -> Self {
        RunCommand {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token stopping this run from another thread
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Command for RunCommand {
    fn execute(&self) -> ExtentResult<i32> {
        self.cancel.cancel_on_interrupt();
        let mut table = CsvResultTable::new(self.config.output_table_path());
        info!("Results go to {}", table.location());

        let summary = batch::run_batch(&self.config, &mut table, &self.cancel)?;

        println!("{}", summary);
        for (path, reason) in &summary.failed {
            println!("  failed: {}: {}", path.display(), reason);
        }
        Ok(summary.exit_code())
    }
}
