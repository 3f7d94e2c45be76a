use std::path::PathBuf;

use feed_cli::pipeline::CheckOutcome;

#[derive(Debug)]
pub struct CheckResult {
    pub outcome: CheckOutcome,
    pub report_path: Option<PathBuf>,
}

impl CheckResult {
    pub fn has_errors(&self) -> bool {
        self.outcome.has_errors()
    }
}
