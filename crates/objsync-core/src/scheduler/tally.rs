use crate::planner::FileFailure;
use crate::upload::UploadOutcome;

/// Counters kept by one lane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneTally {
    pub uploaded: usize,
    pub uploaded_bytes: u64,
    pub skipped: usize,
    pub not_overwritten: usize,
    /// Includes `not_overwritten`.
    pub failed: usize,
    pub failures: Vec<FileFailure>,
}

impl LaneTally {
    pub fn record(&mut self, key: &str, outcome: UploadOutcome) {
        match outcome {
            UploadOutcome::Uploaded { bytes, .. } => {
                self.uploaded += 1;
                self.uploaded_bytes += bytes;
            }
            UploadOutcome::Skipped => self.skipped += 1,
            UploadOutcome::NotOverwritten => {
                self.not_overwritten += 1;
                self.fail(key, "remote object exists and overwrite is disabled".to_string());
            }
        }
    }

    pub fn fail(&mut self, key: &str, error: String) {
        self.failed += 1;
        self.failures.push(FileFailure {
            path: key.to_string(),
            error,
        });
    }

    pub fn processed(&self) -> usize {
        self.uploaded + self.skipped + self.failed
    }
}

/// Sum of every lane's tally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub uploaded: usize,
    pub uploaded_bytes: u64,
    pub skipped: usize,
    pub not_overwritten: usize,
    pub failed: usize,
    pub failures: Vec<FileFailure>,
}

impl TransferSummary {
    pub fn merge(&mut self, lane: LaneTally) {
        self.uploaded += lane.uploaded;
        self.uploaded_bytes += lane.uploaded_bytes;
        self.skipped += lane.skipped;
        self.not_overwritten += lane.not_overwritten;
        self.failed += lane.failed;
        self.failures.extend(lane.failures);
    }
}
