//! State of one multipart upload.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::SyncError;
use crate::store::{CompletedPart, MultipartSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Chunking,
    Uploading,
    Completing,
    Completed,
    Aborting,
    Aborted,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobPhase::Chunking => "chunking",
            JobPhase::Uploading => "uploading",
            JobPhase::Completing => "completing",
            JobPhase::Completed => "completed",
            JobPhase::Aborting => "aborting",
            JobPhase::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Acknowledged parts and their raw digests for one session.
#[derive(Debug)]
pub struct MultipartJob {
    session: MultipartSession,
    phase: JobPhase,
    parts: Vec<CompletedPart>,
    digests: BTreeMap<u32, Vec<u8>>,
}

impl MultipartJob {
    pub fn new(session: MultipartSession) -> Self {
        Self {
            session,
            phase: JobPhase::Chunking,
            parts: Vec::new(),
            digests: BTreeMap::new(),
        }
    }

    pub fn session(&self) -> &MultipartSession {
        &self.session
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: JobPhase) {
        tracing::debug!(
            key = %self.session.key,
            upload_id = %self.session.upload_id,
            from = %self.phase,
            to = %phase,
            "multipart phase"
        );
        self.phase = phase;
    }

    /// Remember the raw SHA-256 of a part as it is read.
    pub fn add_digest(&mut self, part_number: u32, raw: Vec<u8>) {
        self.digests.insert(part_number, raw);
    }

    pub fn record_part(&mut self, part: CompletedPart) {
        self.parts.push(part);
    }

    /// Sort acknowledged parts and check they are exactly `1..=expected`.
    pub fn finalize_parts(&mut self, expected: u32) -> Result<&[CompletedPart], SyncError> {
        self.parts.sort_by_key(|p| p.part_number);
        let invalid = |reason: String| SyncError::InvalidPartList {
            key: self.session.key.clone(),
            reason,
        };
        if self.parts.len() != expected as usize {
            return Err(invalid(format!(
                "{} parts acknowledged, {} read",
                self.parts.len(),
                expected
            )));
        }
        for (i, part) in self.parts.iter().enumerate() {
            let want = i as u32 + 1;
            if part.part_number != want {
                return Err(invalid(format!("expected part {}, found {}", want, part.part_number)));
            }
            if !self.digests.contains_key(&want) {
                return Err(invalid(format!("no digest for part {}", want)));
            }
        }
        Ok(&self.parts)
    }

    /// Raw part digests concatenated in part order.
    pub fn concatenated_digests(&self) -> Vec<u8> {
        self.digests.values().flatten().copied().collect()
    }
}
