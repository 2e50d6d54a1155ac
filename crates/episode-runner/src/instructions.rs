//! Instruction manifests and worker range assignment.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::errors::RunnerError;

/// One persona's block in the instruction manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaGroup {
    pub persona: String,
    pub url: String,
    pub instructions: Vec<String>,
    pub augmented_instructions: Vec<String>,
}

/// One flattened instruction: what a single episode executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub persona: String,
    pub url: String,
    pub original: String,
    /// The augmented phrasing is what actually drives the episode.
    pub augmented: String,
}

/// Load a manifest file and flatten persona blocks into an ordered list.
pub fn load_manifest(path: &Path) -> Result<Vec<Instruction>, RunnerError> {
    let bytes = std::fs::read(path)
        .map_err(|e| RunnerError::Manifest(format!("{}: {e}", path.display())))?;
    let groups: Vec<PersonaGroup> = serde_json::from_slice(&bytes)
        .map_err(|e| RunnerError::Manifest(format!("{}: {e}", path.display())))?;
    let instructions = flatten(groups);
    info!(count = instructions.len(), manifest = %path.display(), "loaded instructions");
    Ok(instructions)
}

/// Pair original and augmented phrasings positionally, as the manifests
/// are produced.
pub fn flatten(groups: Vec<PersonaGroup>) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    for group in groups {
        for (original, augmented) in group
            .instructions
            .iter()
            .zip(group.augmented_instructions.iter())
        {
            instructions.push(Instruction {
                persona: group.persona.clone(),
                url: group.url.clone(),
                original: original.clone(),
                augmented: augmented.clone(),
            });
        }
    }
    instructions
}

/// Half-open instruction range `[start, end)` assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRange {
    pub start: usize,
    pub end: usize,
}

impl WorkerRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A range must fit the instruction list and be non-inverted.
    pub fn validate(&self, total: usize) -> Result<(), RunnerError> {
        if self.start >= total || self.end <= self.start || self.end > total {
            return Err(RunnerError::Manifest(format!(
                "invalid range {}..{} for {total} instructions",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

/// Distribute `total` instructions evenly over `workers` contiguous
/// ranges; the first `total % workers` ranges take one extra.
pub fn assign_ranges(total: usize, workers: usize) -> Vec<WorkerRange> {
    if workers == 0 || total == 0 {
        return Vec::new();
    }
    let base = total / workers;
    let extra = total % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut cursor = 0;
    for i in 0..workers {
        let len = base + usize::from(i < extra);
        if len == 0 {
            break;
        }
        ranges.push(WorkerRange {
            start: cursor,
            end: cursor + len,
        });
        cursor += len;
    }
    ranges
}
