//! Filesystem layout and record lifecycle for one episode.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use trail_types::{ElementDescriptor, Episode, StepOutcome, StepRecord};

use crate::errors::StoreError;
use crate::model::{EpisodeMetadata, ErrorLog, ErrorLogEntry, TrajectoryEntry};
use crate::report;

const TRAJECTORY_FILE: &str = "trajectory.json";
const ERROR_LOG_FILE: &str = "error_log.json";
const METADATA_FILE: &str = "metadata.json";
const REPORT_FILE: &str = "report.html";

/// Owns one episode's artifact namespace.
///
/// Layout under the episode root:
/// `images/` raw screenshots, `annotated_images/` box-burned copies,
/// `state/` descriptor snapshots, `summaries/` per-step oracle summaries,
/// plus the three log files at the root.
pub struct TrajectoryStore {
    root: PathBuf,
    images: PathBuf,
    annotated_images: PathBuf,
    state: PathBuf,
    summaries: PathBuf,
}

impl TrajectoryStore {
    /// Create the namespace for one episode and its empty log files.
    pub fn allocate(results_dir: &Path, episode_name: &str) -> Result<Self, StoreError> {
        let root = results_dir.join(episode_name);
        let store = Self {
            images: root.join("images"),
            annotated_images: root.join("annotated_images"),
            state: root.join("state"),
            summaries: root.join("summaries"),
            root,
        };
        for dir in [
            &store.root,
            &store.images,
            &store.annotated_images,
            &store.state,
            &store.summaries,
        ] {
            fs::create_dir_all(dir)?;
        }

        store.write_json(
            &store.root.join(TRAJECTORY_FILE),
            &BTreeMap::<u32, TrajectoryEntry>::new(),
        )?;
        store.write_json(&store.root.join(ERROR_LOG_FILE), &ErrorLog::default())?;

        info!(root = %store.root.display(), "allocated episode namespace");
        Ok(store)
    }

    /// Open an existing episode namespace without touching the disk.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        Self {
            images: root.join("images"),
            annotated_images: root.join("annotated_images"),
            state: root.join("state"),
            summaries: root.join("summaries"),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths follow the original 1-based, zero-padded artifact naming.
    pub fn screenshot_path(&self, index: u32) -> PathBuf {
        self.images.join(format!("screenshot_{:03}.png", index + 1))
    }

    pub fn annotated_screenshot_path(&self, index: u32) -> PathBuf {
        self.annotated_images
            .join(format!("annotated_screenshot_{:03}.png", index + 1))
    }

    pub fn state_path(&self, index: u32) -> PathBuf {
        self.state.join(format!("state_{:03}.json", index + 1))
    }

    pub fn summary_path(&self, index: u32) -> PathBuf {
        self.summaries
            .join(format!("oracle_summary_{:03}.txt", index + 1))
    }

    pub fn write_screenshot(&self, index: u32, png: &[u8]) -> Result<String, StoreError> {
        let path = self.screenshot_path(index);
        fs::write(&path, png)?;
        Ok(self.relative(&path))
    }

    /// Best-effort by contract; callers log and continue on failure.
    pub fn write_annotated_screenshot(&self, index: u32, png: &[u8]) -> Result<(), StoreError> {
        fs::write(self.annotated_screenshot_path(index), png)?;
        Ok(())
    }

    pub fn write_state_snapshot(
        &self,
        index: u32,
        descriptors: &[ElementDescriptor],
    ) -> Result<String, StoreError> {
        let path = self.state_path(index);
        self.write_json(&path, &descriptors)?;
        Ok(self.relative(&path))
    }

    /// Persist the exact summary text sent to the oracle, for debugging.
    pub fn write_oracle_summary(&self, index: u32, summary: &str) -> Result<(), StoreError> {
        fs::write(self.summary_path(index), summary)?;
        Ok(())
    }

    /// Record one finalized step.
    ///
    /// Exactly one record per index is accepted. A `Failed` outcome purges
    /// the step's transient artifacts; its log entries remain.
    pub fn record_step(&self, record: &StepRecord) -> Result<(), StoreError> {
        let path = self.root.join(TRAJECTORY_FILE);
        let mut trajectory: BTreeMap<u32, TrajectoryEntry> = self.read_json(&path)?;
        if trajectory.contains_key(&record.index) {
            return Err(StoreError::DuplicateStep(record.index));
        }

        let mut entry = TrajectoryEntry::from(record);
        if record.outcome == StepOutcome::Failed {
            self.purge_step_artifacts(record.index)?;
            entry.screenshot_ref = None;
            entry.state_ref = None;
        }

        trajectory.insert(record.index, entry);
        self.write_json(&path, &trajectory)?;
        debug!(index = record.index, outcome = ?record.outcome, "recorded step");
        Ok(())
    }

    /// Append one entry to the episode's error log.
    pub fn append_error(&self, entry: ErrorLogEntry) -> Result<(), StoreError> {
        let path = self.root.join(ERROR_LOG_FILE);
        let mut log: ErrorLog = self.read_json(&path)?;
        log.errors.push(entry);
        self.write_json(&path, &log)
    }

    /// Remove a step's transient artifacts. Idempotent: missing files are
    /// fine, and the single call site keeps cleanup in one place.
    pub fn purge_step_artifacts(&self, index: u32) -> Result<(), StoreError> {
        for path in [
            self.screenshot_path(index),
            self.annotated_screenshot_path(index),
            self.state_path(index),
            self.summary_path(index),
        ] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        debug!(index, "purged step artifacts");
        Ok(())
    }

    /// Write final metadata and generate the human-viewable report.
    pub fn record_episode(&self, episode: &Episode) -> Result<(), StoreError> {
        let trajectory = self.load_trajectory()?;
        let steps = trajectory
            .values()
            .map(|e| e.action.description.clone())
            .collect();

        let metadata = EpisodeMetadata::from_episode(episode, steps);
        self.write_json(&self.root.join(METADATA_FILE), &metadata)?;

        // Report generation is best-effort; a render bug must not lose the
        // episode.
        let html = report::render(&metadata, &trajectory);
        if let Err(err) = fs::write(self.root.join(REPORT_FILE), html) {
            warn!(%err, "failed to write episode report");
        }

        info!(
            episode = %episode.name,
            success = episode.is_success(),
            steps = episode.step_count,
            "recorded episode metadata"
        );
        Ok(())
    }

    /// Re-render the HTML report from the persisted logs.
    pub fn record_report(&self, metadata: &EpisodeMetadata) -> Result<(), StoreError> {
        let trajectory = self.load_trajectory()?;
        let html = report::render(metadata, &trajectory);
        fs::write(self.root.join(REPORT_FILE), html)?;
        Ok(())
    }

    pub fn load_trajectory(&self) -> Result<BTreeMap<u32, TrajectoryEntry>, StoreError> {
        self.read_json(&self.root.join(TRAJECTORY_FILE))
    }

    pub fn load_error_log(&self) -> Result<ErrorLog, StoreError> {
        self.read_json(&self.root.join(ERROR_LOG_FILE))
    }

    pub fn load_metadata(&self) -> Result<EpisodeMetadata, StoreError> {
        self.read_json(&self.root.join(METADATA_FILE))
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, path: &Path) -> Result<T, StoreError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        fs::write(path, serde_json::to_vec_pretty(value)?)?;
        Ok(())
    }
}
