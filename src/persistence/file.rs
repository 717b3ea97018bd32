//! Control-file backed state store

use crate::core::error::PipelineError;
use crate::core::state::PipelineState;
use crate::persistence::StateStore;
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One control file per pipeline name, co-located with the project config
///
/// The file holds the serialized [`PipelineState`]. Writes go through a
/// temp path followed by a rename, so a crash mid-write leaves the previous
/// file intact rather than a truncated one.
pub struct ControlFileStore {
    path: PathBuf,
}

impl ControlFileStore {
    /// Derive the control-file path for `pipeline` inside `project_dir`
    pub fn for_pipeline(project_dir: impl AsRef<Path>, pipeline: &str) -> Self {
        let path = project_dir
            .as_ref()
            .join(format!(".stepwise-{}.json", pipeline));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(".tmp");
        PathBuf::from(os)
    }
}

#[async_trait::async_trait]
impl StateStore for ControlFileStore {
    async fn exists(&self) -> Result<bool> {
        Ok(tokio::fs::try_exists(&self.path).await?)
    }

    async fn load(&self) -> Result<Option<PipelineState>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read control file {}", self.path.display())
                })
            }
        };

        let state = PipelineState::unserialize(&raw).map_err(|e| PipelineError::CorruptState {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        Ok(Some(state))
    }

    async fn save(&self, state: &PipelineState) -> Result<()> {
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, state.serialize())
            .await
            .with_context(|| format!("failed to write control file {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to move control file into {}", self.path.display()))?;
        debug!(path = %self.path.display(), cursor = state.cursor, "state written");
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("failed to remove control file {}", self.path.display())
            }),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
