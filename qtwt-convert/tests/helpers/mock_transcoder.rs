//! Passthrough transcoder for pipeline and batch tests
//!
//! Returns its input unchanged (so tests feed it ready-made WAV bytes),
//! optionally reports fake artifacts, and records what it was asked to do.

use async_trait::async_trait;
use qtwt_convert::error::{CleanupError, TranscoderError};
use qtwt_convert::transcoder::{TranscodeOutput, TranscodeParams, Transcoder, TranscoderEngine};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct Calls {
    pub transcoded: Vec<String>,
    pub released: Vec<PathBuf>,
}

#[derive(Clone, Default)]
pub struct PassthroughTranscoder {
    pub calls: Arc<Mutex<Calls>>,
    /// Artifacts reported for every transcode
    pub artifacts: Vec<PathBuf>,
    /// Releasing these fails
    pub stuck_artifacts: Vec<PathBuf>,
    /// Inputs with these names fail to transcode
    pub failing_inputs: Vec<String>,
}

impl PassthroughTranscoder {
    pub fn transcoded(&self) -> Vec<String> {
        self.calls.lock().unwrap().transcoded.clone()
    }

    pub fn released(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().released.clone()
    }
}

#[async_trait]
impl Transcoder for PassthroughTranscoder {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    async fn load(&self) -> Result<(), TranscoderError> {
        Ok(())
    }

    async fn transcode(
        &self,
        input: &[u8],
        file_name_hint: &str,
        _params: &TranscodeParams,
    ) -> Result<TranscodeOutput, TranscoderError> {
        self.calls
            .lock()
            .unwrap()
            .transcoded
            .push(file_name_hint.to_string());

        if self.failing_inputs.iter().any(|n| n == file_name_hint) {
            return Err(TranscoderError::Failed(format!("cannot decode {}", file_name_hint)));
        }

        Ok(TranscodeOutput {
            wav: input.to_vec(),
            artifacts: self.artifacts.clone(),
        })
    }

    async fn release(&self, artifact: &Path) -> Result<(), CleanupError> {
        self.calls
            .lock()
            .unwrap()
            .released
            .push(artifact.to_path_buf());

        if self.stuck_artifacts.iter().any(|a| a == artifact) {
            return Err(CleanupError {
                artifact: artifact.display().to_string(),
                reason: "permission denied".to_string(),
            });
        }
        Ok(())
    }
}

pub fn passthrough_engine(transcoder: PassthroughTranscoder) -> Arc<TranscoderEngine> {
    Arc::new(TranscoderEngine::new(
        Box::new(transcoder),
        Duration::from_secs(15),
    ))
}
