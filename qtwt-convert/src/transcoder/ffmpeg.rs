//! External ffmpeg transcoder
//!
//! Each conversion writes the input to `<base>_<id>_in.<ext>` in the working
//! directory, runs
//!
//! ```text
//! ffmpeg -hide_banner -y -i IN -ac 1 -ar 44100 -c:a pcm_s16le -map_metadata -1 MID
//! ```
//!
//! and reads back `<base>_<id>_mid.wav`. Both files are handed to the caller
//! as artifacts; if ffmpeg itself fails they are removed here instead.

use super::{extension_hint, TranscodeOutput, TranscodeParams, Transcoder};
use crate::error::{CleanupError, TranscoderError};
use async_trait::async_trait;
use qtwt_common::naming::sanitize_base_name;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

/// Input extension when the file name carries none
const FALLBACK_EXTENSION: &str = "bin";

/// Transcoder that shells out to an `ffmpeg` binary
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
    work_dir: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Scratch file paths for one conversion
    fn scratch_paths(&self, file_name_hint: &str) -> (PathBuf, PathBuf) {
        let stem = format!(
            "{}_{}",
            sanitize_base_name(file_name_hint),
            Uuid::new_v4().simple()
        );
        let ext = extension_hint(file_name_hint).unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

        (
            self.work_dir.join(format!("{}_in.{}", stem, ext)),
            self.work_dir.join(format!("{}_mid.wav", stem)),
        )
    }

    async fn run(&self, input: &Path, output: &Path, params: &TranscodeParams) -> Result<Vec<u8>, TranscoderError> {
        let result = Command::new(&self.binary)
            .args(ffmpeg_args(input, output, params))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TranscoderError::Failed(format!("failed to run {}: {}", self.binary.display(), e)))?;

        let stderr = String::from_utf8_lossy(&result.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            debug!(target: "qtwt_convert::ffmpeg", "{}", line);
        }

        if !result.status.success() {
            let last_line = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            return Err(TranscoderError::Failed(format!(
                "ffmpeg exited with {}: {}",
                result.status, last_line
            )));
        }

        Ok(tokio::fs::read(output).await?)
    }

    async fn remove_quietly(path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != ErrorKind::NotFound {
                warn!(artifact = %path.display(), "Failed to remove scratch file: {}", e);
            }
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn load(&self) -> Result<(), TranscoderError> {
        tokio::fs::create_dir_all(&self.work_dir).await.map_err(|e| {
            TranscoderError::Load(format!(
                "cannot create work directory {}: {}",
                self.work_dir.display(),
                e
            ))
        })?;

        let probe = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TranscoderError::Load(format!("{}: {}", self.binary.display(), e)))?;

        if !probe.status.success() {
            return Err(TranscoderError::Load(format!(
                "{} -version exited with {}",
                self.binary.display(),
                probe.status
            )));
        }

        let version = String::from_utf8_lossy(&probe.stdout);
        debug!(
            binary = %self.binary.display(),
            "{}",
            version.lines().next().unwrap_or("unknown version")
        );
        Ok(())
    }

    async fn transcode(
        &self,
        input: &[u8],
        file_name_hint: &str,
        params: &TranscodeParams,
    ) -> Result<TranscodeOutput, TranscoderError> {
        let (in_path, mid_path) = self.scratch_paths(file_name_hint);

        if let Err(e) = tokio::fs::write(&in_path, input).await {
            Self::remove_quietly(&in_path).await;
            return Err(e.into());
        }

        match self.run(&in_path, &mid_path, params).await {
            Ok(wav) => Ok(TranscodeOutput {
                wav,
                artifacts: vec![in_path, mid_path],
            }),
            Err(e) => {
                Self::remove_quietly(&in_path).await;
                Self::remove_quietly(&mid_path).await;
                Err(e)
            }
        }
    }

    async fn release(&self, artifact: &Path) -> Result<(), CleanupError> {
        match tokio::fs::remove_file(artifact).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CleanupError {
                artifact: artifact.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Command line for one conversion
fn ffmpeg_args(input: &Path, output: &Path, params: &TranscodeParams) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-hide_banner".into(),
        "-y".into(),
        "-i".into(),
        input.into(),
        "-ac".into(),
        params.channels.to_string().into(),
        "-ar".into(),
        params.sample_rate.to_string().into(),
        "-c:a".into(),
        format!("pcm_s{}le", params.bits_per_sample).into(),
    ];
    if params.strip_metadata {
        args.push("-map_metadata".into());
        args.push("-1".into());
    }
    args.push(output.into());
    args
}
