//! Sequential batch conversion
//!
//! Files are converted strictly in input order, one at a time. The first
//! failure stops the batch: results already produced stay available, later
//! files are never attempted.
//!
//! Callers that want to stop early drive the batch with
//! [`BatchController::step`] and simply stop calling it.

use crate::error::ConversionError;
use crate::pipeline::{ConversionPipeline, ConversionResult};
use chrono::Utc;
use qtwt_common::events::{ConversionEvent, EventBus};
use qtwt_common::params::SAMPLES_PER_WAVE;
use qtwt_common::ConversionRequest;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// Where an input file's bytes come from
#[derive(Debug, Clone)]
pub enum InputSource {
    Path(PathBuf),
    Memory(Vec<u8>),
}

/// One file selected for conversion
#[derive(Debug, Clone)]
pub struct InputFile {
    /// Display name; also the source of the output name
    pub name: String,
    pub source: InputSource,
}

impl InputFile {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            source: InputSource::Path(path.to_path_buf()),
        }
    }

    pub fn in_memory(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source: InputSource::Memory(bytes),
        }
    }

    async fn read(&self) -> std::io::Result<Cow<'_, [u8]>> {
        match &self.source {
            InputSource::Path(path) => Ok(Cow::Owned(tokio::fs::read(path).await?)),
            InputSource::Memory(bytes) => Ok(Cow::Borrowed(bytes)),
        }
    }
}

/// A file that failed, identified by its 1-based batch position
#[derive(Error, Debug)]
#[error("File {position}/{total} ({file_name}) failed: {source}")]
pub struct BatchError {
    pub position: usize,
    pub total: usize,
    pub file_name: String,
    #[source]
    pub source: ConversionError,
}

/// Outcome of a failed [`BatchController::run_batch`]
#[derive(Error, Debug)]
#[error("{error} ({} converted before the failure)", .completed.len())]
pub struct BatchFailure {
    /// Results produced before the failing file
    pub completed: Vec<ConversionResult>,
    #[source]
    pub error: BatchError,
}

/// Ordered input files and the results accumulated so far
#[derive(Debug)]
pub struct BatchJob {
    files: Vec<InputFile>,
    request: ConversionRequest,
    next: usize,
    failed: bool,
    results: Vec<ConversionResult>,
}

impl BatchJob {
    pub fn new(files: Vec<InputFile>, request: ConversionRequest) -> Self {
        Self {
            files,
            request,
            next: 0,
            failed: false,
            results: Vec::new(),
        }
    }

    /// Forget all progress and results
    pub fn reset(&mut self) {
        self.next = 0;
        self.failed = false;
        self.results.clear();
    }

    pub fn request(&self) -> &ConversionRequest {
        &self.request
    }

    pub fn total(&self) -> usize {
        self.files.len()
    }

    /// Files not yet attempted (0 once the batch has failed)
    pub fn remaining(&self) -> usize {
        if self.failed {
            0
        } else {
            self.files.len() - self.next
        }
    }

    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Results in input order
    pub fn results(&self) -> &[ConversionResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<ConversionResult> {
        self.results
    }
}

/// Drives a [`ConversionPipeline`] over a [`BatchJob`]
pub struct BatchController {
    pipeline: ConversionPipeline,
    events: EventBus,
}

impl BatchController {
    pub fn new(pipeline: ConversionPipeline, events: EventBus) -> Self {
        Self { pipeline, events }
    }

    /// Convert every file of `files`, stopping at the first failure
    pub async fn run_batch(
        &self,
        files: Vec<InputFile>,
        request: ConversionRequest,
    ) -> Result<Vec<ConversionResult>, BatchFailure> {
        let mut job = BatchJob::new(files, request);
        match self.run(&mut job).await {
            Ok(()) => Ok(job.into_results()),
            Err(error) => Err(BatchFailure {
                completed: job.into_results(),
                error,
            }),
        }
    }

    /// Run `job` from the start (previous results are cleared)
    pub async fn run(&self, job: &mut BatchJob) -> Result<(), BatchError> {
        job.reset();

        let request = *job.request();
        info!(
            "Target: {} waves × {} = {} samples",
            request.target_wave_count,
            SAMPLES_PER_WAVE,
            request.target_sample_count()
        );
        info!(
            "Fade: in={}, out={}, length={} samples",
            request.fade_in, request.fade_out, request.fade_length_samples
        );

        self.events.emit_lossy(ConversionEvent::BatchStarted {
            total_files: job.total(),
            target_wave_count: request.target_wave_count.get(),
            target_sample_count: request.target_sample_count(),
            fade_in: request.fade_in,
            fade_out: request.fade_out,
            fade_length_samples: request.fade_length_samples,
            timestamp: Utc::now(),
        });

        let mut outcome = Ok(());
        while let Some(step) = self.step(job).await {
            if let Err(e) = step {
                outcome = Err(e);
                break;
            }
        }

        self.events.emit_lossy(ConversionEvent::BatchCompleted {
            converted: job.results().len(),
            total_files: job.total(),
            failed: job.has_failed(),
            timestamp: Utc::now(),
        });

        if outcome.is_ok() {
            info!("Done. {} file(s) converted.", job.results().len());
        }
        outcome
    }

    /// Convert the next file of `job`
    ///
    /// Returns `None` once every file is done or the batch has failed.
    pub async fn step(&self, job: &mut BatchJob) -> Option<Result<(), BatchError>> {
        if job.is_finished() {
            return None;
        }

        let index = job.next;
        let position = index + 1;
        let total = job.total();
        let request = *job.request();
        let file = &job.files[index];
        let file_name = file.name.clone();

        info!("[{}/{}] Converting: {}", position, total, file_name);
        self.events.emit_lossy(ConversionEvent::FileStarted {
            position,
            total_files: total,
            file_name: file_name.clone(),
            timestamp: Utc::now(),
        });

        let outcome = match file.read().await {
            Ok(bytes) => self.pipeline.convert(&bytes, &file_name, &request).await,
            Err(e) => Err(ConversionError::Input(e)),
        };

        match outcome {
            Ok(result) => {
                info!("OK: {}", result.output_name);
                self.events.emit_lossy(ConversionEvent::FileConverted {
                    position,
                    total_files: total,
                    file_name,
                    output_name: result.output_name.clone(),
                    input_sample_count: result.input_sample_count,
                    output_sample_count: result.output_sample_count,
                    timestamp: Utc::now(),
                });
                job.results.push(result);
                job.next += 1;
                Some(Ok(()))
            }
            Err(source) => {
                error!("ERROR on {}: {}", file_name, source);
                self.events.emit_lossy(ConversionEvent::FileFailed {
                    position,
                    total_files: total,
                    file_name: file_name.clone(),
                    error: source.to_string(),
                    timestamp: Utc::now(),
                });
                job.failed = true;
                Some(Err(BatchError {
                    position,
                    total,
                    file_name,
                    source,
                }))
            }
        }
    }
}
