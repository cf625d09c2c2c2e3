// Upload orchestration: sign, transfer and confirm each registered handle,
// one handle at a time. A failing handle is recorded and skipped; it never
// stops the handles after it.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::api::DatasetApi;
use crate::error::{RequestFailure, UploadError};
use crate::retry::RetryPolicy;

/// A registered slot waiting for its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHandle {
    pub upload_id: String,
    pub file_name: String,
    pub slot_name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Sign,
    Transfer,
    Confirm,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::Sign => "sign",
            Step::Transfer => "transfer",
            Step::Confirm => "confirm",
        };
        f.write_str(s)
    }
}

/// Receives progress while handles are processed. The terminal UI draws a
/// progress bar from these; tests record them.
pub trait UploadObserver {
    fn started(&mut self, _total: usize) {}
    fn step_done(&mut self, _handle: &UploadHandle, _step: Step, _status: Option<u16>) {}
    fn handle_done(&mut self, _handle: &UploadHandle, _failure: Option<(Step, &UploadError)>) {}
    fn finished(&mut self, _report: &UploadReport) {}
}

/// Observer that ignores everything.
pub struct Silent;

impl UploadObserver for Silent {}

#[derive(Debug)]
pub struct HandleFailure {
    pub handle: UploadHandle,
    pub step: Step,
    pub error: UploadError,
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub items_registered: usize,
    pub blocked_items: Vec<String>,
    pub succeeded: Vec<UploadHandle>,
    pub failed: Vec<HandleFailure>,
}

impl UploadReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.blocked_items.is_empty()
    }
}

pub struct Uploader<'a, A: DatasetApi + ?Sized> {
    api: &'a A,
    batch_name: &'a str,
    retry: RetryPolicy,
}

impl<'a, A: DatasetApi + ?Sized> Uploader<'a, A> {
    pub fn new(api: &'a A, batch_name: &'a str, retry: RetryPolicy) -> Self {
        Uploader {
            api,
            batch_name,
            retry,
        }
    }

    /// Process every handle in order and collect the outcome.
    pub fn run(&self, handles: &[UploadHandle], observer: &mut dyn UploadObserver) -> UploadReport {
        observer.started(handles.len());
        let mut report = UploadReport::default();

        for handle in handles {
            match self.upload_one(handle, observer) {
                Ok(()) => {
                    observer.handle_done(handle, None);
                    info!("Uploaded {} into slot {}", handle.file_name, handle.slot_name);
                    report.succeeded.push(handle.clone());
                }
                Err((step, error)) => {
                    warn!("Upload of {} failed at {}: {}", handle.file_name, step, error);
                    observer.handle_done(handle, Some((step, &error)));
                    report.failed.push(HandleFailure {
                        handle: handle.clone(),
                        step,
                        error,
                    });
                }
            }
        }

        observer.finished(&report);
        report
    }

    fn upload_one(
        &self,
        handle: &UploadHandle,
        observer: &mut dyn UploadObserver,
    ) -> Result<(), (Step, UploadError)> {
        let id = handle.upload_id.as_str();

        let upload_url = self
            .retry
            .run(&format!("sign {}", id), || self.api.sign_upload(id))
            .map_err(|source| {
                (
                    Step::Sign,
                    UploadError::Signing {
                        upload_id: id.to_string(),
                        source,
                    },
                )
            })?;
        observer.step_done(handle, Step::Sign, None);

        let transfer_err = |source: RequestFailure| {
            (
                Step::Transfer,
                UploadError::Transfer {
                    upload_id: id.to_string(),
                    source,
                },
            )
        };
        let data = fs::read(&handle.path).map_err(|e| {
            transfer_err(RequestFailure::Read(format!("{}: {}", handle.path.display(), e)))
        })?;
        let status = self
            .retry
            .run(&format!("transfer {}", id), || {
                self.api.put_file(&upload_url, data.clone())
            })
            .map_err(transfer_err)?;
        observer.step_done(handle, Step::Transfer, Some(status));

        let status = self
            .retry
            .run(&format!("confirm {}", id), || {
                self.api.confirm_upload(id, self.batch_name)
            })
            .map_err(|source| {
                (
                    Step::Confirm,
                    UploadError::Confirm {
                        upload_id: id.to_string(),
                        source,
                    },
                )
            })?;
        observer.step_done(handle, Step::Confirm, Some(status));
        Ok(())
    }
}
