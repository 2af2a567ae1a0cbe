// Uploader: checks the local file, reads it, hands the bytes to a
// `MediaService` and reports every step as a human-readable line. Failures
// never escape; they come back as an `UploadOutcome` variant.

use crate::api::{MediaService, UploadResponse};
use crate::error::{ServiceError, UploadFailure};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// One file to upload and the name it should get remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub local_path: PathBuf,
    pub remote_name: String,
}

impl UploadRequest {
    pub fn new(local_path: impl Into<PathBuf>, remote_name: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            remote_name: remote_name.into(),
        }
    }
}

/// A successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    pub remote_url: Option<String>,
    pub remote_id: Option<String>,
    pub raw_response: Value,
    /// Wall-clock time spent in the service call.
    pub elapsed: Duration,
}

/// Diagnostic for a path that does not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingFile {
    pub path: PathBuf,
    pub working_dir: Option<PathBuf>,
    pub listing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Missing(MissingFile),
    Uploaded(UploadResult),
    Failed(UploadFailure),
}

impl UploadOutcome {
    /// The upload result, or `None` if the file was missing or the upload
    /// failed.
    pub fn result(&self) -> Option<&UploadResult> {
        match self {
            Self::Uploaded(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<UploadResult> {
        match self {
            Self::Uploaded(r) => Some(r),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&UploadFailure> {
        match self {
            Self::Failed(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Uploaded(_))
    }
}

/// Runs uploads against `S`, writing diagnostics to `W` (stdout by default).
pub struct Uploader<S, W = io::Stdout> {
    service: S,
    out: W,
    spinner: bool,
}

impl<S: MediaService> Uploader<S, io::Stdout> {
    pub fn new(service: S) -> Self {
        Self::with_output(service, io::stdout())
    }
}

impl<S: MediaService, W: Write> Uploader<S, W> {
    pub fn with_output(service: S, out: W) -> Self {
        Uploader {
            service,
            out,
            spinner: false,
        }
    }

    /// Show a spinner on stderr while the service call runs.
    pub fn spinner(mut self, enabled: bool) -> Self {
        self.spinner = enabled;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn into_parts(self) -> (S, W) {
        (self.service, self.out)
    }

    // Diagnostics are best effort; a broken stdout must not change the outcome.
    fn say(&mut self, line: impl AsRef<str>) {
        let _ = writeln!(self.out, "{}", line.as_ref());
    }

    pub fn upload(&mut self, req: &UploadRequest) -> UploadOutcome {
        self.say("Starting upload process");
        let path = req.local_path.as_path();

        if !path.exists() {
            let missing = missing_file(path);
            self.report_missing(&missing);
            return UploadOutcome::Missing(missing);
        }

        self.say(format!("✓ File found: {}", path.display()));
        match std::fs::metadata(path) {
            Ok(meta) => {
                let size = meta.len();
                self.say(format!(
                    "✓ File size: {} bytes ({:.2} KB)",
                    size,
                    size as f64 / 1024.0
                ));
            }
            Err(e) => log::debug!("could not stat {}: {}", path.display(), e),
        }

        self.say("Reading file...");
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Removed between the existence check and the read.
                self.say(format!("❌ File Error: {}", e));
                return UploadOutcome::Missing(missing_file(path));
            }
            Err(e) => {
                let failure = UploadFailure::from_io(&e);
                self.report_failure(&failure);
                return UploadOutcome::Failed(failure);
            }
        };
        self.say(format!("✓ File read successfully: {} bytes", data.len()));

        self.say("Uploading...");
        let (res, elapsed) = self.timed_upload(data, &req.remote_name);

        match res {
            Ok(resp) => {
                self.say(format!(
                    "✓ Upload completed in {:.2} seconds",
                    elapsed.as_secs_f64()
                ));
                let result = into_result(resp, elapsed);
                self.report_success(&result);
                log::info!(
                    "uploaded {} as {:?} in {:?}",
                    path.display(),
                    req.remote_name,
                    elapsed
                );
                UploadOutcome::Uploaded(result)
            }
            Err(e) => {
                log::warn!("upload of {} failed: {}", path.display(), e);
                let failure = UploadFailure::from(&e);
                self.report_failure(&failure);
                UploadOutcome::Failed(failure)
            }
        }
    }

    fn timed_upload(
        &self,
        data: Vec<u8>,
        remote_name: &str,
    ) -> (Result<UploadResponse, ServiceError>, Duration) {
        let spinner = if self.spinner {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
                pb.set_style(style);
            }
            pb.set_message("Uploading...");
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };

        let start = Instant::now();
        let res = self.service.upload_file(data, remote_name);
        let elapsed = start.elapsed();
        spinner.finish_and_clear();
        (res, elapsed)
    }

    fn report_missing(&mut self, missing: &MissingFile) {
        self.say(format!("❌ File not found: {}", missing.path.display()));
        match &missing.working_dir {
            Some(dir) => self.say(format!("Current directory: {}", dir.display())),
            None => self.say("Current directory: <unavailable>"),
        }
        self.say(format!("Files in current directory: {:?}", missing.listing));
    }

    fn report_success(&mut self, result: &UploadResult) {
        self.say("✅ Upload successful!");
        self.say(format!(
            "URL: {}",
            result.remote_url.as_deref().unwrap_or("N/A")
        ));
        self.say(format!(
            "File ID: {}",
            result.remote_id.as_deref().unwrap_or("N/A")
        ));
        self.say(format!("Full response: {}", pretty(&result.raw_response)));
    }

    fn report_failure(&mut self, failure: &UploadFailure) {
        self.say("❌ Error during upload:");
        self.say(format!("Error Type: {}", failure.error_kind));
        self.say(format!("Error Message: {}", failure.message));
        if let Some(status) = failure.status_code {
            self.say(format!("Status Code: {}", status));
        }
        if let Some(raw) = &failure.raw_response {
            self.say(format!("Raw Response: {}", pretty(raw)));
        }
        if !failure.causes.is_empty() {
            self.say("Caused by:");
            for (i, cause) in failure.causes.iter().enumerate() {
                self.say(format!("  {}: {}", i, cause));
            }
        }
    }
}

fn into_result(resp: UploadResponse, elapsed: Duration) -> UploadResult {
    UploadResult {
        remote_url: resp.url().map(str::to_string),
        remote_id: resp.file_id().map(str::to_string),
        raw_response: resp.raw,
        elapsed,
    }
}

fn pretty(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}

/// Collect the working directory and its entries for the not-found report.
fn missing_file(path: &Path) -> MissingFile {
    let working_dir = std::env::current_dir().ok();
    let mut listing: Vec<String> = match std::fs::read_dir(".") {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(e) => {
            log::debug!("could not list current directory: {}", e);
            Vec::new()
        }
    };
    listing.sort();
    MissingFile {
        path: path.to_path_buf(),
        working_dir,
        listing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    struct Fixed(Value);

    impl MediaService for Fixed {
        fn upload_file(&self, _data: Vec<u8>, _name: &str) -> Result<UploadResponse, ServiceError> {
            Ok(UploadResponse::from_value(self.0.clone()))
        }
    }

    struct Rejecting {
        calls: Cell<u32>,
    }

    impl MediaService for Rejecting {
        fn upload_file(&self, _data: Vec<u8>, _name: &str) -> Result<UploadResponse, ServiceError> {
            self.calls.set(self.calls.get() + 1);
            Err(ServiceError::api(
                400,
                "A file with this name is not allowed",
                Some(json!({"message": "A file with this name is not allowed"})),
            ))
        }
    }

    fn output<S: MediaService>(uploader: Uploader<S, Vec<u8>>) -> String {
        String::from_utf8(uploader.into_output()).unwrap()
    }

    #[test]
    fn outcome_helpers() {
        let ok = UploadOutcome::Uploaded(UploadResult {
            remote_url: None,
            remote_id: None,
            raw_response: json!({}),
            elapsed: Duration::ZERO,
        });
        assert!(ok.is_success());
        assert!(ok.result().is_some());
        assert!(ok.failure().is_none());

        let missing = UploadOutcome::Missing(MissingFile {
            path: "x".into(),
            working_dir: None,
            listing: vec![],
        });
        assert!(missing.result().is_none());
        assert!(missing.into_result().is_none());
    }

    #[test]
    fn success_without_locator_prints_na() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.bin");
        std::fs::write(&file, b"abc").unwrap();

        let mut up = Uploader::with_output(Fixed(json!({"name": "a.bin"})), Vec::new());
        let outcome = up.upload(&UploadRequest::new(&file, "a.bin"));

        let result = outcome.result().unwrap();
        assert_eq!(result.remote_url, None);
        assert_eq!(result.remote_id, None);

        let out = output(up);
        assert!(out.contains("URL: N/A"));
        assert!(out.contains("File ID: N/A"));
        assert!(out.contains("✓ File size: 3 bytes (0.00 KB)"));
    }

    #[test]
    fn failure_is_reported_not_propagated() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("b.png");
        std::fs::write(&file, vec![0u8; 2048]).unwrap();

        let svc = Rejecting { calls: Cell::new(0) };
        let mut up = Uploader::with_output(svc, Vec::new());
        let outcome = up.upload(&UploadRequest::new(&file, "b.png"));

        assert_eq!(up.service().calls.get(), 1);
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.error_kind, "api");
        assert_eq!(failure.status_code, Some(400));
        assert!(outcome.result().is_none());

        let out = output(up);
        assert!(out.contains("❌ Error during upload:"));
        assert!(out.contains("Status Code: 400"));
        assert!(out.contains("Raw Response:"));
    }

    #[test]
    fn unreadable_path_is_an_io_failure() {
        // A directory exists but cannot be read as a file.
        let dir = tempfile::tempdir().unwrap();
        let svc = Rejecting { calls: Cell::new(0) };
        let mut up = Uploader::with_output(svc, Vec::new());
        let outcome = up.upload(&UploadRequest::new(dir.path(), "dir.png"));

        assert_eq!(up.service().calls.get(), 0);
        assert_eq!(outcome.failure().unwrap().error_kind, "io");
    }
}
