//! PDF export driver.
//!
//! Stage 5 of the bookc pipeline, run only with `--pdf`. Hands the written
//! HTML document to a headless browser and returns the printed PDF bytes.
//!
//! | Concern | Where |
//! |---|---|
//! | Browser | [`PdfRenderer`] trait, [`ChromeRenderer`] in production |
//! | Timeout | worker thread + `recv_timeout`, one deadline for all attempts |
//! | Cancellation | [`CancelToken`], polled while waiting |
//! | Retry | one extra attempt after a browser launch failure |
//! | Writing | [`write_pdf`]: temp file + rename |
//!
//! A timed-out attempt is abandoned, not killed: its worker thread finishes
//! on its own and the browser shuts down through its idle timeout.

mod chrome;
pub mod renderer;

pub use chrome::ChromeRenderer;
pub use renderer::{PdfRenderer, PrintSettings, RenderFailure};

use crate::config::ExportConfig;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// How often the driver checks the cancel token while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Launch failures are retried this many times.
const LAUNCH_RETRIES: usize = 1;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("PDF export of {path} failed: {reason}")]
    ExportFailed { path: PathBuf, reason: String },
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Shared flag to abandon an export in progress.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything the driver needs besides the document path.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Upper bound on the whole export, retries included.
    pub timeout: Duration,
    pub print: PrintSettings,
    pub sandbox: bool,
    pub chrome_path: Option<PathBuf>,
}

impl ExportOptions {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            print: PrintSettings::from_config(config),
            sandbox: config.sandbox,
            chrome_path: config.chrome_path.clone(),
        }
    }
}

/// Export `document` to PDF with headless Chrome.
pub fn export_pdf(document: &Path, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    let renderer = Arc::new(ChromeRenderer::new(
        options.sandbox,
        options.chrome_path.clone(),
    ));
    export_pdf_with(renderer, document, options, &CancelToken::new())
}

/// Export `document` to PDF with any renderer.
///
/// Fails with [`ExportError::ExportFailed`] on a missing document, a render
/// error, a second launch failure, timeout, cancellation, or a crashed worker.
pub fn export_pdf_with(
    renderer: Arc<dyn PdfRenderer>,
    document: &Path,
    options: &ExportOptions,
    cancel: &CancelToken,
) -> Result<Vec<u8>, ExportError> {
    let failed = |reason: String| ExportError::ExportFailed {
        path: document.to_path_buf(),
        reason,
    };

    let absolute = document
        .canonicalize()
        .map_err(|e| failed(format!("document not readable: {e}")))?;
    let url = file_url(&absolute);
    let deadline = Instant::now() + options.timeout;

    let mut attempt = 0;
    loop {
        attempt += 1;
        debug!("PDF export attempt {attempt} for {url}");
        match run_attempt(Arc::clone(&renderer), &url, &options.print, deadline, cancel) {
            Ok(bytes) => {
                info!("exported {} ({} bytes)", document.display(), bytes.len());
                return Ok(bytes);
            }
            Err(AttemptError::Renderer(RenderFailure::Launch(reason)))
                if attempt <= LAUNCH_RETRIES =>
            {
                warn!("browser launch failed ({reason}), retrying");
            }
            Err(e) => return Err(failed(e.to_string())),
        }
    }
}

#[derive(Error, Debug)]
enum AttemptError {
    #[error(transparent)]
    Renderer(RenderFailure),
    #[error("timed out")]
    Timeout,
    #[error("cancelled")]
    Cancelled,
    #[error("renderer crashed")]
    Crashed,
}

/// One render on a worker thread, bounded by `deadline` and `cancel`.
fn run_attempt(
    renderer: Arc<dyn PdfRenderer>,
    url: &str,
    settings: &PrintSettings,
    deadline: Instant,
    cancel: &CancelToken,
) -> Result<Vec<u8>, AttemptError> {
    let (tx, rx) = mpsc::channel();
    let url = url.to_string();
    let settings = settings.clone();
    thread::Builder::new()
        .name("pdf-export".to_string())
        .spawn(move || {
            let _ = tx.send(renderer.render_pdf(&url, &settings));
        })
        .map_err(|_| AttemptError::Crashed)?;

    loop {
        if cancel.is_cancelled() {
            return Err(AttemptError::Cancelled);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(AttemptError::Timeout);
        }
        match rx.recv_timeout(remaining.min(POLL_INTERVAL)) {
            Ok(result) => return result.map_err(AttemptError::Renderer),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Err(AttemptError::Crashed),
        }
    }
}

fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    let mut url = String::from("file://");
    if !path.starts_with('/') {
        url.push('/');
    }
    for c in path.chars() {
        match c {
            ' ' => url.push_str("%20"),
            '#' => url.push_str("%23"),
            '?' => url.push_str("%3F"),
            '%' => url.push_str("%25"),
            c => url.push(c),
        }
    }
    url
}

/// Write PDF bytes to `dest` without ever leaving a partial file there.
pub fn write_pdf(bytes: &[u8], dest: &Path) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: dest.to_path_buf(),
        source,
    };
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "book.pdf".to_string());
    let tmp = dest.with_file_name(format!(".{file_name}.partial"));

    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(e));
    }
    fs::rename(&tmp, dest).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        io_err(e)
    })
}
