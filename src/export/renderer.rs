//! PDF renderer trait and shared types.
//!
//! The [`PdfRenderer`] trait is the single seam between the export driver
//! and a browser. The production implementation is
//! [`ChromeRenderer`](super::chrome::ChromeRenderer); tests substitute a mock.

use crate::config::{ExportConfig, Paper};
use std::time::Duration;
use thiserror::Error;

/// Why a single render attempt failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderFailure {
    /// The browser could not be started. Worth one retry.
    #[error("browser launch failed: {0}")]
    Launch(String),
    /// The browser started but loading or printing the page failed.
    #[error("{0}")]
    Render(String),
}

/// Page settings handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintSettings {
    pub paper: Paper,
    pub margin_mm: f64,
    pub print_background: bool,
    /// Per-operation timeout inside the browser (navigation, waits).
    pub timeout: Duration,
}

impl PrintSettings {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            paper: config.paper,
            margin_mm: config.margin_mm,
            print_background: config.print_background,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Margin in inches, the unit Chrome's print API uses.
    pub fn margin_inches(&self) -> f64 {
        self.margin_mm / 25.4
    }
}

/// Something that turns a loaded page into PDF bytes.
///
/// Implementations run on the export worker thread, so they must be `Send`
/// and `Sync`. The driver owns timeouts, cancellation, and retries.
pub trait PdfRenderer: Send + Sync {
    /// Load `url` and print it.
    fn render_pdf(&self, url: &str, settings: &PrintSettings) -> Result<Vec<u8>, RenderFailure>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock renderer that replays scripted outcomes and records calls.
    /// Uses Mutex (not RefCell) so it is Sync and can move to the worker.
    #[derive(Default)]
    pub struct MockRenderer {
        /// Outcomes returned in order; an exhausted script returns a tiny PDF.
        pub outcomes: Mutex<Vec<Result<Vec<u8>, RenderFailure>>>,
        /// Each call sleeps this long first.
        pub delay: Duration,
        pub calls: Mutex<Vec<String>>,
    }

    impl MockRenderer {
        pub fn with_outcomes(outcomes: Vec<Result<Vec<u8>, RenderFailure>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                ..Default::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl PdfRenderer for MockRenderer {
        fn render_pdf(
            &self,
            url: &str,
            _settings: &PrintSettings,
        ) -> Result<Vec<u8>, RenderFailure> {
            self.calls.lock().unwrap().push(url.to_string());
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                Ok(b"%PDF-1.7\n%%EOF\n".to_vec())
            } else {
                outcomes.remove(0)
            }
        }
    }

    #[test]
    fn settings_from_config() {
        let config = ExportConfig {
            margin_mm: 25.4,
            timeout_secs: 7,
            ..Default::default()
        };
        let settings = PrintSettings::from_config(&config);
        assert_eq!(settings.paper, Paper::A4);
        assert!((settings.margin_inches() - 1.0).abs() < f64::EPSILON);
        assert_eq!(settings.timeout, Duration::from_secs(7));
    }

    #[test]
    fn mock_replays_outcomes_in_order() {
        let mock = MockRenderer::with_outcomes(vec![
            Err(RenderFailure::Launch("no chrome".into())),
            Ok(b"pdf".to_vec()),
        ]);
        let settings = PrintSettings::from_config(&ExportConfig::default());
        assert!(mock.render_pdf("file:///a", &settings).is_err());
        assert_eq!(mock.render_pdf("file:///a", &settings).unwrap(), b"pdf");
        assert_eq!(mock.call_count(), 2);
    }
}
