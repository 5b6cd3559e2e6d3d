//! Headless Chrome renderer.
//!
//! Launches a fresh browser per render, loads the compiled document from
//! `file://`, waits for client-side diagrams to finish, and prints with the
//! DevTools `Page.printToPDF` call. Internal `#anchor` links survive as PDF
//! links; page breaks come from the document's print stylesheet.

use super::renderer::{PdfRenderer, PrintSettings, RenderFailure};
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::path::PathBuf;

/// Selector set by `book.js` once diagrams are drawn.
const READY_SELECTOR: &str = "body[data-render-ready]";

#[derive(Debug, Clone, Default)]
pub struct ChromeRenderer {
    /// Run Chrome with its sandbox. Containers running as root need `false`.
    pub sandbox: bool,
    /// Explicit browser binary; auto-detected when `None`.
    pub chrome_path: Option<PathBuf>,
}

impl ChromeRenderer {
    pub fn new(sandbox: bool, chrome_path: Option<PathBuf>) -> Self {
        Self {
            sandbox,
            chrome_path,
        }
    }
}

impl PdfRenderer for ChromeRenderer {
    fn render_pdf(&self, url: &str, settings: &PrintSettings) -> Result<Vec<u8>, RenderFailure> {
        let browser = Browser::new(LaunchOptions {
            headless: true,
            sandbox: self.sandbox,
            path: self.chrome_path.clone(),
            idle_browser_timeout: settings.timeout,
            window_size: Some((1280, 1024)),
            ..Default::default()
        })
        .map_err(|e| RenderFailure::Launch(e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| RenderFailure::Render(format!("could not open tab: {e}")))?;
        tab.set_default_timeout(settings.timeout);

        debug!("loading {url}");
        tab.navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| RenderFailure::Render(format!("navigation failed: {e}")))?;

        if let Err(e) = tab.wait_for_element(READY_SELECTOR) {
            warn!("page never signalled render-ready, printing anyway: {e}");
        }

        let (width, height) = settings.paper.inches();
        let margin = settings.margin_inches();
        let pdf = tab
            .print_to_pdf(Some(PrintToPdfOptions {
                landscape: Some(false),
                print_background: Some(settings.print_background),
                paper_width: Some(width),
                paper_height: Some(height),
                margin_top: Some(margin),
                margin_bottom: Some(margin),
                margin_left: Some(margin),
                margin_right: Some(margin),
                prefer_css_page_size: Some(true),
                ..Default::default()
            }))
            .map_err(|e| RenderFailure::Render(format!("print failed: {e}")))?;

        debug!("printed {} bytes", pdf.len());
        Ok(pdf)
    }
}
