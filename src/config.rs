//! Book configuration.
//!
//! Handles loading, validating, and merging `book.toml`. The file lives in
//! the source directory next to the chapters (or anywhere, via `--config`)
//! and is entirely optional: stock defaults cover every key.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [book]
//! title = "Untitled Book"
//! author = ""               # Omitted from the output when empty
//! language = "en"
//! description = ""
//!
//! [output]
//! html_file = "book.html"
//! pdf_file = "book.pdf"
//! assets_dir = "assets"     # Copied verbatim from the source directory
//!
//! [render]
//! diagram_languages = ["mermaid"]
//! diagram_script = "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js"
//! highlight_script = "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/highlight.min.js"
//! highlight_stylesheet = "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/styles/github.min.css"
//!
//! [theme]
//! content_width = "42rem"
//!
//! [theme.colors.light]
//! background = "#ffffff"
//! text = "#1a1a1a"
//! ...
//!
//! [export]
//! timeout_secs = 120
//! paper = "a4"              # "a4" or "letter"
//! margin_mm = 18
//! print_background = true
//! sandbox = true
//! # chrome_path = "/usr/bin/chromium"
//!
//! [processing]
//! # max_threads = 4         # Omit for auto = CPU cores
//! ```
//!
//! Config files are sparse: override only the values you need. Unknown keys
//! are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in the source directory.
pub const CONFIG_FILE: &str = "book.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Book configuration loaded from `book.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BookConfig {
    /// Metadata shown in the document head and title block.
    pub book: BookMeta,
    /// Output file names.
    pub output: OutputConfig,
    /// Client-side libraries and diagram languages.
    pub render: RenderConfig,
    /// Colors and layout.
    pub theme: ThemeConfig,
    /// PDF export settings.
    pub export: ExportConfig,
    /// Parallel parsing/rendering settings.
    pub processing: ProcessingConfig,
}

impl BookConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.book.title.trim().is_empty() {
            return Err(ConfigError::Validation("book.title must not be empty".into()));
        }
        for (key, name) in [
            ("output.html_file", &self.output.html_file),
            ("output.pdf_file", &self.output.pdf_file),
        ] {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a plain file name, got '{name}'"
                )));
            }
        }
        if self.output.html_file == self.output.pdf_file {
            return Err(ConfigError::Validation(
                "output.html_file and output.pdf_file must differ".into(),
            ));
        }
        if self.export.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "export.timeout_secs must be non-zero".into(),
            ));
        }
        if self.processing.max_threads == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_threads must be non-zero".into(),
            ));
        }
        if !self.export.margin_mm.is_finite() || self.export.margin_mm < 0.0 {
            return Err(ConfigError::Validation(format!(
                "export.margin_mm must be a non-negative number, got {}",
                self.export.margin_mm
            )));
        }
        for (key, value) in self.theme.css_values() {
            if value.contains(['<', '{', '}', ';']) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a plain CSS value, got '{value}'"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BookMeta {
    pub title: String,
    pub author: String,
    /// BCP 47 language tag for `<html lang>`.
    pub language: String,
    pub description: String,
}

impl Default for BookMeta {
    fn default() -> Self {
        Self {
            title: "Untitled Book".to_string(),
            author: String::new(),
            language: "en".to_string(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub html_file: String,
    pub pdf_file: String,
    /// Directory under the source root copied verbatim into the output.
    pub assets_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            html_file: "book.html".to_string(),
            pdf_file: "book.pdf".to_string(),
            assets_dir: "assets".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Fence languages treated as diagram directives.
    pub diagram_languages: Vec<String>,
    /// Script that renders diagram directives client-side. Empty disables it.
    pub diagram_script: String,
    /// Syntax highlighting script. Empty disables it.
    pub highlight_script: String,
    pub highlight_stylesheet: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            diagram_languages: vec!["mermaid".to_string()],
            diagram_script: "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js"
                .to_string(),
            highlight_script:
                "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/highlight.min.js"
                    .to_string(),
            highlight_stylesheet:
                "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/styles/github.min.css"
                    .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    /// Maximum width of the text column (CSS value).
    pub content_width: String,
    pub colors: ColorConfig,
}

impl ThemeConfig {
    /// Every value that lands verbatim in the generated stylesheet, keyed by
    /// its config path.
    fn css_values(&self) -> Vec<(String, &str)> {
        let mut values = vec![("theme.content_width".to_string(), self.content_width.as_str())];
        for (mode, scheme) in [("light", &self.colors.light), ("dark", &self.colors.dark)] {
            for (name, value) in [
                ("background", &scheme.background),
                ("text", &scheme.text),
                ("text_muted", &scheme.text_muted),
                ("border", &scheme.border),
                ("link", &scheme.link),
                ("takeaways", &scheme.takeaways),
                ("war_story", &scheme.war_story),
                ("note", &scheme.note),
            ] {
                values.push((format!("theme.colors.{mode}.{name}"), value.as_str()));
            }
        }
        values
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            content_width: "42rem".to_string(),
            colors: ColorConfig::default(),
        }
    }
}

/// Color configuration for light and dark modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub light: ColorScheme,
    pub dark: ColorScheme,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::default_light(),
            dark: ColorScheme::default_dark(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    pub background: String,
    pub text: String,
    /// Captions, chapter navigation, TOC numbers.
    pub text_muted: String,
    pub border: String,
    pub link: String,
    /// Key Takeaways box background.
    pub takeaways: String,
    /// War Story box border.
    pub war_story: String,
    /// Note box background.
    pub note: String,
}

impl ColorScheme {
    pub fn default_light() -> Self {
        Self {
            background: "#ffffff".to_string(),
            text: "#1a1a1a".to_string(),
            text_muted: "#666666".to_string(),
            border: "#e0e0e0".to_string(),
            link: "#1f5fbf".to_string(),
            takeaways: "#eef6ee".to_string(),
            war_story: "#b5472d".to_string(),
            note: "#f2f5fa".to_string(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "#111111".to_string(),
            text: "#e8e8e8".to_string(),
            text_muted: "#999999".to_string(),
            border: "#333333".to_string(),
            link: "#7fb2ff".to_string(),
            takeaways: "#1c2a1c".to_string(),
            war_story: "#e0765c".to_string(),
            note: "#1a2230".to_string(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_light()
    }
}

/// Paper size used for the PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Paper {
    #[default]
    A4,
    Letter,
}

impl Paper {
    /// Width and height in inches, as Chrome's print API expects.
    pub fn inches(self) -> (f64, f64) {
        match self {
            Paper::A4 => (8.27, 11.69),
            Paper::Letter => (8.5, 11.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Upper bound on the whole PDF render, browser launch included.
    pub timeout_secs: u64,
    pub paper: Paper,
    pub margin_mm: f64,
    pub print_background: bool,
    /// Run Chrome with its sandbox. Containers often need `false`.
    pub sandbox: bool,
    /// Explicit Chrome/Chromium binary. Auto-detected when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            paper: Paper::A4,
            margin_mm: 18.0,
            print_background: true,
            sandbox: true,
            chrome_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel parse/render workers.
    /// When absent, defaults to the number of CPU cores.
    pub max_threads: Option<usize>,
}

/// Resolve the effective worker count.
///
/// - `None` → all available cores
/// - `Some(n)` → `min(n, cores)`; the user can constrain down, not up
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_threads.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// The stock defaults as a `toml::Value`, the base layer for merging.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(BookConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. `Ok(None)` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(toml::from_str(&content)?))
}

/// Merge an optional overlay onto the stock defaults, deserialize, validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<BookConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: BookConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the book config.
///
/// Uses `explicit` when given (it must exist), otherwise `book.toml` in the
/// source directory if present, otherwise stock defaults.
pub fn load_config(source_dir: &Path, explicit: Option<&Path>) -> Result<BookConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) => {
            let raw = load_raw_config(path)?.ok_or_else(|| ConfigError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })?;
            Some(raw)
        }
        None => load_raw_config(&source_dir.join(CONFIG_FILE))?,
    };
    resolve_config(overlay)
}

/// A fully commented stock `book.toml`, printed by `bookc gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# bookc configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Book metadata
# ---------------------------------------------------------------------------
[book]
title = "Untitled Book"
# Omitted from the output when empty.
author = ""
# Language tag for <html lang>.
language = "en"
description = ""

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
html_file = "book.html"
pdf_file = "book.pdf"
# Directory under the source root copied verbatim next to the HTML
# (images, SQL schemas, translation files...). Never parsed.
assets_dir = "assets"

# ---------------------------------------------------------------------------
# Rendering
# ---------------------------------------------------------------------------
[render]
# Fence languages rendered client-side as diagrams instead of code.
diagram_languages = ["mermaid"]
# Set any of these to "" to leave the include out.
diagram_script = "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js"
highlight_script = "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/highlight.min.js"
highlight_stylesheet = "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/styles/github.min.css"

# ---------------------------------------------------------------------------
# Theme
# ---------------------------------------------------------------------------
[theme]
# Maximum width of the text column.
content_width = "42rem"

[theme.colors.light]
background = "#ffffff"
text = "#1a1a1a"
text_muted = "#666666"
border = "#e0e0e0"
link = "#1f5fbf"
takeaways = "#eef6ee"     # Key Takeaways box
war_story = "#b5472d"     # War Story border
note = "#f2f5fa"          # Note box

[theme.colors.dark]
background = "#111111"
text = "#e8e8e8"
text_muted = "#999999"
border = "#333333"
link = "#7fb2ff"
takeaways = "#1c2a1c"
war_story = "#e0765c"
note = "#1a2230"

# ---------------------------------------------------------------------------
# PDF export (bookc compile --pdf)
# ---------------------------------------------------------------------------
[export]
# Upper bound for the whole render, browser launch included.
timeout_secs = 120
# "a4" or "letter".
paper = "a4"
margin_mm = 18.0
print_background = true
# Chrome's sandbox. Containers running as root usually need false.
sandbox = true
# Explicit browser binary; auto-detected when omitted.
# chrome_path = "/usr/bin/chromium"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel parse/render workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4
"##
}

/// CSS custom properties for the configured theme.
pub fn generate_theme_css(theme: &ThemeConfig) -> String {
    let light = &theme.colors.light;
    let dark = &theme.colors.dark;
    format!(
        r#":root {{
    --content-width: {width};
    --color-bg: {l_bg};
    --color-text: {l_text};
    --color-text-muted: {l_muted};
    --color-border: {l_border};
    --color-link: {l_link};
    --color-takeaways: {l_takeaways};
    --color-war-story: {l_war};
    --color-note: {l_note};
}}

@media screen and (prefers-color-scheme: dark) {{
    :root {{
        --color-bg: {d_bg};
        --color-text: {d_text};
        --color-text-muted: {d_muted};
        --color-border: {d_border};
        --color-link: {d_link};
        --color-takeaways: {d_takeaways};
        --color-war-story: {d_war};
        --color-note: {d_note};
    }}
}}"#,
        width = theme.content_width,
        l_bg = light.background,
        l_text = light.text,
        l_muted = light.text_muted,
        l_border = light.border,
        l_link = light.link,
        l_takeaways = light.takeaways,
        l_war = light.war_story,
        l_note = light.note,
        d_bg = dark.background,
        d_text = dark.text,
        d_muted = dark.text_muted,
        d_border = dark.border,
        d_link = dark.link,
        d_takeaways = dark.takeaways,
        d_war = dark.war_story,
        d_note = dark.note,
    )
}

/// `@page` rule for the configured paper size and margins.
pub fn generate_page_css(export: &ExportConfig) -> String {
    let size = match export.paper {
        Paper::A4 => "A4",
        Paper::Letter => "letter",
    };
    format!(
        "@page {{\n    size: {size};\n    margin: {}mm;\n}}",
        export.margin_mm
    )
}
