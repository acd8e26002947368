//! Run configuration: user settings plus the capabilities probed once at
//! startup. Both are passed explicitly to the components that need them.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::charts::raster::{install_font, RasterBackend};
use crate::charts::BackendKind;
use crate::report::REPORT_FILE;

pub const DEFAULT_DATA_PATH: &str = "data/cleaned_data.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";

/// User-facing settings, filled from CLI flags and environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Dataset used when nothing is uploaded.
    pub data_path: PathBuf,
    /// Where the EDA report images and PDF go.
    pub output_dir: PathBuf,
    /// TrueType font for static chart text.
    pub font_path: Option<PathBuf>,
    /// Use the static backend even when interactive plots are available.
    pub prefer_static: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            font_path: None,
            prefer_static: false,
        }
    }
}

/// What this process can do, decided once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// The dashboard can be opened (built with `gui` and a display exists).
    pub interactive: bool,
    /// Backend for dashboard charts.
    pub charts: BackendKind,
    /// Static charts can draw text.
    pub chart_labels: bool,
}

impl Capabilities {
    pub fn probe(settings: &Settings) -> Self {
        let interactive = cfg!(feature = "gui") && display_available();
        let chart_labels = install_font(settings.font_path.as_deref());
        Self::resolve(settings, interactive, chart_labels)
    }

    /// Combine probe results with the settings.
    pub fn resolve(settings: &Settings, interactive: bool, chart_labels: bool) -> Self {
        let charts = if interactive && !settings.prefer_static {
            BackendKind::Interactive
        } else {
            BackendKind::Static
        };
        Capabilities {
            interactive,
            charts,
            chart_labels,
        }
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn display_available() -> bool {
    ["DISPLAY", "WAYLAND_DISPLAY"]
        .iter()
        .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn display_available() -> bool {
    true
}

/// Settings and capabilities together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeConfig {
    pub settings: Settings,
    pub capabilities: Capabilities,
}

impl RuntimeConfig {
    /// Probe capabilities for `settings`.
    pub fn probe(settings: Settings) -> Self {
        let capabilities = Capabilities::probe(&settings);
        log::info!(
            "Capabilities: interactive={} charts={:?} chart_labels={}",
            capabilities.interactive,
            capabilities.charts,
            capabilities.chart_labels
        );
        RuntimeConfig {
            settings,
            capabilities,
        }
    }

    /// Static chart renderer matching the probed font support.
    pub fn raster_backend(&self) -> RasterBackend {
        RasterBackend::new(self.capabilities.chart_labels)
    }

    pub fn output_dir(&self) -> &Path {
        &self.settings.output_dir
    }

    pub fn report_pdf(&self) -> PathBuf {
        self.settings.output_dir.join(REPORT_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interactive_when_available() {
        let caps = Capabilities::resolve(&Settings::default(), true, true);
        assert_eq!(caps.charts, BackendKind::Interactive);
    }

    #[test]
    fn static_when_headless_or_preferred() {
        let caps = Capabilities::resolve(&Settings::default(), false, true);
        assert_eq!(caps.charts, BackendKind::Static);

        let settings = Settings {
            prefer_static: true,
            ..Settings::default()
        };
        let caps = Capabilities::resolve(&settings, true, false);
        assert_eq!(caps.charts, BackendKind::Static);
        assert!(caps.interactive);
    }

    #[test]
    fn report_pdf_lives_in_output_dir() {
        let config = RuntimeConfig {
            settings: Settings::default(),
            capabilities: Capabilities::resolve(&Settings::default(), false, false),
        };
        assert_eq!(config.report_pdf(), PathBuf::from("outputs/EDA_report.pdf"));
    }
}
