//! Progress indicators for the command-line surface
//!
//! Terminal progress for the version check and the binary download, built on
//! `indicatif`. [`ProgressObserver`] adapts a download bar to the
//! [`UpdateObserver`] callbacks of the update core.
//!
//! # Environment Variables
//!
//! - `VDPRO_NO_PROGRESS`: Set to any value other than `0`/`false` to disable
//!   all progress indicators
//!   (the global `--no-progress` flag has the same effect)
//!
//! # Examples
//!
//! ```rust
//! use vdpro::utils::progress::ProgressBar;
//!
//! let spinner = ProgressBar::new_spinner();
//! spinner.set_message("Checking for updates...");
//! spinner.finish_and_clear();
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

use crate::upgrade::UpdateObserver;

/// Environment variable that hides every progress indicator.
pub const NO_PROGRESS_ENV: &str = "VDPRO_NO_PROGRESS";

/// Number of steps a fractional download bar is divided into.
const FRACTION_STEPS: u64 = 1000;

fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV)
        .map(|v| !matches!(v.to_lowercase().as_str(), "" | "0" | "false" | "no" | "off"))
        .unwrap_or(false)
}

/// A progress bar with consistent styling.
///
/// Hidden (all calls become no-ops) when `VDPRO_NO_PROGRESS` is set.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// A bar that draws nothing.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Bar tracking a download as a fraction of its total size.
    pub fn new_download() -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(FRACTION_STEPS);
            bar.set_style(ProgressStyle::download());
            bar
        };
        Self { inner: bar }
    }

    /// Spinner for work of unknown length.
    pub fn new_spinner() -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(ProgressStyle::spinner());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self { inner: bar }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    /// Move a download bar to `fraction` (`0.0..=1.0`).
    pub fn set_fraction(&self, fraction: f64) {
        let clamped = fraction.clamp(0.0, 1.0);
        self.inner.set_position((clamped * FRACTION_STEPS as f64).round() as u64);
    }

    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    /// Stop the bar where it is, keeping its last line on screen.
    pub fn abandon(&self) {
        self.inner.abandon();
    }

    pub fn message(&self) -> String {
        self.inner.message()
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    /// Current position in steps of a thousandth.
    pub fn position(&self) -> u64 {
        self.inner.position()
    }
}

/// Predefined styles.
pub struct ProgressStyle;

impl ProgressStyle {
    /// `{prefix} [{bar}] {percent}% ({eta})`
    pub fn download() -> IndicatifStyle {
        template(
            IndicatifStyle::default_bar(),
            "{prefix:.bold.cyan} [{bar:40.cyan/blue}] {percent:>3}% ({eta})",
        )
        .progress_chars("━╸━")
    }

    pub fn spinner() -> IndicatifStyle {
        template(IndicatifStyle::default_spinner(), "{spinner:.cyan} {msg}")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
    }
}

fn template(base: IndicatifStyle, template: &str) -> IndicatifStyle {
    base.clone().template(template).unwrap_or(base)
}

/// Shows update callbacks on a terminal progress bar.
pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    /// Observer drawing a download bar, or nothing when `show` is false.
    pub fn new(target_version: &str, show: bool) -> Self {
        let bar = if show { ProgressBar::new_download() } else { ProgressBar::hidden() };
        bar.set_prefix(format!("Downloading {target_version}"));
        Self { bar }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl UpdateObserver for ProgressObserver {
    fn on_progress(&self, fraction: f64) {
        self.bar.set_fraction(fraction);
    }

    fn on_complete(&self) {
        self.bar.finish_with_message("done");
    }

    /// The caller reports the error itself.
    fn on_error(&self, _message: &str) {
        self.bar.abandon();
    }
}
