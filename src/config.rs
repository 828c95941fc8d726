use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::render::fade::FadeMode;
use crate::slideshow::{IdleResume, SlideshowSettings};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// JSON manifest listing the artwork, in display order.
    pub manifest: PathBuf,
    /// Directory image locators resolve against; defaults to the manifest's directory.
    pub asset_root: Option<PathBuf>,
    /// Time an image stays on screen before auto-advancing.
    #[serde(with = "humantime_serde")]
    pub dwell: Duration,
    /// Inactivity required after pointer movement before auto-advance resumes.
    #[serde(with = "humantime_serde")]
    pub idle_window: Duration,
    /// Cross-fade duration.
    #[serde(with = "humantime_serde")]
    pub fade: Duration,
    pub fade_mode: FadeMode,
    /// How repeated pointer activity interacts with a pending resume.
    pub idle_resume: IdleResume,
    pub fullscreen: bool,
    /// Letterbox colour as `[r, g, b]`.
    pub background: [u8; 3],
}

impl Configuration {
    /// Parse a YAML file. A relative `manifest` path is taken relative to the
    /// file's directory.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut cfg: Self = serde_yaml::from_str(&s)?;
        if cfg.manifest.is_relative() {
            if let Some(dir) = path.parent() {
                cfg.manifest = dir.join(&cfg.manifest);
            }
        }
        Ok(cfg)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(!self.dwell.is_zero(), "dwell must be greater than zero");
        ensure!(
            !self.idle_window.is_zero(),
            "idle-window must be greater than zero"
        );
        ensure!(!self.fade.is_zero(), "fade must be greater than zero");
        ensure!(
            !self.manifest.as_os_str().is_empty(),
            "manifest path must not be empty"
        );
        Ok(self)
    }

    pub fn slideshow_settings(&self) -> SlideshowSettings {
        SlideshowSettings {
            dwell: self.dwell,
            idle_window: self.idle_window,
            idle_resume: self.idle_resume,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        let settings = SlideshowSettings::default();
        Self {
            manifest: PathBuf::from("artwork.json"),
            asset_root: None,
            dwell: settings.dwell,
            idle_window: settings.idle_window,
            fade: Duration::from_secs(1),
            fade_mode: FadeMode::default(),
            idle_resume: settings.idle_resume,
            fullscreen: true,
            background: [0, 0, 0],
        }
    }
}
