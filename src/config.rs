//! YAML configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    /// Folder scanned (recursively) for playable media.
    #[serde(default = "Configuration::default_media_dir")]
    pub media_dir: PathBuf,

    /// Corner handle hit radius in view pixels. 40 keeps handles grabbable
    /// on touch screens.
    #[serde(default = "Configuration::default_handle_radius")]
    pub handle_radius_px: f64,

    /// Draw the corner markers even outside edit mode.
    #[serde(default)]
    pub show_handles_always: bool,

    /// Image shown when the playlist is empty or playback fails. Without it a
    /// built-in dark placeholder is used.
    #[serde(default)]
    pub fallback_image: Option<PathBuf>,

    /// Optional graphic stretched to the destination quad in edit mode, as a
    /// visual alignment reference.
    #[serde(default)]
    pub alignment_overlay: Option<PathBuf>,

    /// Rescan the media folder when its contents change.
    #[serde(default = "Configuration::default_watch")]
    pub watch: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            media_dir: Self::default_media_dir(),
            handle_radius_px: Self::default_handle_radius(),
            show_handles_always: false,
            fallback_image: None,
            alignment_overlay: None,
            watch: Self::default_watch(),
        }
    }
}

impl Configuration {
    fn default_media_dir() -> PathBuf {
        PathBuf::from("VJ")
    }

    fn default_handle_radius() -> f64 {
        40.0
    }

    fn default_watch() -> bool {
        true
    }

    /// # Errors
    /// Returns an error when a field cannot support the running display.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.handle_radius_px > 0.0,
            "handle-radius-px must be positive, got {}",
            self.handle_radius_px
        );
        if let Some(path) = &self.fallback_image {
            ensure!(
                path.is_file(),
                "fallback-image {} is not a file",
                path.display()
            );
        }
        if let Some(path) = &self.alignment_overlay {
            ensure!(
                path.is_file(),
                "alignment-overlay {} is not a file",
                path.display()
            );
        }
        Ok(())
    }
}

/// Load configuration from a YAML file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn from_yaml_file(path: &Path) -> Result<Configuration> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let cfg: Configuration =
        serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_for_missing_fields() {
        let cfg: Configuration = serde_yaml::from_str("media-dir: /tmp/vj\n").unwrap();
        assert_eq!(cfg.media_dir, PathBuf::from("/tmp/vj"));
        assert_eq!(cfg.handle_radius_px, 40.0);
        assert!(!cfg.show_handles_always);
        assert!(cfg.watch);
        assert!(cfg.fallback_image.is_none());
    }

    #[test]
    fn kebab_case_keys_parse() {
        let cfg: Configuration = serde_yaml::from_str(
            "media-dir: /m\nhandle-radius-px: 20\nshow-handles-always: true\nwatch: false\n",
        )
        .unwrap();
        assert_eq!(cfg.handle_radius_px, 20.0);
        assert!(cfg.show_handles_always);
        assert!(!cfg.watch);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let res: Result<Configuration, _> = serde_yaml::from_str("media-folder: /m\n");
        assert!(res.is_err());
    }

    #[test]
    fn nonpositive_radius_fails_validation() {
        let cfg: Configuration = serde_yaml::from_str("handle-radius-px: 0\n").unwrap();
        assert!(cfg.validate().is_err());
    }
}
