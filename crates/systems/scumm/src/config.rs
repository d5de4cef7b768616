use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Output mode of the physical display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    #[default]
    Default,
    Ega,
    Cga,
    CgaComposite,
    CgaBw,
    HerculesGreen,
    HerculesAmber,
}

impl RenderMode {
    pub fn is_hercules(self) -> bool {
        matches!(self, RenderMode::HerculesGreen | RenderMode::HerculesAmber)
    }

    /// Plain CGA 4-colour output.
    pub fn is_cga(self) -> bool {
        self == RenderMode::Cga
    }
}

/// Opt-in fixes for bugs that shipped with the original games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Enhancements {
    pub minor_bug_fixes: bool,
    pub visual_changes: bool,
}

impl Default for Enhancements {
    fn default() -> Self {
        Self {
            minor_bug_fixes: true,
            visual_changes: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GfxConfig {
    pub render_mode: RenderMode,
    /// Skip the waits between transition steps
    pub fast_mode: bool,
    /// Transition delay in quarter frames; `None` uses the per-version default
    pub fade_delay: Option<u32>,
    pub enhancements: Enhancements,
    /// Render 256-colour rooms through the EGA ditherer
    pub ega_dithering: bool,
    /// Screen shake timer frequency in Hz
    pub shake_timer_rate: u32,
}

impl Default for GfxConfig {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::Default,
            fast_mode: false,
            fade_delay: None,
            enhancements: Enhancements::default(),
            ega_dithering: false,
            shake_timer_rate: 60,
        }
    }
}

impl GfxConfig {
    /// Load a config file. A missing or unreadable file yields defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!(
                        "Warning: Failed to parse {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    pub fn with_fast_mode(mut self, fast: bool) -> Self {
        self.fast_mode = fast;
        self
    }

    pub fn with_fade_delay(mut self, delay: u32) -> Self {
        self.fade_delay = Some(delay);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = GfxConfig::default();
        assert_eq!(c.render_mode, RenderMode::Default);
        assert_eq!(c.shake_timer_rate, 60);
        assert!(c.enhancements.minor_bug_fixes);
        assert_eq!(c.fade_delay, None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let c: GfxConfig = serde_json::from_str(r#"{"render_mode":"Cga","fade_delay":2}"#)
            .expect("parse");
        assert_eq!(c.render_mode, RenderMode::Cga);
        assert_eq!(c.fade_delay, Some(2));
        assert!(!c.fast_mode);
        assert!(c.enhancements.visual_changes);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let c = GfxConfig::load("/nonexistent/dir/scumm_gfx.json");
        assert_eq!(c, GfxConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("scumm_gfx_cfg_{}.json", std::process::id()));
        let c = GfxConfig::default()
            .with_render_mode(RenderMode::HerculesAmber)
            .with_fast_mode(true);
        c.save(&path).expect("save");
        let back = GfxConfig::load(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(back, c);
        assert!(back.render_mode.is_hercules());
    }

    #[test]
    fn test_garbage_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("scumm_gfx_bad_{}.json", std::process::id()));
        std::fs::write(&path, "not json").expect("write");
        let c = GfxConfig::load(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(c, GfxConfig::default());
    }
}
