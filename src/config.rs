use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::applets::Slot;
use crate::autohide::{AutohideKind, AutohideSettings, FadeSettings};
use crate::background::{BackgroundParams, Colors, StyleKind};
use crate::color::Rgba;
use crate::constants::{timing, validation};
use crate::panel::{PanelGeometry, Position};
use crate::poller::ClickthroughMode;

/// Whole configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub panel: PanelSection,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub background: BackgroundConfig,
    #[serde(default)]
    pub autohide: AutohideConfig,
    #[serde(default)]
    pub drag_proxy: DragProxyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelSection {
    #[serde(default)]
    pub position: Position,
    /// Icon size in pixels
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub expand: bool,
    #[serde(default)]
    pub style: StyleKind,
    #[serde(default)]
    pub clickthrough: ClickthroughMode,
    /// Mirror the alignment for right-to-left layouts
    #[serde(default)]
    pub right_to_left: bool,
    /// Launcher row, in order along the edge
    #[serde(default = "default_slots")]
    pub slots: Vec<Slot>,
}

impl Default for PanelSection {
    fn default() -> Self {
        Self {
            position: Position::default(),
            size: default_size(),
            offset: 0,
            expand: false,
            style: StyleKind::default(),
            clickthrough: ClickthroughMode::default(),
            right_to_left: false,
            slots: default_slots(),
        }
    }
}

/// Which monitor the panel lives on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Output index, `-1` for the output at the screen origin
    #[serde(default)]
    pub number: i32,
    /// Use the geometry below instead of the detected one
    #[serde(default)]
    pub force: bool,
    #[serde(default = "default_monitor_width")]
    pub width: i32,
    #[serde(default = "default_monitor_height")]
    pub height: i32,
    #[serde(default)]
    pub x_offset: i32,
    #[serde(default)]
    pub y_offset: i32,
    /// Position along the edge, `0.0..=1.0`
    #[serde(default = "default_align")]
    pub align: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            number: 0,
            force: false,
            width: default_monitor_width(),
            height: default_monitor_height(),
            x_offset: 0,
            y_offset: 0,
            align: default_align(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundConfig {
    #[serde(default = "default_corner_radius")]
    pub corner_radius: f64,
    #[serde(default = "default_panel_angle")]
    pub panel_angle: f64,
    #[serde(default = "default_floaty_offset")]
    pub floaty_offset: u32,
    #[serde(default = "default_thickness")]
    pub thickness: f64,
    #[serde(default = "default_curviness")]
    pub curviness: f64,
    #[serde(default = "default_curves_symmetry")]
    pub curves_symmetry: f64,
    #[serde(default)]
    pub enable_pattern: bool,
    #[serde(default = "default_pattern_alpha")]
    pub pattern_alpha: f64,
    #[serde(default)]
    pub pattern_path: Option<PathBuf>,

    /// Colours as `RRGGBBAA`
    #[serde(default = "default_g_step_1")]
    pub g_step_1: String,
    #[serde(default = "default_g_step_2")]
    pub g_step_2: String,
    #[serde(default = "default_g_histep_1")]
    pub g_histep_1: String,
    #[serde(default = "default_g_histep_2")]
    pub g_histep_2: String,
    #[serde(default = "default_border")]
    pub border: String,
    #[serde(default = "default_hilight")]
    pub hilight: String,
    #[serde(default = "default_sep")]
    pub sep: String,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            corner_radius: default_corner_radius(),
            panel_angle: default_panel_angle(),
            floaty_offset: default_floaty_offset(),
            thickness: default_thickness(),
            curviness: default_curviness(),
            curves_symmetry: default_curves_symmetry(),
            enable_pattern: false,
            pattern_alpha: default_pattern_alpha(),
            pattern_path: None,
            g_step_1: default_g_step_1(),
            g_step_2: default_g_step_2(),
            g_histep_1: default_g_histep_1(),
            g_histep_2: default_g_histep_2(),
            border: default_border(),
            hilight: default_hilight(),
            sep: default_sep(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutohideConfig {
    #[serde(default)]
    pub kind: AutohideKind,
    #[serde(default = "default_hide_delay_ms")]
    pub hide_delay_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_fade_step_ms")]
    pub fade_step_ms: u64,
    #[serde(default = "default_fade_steps")]
    pub fade_steps: u32,
    /// Opacity while transparentized, `0.0..=1.0`
    #[serde(default = "default_transparentize_opacity")]
    pub transparentize_opacity: f64,
}

impl Default for AutohideConfig {
    fn default() -> Self {
        Self {
            kind: AutohideKind::default(),
            hide_delay_ms: default_hide_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            fade_step_ms: default_fade_step_ms(),
            fade_steps: default_fade_steps(),
            transparentize_opacity: default_transparentize_opacity(),
        }
    }
}

impl AutohideConfig {
    pub fn settings(&self) -> AutohideSettings {
        AutohideSettings {
            kind: self.kind,
            hide_delay: Duration::from_millis(self.hide_delay_ms),
            fade: FadeSettings {
                step: Duration::from_millis(self.fade_step_ms),
                steps: self.fade_steps,
            },
            transparentize_opacity: self.transparentize_opacity,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragProxyConfig {
    #[serde(default = "default_drag_recheck_ms")]
    pub recheck_interval_ms: u64,
}

impl Default for DragProxyConfig {
    fn default() -> Self {
        Self {
            recheck_interval_ms: default_drag_recheck_ms(),
        }
    }
}

impl DragProxyConfig {
    pub fn recheck_interval(&self) -> Duration {
        Duration::from_millis(self.recheck_interval_ms)
    }
}

fn default_size() -> u32 {
    48
}

fn default_slots() -> Vec<Slot> {
    vec![Slot::Icon; 4]
}

fn default_monitor_width() -> i32 {
    1024
}

fn default_monitor_height() -> i32 {
    768
}

fn default_align() -> f64 {
    0.5
}

fn default_corner_radius() -> f64 {
    10.0
}

fn default_panel_angle() -> f64 {
    45.0
}

fn default_floaty_offset() -> u32 {
    10
}

fn default_thickness() -> f64 {
    0.6
}

fn default_curviness() -> f64 {
    1.0
}

fn default_curves_symmetry() -> f64 {
    0.5
}

fn default_pattern_alpha() -> f64 {
    0.5
}

fn default_g_step_1() -> String {
    Colors::default().g_step_1.to_hex()
}

fn default_g_step_2() -> String {
    Colors::default().g_step_2.to_hex()
}

fn default_g_histep_1() -> String {
    Colors::default().g_histep_1.to_hex()
}

fn default_g_histep_2() -> String {
    Colors::default().g_histep_2.to_hex()
}

fn default_border() -> String {
    Colors::default().border.to_hex()
}

fn default_hilight() -> String {
    Colors::default().hilight.to_hex()
}

fn default_sep() -> String {
    Colors::default().sep.to_hex()
}

fn default_hide_delay_ms() -> u64 {
    timing::HIDE_DELAY_MS
}

fn default_poll_interval_ms() -> u64 {
    timing::POLL_INTERVAL_MS
}

fn default_fade_step_ms() -> u64 {
    timing::FADE_STEP_MS
}

fn default_fade_steps() -> u32 {
    timing::FADE_STEPS
}

fn default_transparentize_opacity() -> f64 {
    0.4
}

fn default_drag_recheck_ms() -> u64 {
    timing::DRAG_RECHECK_MS
}

/// Clamp a float field into `min..=max`, warning when it moves
fn clamp_f64(field: &'static str, value: &mut f64, min: f64, max: f64) {
    if value.is_nan() {
        warn!(field, min, "value is not a number, using minimum");
        *value = min;
    } else if *value < min {
        warn!(field, value = *value, min, "value below minimum, clamping");
        *value = min;
    } else if *value > max {
        warn!(field, value = *value, max, "value exceeds maximum, clamping");
        *value = max;
    }
}

fn clamp_u32(field: &'static str, value: &mut u32, min: u32, max: u32) {
    if *value < min {
        warn!(field, value = *value, min, "value below minimum, clamping");
        *value = min;
    } else if *value > max {
        warn!(field, value = *value, max, "value exceeds maximum, clamping");
        *value = max;
    }
}

fn clamp_delay(field: &'static str, value: &mut u64) {
    if *value < timing::MIN_DELAY_MS {
        warn!(field, value = *value, min = timing::MIN_DELAY_MS, "delay below minimum, clamping");
        *value = timing::MIN_DELAY_MS;
    }
}

/// Parse a configured colour, falling back to the built-in one
fn parse_color(field: &'static str, hex: &str, fallback: Rgba) -> Rgba {
    Rgba::parse(hex).unwrap_or_else(|| {
        error!(field, value = %hex, "Invalid colour hex, using default");
        fallback
    })
}

impl PanelConfig {
    /// `$XDG_CONFIG_HOME/edgepanel/config.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Load from `path`, falling back to defaults
    ///
    /// A missing file is created with the defaults. A file that does not
    /// parse is left untouched so it can be fixed by hand.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<PanelConfig>(&contents) {
                Ok(mut config) => {
                    config.validate_and_clamp();
                    info!(path = %path.display(), "Loaded config");
                    config
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                    error!(path = %path.display(), "The file has been preserved, fix it and restart");
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                if let Err(e) = config.save(path) {
                    error!(error = ?e, "Failed to save default config");
                } else {
                    info!(path = %path.display(), "Generated default config file");
                }
                config
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        fs::write(path, contents).context(format!("Failed to write config file to {}", path.display()))?;
        Ok(())
    }

    /// Bring every value into its supported range
    pub fn validate_and_clamp(&mut self) {
        use validation::*;

        clamp_u32("panel.size", &mut self.panel.size, MIN_SIZE, MAX_SIZE);
        clamp_u32("panel.offset", &mut self.panel.offset, 0, MAX_OFFSET);

        clamp_f64("monitor.align", &mut self.monitor.align, 0.0, 1.0);
        if self.monitor.width <= 0 || self.monitor.height <= 0 {
            warn!(
                width = self.monitor.width,
                height = self.monitor.height,
                "monitor size must be positive, using default"
            );
            self.monitor.width = default_monitor_width();
            self.monitor.height = default_monitor_height();
        }

        let bg = &mut self.background;
        clamp_f64("background.corner_radius", &mut bg.corner_radius, 0.0, MAX_CORNER_RADIUS);
        clamp_f64("background.panel_angle", &mut bg.panel_angle, 0.0, MAX_PANEL_ANGLE);
        clamp_u32("background.floaty_offset", &mut bg.floaty_offset, 0, MAX_FLOATY_OFFSET);
        clamp_f64("background.thickness", &mut bg.thickness, 0.0, 1.0);
        clamp_f64("background.curviness", &mut bg.curviness, 0.0, MAX_CURVINESS);
        clamp_f64("background.curves_symmetry", &mut bg.curves_symmetry, 0.0, 1.0);
        clamp_f64("background.pattern_alpha", &mut bg.pattern_alpha, 0.0, 1.0);

        let ah = &mut self.autohide;
        clamp_delay("autohide.hide_delay_ms", &mut ah.hide_delay_ms);
        clamp_delay("autohide.poll_interval_ms", &mut ah.poll_interval_ms);
        clamp_delay("autohide.fade_step_ms", &mut ah.fade_step_ms);
        clamp_u32("autohide.fade_steps", &mut ah.fade_steps, 1, MAX_FADE_STEPS);
        clamp_f64("autohide.transparentize_opacity", &mut ah.transparentize_opacity, 0.0, 1.0);

        clamp_delay("drag_proxy.recheck_interval_ms", &mut self.drag_proxy.recheck_interval_ms);
    }

    /// Panel parameters; `composited` comes from the running display
    pub fn panel_geometry(&self, composited: bool) -> PanelGeometry {
        PanelGeometry {
            position: self.panel.position,
            size: self.panel.size,
            offset: self.panel.offset,
            extra_padding: 0,
            composited,
            expand: self.panel.expand,
        }
    }

    /// Style parameters with parsed colours; the pattern is loaded separately
    pub fn background_params(&self) -> BackgroundParams {
        let bg = &self.background;
        let fallback = Colors::default();
        BackgroundParams {
            corner_radius: bg.corner_radius,
            panel_angle: bg.panel_angle,
            floaty_offset: bg.floaty_offset,
            thickness: bg.thickness,
            curviness: bg.curviness,
            curves_symmetry: bg.curves_symmetry,
            enable_pattern: bg.enable_pattern,
            pattern_alpha: bg.pattern_alpha,
            pattern: None,
            colors: Colors {
                g_step_1: parse_color("g_step_1", &bg.g_step_1, fallback.g_step_1),
                g_step_2: parse_color("g_step_2", &bg.g_step_2, fallback.g_step_2),
                g_histep_1: parse_color("g_histep_1", &bg.g_histep_1, fallback.g_histep_1),
                g_histep_2: parse_color("g_histep_2", &bg.g_histep_2, fallback.g_histep_2),
                border: parse_color("border", &bg.border, fallback.border),
                hilight: parse_color("hilight", &bg.hilight, fallback.hilight),
                sep: parse_color("sep", &bg.sep, fallback.sep),
            },
        }
    }

    /// Monitor alignment as the background sees it
    pub fn effective_align(&self, align: f64) -> f64 {
        if self.panel.right_to_left && self.panel.position.is_horizontal() {
            1.0 - align
        } else {
            align
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: PanelConfig = serde_json::from_str(r#"{"panel": {"position": "top"}}"#).unwrap();
        assert_eq!(config.panel.position, Position::Top);
        assert_eq!(config.panel.size, 48);
        assert_eq!(config.background.corner_radius, 10.0);
        assert_eq!(config.background.g_step_1, "454545C8");
        assert_eq!(config.autohide.hide_delay_ms, 1000);
        assert_eq!(config.monitor.width, 1024);
        assert_eq!(config.monitor.align, 0.5);
    }

    #[test]
    fn test_unknown_enum_value_is_rejected() {
        let parsed = serde_json::from_str::<PanelConfig>(r#"{"panel": {"position": "diagonal"}}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validate_and_clamp() {
        let mut config = PanelConfig::default();
        config.panel.size = 2;
        config.background.panel_angle = 120.0;
        config.background.thickness = -1.0;
        config.monitor.align = 1.5;
        config.autohide.hide_delay_ms = 0;
        config.autohide.fade_steps = 0;
        config.validate_and_clamp();

        assert_eq!(config.panel.size, 8);
        assert_eq!(config.background.panel_angle, 90.0);
        assert_eq!(config.background.thickness, 0.0);
        assert_eq!(config.monitor.align, 1.0);
        assert_eq!(config.autohide.hide_delay_ms, 1);
        assert_eq!(config.autohide.fade_steps, 1);
    }

    #[test]
    fn test_invalid_colour_falls_back() {
        let mut config = PanelConfig::default();
        config.background.border = "not-a-colour".to_string();
        config.background.hilight = "#FF000080".to_string();
        let params = config.background_params();
        assert_eq!(params.colors.border, Colors::default().border);
        assert_eq!(params.colors.hilight, Rgba::from_bytes(0xFF, 0, 0, 0x80));
    }

    #[test]
    fn test_missing_file_is_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = PanelConfig::load(&path);
        assert_eq!(config, PanelConfig::default());
        assert!(path.exists());
        assert_eq!(PanelConfig::load(&path), config);
    }

    #[test]
    fn test_broken_file_is_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let config = PanelConfig::load(&path);
        assert_eq!(config, PanelConfig::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_save_round_trips_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut config = PanelConfig::default();
        config.panel.style = StyleKind::Lucido;
        config.autohide.kind = AutohideKind::FadeOut;
        config.save(&path).unwrap();
        let loaded = PanelConfig::load(&path);
        assert_eq!(loaded.panel.style, StyleKind::Lucido);
        assert_eq!(loaded.autohide.kind, AutohideKind::FadeOut);
    }

    #[test]
    fn test_rtl_mirrors_horizontal_only() {
        let mut config = PanelConfig::default();
        config.panel.right_to_left = true;
        assert_eq!(config.effective_align(0.25), 0.75);
        config.panel.position = Position::Left;
        assert_eq!(config.effective_align(0.25), 0.25);
    }
}
