//! Configuration system.
//!
//! Loads client configuration from JSON strings/files. Every field has a
//! default so partial documents are accepted.

use std::f32::consts::PI;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Root configuration for the client core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Host of the remote simulation.
    #[serde(default = "default_server_host")]
    pub server_host: String,
    /// Port of the remote simulation.
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Frame rate the tick driver is paced at.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    /// Players requested when creating a room.
    #[serde(default = "default_player_count")]
    pub player_count: u8,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub presentation: PresentationConfig,
}

/// Motion smoothing limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Maximum turn rate of velocity and heading, radians per second.
    #[serde(default = "default_angular_rate")]
    pub angular_rate: f32,
    /// Maximum change of speed, units per second per second.
    #[serde(default = "default_magnitude_rate")]
    pub magnitude_rate: f32,
    /// Squared speed above which heading follows velocity.
    #[serde(default = "default_heading_threshold_sq")]
    pub heading_threshold_sq: f32,
    /// Heading given to an entity whose first snapshot has no direction.
    #[serde(default = "default_heading")]
    pub default_heading: Vec2,
}

/// Animation playback tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresentationConfig {
    /// Crossfade time for looping clips, seconds.
    #[serde(default = "default_blend_time")]
    pub blend_time: f32,
    /// Move-clip playback speed per unit of velocity.
    #[serde(default = "default_move_speed_scale")]
    pub move_speed_scale: f32,
    /// Length of the attack action in simulation time units.
    #[serde(default = "default_attack_duration")]
    pub attack_duration: f32,
}

fn default_server_host() -> String {
    "localhost".to_string()
}

fn default_server_port() -> u16 {
    1234
}

fn default_tick_hz() -> u32 {
    60
}

fn default_player_count() -> u8 {
    1
}

fn default_angular_rate() -> f32 {
    3.0 * PI
}

fn default_magnitude_rate() -> f32 {
    6.0
}

fn default_heading_threshold_sq() -> f32 {
    0.01
}

fn default_heading() -> Vec2 {
    Vec2::UP
}

fn default_blend_time() -> f32 {
    0.25
}

fn default_move_speed_scale() -> f32 {
    0.25
}

fn default_attack_duration() -> f32 {
    0.24
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_host: default_server_host(),
            server_port: default_server_port(),
            tick_hz: default_tick_hz(),
            player_count: default_player_count(),
            reconcile: ReconcileConfig::default(),
            presentation: PresentationConfig::default(),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            angular_rate: default_angular_rate(),
            magnitude_rate: default_magnitude_rate(),
            heading_threshold_sq: default_heading_threshold_sq(),
            default_heading: default_heading(),
        }
    }
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            blend_time: default_blend_time(),
            move_speed_scale: default_move_speed_scale(),
            attack_duration: default_attack_duration(),
        }
    }
}

impl ClientConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = ClientConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, ClientConfig::default());
        assert_eq!(cfg.server_port, 1234);
        assert_eq!(cfg.reconcile.heading_threshold_sq, 0.01);
    }

    #[test]
    fn partial_nested_section_keeps_other_defaults() {
        let cfg = ClientConfig::from_json_str(
            r#"{ "server_host": "10.0.0.2", "presentation": { "attack_duration": 0.5 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.server_host, "10.0.0.2");
        assert_eq!(cfg.presentation.attack_duration, 0.5);
        assert_eq!(cfg.presentation.blend_time, 0.25);
        assert_eq!(cfg.reconcile.magnitude_rate, 6.0);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ClientConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(format!("{err:#}").contains("not/here.json"));
    }
}
