//! Configuration for the drawing plugin
//!
//! A [`DrawConfig`] can be written by hand, loaded from JSON, or resolved
//! from one of the [`EditorProfile`] presets.

use crate::{
    core::constants::{
        COALESCE_INTERVAL_MS, SESSION_COLOR, SESSION_FILL_OPACITY, SESSION_STROKE_WEIGHT,
    },
    shapes::{descriptor::ShapeKind, style::ShapeStyle},
    Result,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorProfile {
    /// Every drawing mode, editable shapes
    Interactive,
    /// Shapes are shown but cannot be drawn, dragged or edited
    ReadOnly,
    Custom(DrawConfig),
}

impl EditorProfile {
    pub fn resolve(&self) -> DrawConfig {
        match self {
            Self::Interactive => DrawConfig::default(),
            Self::ReadOnly => DrawConfig {
                drawing_modes: Vec::new(),
                editable: false,
                ..DrawConfig::default()
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for EditorProfile {
    fn default() -> Self {
        Self::Interactive
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawConfig {
    /// Minimum spacing of coalesced change emissions
    pub coalesce_interval_ms: u64,
    /// Kinds offered by the drawing session, in display order
    pub drawing_modes: Vec<ShapeKind>,
    /// Style of newly drawn shapes
    pub session_style: ShapeStyle,
    /// Whether shapes are built draggable and editable
    pub editable: bool,
    /// Icon reference for markers
    pub marker_icon: Option<String>,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            coalesce_interval_ms: COALESCE_INTERVAL_MS,
            drawing_modes: ShapeKind::ALL.to_vec(),
            session_style: ShapeStyle::default()
                .with_fill(SESSION_COLOR, SESSION_FILL_OPACITY)
                .with_stroke_weight(SESSION_STROKE_WEIGHT),
            editable: true,
            marker_icon: None,
        }
    }
}

impl DrawConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: DrawConfig = serde_json::from_str(json)?;
        config.session_style.validate()?;
        Ok(config)
    }

    pub fn coalesce_interval(&self) -> Duration {
        Duration::from_millis(self.coalesce_interval_ms)
    }

    pub fn supports_mode(&self, kind: ShapeKind) -> bool {
        self.drawing_modes.contains(&kind)
    }

    pub fn with_drawing_modes(mut self, modes: impl IntoIterator<Item = ShapeKind>) -> Self {
        self.drawing_modes = modes.into_iter().collect();
        self
    }

    pub fn with_marker_icon(mut self, icon: impl Into<String>) -> Self {
        self.marker_icon = Some(icon.into());
        self
    }
}
