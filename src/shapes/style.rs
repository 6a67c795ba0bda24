use crate::{
    core::constants::{
        DEFAULT_COLOR, DEFAULT_FILL_OPACITY, DEFAULT_POLYLINE_STROKE_OPACITY,
        DEFAULT_STROKE_OPACITY, DEFAULT_STROKE_WEIGHT,
    },
    shapes::descriptor::ShapeKind,
    MapError, Result,
};
use serde::{Deserialize, Serialize};

/// Stroke and fill settings of a shape.
///
/// Every field is optional: the same type carries a full style, a partial
/// construction style, and a restyle delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShapeStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_weight: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
}

impl ShapeStyle {
    pub fn with_fill(mut self, color: impl Into<String>, opacity: f64) -> Self {
        self.fill_color = Some(color.into());
        self.fill_opacity = Some(opacity);
        self
    }

    pub fn with_stroke_weight(mut self, weight: u32) -> Self {
        self.stroke_weight = Some(weight);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == ShapeStyle::default()
    }

    /// Rejects opacities outside [0, 1] and colors that are not `#RGB` or `#RRGGBB`
    pub fn validate(&self) -> Result<()> {
        for (name, opacity) in [
            ("strokeOpacity", self.stroke_opacity),
            ("fillOpacity", self.fill_opacity),
        ] {
            if let Some(value) = opacity {
                if !(0.0..=1.0).contains(&value) {
                    return Err(MapError::InvalidStyle(format!(
                        "{name} must be within [0, 1], got {value}"
                    )));
                }
            }
        }
        for (name, color) in [
            ("strokeColor", &self.stroke_color),
            ("fillColor", &self.fill_color),
        ] {
            if let Some(color) = color {
                if !is_hex_color(color) {
                    return Err(MapError::InvalidStyle(format!(
                        "{name} '{color}' is not a hex color"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Overwrites the fields set in `delta`, keeping the rest
    pub fn merge(&mut self, delta: &ShapeStyle) {
        if let Some(color) = &delta.stroke_color {
            self.stroke_color = Some(color.clone());
        }
        if let Some(opacity) = delta.stroke_opacity {
            self.stroke_opacity = Some(opacity);
        }
        if let Some(weight) = delta.stroke_weight {
            self.stroke_weight = Some(weight);
        }
        if let Some(color) = &delta.fill_color {
            self.fill_color = Some(color.clone());
        }
        if let Some(opacity) = delta.fill_opacity {
            self.fill_opacity = Some(opacity);
        }
    }

    pub fn merged(&self, delta: &ShapeStyle) -> ShapeStyle {
        let mut style = self.clone();
        style.merge(delta);
        style
    }

    /// Full construction style for `kind`, defaults filling the gaps.
    ///
    /// Markers carry no stroke or fill. Polylines carry no fill: their fill
    /// keys are drawn as the stroke, as in [`ShapeStyle::delta_for`].
    pub fn resolved_for(&self, kind: ShapeKind) -> ShapeStyle {
        match kind {
            ShapeKind::Marker => ShapeStyle::default(),
            ShapeKind::Polyline => {
                let stroke = self.delta_for(ShapeKind::Polyline);
                ShapeStyle {
                    stroke_color: Some(color_or_default(&stroke.stroke_color)),
                    stroke_opacity: Some(
                        stroke
                            .stroke_opacity
                            .unwrap_or(DEFAULT_POLYLINE_STROKE_OPACITY),
                    ),
                    stroke_weight: Some(stroke.stroke_weight.unwrap_or(DEFAULT_STROKE_WEIGHT)),
                    fill_color: None,
                    fill_opacity: None,
                }
            }
            ShapeKind::Circle | ShapeKind::Rectangle | ShapeKind::Polygon => ShapeStyle {
                stroke_color: Some(color_or_default(&self.stroke_color)),
                stroke_opacity: Some(self.stroke_opacity.unwrap_or(DEFAULT_STROKE_OPACITY)),
                stroke_weight: Some(self.stroke_weight.unwrap_or(DEFAULT_STROKE_WEIGHT)),
                fill_color: Some(color_or_default(&self.fill_color)),
                fill_opacity: Some(self.fill_opacity.unwrap_or(DEFAULT_FILL_OPACITY)),
            },
        }
    }

    /// Restyle delta as the provider object for `kind` understands it.
    ///
    /// Polylines render as strokes, so fill keys become stroke keys and win
    /// over stroke keys given in the same delta. Markers take no style.
    pub fn delta_for(&self, kind: ShapeKind) -> ShapeStyle {
        match kind {
            ShapeKind::Marker => ShapeStyle::default(),
            ShapeKind::Polyline => ShapeStyle {
                stroke_color: self.fill_color.clone().or_else(|| self.stroke_color.clone()),
                stroke_opacity: self.fill_opacity.or(self.stroke_opacity),
                stroke_weight: self.stroke_weight,
                fill_color: None,
                fill_opacity: None,
            },
            _ => self.clone(),
        }
    }

    /// Fields reported back in a change descriptor for `kind`
    pub fn reported_for(&self, kind: ShapeKind) -> ShapeStyle {
        match kind {
            ShapeKind::Marker => ShapeStyle::default(),
            ShapeKind::Polyline => ShapeStyle {
                stroke_color: self.stroke_color.clone(),
                stroke_opacity: self.stroke_opacity,
                stroke_weight: self.stroke_weight,
                fill_color: None,
                fill_opacity: None,
            },
            _ => ShapeStyle {
                stroke_color: None,
                stroke_opacity: None,
                stroke_weight: self.stroke_weight,
                fill_color: self.fill_color.clone(),
                fill_opacity: self.fill_opacity,
            },
        }
    }
}

fn color_or_default(color: &Option<String>) -> String {
    color.clone().unwrap_or_else(|| DEFAULT_COLOR.to_string())
}

fn is_hex_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => {
            matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}
