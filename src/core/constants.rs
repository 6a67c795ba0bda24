//! Core constants for overlay styling and change coalescing.
//! Keeping them in a single place makes it easier to tweak crate-wide magic numbers.

/// Stroke and fill color used when a style omits them.
pub const DEFAULT_COLOR: &str = "#FF0000";

/// Stroke opacity for filled shapes (circle, rectangle, polygon).
pub const DEFAULT_STROKE_OPACITY: f64 = 0.8;

/// Stroke opacity for polylines, which have no fill.
pub const DEFAULT_POLYLINE_STROKE_OPACITY: f64 = 1.0;

pub const DEFAULT_FILL_OPACITY: f64 = 0.35;

/// Stroke weight in pixels.
pub const DEFAULT_STROKE_WEIGHT: u32 = 2;

/// Minimum interval between two coalesced change emissions.
pub const COALESCE_INTERVAL_MS: u64 = 200;

/// Stacking order requested for editable overlays.
pub const EDITABLE_Z_INDEX: i32 = 1;

/// Session drawing defaults (color picker and stroke selector start values).
pub const SESSION_COLOR: &str = "#ff0000";
pub const SESSION_FILL_OPACITY: f64 = 1.0;
pub const SESSION_STROKE_WEIGHT: u32 = 3;
