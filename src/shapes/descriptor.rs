use crate::{
    core::geo::{LatLng, LatLngBounds},
    shapes::style::ShapeStyle,
    MapError, Result,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The five overlay kinds a geofence can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Marker,
    Circle,
    Rectangle,
    Polyline,
    Polygon,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 5] = [
        ShapeKind::Marker,
        ShapeKind::Circle,
        ShapeKind::Rectangle,
        ShapeKind::Polyline,
        ShapeKind::Polygon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Marker => "marker",
            ShapeKind::Circle => "circle",
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Polyline => "polyline",
            ShapeKind::Polygon => "polygon",
        }
    }

    /// Kinds whose geometry is an ordered vertex path
    pub fn has_path(&self) -> bool {
        matches!(self, ShapeKind::Polyline | ShapeKind::Polygon)
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeKind {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        ShapeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MapError::InvalidGeometry(format!("unknown shape type '{s}'")))
    }
}

/// Geometry of a shape, tagged by its kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Geometry {
    Marker { latitude: f64, longitude: f64 },
    Circle { center: LatLng, radius: f64 },
    Rectangle { bounds: LatLngBounds },
    Polyline { path: Vec<LatLng> },
    Polygon { path: Vec<LatLng> },
}

impl Geometry {
    pub fn marker(position: LatLng) -> Self {
        Geometry::Marker {
            latitude: position.lat,
            longitude: position.lng,
        }
    }

    pub fn circle(center: LatLng, radius: f64) -> Self {
        Geometry::Circle { center, radius }
    }

    pub fn rectangle(bounds: LatLngBounds) -> Self {
        Geometry::Rectangle { bounds }
    }

    pub fn polyline(path: Vec<LatLng>) -> Self {
        Geometry::Polyline { path }
    }

    pub fn polygon(path: Vec<LatLng>) -> Self {
        Geometry::Polygon { path }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Geometry::Marker { .. } => ShapeKind::Marker,
            Geometry::Circle { .. } => ShapeKind::Circle,
            Geometry::Rectangle { .. } => ShapeKind::Rectangle,
            Geometry::Polyline { .. } => ShapeKind::Polyline,
            Geometry::Polygon { .. } => ShapeKind::Polygon,
        }
    }

    pub fn path(&self) -> Option<&[LatLng]> {
        match self {
            Geometry::Polyline { path } | Geometry::Polygon { path } => Some(path),
            _ => None,
        }
    }

    pub fn path_mut(&mut self) -> Option<&mut Vec<LatLng>> {
        match self {
            Geometry::Polyline { path } | Geometry::Polygon { path } => Some(path),
            _ => None,
        }
    }

    /// Checks the structural constraints of the geometry against `kind`.
    ///
    /// Coordinate ranges are left to the provider; only shape-level
    /// constraints are enforced here.
    pub fn validate_for(&self, kind: ShapeKind) -> Result<()> {
        if self.kind() != kind {
            return Err(MapError::InvalidGeometry(format!(
                "{} geometry supplied for a {kind}",
                self.kind()
            )));
        }

        match self {
            Geometry::Marker { .. } => Ok(()),
            Geometry::Circle { radius, .. } => {
                if *radius >= 0.0 {
                    Ok(())
                } else {
                    Err(MapError::InvalidGeometry(format!(
                        "circle radius must be non-negative, got {radius}"
                    )))
                }
            }
            Geometry::Rectangle { bounds } => {
                if bounds.north() <= bounds.south() {
                    return Err(MapError::InvalidGeometry(format!(
                        "rectangle north ({}) must be above south ({})",
                        bounds.north(),
                        bounds.south()
                    )));
                }
                let in_range = |lng: f64| (-180.0..=180.0).contains(&lng);
                if !in_range(bounds.east()) || !in_range(bounds.west()) {
                    return Err(MapError::InvalidGeometry(format!(
                        "rectangle east/west ({}, {}) do not form a longitude span",
                        bounds.east(),
                        bounds.west()
                    )));
                }
                Ok(())
            }
            Geometry::Polyline { path } => check_path_len(kind, path, 2),
            Geometry::Polygon { path } => check_path_len(kind, path, 3),
        }
    }

    /// Minimal enclosing rectangle of the geometry.
    ///
    /// `None` only when a path has lost all of its vertices.
    pub fn bounds(&self) -> Option<LatLngBounds> {
        match self {
            Geometry::Marker {
                latitude,
                longitude,
            } => Some(LatLngBounds::from_point(LatLng::new(*latitude, *longitude))),
            Geometry::Circle { center, radius } => Some(LatLngBounds::around(*center, *radius)),
            Geometry::Rectangle { bounds } => Some(*bounds),
            Geometry::Polyline { path } | Geometry::Polygon { path } => {
                LatLngBounds::from_points(path)
            }
        }
    }

    /// Moves the whole geometry by the given deltas, as a drag does
    pub fn translate(&mut self, delta_lat: f64, delta_lng: f64) {
        match self {
            Geometry::Marker {
                latitude,
                longitude,
            } => {
                *latitude += delta_lat;
                *longitude += delta_lng;
            }
            Geometry::Circle { center, .. } => *center = center.offset(delta_lat, delta_lng),
            Geometry::Rectangle { bounds } => {
                bounds.south_west = bounds.south_west.offset(delta_lat, delta_lng);
                bounds.north_east = bounds.north_east.offset(delta_lat, delta_lng);
            }
            Geometry::Polyline { path } | Geometry::Polygon { path } => {
                for point in path.iter_mut() {
                    *point = point.offset(delta_lat, delta_lng);
                }
            }
        }
    }
}

fn check_path_len(kind: ShapeKind, path: &[LatLng], min: usize) -> Result<()> {
    if path.len() < min {
        Err(MapError::InvalidGeometry(format!(
            "{kind} path needs at least {min} points, got {}",
            path.len()
        )))
    } else {
        Ok(())
    }
}

/// Plain, provider-independent representation of a shape.
///
/// Serializes as one flat object: `{"type": "circle", "center": .., "radius": ..,
/// "fillColor": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDescriptor {
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(flatten)]
    pub style: ShapeStyle,
}

impl ShapeDescriptor {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            style: ShapeStyle::default(),
        }
    }

    pub fn with_style(mut self, style: ShapeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    pub fn validate(&self) -> Result<()> {
        self.geometry.validate_for(self.kind())?;
        self.style.validate()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
