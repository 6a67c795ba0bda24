use geo::{BoundingRect, HaversineDestination};
use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Point reached after travelling `distance` meters along `bearing` degrees
    pub fn destination(&self, bearing: f64, distance: f64) -> LatLng {
        let moved = geo::Point::<f64>::from(*self).haversine_destination(bearing, distance);
        LatLng::from(moved)
    }

    /// Returns the coordinate shifted by the given deltas
    pub fn offset(&self, delta_lat: f64, delta_lng: f64) -> LatLng {
        LatLng::new(self.lat + delta_lat, self.lng + delta_lng)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

// geo uses x = longitude, y = latitude
impl From<LatLng> for geo::Point<f64> {
    fn from(value: LatLng) -> Self {
        geo::Point::new(value.lng, value.lat)
    }
}

impl From<geo::Point<f64>> for LatLng {
    fn from(value: geo::Point<f64>) -> Self {
        LatLng::new(value.y(), value.x())
    }
}

impl From<LatLng> for geo_types::Coord<f64> {
    fn from(value: LatLng) -> Self {
        geo_types::coord! { x: value.lng, y: value.lat }
    }
}

/// Wire form of a bounding box: the four edges
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct BoundsLiteral {
    north: f64,
    south: f64,
    east: f64,
    west: f64,
}

/// Represents a bounding box of geographical coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "BoundsLiteral", into = "BoundsLiteral")]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl From<BoundsLiteral> for LatLngBounds {
    fn from(value: BoundsLiteral) -> Self {
        LatLngBounds::from_edges(value.north, value.south, value.east, value.west)
    }
}

impl From<LatLngBounds> for BoundsLiteral {
    fn from(value: LatLngBounds) -> Self {
        BoundsLiteral {
            north: value.north(),
            south: value.south(),
            east: value.east(),
            west: value.west(),
        }
    }
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(LatLng::new(south, west), LatLng::new(north, east))
    }

    /// Creates bounds from the four edges, in the order used on the wire
    pub fn from_edges(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self::from_coords(south, west, north, east)
    }

    /// Degenerate bounds covering a single point
    pub fn from_point(point: LatLng) -> Self {
        Self::new(point, point)
    }

    /// Minimal bounds enclosing every point, `None` for an empty sequence
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a LatLng>,
    {
        let line: geo_types::LineString<f64> = points
            .into_iter()
            .map(|p| geo_types::Coord::from(*p))
            .collect();
        line.bounding_rect().map(|rect| {
            LatLngBounds::from_coords(rect.min().y, rect.min().x, rect.max().y, rect.max().x)
        })
    }

    /// Bounds of a circle on the sphere, projected from its center along the
    /// four cardinal bearings
    pub fn around(center: LatLng, radius: f64) -> Self {
        let north = center.destination(0.0, radius);
        let east = center.destination(90.0, radius);
        let south = center.destination(180.0, radius);
        let west = center.destination(270.0, radius);
        Self::from_edges(north.lat, south.lat, east.lng, west.lng)
    }

    pub fn north(&self) -> f64 {
        self.north_east.lat
    }

    pub fn south(&self) -> f64 {
        self.south_west.lat
    }

    pub fn east(&self) -> f64 {
        self.north_east.lng
    }

    pub fn west(&self) -> f64 {
        self.south_west.lng
    }

    /// Returns the union of this bounds with another bounds
    pub fn union(&self, other: &LatLngBounds) -> LatLngBounds {
        let south = self.south_west.lat.min(other.south_west.lat);
        let west = self.south_west.lng.min(other.south_west.lng);
        let north = self.north_east.lat.max(other.north_east.lat);
        let east = self.north_east.lng.max(other.north_east.lng);

        LatLngBounds::new(LatLng::new(south, west), LatLng::new(north, east))
    }
}
