//! # Mapfence
//!
//! Geofence shapes on top of any mapping backend.
//!
//! The crate turns declarative shape descriptors (marker, circle, rectangle,
//! polyline, polygon) into provider-native overlays, and turns edits made on
//! those overlays back into plain descriptors. The mapping backend is
//! injected through the [`provider::MapProvider`] trait so the same logic
//! runs against a real SDK binding or the in-process
//! [`provider::memory::MemoryProvider`].

pub mod core;
pub mod editing;
pub mod input;
pub mod plugins;
pub mod prelude;
pub mod provider;
pub mod shapes;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{DrawConfig, EditorProfile},
    geo::{LatLng, LatLngBounds},
};

pub use shapes::{
    descriptor::{Geometry, ShapeDescriptor, ShapeKind},
    factory::{LiveOverlay, ShapeFactory},
    style::ShapeStyle,
};

pub use editing::{
    normalizer::{ChangeCallback, DragState, ListenerSet, OverlayChangeNormalizer},
    restyle::restyle,
    scheduler::{Clock, CoalescingScheduler, ManualClock, SystemClock},
};

pub use input::events::{OverlayEvent, OverlayEventKind};

pub use plugins::{
    base::PluginTrait,
    draw::{DrawPlugin, ShapeChange},
};

pub use provider::{memory::MemoryProvider, MapProvider, NativeOverlay};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Mapping provider is not initialized yet")]
    ProviderUnavailable,

    #[error("Listener attach failure: {0}")]
    ListenerAttachFailure(String),

    #[error("Shape kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        expected: ShapeKind,
        actual: ShapeKind,
    },

    #[error("Invalid style: {0}")]
    InvalidStyle(String),

    #[error("Drawing mode {0} is not offered")]
    UnsupportedMode(ShapeKind),

    #[error("No drawing mode is active")]
    NoDrawingMode,

    #[error("Unknown shape: {0}")]
    UnknownShape(u64),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MapError {
    /// Whether the same call may succeed later without changing its input
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MapError::ProviderUnavailable | MapError::ListenerAttachFailure(_)
        )
    }
}

/// Error type alias for convenience
pub type Error = MapError;
