//! The mapping backend, as seen by the shape factory and the normalizer.
//!
//! A binding to a real mapping SDK implements [`MapProvider`] and
//! [`NativeOverlay`]; [`memory::MemoryProvider`] implements them in-process.
//! Everything runs on the UI event loop, so handles are `Rc`-shared and
//! methods take `&self`.

pub mod memory;

use crate::{
    core::geo::LatLngBounds,
    input::events::{OverlayEvent, OverlayEventKind},
    shapes::{
        descriptor::{Geometry, ShapeKind},
        factory::OverlayId,
        style::ShapeStyle,
    },
    Result,
};
use std::rc::Rc;

/// Callback invoked by the provider when a subscribed event fires
pub type EventHandler = Rc<dyn Fn(&OverlayEvent)>;

/// Handle returned by [`NativeOverlay::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(pub u64);

/// Construction options handed to the provider
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayOptions {
    pub geometry: Geometry,
    pub style: ShapeStyle,
    pub editable: bool,
    pub draggable: bool,
    pub z_index: i32,
    /// Icon reference for markers
    pub icon: Option<String>,
    /// Draw lines along great circles (polylines)
    pub geodesic: bool,
}

impl OverlayOptions {
    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }
}

/// Factory side of the mapping backend
pub trait MapProvider {
    /// False until the backend finished loading
    fn is_ready(&self) -> bool;

    /// Constructs a detached overlay
    fn create_overlay(&self, options: OverlayOptions) -> Result<Rc<dyn NativeOverlay>>;
}

/// A provider-native overlay object
pub trait NativeOverlay {
    fn id(&self) -> OverlayId;

    fn kind(&self) -> ShapeKind;

    /// Current geometry, as last edited or dragged
    fn geometry(&self) -> Geometry;

    /// Current style
    fn style(&self) -> ShapeStyle;

    /// Applies a partial style; unset fields keep their value
    fn set_style(&self, delta: &ShapeStyle);

    /// Bounds accessor of the native object, if it has one
    fn native_bounds(&self) -> Option<LatLngBounds> {
        None
    }

    fn is_editable(&self) -> bool;

    fn is_draggable(&self) -> bool;

    /// Places the overlay on (or removes it from) the visible surface
    fn set_attached(&self, attached: bool);

    fn is_attached(&self) -> bool;

    fn add_listener(&self, event: OverlayEventKind, handler: EventHandler)
        -> Result<Subscription>;

    /// Removing an unknown subscription is a no-op
    fn remove_listener(&self, subscription: Subscription);
}
