use crate::{
    core::{constants::EDITABLE_Z_INDEX, geo::LatLngBounds},
    provider::{MapProvider, NativeOverlay, OverlayOptions},
    shapes::{
        descriptor::{Geometry, ShapeDescriptor, ShapeKind},
        style::ShapeStyle,
    },
    MapError, Result,
};
use std::{fmt, rc::Rc};

/// Identifier the provider assigns to an overlay
pub type OverlayId = u64;

/// Handle to a provider-native overlay bound to one shape.
///
/// Cloning shares the same native object. The kind is fixed at construction.
#[derive(Clone)]
pub struct LiveOverlay {
    native: Rc<dyn NativeOverlay>,
    kind: ShapeKind,
}

impl LiveOverlay {
    pub fn id(&self) -> OverlayId {
        self.native.id()
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn geometry(&self) -> Geometry {
        self.native.geometry()
    }

    pub fn style(&self) -> ShapeStyle {
        self.native.style()
    }

    /// Minimal enclosing rectangle of the current geometry.
    ///
    /// Uses the provider's accessor when it has one and derives the box from
    /// the geometry otherwise (markers, polylines).
    pub fn bounds(&self) -> Option<LatLngBounds> {
        self.native
            .native_bounds()
            .or_else(|| self.geometry().bounds())
    }

    /// Places the overlay on the visible surface
    pub fn attach(&self) {
        self.native.set_attached(true);
    }

    pub fn detach(&self) {
        self.native.set_attached(false);
    }

    pub fn is_attached(&self) -> bool {
        self.native.is_attached()
    }

    pub fn is_editable(&self) -> bool {
        self.native.is_editable()
    }

    pub fn native(&self) -> &Rc<dyn NativeOverlay> {
        &self.native
    }
}

impl fmt::Debug for LiveOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveOverlay")
            .field("id", &self.id())
            .field("kind", &self.kind)
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Builds provider-native overlays from shape descriptors
pub struct ShapeFactory {
    provider: Rc<dyn MapProvider>,
    marker_icon: Option<String>,
}

impl ShapeFactory {
    pub fn new(provider: Rc<dyn MapProvider>) -> Self {
        Self {
            provider,
            marker_icon: None,
        }
    }

    /// Icon reference handed to every marker built by this factory
    pub fn with_marker_icon(mut self, icon: impl Into<String>) -> Self {
        self.marker_icon = Some(icon.into());
        self
    }

    pub fn provider(&self) -> &Rc<dyn MapProvider> {
        &self.provider
    }

    /// Builds a detached overlay of `kind`.
    ///
    /// Omitted style fields take the per-kind defaults; markers ignore style.
    /// When `editable` is false the provider is asked for a shape that can be
    /// neither dragged nor edited.
    pub fn build(
        &self,
        kind: ShapeKind,
        geometry: Geometry,
        style: &ShapeStyle,
        editable: bool,
    ) -> Result<LiveOverlay> {
        geometry.validate_for(kind)?;
        if kind != ShapeKind::Marker {
            style.validate()?;
        }
        if !self.provider.is_ready() {
            return Err(MapError::ProviderUnavailable);
        }

        let options = OverlayOptions {
            geometry,
            style: style.resolved_for(kind),
            editable,
            draggable: editable,
            z_index: EDITABLE_Z_INDEX,
            icon: match kind {
                ShapeKind::Marker => self.marker_icon.clone(),
                _ => None,
            },
            geodesic: kind == ShapeKind::Polyline,
        };

        let native = self.provider.create_overlay(options)?;
        if native.kind() != kind {
            return Err(MapError::KindMismatch {
                expected: kind,
                actual: native.kind(),
            });
        }

        log::debug!(
            "built {} overlay {} (editable: {})",
            kind,
            native.id(),
            editable
        );
        Ok(LiveOverlay { native, kind })
    }

    /// Builds from a descriptor, with `style` overriding the descriptor's own fields
    pub fn build_descriptor(
        &self,
        descriptor: &ShapeDescriptor,
        style: &ShapeStyle,
        editable: bool,
    ) -> Result<LiveOverlay> {
        let style = descriptor.style.merged(style);
        self.build(
            descriptor.kind(),
            descriptor.geometry.clone(),
            &style,
            editable,
        )
    }
}
