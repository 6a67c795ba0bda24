//! In-process mapping backend.
//!
//! Keeps overlay state in memory and fires the same events a real SDK would
//! while a user drags shapes or edits vertices. Used headless and as the
//! test double for the factory and the normalizer.

use crate::{
    core::geo::{LatLng, LatLngBounds},
    input::events::{OverlayEvent, OverlayEventKind},
    prelude::HashMap,
    provider::{EventHandler, MapProvider, NativeOverlay, OverlayOptions, Subscription},
    shapes::{
        descriptor::{Geometry, ShapeKind},
        factory::OverlayId,
        style::ShapeStyle,
    },
    MapError, Result,
};
use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

pub struct MemoryProvider {
    ready: Cell<bool>,
    next_id: Cell<OverlayId>,
    overlays: RefCell<HashMap<OverlayId, Weak<MemoryOverlay>>>,
}

impl MemoryProvider {
    /// A provider that is ready immediately
    pub fn new() -> Self {
        Self {
            ready: Cell::new(true),
            next_id: Cell::new(1),
            overlays: RefCell::new(HashMap::default()),
        }
    }

    /// A provider that refuses to build overlays until [`Self::set_ready`]
    pub fn loading() -> Self {
        let provider = Self::new();
        provider.ready.set(false);
        provider
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.set(ready);
    }

    /// Concrete handle of a live overlay, for driving simulated edits
    pub fn overlay(&self, id: OverlayId) -> Option<Rc<MemoryOverlay>> {
        self.overlays.borrow().get(&id).and_then(Weak::upgrade)
    }

    /// Number of overlays still alive
    pub fn live_overlays(&self) -> usize {
        self.overlays
            .borrow()
            .values()
            .filter(|overlay| overlay.strong_count() > 0)
            .count()
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MapProvider for MemoryProvider {
    fn is_ready(&self) -> bool {
        self.ready.get()
    }

    fn create_overlay(&self, options: OverlayOptions) -> Result<Rc<dyn NativeOverlay>> {
        if !self.is_ready() {
            return Err(MapError::ProviderUnavailable);
        }

        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let overlay = Rc::new(MemoryOverlay::new(id, options));
        self.overlays
            .borrow_mut()
            .insert(id, Rc::downgrade(&overlay));
        Ok(overlay)
    }
}

struct Listener {
    subscription: Subscription,
    event: OverlayEventKind,
    handler: EventHandler,
}

pub struct MemoryOverlay {
    id: OverlayId,
    kind: ShapeKind,
    editable: bool,
    draggable: bool,
    z_index: i32,
    icon: Option<String>,
    geometry: RefCell<Geometry>,
    style: RefCell<ShapeStyle>,
    attached: Cell<bool>,
    dragging: Cell<bool>,
    listeners: RefCell<Vec<Listener>>,
    next_subscription: Cell<u64>,
    reject_listeners: Cell<bool>,
}

impl MemoryOverlay {
    fn new(id: OverlayId, options: OverlayOptions) -> Self {
        Self {
            id,
            kind: options.kind(),
            editable: options.editable,
            draggable: options.draggable,
            z_index: options.z_index,
            icon: options.icon,
            geometry: RefCell::new(options.geometry),
            style: RefCell::new(options.style),
            attached: Cell::new(false),
            dragging: Cell::new(false),
            listeners: RefCell::new(Vec::new()),
            next_subscription: Cell::new(1),
            reject_listeners: Cell::new(false),
        }
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.get()
    }

    /// Number of active subscriptions, across all events
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Number of active subscriptions for one event
    pub fn listeners_for(&self, event: OverlayEventKind) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|listener| listener.event == event)
            .count()
    }

    /// Makes every following `add_listener` call fail
    pub fn reject_listeners(&self, reject: bool) {
        self.reject_listeners.set(reject);
    }

    /// Fires `event` to its subscribers.
    ///
    /// Handlers are snapshotted first so they may add or remove listeners
    /// while the event is dispatched.
    pub fn fire(&self, event: OverlayEvent) {
        let handlers: Vec<EventHandler> = self
            .listeners
            .borrow()
            .iter()
            .filter(|listener| listener.event == event.kind())
            .map(|listener| Rc::clone(&listener.handler))
            .collect();

        for handler in handlers {
            handler(&event);
        }
    }

    pub fn begin_drag(&self) -> Result<()> {
        self.ensure_draggable()?;
        self.dragging.set(true);
        self.fire(OverlayEvent::DragStart);
        Ok(())
    }

    /// Moves the whole overlay, as one frame of a drag does
    pub fn drag_by(&self, delta_lat: f64, delta_lng: f64) -> Result<()> {
        self.ensure_draggable()?;
        self.geometry.borrow_mut().translate(delta_lat, delta_lng);
        self.fire(OverlayEvent::GeometryChanged);
        Ok(())
    }

    pub fn end_drag(&self) -> Result<()> {
        self.ensure_draggable()?;
        self.dragging.set(false);
        self.fire(OverlayEvent::DragEnd);
        Ok(())
    }

    /// Replaces the geometry through an edit handle (radius, corner, vertex)
    pub fn edit_geometry(&self, geometry: Geometry) -> Result<()> {
        self.ensure_editable()?;
        if geometry.kind() != self.kind {
            return Err(MapError::KindMismatch {
                expected: self.kind,
                actual: geometry.kind(),
            });
        }
        *self.geometry.borrow_mut() = geometry;
        self.fire(OverlayEvent::GeometryChanged);
        Ok(())
    }

    pub fn insert_at(&self, index: usize, point: LatLng) -> Result<()> {
        self.edit_path(|path| {
            if index > path.len() {
                return Err(out_of_range(index, path.len()));
            }
            path.insert(index, point);
            Ok(())
        })?;
        self.fire(OverlayEvent::InsertAt { index });
        Ok(())
    }

    pub fn remove_at(&self, index: usize) -> Result<LatLng> {
        let removed = self.edit_path(|path| {
            if index >= path.len() {
                return Err(out_of_range(index, path.len()));
            }
            Ok(path.remove(index))
        })?;
        self.fire(OverlayEvent::RemoveAt { index });
        Ok(removed)
    }

    pub fn set_at(&self, index: usize, point: LatLng) -> Result<()> {
        self.edit_path(|path| {
            let len = path.len();
            let slot = path.get_mut(index).ok_or_else(|| out_of_range(index, len))?;
            *slot = point;
            Ok(())
        })?;
        self.fire(OverlayEvent::SetAt { index });
        Ok(())
    }

    fn edit_path<T>(&self, edit: impl FnOnce(&mut Vec<LatLng>) -> Result<T>) -> Result<T> {
        self.ensure_editable()?;
        let mut geometry = self.geometry.borrow_mut();
        let path = geometry
            .path_mut()
            .ok_or_else(|| MapError::Provider(format!("{} has no vertex path", self.kind)))?;
        edit(path)
    }

    fn ensure_draggable(&self) -> Result<()> {
        if self.draggable {
            Ok(())
        } else {
            Err(MapError::Provider(format!(
                "overlay {} is not draggable",
                self.id
            )))
        }
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.editable {
            Ok(())
        } else {
            Err(MapError::Provider(format!(
                "overlay {} is not editable",
                self.id
            )))
        }
    }
}

fn out_of_range(index: usize, len: usize) -> MapError {
    MapError::Provider(format!("vertex {index} out of range for path of {len}"))
}

impl NativeOverlay for MemoryOverlay {
    fn id(&self) -> OverlayId {
        self.id
    }

    fn kind(&self) -> ShapeKind {
        self.kind
    }

    fn geometry(&self) -> Geometry {
        self.geometry.borrow().clone()
    }

    fn style(&self) -> ShapeStyle {
        self.style.borrow().clone()
    }

    fn set_style(&self, delta: &ShapeStyle) {
        self.style.borrow_mut().merge(delta);
    }

    // Markers and polylines have no bounds accessor natively
    fn native_bounds(&self) -> Option<LatLngBounds> {
        match &*self.geometry.borrow() {
            Geometry::Circle { center, radius } => Some(LatLngBounds::around(*center, *radius)),
            Geometry::Rectangle { bounds } => Some(*bounds),
            Geometry::Polygon { path } => LatLngBounds::from_points(path),
            _ => None,
        }
    }

    fn is_editable(&self) -> bool {
        self.editable
    }

    fn is_draggable(&self) -> bool {
        self.draggable
    }

    fn set_attached(&self, attached: bool) {
        self.attached.set(attached);
    }

    fn is_attached(&self) -> bool {
        self.attached.get()
    }

    fn add_listener(
        &self,
        event: OverlayEventKind,
        handler: EventHandler,
    ) -> Result<Subscription> {
        if self.reject_listeners.get() {
            return Err(MapError::ListenerAttachFailure(format!(
                "overlay {} rejected a {event:?} listener",
                self.id
            )));
        }
        if OverlayEventKind::PATH.contains(&event) && !self.kind.has_path() {
            return Err(MapError::ListenerAttachFailure(format!(
                "{} emits no {event:?} events",
                self.kind
            )));
        }

        let subscription = Subscription(self.next_subscription.get());
        self.next_subscription.set(subscription.0 + 1);
        self.listeners.borrow_mut().push(Listener {
            subscription,
            event,
            handler,
        });
        Ok(subscription)
    }

    fn remove_listener(&self, subscription: Subscription) {
        self.listeners
            .borrow_mut()
            .retain(|listener| listener.subscription != subscription);
    }
}
