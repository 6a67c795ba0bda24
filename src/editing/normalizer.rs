//! Turns overlay edits into plain [`ShapeDescriptor`]s.
//!
//! Every observed overlay gets a [`ListenerSet`] holding its subscriptions
//! and a small drag state machine:
//!
//! ```text
//!   Idle --drag-start--> Dragging   (geometry listener revoked, pending emission dropped)
//!   Dragging --drag-end--> Idle     (geometry listener re-established, one emission)
//! ```
//!
//! Geometry and vertex events outside a drag go through the coalescing
//! scheduler; a drag-end emits synchronously.

use crate::{
    editing::scheduler::{CoalescingScheduler, SlotId},
    input::events::{OverlayEvent, OverlayEventKind},
    provider::{EventHandler, Subscription},
    shapes::{
        descriptor::{Geometry, ShapeDescriptor, ShapeKind},
        factory::LiveOverlay,
    },
    MapError, Result,
};
use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

/// Receives the descriptor of an overlay after each observed change
pub type ChangeCallback = Rc<dyn Fn(&ShapeDescriptor)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging,
}

/// Reads the current geometry and style out of an overlay.
///
/// Style is read from the overlay itself, not from construction options, so
/// restyles show up even when the geometry did not move.
pub fn describe_overlay(overlay: &LiveOverlay) -> ShapeDescriptor {
    let kind = overlay.kind();
    let mut geometry = overlay.geometry();
    if let (Geometry::Rectangle { bounds }, Some(current)) =
        (&mut geometry, overlay.native().native_bounds())
    {
        *bounds = current;
    }
    ShapeDescriptor {
        geometry,
        style: overlay.style().reported_for(kind),
    }
}

struct Observer {
    overlay: LiveOverlay,
    on_change: Option<ChangeCallback>,
    state: DragState,
    geometry_subscription: Option<Subscription>,
    subscriptions: Vec<Subscription>,
    slot: SlotId,
    released: bool,
}

/// Subscriptions of one observed overlay; released exactly once
pub struct ListenerSet {
    observer: Rc<RefCell<Observer>>,
    scheduler: Rc<CoalescingScheduler>,
}

impl ListenerSet {
    pub fn overlay(&self) -> LiveOverlay {
        self.observer.borrow().overlay.clone()
    }

    pub fn state(&self) -> DragState {
        self.observer.borrow().state
    }

    pub fn is_released(&self) -> bool {
        self.observer.borrow().released
    }

    /// Whether a coalesced emission is waiting for its deadline
    pub fn has_pending_emission(&self) -> bool {
        let slot = self.observer.borrow().slot;
        self.scheduler.is_pending(slot)
    }

    /// Whether the geometry-changed subscription is currently held
    pub fn observes_geometry(&self) -> bool {
        self.observer.borrow().geometry_subscription.is_some()
    }

    /// Emits the current descriptor right away, bypassing the coalescer
    pub fn emit_now(&self) {
        emit(&self.observer);
    }

    /// Removes every subscription and drops any pending emission.
    ///
    /// Later calls are no-ops; no callback fires after the first one.
    pub fn release(&self) {
        let mut observer = self.observer.borrow_mut();
        if observer.released {
            return;
        }
        observer.released = true;
        observer.on_change = None;

        let native = Rc::clone(observer.overlay.native());
        if let Some(subscription) = observer.geometry_subscription.take() {
            native.remove_listener(subscription);
        }
        for subscription in observer.subscriptions.drain(..) {
            native.remove_listener(subscription);
        }
        if self.scheduler.cancel(observer.slot) {
            log::debug!(
                "dropped pending emission of overlay {} on release",
                observer.overlay.id()
            );
        }
    }
}

impl Drop for ListenerSet {
    fn drop(&mut self) {
        self.release();
    }
}

/// Attaches change observation to overlays
#[derive(Clone)]
pub struct OverlayChangeNormalizer {
    scheduler: Rc<CoalescingScheduler>,
}

impl OverlayChangeNormalizer {
    pub fn new(scheduler: Rc<CoalescingScheduler>) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &Rc<CoalescingScheduler> {
        &self.scheduler
    }

    /// Subscribes to geometry, drag and (for paths) vertex events of `overlay`.
    ///
    /// A `None` callback yields a working listener set that never emits. If
    /// any subscription fails, the ones already made are removed again and
    /// `ListenerAttachFailure` is returned; the overlay stays readable.
    pub fn attach(
        &self,
        overlay: &LiveOverlay,
        kind: ShapeKind,
        on_change: Option<ChangeCallback>,
    ) -> Result<ListenerSet> {
        if overlay.kind() != kind {
            return Err(MapError::KindMismatch {
                expected: overlay.kind(),
                actual: kind,
            });
        }
        if on_change.is_none() {
            log::debug!(
                "overlay {} observed without a callback, changes will not be emitted",
                overlay.id()
            );
        }

        let observer = Rc::new(RefCell::new(Observer {
            overlay: overlay.clone(),
            on_change,
            state: DragState::Idle,
            geometry_subscription: None,
            subscriptions: Vec::new(),
            slot: self.scheduler.register(),
            released: false,
        }));
        let set = ListenerSet {
            observer: Rc::clone(&observer),
            scheduler: Rc::clone(&self.scheduler),
        };

        let mut events = vec![OverlayEventKind::DragStart, OverlayEventKind::DragEnd];
        if kind.has_path() {
            events.extend(OverlayEventKind::PATH);
        }

        // Dropping `set` on failure removes whatever was subscribed so far
        let geometry = subscribe_geometry(&observer, &self.scheduler).map_err(attach_failure)?;
        observer.borrow_mut().geometry_subscription = Some(geometry);
        for event in events {
            let handler = handler_for(event, &observer, &self.scheduler);
            let subscription = overlay
                .native()
                .add_listener(event, handler)
                .map_err(attach_failure)?;
            observer.borrow_mut().subscriptions.push(subscription);
        }

        log::debug!("observing {} overlay {}", kind, overlay.id());
        Ok(set)
    }
}

fn attach_failure(err: MapError) -> MapError {
    match err {
        MapError::ListenerAttachFailure(_) => err,
        other => MapError::ListenerAttachFailure(other.to_string()),
    }
}

fn subscribe_geometry(
    observer: &Rc<RefCell<Observer>>,
    scheduler: &Rc<CoalescingScheduler>,
) -> Result<Subscription> {
    let handler = handler_for(OverlayEventKind::GeometryChanged, observer, scheduler);
    let native = Rc::clone(observer.borrow().overlay.native());
    native.add_listener(OverlayEventKind::GeometryChanged, handler)
}

fn handler_for(
    event: OverlayEventKind,
    observer: &Rc<RefCell<Observer>>,
    scheduler: &Rc<CoalescingScheduler>,
) -> EventHandler {
    let observer = Rc::downgrade(observer);
    let scheduler = Rc::downgrade(scheduler);
    Rc::new(move |_: &OverlayEvent| {
        let (Some(observer), Some(scheduler)) = (observer.upgrade(), scheduler.upgrade()) else {
            return;
        };
        match event {
            OverlayEventKind::DragStart => on_drag_start(&observer, &scheduler),
            OverlayEventKind::DragEnd => on_drag_end(&observer, &scheduler),
            _ => on_edit(&observer, &scheduler),
        }
    })
}

/// Geometry or vertex change: coalesce unless a drag is in progress
fn on_edit(observer: &Rc<RefCell<Observer>>, scheduler: &Rc<CoalescingScheduler>) {
    let slot = {
        let observer = observer.borrow();
        if observer.released || observer.state == DragState::Dragging {
            return;
        }
        observer.slot
    };

    let weak: Weak<RefCell<Observer>> = Rc::downgrade(observer);
    scheduler.schedule(
        slot,
        Rc::new(move || {
            if let Some(observer) = weak.upgrade() {
                emit(&observer);
            }
        }),
    );
}

fn on_drag_start(observer: &Rc<RefCell<Observer>>, scheduler: &Rc<CoalescingScheduler>) {
    let mut state = observer.borrow_mut();
    if state.released || state.state == DragState::Dragging {
        return;
    }

    if let Some(subscription) = state.geometry_subscription.take() {
        state.overlay.native().remove_listener(subscription);
    }
    scheduler.cancel(state.slot);
    state.state = DragState::Dragging;
}

fn on_drag_end(observer: &Rc<RefCell<Observer>>, scheduler: &Rc<CoalescingScheduler>) {
    {
        let mut state = observer.borrow_mut();
        if state.released {
            return;
        }
        state.state = DragState::Idle;
        scheduler.cancel(state.slot);
    }

    let resubscribe = observer.borrow().geometry_subscription.is_none();
    if resubscribe {
        match subscribe_geometry(observer, scheduler) {
            Ok(subscription) => observer.borrow_mut().geometry_subscription = Some(subscription),
            Err(err) => log::warn!(
                "overlay {} lost its geometry listener after a drag: {}",
                observer.borrow().overlay.id(),
                err
            ),
        }
    }

    emit(observer);
}

fn emit(observer: &Rc<RefCell<Observer>>) {
    let (callback, descriptor) = {
        let observer = observer.borrow();
        if observer.released {
            return;
        }
        let Some(callback) = observer.on_change.clone() else {
            return;
        };
        (callback, describe_overlay(&observer.overlay))
    };

    log::trace!("emitting {} change", descriptor.kind());
    callback(&descriptor);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::geo::LatLng,
        editing::scheduler::ManualClock,
        provider::memory::{MemoryOverlay, MemoryProvider},
        shapes::{factory::ShapeFactory, style::ShapeStyle},
    };
    use std::time::Duration;

    struct Harness {
        clock: Rc<ManualClock>,
        scheduler: Rc<CoalescingScheduler>,
        provider: Rc<MemoryProvider>,
        factory: ShapeFactory,
        normalizer: OverlayChangeNormalizer,
    }

    impl Harness {
        fn new() -> Self {
            let clock = Rc::new(ManualClock::new());
            let scheduler = Rc::new(CoalescingScheduler::new(
                clock.clone(),
                Duration::from_millis(200),
            ));
            let provider = Rc::new(MemoryProvider::new());
            Self {
                factory: ShapeFactory::new(provider.clone()),
                normalizer: OverlayChangeNormalizer::new(Rc::clone(&scheduler)),
                clock,
                scheduler,
                provider,
            }
        }

        fn build(&self, geometry: Geometry) -> (LiveOverlay, Rc<MemoryOverlay>) {
            let overlay = self
                .factory
                .build(geometry.kind(), geometry, &ShapeStyle::default(), true)
                .unwrap();
            let native = self.provider.overlay(overlay.id()).unwrap();
            (overlay, native)
        }

        fn tick(&self, millis: u64) -> usize {
            self.clock.advance_ms(millis);
            self.scheduler.run_due()
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<ShapeDescriptor>>>, Option<ChangeCallback>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let callback: ChangeCallback =
            Rc::new(move |descriptor: &ShapeDescriptor| sink.borrow_mut().push(descriptor.clone()));
        (seen, Some(callback))
    }

    fn triangle() -> Geometry {
        Geometry::polygon(vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 1.0),
            LatLng::new(1.0, 1.0),
        ])
    }

    #[test]
    fn test_geometry_burst_emits_once_with_last_state() {
        let harness = Harness::new();
        let (overlay, native) = harness.build(Geometry::circle(LatLng::new(10.0, 20.0), 500.0));
        let (seen, callback) = recorder();
        let _listeners = harness
            .normalizer
            .attach(&overlay, ShapeKind::Circle, callback)
            .unwrap();

        for radius in [600.0, 700.0, 800.0] {
            native
                .edit_geometry(Geometry::circle(LatLng::new(10.0, 20.0), radius))
                .unwrap();
            harness.tick(50);
        }
        assert!(seen.borrow().is_empty());

        harness.tick(200);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].geometry,
            Geometry::circle(LatLng::new(10.0, 20.0), 800.0)
        );
        assert_eq!(seen[0].style.fill_opacity, Some(0.35));
        assert_eq!(seen[0].style.stroke_weight, Some(2));
    }

    #[test]
    fn test_drag_emits_only_on_drag_end() {
        let harness = Harness::new();
        let (overlay, native) = harness.build(Geometry::marker(LatLng::new(1.0, 1.0)));
        let (seen, callback) = recorder();
        let listeners = harness
            .normalizer
            .attach(&overlay, ShapeKind::Marker, callback)
            .unwrap();

        native.begin_drag().unwrap();
        assert_eq!(listeners.state(), DragState::Dragging);
        assert!(!listeners.observes_geometry());
        for _ in 0..3 {
            native.drag_by(0.5, 0.5).unwrap();
            harness.tick(300);
        }
        assert!(seen.borrow().is_empty());

        native.end_drag().unwrap();
        assert_eq!(listeners.state(), DragState::Idle);
        assert!(listeners.observes_geometry());
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(
            seen.borrow()[0].geometry,
            Geometry::marker(LatLng::new(2.5, 2.5))
        );

        harness.tick(500);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(native.listeners_for(OverlayEventKind::GeometryChanged), 1);
    }

    #[test]
    fn test_drag_end_without_movement_still_emits() {
        let harness = Harness::new();
        let (overlay, native) = harness.build(triangle());
        let (seen, callback) = recorder();
        let _listeners = harness
            .normalizer
            .attach(&overlay, ShapeKind::Polygon, callback)
            .unwrap();

        native.begin_drag().unwrap();
        native.end_drag().unwrap();
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].geometry, triangle());
    }

    #[test]
    fn test_vertex_insert_emits_path_in_order() {
        let harness = Harness::new();
        let (overlay, native) = harness.build(triangle());
        let (seen, callback) = recorder();
        let _listeners = harness
            .normalizer
            .attach(&overlay, ShapeKind::Polygon, callback)
            .unwrap();

        native.insert_at(3, LatLng::new(1.0, 0.0)).unwrap();
        harness.tick(200);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].geometry.path().unwrap(),
            &[
                LatLng::new(0.0, 0.0),
                LatLng::new(0.0, 1.0),
                LatLng::new(1.0, 1.0),
                LatLng::new(1.0, 0.0)
            ]
        );
    }

    #[test]
    fn test_vertex_remove_and_move_emit_once() {
        let harness = Harness::new();
        let (overlay, native) = harness.build(Geometry::polyline(vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(1.0, 1.0),
            LatLng::new(2.0, 2.0),
        ]));
        let (seen, callback) = recorder();
        let _listeners = harness
            .normalizer
            .attach(&overlay, ShapeKind::Polyline, callback)
            .unwrap();

        native.remove_at(1).unwrap();
        harness.tick(50);
        native.set_at(0, LatLng::new(-1.0, -1.0)).unwrap();
        assert_eq!(harness.tick(199), 0);
        assert_eq!(harness.tick(1), 1);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].geometry,
            Geometry::polyline(vec![LatLng::new(-1.0, -1.0), LatLng::new(2.0, 2.0)])
        );
    }

    #[test]
    fn test_edit_after_drag_is_coalesced_again() {
        let harness = Harness::new();
        let center = LatLng::new(10.0, 20.0);
        let (overlay, native) = harness.build(Geometry::circle(center, 100.0));
        let (seen, callback) = recorder();
        let _listeners = harness
            .normalizer
            .attach(&overlay, ShapeKind::Circle, callback)
            .unwrap();

        native.begin_drag().unwrap();
        native.drag_by(1.0, 0.0).unwrap();
        native.end_drag().unwrap();
        assert_eq!(seen.borrow().len(), 1);

        let moved = LatLng::new(11.0, 20.0);
        native.edit_geometry(Geometry::circle(moved, 150.0)).unwrap();
        native.edit_geometry(Geometry::circle(moved, 250.0)).unwrap();
        assert_eq!(seen.borrow().len(), 1);

        harness.tick(200);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].geometry, Geometry::circle(moved, 250.0));
    }

    #[test]
    fn test_release_cancels_pending_emission() {
        let harness = Harness::new();
        let (overlay, native) = harness.build(triangle());
        let (seen, callback) = recorder();
        let listeners = harness
            .normalizer
            .attach(&overlay, ShapeKind::Polygon, callback)
            .unwrap();

        native.set_at(0, LatLng::new(-1.0, -1.0)).unwrap();
        assert!(listeners.has_pending_emission());

        listeners.release();
        listeners.release();
        assert_eq!(native.listener_count(), 0);
        harness.tick(1_000);
        native.set_at(0, LatLng::new(-2.0, -2.0)).unwrap();
        harness.tick(1_000);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_missing_callback_is_a_no_op() {
        let harness = Harness::new();
        let (overlay, native) = harness.build(triangle());
        let listeners = harness
            .normalizer
            .attach(&overlay, ShapeKind::Polygon, None)
            .unwrap();

        native.remove_at(0).unwrap();
        harness.tick(200);
        native.begin_drag().unwrap();
        native.end_drag().unwrap();
        listeners.emit_now();
        assert!(!listeners.is_released());
    }

    #[test]
    fn test_attach_failure_rolls_back() {
        let harness = Harness::new();
        let (overlay, native) = harness.build(triangle());
        native.reject_listeners(true);

        let (_seen, callback) = recorder();
        let result = harness
            .normalizer
            .attach(&overlay, ShapeKind::Polygon, callback);
        assert!(matches!(result, Err(MapError::ListenerAttachFailure(_))));
        assert_eq!(native.listener_count(), 0);
        assert_eq!(overlay.geometry(), triangle());
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let harness = Harness::new();
        let (overlay, _native) = harness.build(triangle());
        let result = harness.normalizer.attach(&overlay, ShapeKind::Circle, None);
        assert!(matches!(result, Err(MapError::KindMismatch { .. })));
    }

    #[test]
    fn test_rectangle_reports_corner_bounds() {
        let harness = Harness::new();
        let bounds = crate::core::geo::LatLngBounds::from_edges(2.0, 1.0, 4.0, 3.0);
        let (overlay, _native) = harness.build(Geometry::rectangle(bounds));
        let descriptor = describe_overlay(&overlay);
        assert_eq!(descriptor.geometry, Geometry::rectangle(bounds));
        assert_eq!(descriptor.style.fill_color.as_deref(), Some("#FF0000"));
        assert_eq!(descriptor.style.stroke_color, None);
    }

    #[test]
    fn test_dropping_listener_set_unsubscribes() {
        let harness = Harness::new();
        let (overlay, native) = harness.build(triangle());
        let listeners = harness
            .normalizer
            .attach(&overlay, ShapeKind::Polygon, None)
            .unwrap();
        assert_eq!(native.listener_count(), 6);

        drop(listeners);
        assert_eq!(native.listener_count(), 0);
    }
}
