use crate::{
    core::{config::DrawConfig, geo::LatLngBounds},
    editing::{
        normalizer::{ChangeCallback, ListenerSet, OverlayChangeNormalizer},
        restyle::restyle,
        scheduler::{Clock, CoalescingScheduler, SystemClock},
    },
    plugins::base::PluginTrait,
    prelude::HashMap,
    provider::MapProvider,
    shapes::{
        descriptor::{Geometry, ShapeDescriptor, ShapeKind},
        factory::{LiveOverlay, OverlayId, ShapeFactory},
        style::ShapeStyle,
    },
    MapError, Result,
};
use std::rc::Rc;

/// What the drawing session reports to its host
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeChange {
    /// The session shape was drawn, edited, dragged or restyled
    Updated(ShapeDescriptor),
    /// The session shape was discarded by a drawing mode switch
    Cleared,
}

pub type SessionCallback = Rc<dyn Fn(&ShapeChange)>;

struct TrackedShape {
    overlay: LiveOverlay,
    listeners: Option<ListenerSet>,
}

/// Owns the live overlays of one map and the drawing session on top of it
pub struct DrawPlugin {
    config: DrawConfig,
    factory: ShapeFactory,
    normalizer: OverlayChangeNormalizer,
    shapes: HashMap<OverlayId, TrackedShape>,
    drawing_mode: Option<ShapeKind>,
    session_shape: Option<OverlayId>,
    session_style: ShapeStyle,
    session_callback: Option<SessionCallback>,
}

impl DrawPlugin {
    pub fn new(provider: Rc<dyn MapProvider>, config: DrawConfig) -> Self {
        Self::with_clock(provider, config, Rc::new(SystemClock))
    }

    pub fn with_clock(
        provider: Rc<dyn MapProvider>,
        config: DrawConfig,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let scheduler = Rc::new(CoalescingScheduler::new(
            clock,
            config.coalesce_interval(),
        ));
        let mut factory = ShapeFactory::new(provider);
        if let Some(icon) = &config.marker_icon {
            factory = factory.with_marker_icon(icon.clone());
        }

        Self {
            session_style: config.session_style.clone(),
            config,
            factory,
            normalizer: OverlayChangeNormalizer::new(scheduler),
            shapes: HashMap::default(),
            drawing_mode: None,
            session_shape: None,
            session_callback: None,
        }
    }

    pub fn config(&self) -> &DrawConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Rc<CoalescingScheduler> {
        self.normalizer.scheduler()
    }

    /// Builds a detached overlay and starts tracking it.
    ///
    /// `style` overrides the descriptor's own style fields. A read-only
    /// configuration forces `editable` off.
    pub fn create_shape(
        &mut self,
        descriptor: &ShapeDescriptor,
        style: &ShapeStyle,
        editable: bool,
    ) -> Result<LiveOverlay> {
        let editable = editable && self.config.editable;
        let overlay = self.factory.build_descriptor(descriptor, style, editable)?;
        self.shapes.insert(
            overlay.id(),
            TrackedShape {
                overlay: overlay.clone(),
                listeners: None,
            },
        );
        Ok(overlay)
    }

    /// Places a tracked overlay on the visible surface
    pub fn attach_shape(&self, overlay: &LiveOverlay) -> Result<()> {
        self.tracked(overlay)?.overlay.attach();
        Ok(())
    }

    /// Routes changes of `overlay` to `callback`, replacing any earlier observer
    pub fn on_shape_change(
        &mut self,
        overlay: &LiveOverlay,
        callback: Option<ChangeCallback>,
    ) -> Result<()> {
        let normalizer = self.normalizer.clone();
        let shape = self.tracked_mut(overlay)?;
        if let Some(previous) = shape.listeners.take() {
            previous.release();
        }
        shape.listeners = Some(normalizer.attach(&shape.overlay, shape.overlay.kind(), callback)?);
        Ok(())
    }

    /// Applies a partial style and emits one change to the shape's observer
    pub fn update_shape_style(&mut self, overlay: &LiveOverlay, delta: &ShapeStyle) -> Result<()> {
        let shape = self.tracked(overlay)?;
        restyle(
            &shape.overlay,
            shape.overlay.kind(),
            delta,
            shape.listeners.as_ref(),
        )
    }

    /// Stops observing `overlay`, drops any pending emission and detaches it
    pub fn destroy_shape(&mut self, overlay: &LiveOverlay) -> Result<()> {
        let shape = self
            .shapes
            .remove(&overlay.id())
            .ok_or(MapError::UnknownShape(overlay.id()))?;
        if let Some(listeners) = &shape.listeners {
            listeners.release();
        }
        shape.overlay.detach();
        if self.session_shape == Some(overlay.id()) {
            self.session_shape = None;
        }

        log::debug!("destroyed {} overlay {}", shape.overlay.kind(), overlay.id());
        Ok(())
    }

    pub fn shape(&self, id: OverlayId) -> Option<&LiveOverlay> {
        self.shapes.get(&id).map(|shape| &shape.overlay)
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Union of the bounds of every tracked shape
    pub fn fit_bounds(&self) -> Option<LatLngBounds> {
        self.shapes
            .values()
            .filter_map(|shape| shape.overlay.bounds())
            .reduce(|acc, bounds| acc.union(&bounds))
    }

    /// Fires coalesced emissions whose interval elapsed
    pub fn run_pending(&self) -> usize {
        self.scheduler().run_due()
    }

    pub fn set_session_callback(&mut self, callback: Option<SessionCallback>) {
        self.session_callback = callback;
    }

    pub fn drawing_mode(&self) -> Option<ShapeKind> {
        self.drawing_mode
    }

    pub fn session_shape(&self) -> Option<&LiveOverlay> {
        self.session_shape.and_then(|id| self.shape(id))
    }

    pub fn session_style(&self) -> &ShapeStyle {
        &self.session_style
    }

    /// Switches the drawing tool, discarding the current session shape
    pub fn set_drawing_mode(&mut self, kind: ShapeKind) -> Result<()> {
        if !self.config.supports_mode(kind) {
            return Err(MapError::UnsupportedMode(kind));
        }

        self.clear_session()?;
        self.drawing_mode = Some(kind);
        if let Some(callback) = &self.session_callback {
            callback(&ShapeChange::Cleared);
        }
        Ok(())
    }

    /// Turns a finished drawing into the session shape.
    ///
    /// The shape gets the session style, is placed and observed, and its
    /// descriptor is reported immediately. The drawing mode is reset.
    pub fn complete_drawing(&mut self, geometry: Geometry) -> Result<LiveOverlay> {
        let kind = self.drawing_mode.ok_or(MapError::NoDrawingMode)?;
        if geometry.kind() != kind {
            return Err(MapError::InvalidGeometry(format!(
                "drew a {} while the {kind} tool is active",
                geometry.kind()
            )));
        }

        let style = self.session_style.clone();
        let overlay = self.open_session(&ShapeDescriptor::new(geometry), &style)?;
        self.drawing_mode = None;
        if let Some(listeners) = self.tracked(&overlay)?.listeners.as_ref() {
            listeners.emit_now();
        }
        Ok(overlay)
    }

    /// Opens an existing shape for editing; returns the bounds to fit the view to
    pub fn load_existing(&mut self, descriptor: &ShapeDescriptor) -> Result<Option<LatLngBounds>> {
        let overlay = self.open_session(descriptor, &ShapeStyle::default())?;
        Ok(overlay.bounds())
    }

    /// Changes the session style and restyles the session shape, if any
    pub fn update_session_style(&mut self, delta: &ShapeStyle) -> Result<()> {
        delta.validate()?;
        self.session_style.merge(delta);
        match self.session_shape().cloned() {
            Some(overlay) => self.update_shape_style(&overlay, delta),
            None => Ok(()),
        }
    }

    /// Replaces the session shape. The current one is only discarded once
    /// the new shape is built and observed.
    fn open_session(&mut self, descriptor: &ShapeDescriptor, style: &ShapeStyle) -> Result<LiveOverlay> {
        let overlay = self.create_shape(descriptor, style, true)?;
        let callback = self.session_change_callback();
        if let Err(err) = self.on_shape_change(&overlay, callback) {
            self.destroy_shape(&overlay)?;
            return Err(err);
        }
        self.clear_session()?;
        overlay.attach();
        self.session_shape = Some(overlay.id());
        Ok(overlay)
    }

    fn clear_session(&mut self) -> Result<()> {
        match self.session_shape().cloned() {
            Some(overlay) => self.destroy_shape(&overlay),
            None => Ok(()),
        }
    }

    fn session_change_callback(&self) -> Option<ChangeCallback> {
        let callback = self.session_callback.clone()?;
        Some(Rc::new(move |descriptor: &ShapeDescriptor| {
            callback(&ShapeChange::Updated(descriptor.clone()))
        }))
    }

    fn tracked(&self, overlay: &LiveOverlay) -> Result<&TrackedShape> {
        self.shapes
            .get(&overlay.id())
            .ok_or(MapError::UnknownShape(overlay.id()))
    }

    fn tracked_mut(&mut self, overlay: &LiveOverlay) -> Result<&mut TrackedShape> {
        self.shapes
            .get_mut(&overlay.id())
            .ok_or(MapError::UnknownShape(overlay.id()))
    }
}

impl PluginTrait for DrawPlugin {
    fn name(&self) -> &str {
        "Draw"
    }

    fn on_remove(&mut self) -> Result<()> {
        let overlays: Vec<LiveOverlay> = self
            .shapes
            .values()
            .map(|shape| shape.overlay.clone())
            .collect();
        for overlay in overlays {
            self.destroy_shape(&overlay)?;
        }
        self.drawing_mode = None;
        Ok(())
    }

    fn update(&mut self, _delta_time: f64) -> Result<()> {
        let fired = self.run_pending();
        if fired > 0 {
            log::trace!("{} coalesced emission(s) fired", fired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{config::EditorProfile, geo::LatLng},
        editing::scheduler::ManualClock,
        provider::memory::MemoryProvider,
    };
    use std::cell::RefCell;

    fn plugin(config: DrawConfig) -> (Rc<MemoryProvider>, Rc<ManualClock>, DrawPlugin) {
        let provider = Rc::new(MemoryProvider::new());
        let clock = Rc::new(ManualClock::new());
        let plugin = DrawPlugin::with_clock(provider.clone(), config, clock.clone());
        (provider, clock, plugin)
    }

    fn session_recorder(plugin: &mut DrawPlugin) -> Rc<RefCell<Vec<ShapeChange>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        plugin.set_session_callback(Some(Rc::new(move |change: &ShapeChange| {
            sink.borrow_mut().push(change.clone())
        })));
        seen
    }

    fn triangle() -> Geometry {
        Geometry::polygon(vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 1.0),
            LatLng::new(1.0, 1.0),
        ])
    }

    #[test]
    fn test_draw_plugin_creation() {
        let (_provider, _clock, plugin) = plugin(DrawConfig::default());
        assert_eq!(plugin.name(), "Draw");
        assert_eq!(plugin.shape_count(), 0);
        assert_eq!(plugin.drawing_mode(), None);
    }

    #[test]
    fn test_shape_operations() {
        let (provider, _clock, mut plugin) = plugin(DrawConfig::default());
        let overlay = plugin
            .create_shape(
                &ShapeDescriptor::new(triangle()),
                &ShapeStyle::default(),
                true,
            )
            .unwrap();
        assert_eq!(plugin.shape_count(), 1);
        assert!(!overlay.is_attached());

        plugin.attach_shape(&overlay).unwrap();
        plugin.on_shape_change(&overlay, None).unwrap();
        plugin.on_shape_change(&overlay, None).unwrap();
        let native = provider.overlay(overlay.id()).unwrap();
        assert_eq!(native.listener_count(), 6);

        plugin.destroy_shape(&overlay).unwrap();
        assert_eq!(plugin.shape_count(), 0);
        assert!(!overlay.is_attached());
        assert_eq!(native.listener_count(), 0);
        assert!(matches!(
            plugin.destroy_shape(&overlay),
            Err(MapError::UnknownShape(_))
        ));
    }

    #[test]
    fn test_read_only_config_forces_static_shapes() {
        let (_provider, _clock, mut plugin) = plugin(EditorProfile::ReadOnly.resolve());
        let overlay = plugin
            .create_shape(
                &ShapeDescriptor::new(triangle()),
                &ShapeStyle::default(),
                true,
            )
            .unwrap();
        assert!(!overlay.is_editable());
        assert!(matches!(
            plugin.set_drawing_mode(ShapeKind::Polygon),
            Err(MapError::UnsupportedMode(ShapeKind::Polygon))
        ));
    }

    #[test]
    fn test_complete_drawing_reports_immediately() {
        let (_provider, _clock, mut plugin) = plugin(DrawConfig::default());
        let seen = session_recorder(&mut plugin);

        plugin.set_drawing_mode(ShapeKind::Polygon).unwrap();
        let overlay = plugin.complete_drawing(triangle()).unwrap();

        assert!(overlay.is_attached());
        assert_eq!(plugin.drawing_mode(), None);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ShapeChange::Cleared);
        let ShapeChange::Updated(descriptor) = &seen[1] else {
            panic!("expected an update, got {:?}", seen[1]);
        };
        assert_eq!(descriptor.geometry, triangle());
        assert_eq!(descriptor.style.fill_color.as_deref(), Some("#ff0000"));
        assert_eq!(descriptor.style.fill_opacity, Some(1.0));
        assert_eq!(descriptor.style.stroke_weight, Some(3));
    }

    #[test]
    fn test_complete_drawing_checks_mode() {
        let (_provider, _clock, mut plugin) = plugin(DrawConfig::default());
        assert!(matches!(
            plugin.complete_drawing(triangle()),
            Err(MapError::NoDrawingMode)
        ));

        plugin.set_drawing_mode(ShapeKind::Circle).unwrap();
        assert!(matches!(
            plugin.complete_drawing(triangle()),
            Err(MapError::InvalidGeometry(_))
        ));
        assert_eq!(plugin.shape_count(), 0);
    }

    #[test]
    fn test_mode_switch_discards_session_shape() {
        let (_provider, _clock, mut plugin) = plugin(DrawConfig::default());
        let seen = session_recorder(&mut plugin);

        plugin.set_drawing_mode(ShapeKind::Polygon).unwrap();
        let first = plugin.complete_drawing(triangle()).unwrap();
        plugin.set_drawing_mode(ShapeKind::Marker).unwrap();

        assert!(!first.is_attached());
        assert_eq!(plugin.shape_count(), 0);
        assert!(plugin.session_shape().is_none());
        assert_eq!(seen.borrow().last(), Some(&ShapeChange::Cleared));
    }

    #[test]
    fn test_session_style_restyles_session_shape() {
        let (_provider, _clock, mut plugin) = plugin(DrawConfig::default());
        let seen = session_recorder(&mut plugin);
        plugin.set_drawing_mode(ShapeKind::Polyline).unwrap();
        let overlay = plugin
            .complete_drawing(Geometry::polyline(vec![
                LatLng::new(0.0, 0.0),
                LatLng::new(2.0, 2.0),
            ]))
            .unwrap();

        plugin
            .update_session_style(&ShapeStyle::default().with_fill("#00ff00", 0.4))
            .unwrap();

        assert_eq!(overlay.style().stroke_color.as_deref(), Some("#00ff00"));
        assert_eq!(overlay.style().stroke_opacity, Some(0.4));
        assert_eq!(plugin.session_style().fill_color.as_deref(), Some("#00ff00"));
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn test_rejected_load_keeps_current_session_shape() {
        let (_provider, _clock, mut plugin) = plugin(DrawConfig::default());
        plugin
            .load_existing(&ShapeDescriptor::new(triangle()))
            .unwrap();
        let first = plugin.session_shape().cloned().unwrap();

        let result = plugin.load_existing(&ShapeDescriptor::new(Geometry::polygon(vec![
            LatLng::new(0.0, 0.0),
        ])));

        assert!(matches!(result, Err(MapError::InvalidGeometry(_))));
        assert!(first.is_attached());
        assert_eq!(plugin.shape_count(), 1);
        assert_eq!(plugin.session_shape().map(|shape| shape.id()), Some(first.id()));
    }

    #[test]
    fn test_polyline_drawing_uses_picked_color() {
        let (_provider, _clock, mut plugin) = plugin(DrawConfig::default());
        plugin
            .update_session_style(&ShapeStyle::default().with_fill("#00ff00", 0.4))
            .unwrap();
        plugin.set_drawing_mode(ShapeKind::Polyline).unwrap();
        let overlay = plugin
            .complete_drawing(Geometry::polyline(vec![
                LatLng::new(0.0, 0.0),
                LatLng::new(2.0, 2.0),
            ]))
            .unwrap();

        let style = overlay.style();
        assert_eq!(style.stroke_color.as_deref(), Some("#00ff00"));
        assert_eq!(style.stroke_opacity, Some(0.4));
        assert_eq!(style.stroke_weight, Some(3));
        assert_eq!(style.fill_color, None);
    }

    #[test]
    fn test_load_existing_returns_bounds() {
        let (_provider, clock, mut plugin) = plugin(DrawConfig::default());
        let seen = session_recorder(&mut plugin);
        let bounds = plugin
            .load_existing(&ShapeDescriptor::new(triangle()))
            .unwrap();
        assert_eq!(bounds, Some(LatLngBounds::from_edges(1.0, 0.0, 1.0, 0.0)));
        assert!(plugin.session_shape().unwrap().is_attached());

        clock.advance_ms(1_000);
        plugin.update(1.0).unwrap();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_fit_bounds_covers_every_shape() {
        let (_provider, _clock, mut plugin) = plugin(DrawConfig::default());
        assert_eq!(plugin.fit_bounds(), None);

        plugin
            .create_shape(
                &ShapeDescriptor::new(Geometry::marker(LatLng::new(-5.0, 10.0))),
                &ShapeStyle::default(),
                false,
            )
            .unwrap();
        plugin
            .create_shape(
                &ShapeDescriptor::new(triangle()),
                &ShapeStyle::default(),
                false,
            )
            .unwrap();

        assert_eq!(
            plugin.fit_bounds(),
            Some(LatLngBounds::from_edges(1.0, -5.0, 10.0, 0.0))
        );
    }

    #[test]
    fn test_on_remove_destroys_everything() {
        let (provider, _clock, mut plugin) = plugin(DrawConfig::default());
        let overlay = plugin
            .create_shape(
                &ShapeDescriptor::new(triangle()),
                &ShapeStyle::default(),
                true,
            )
            .unwrap();
        plugin.on_shape_change(&overlay, None).unwrap();

        plugin.on_remove().unwrap();
        assert_eq!(plugin.shape_count(), 0);
        assert_eq!(provider.overlay(overlay.id()).unwrap().listener_count(), 0);
    }
}
