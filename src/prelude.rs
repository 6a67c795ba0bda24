//! Prelude module for common mapfence types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use mapfence::prelude::*;`

pub use crate::core::{
    config::{DrawConfig, EditorProfile},
    geo::{LatLng, LatLngBounds},
};

pub use crate::shapes::{
    descriptor::{Geometry, ShapeDescriptor, ShapeKind},
    factory::{LiveOverlay, OverlayId, ShapeFactory},
    style::ShapeStyle,
};

pub use crate::editing::{
    normalizer::{describe_overlay, ChangeCallback, DragState, ListenerSet, OverlayChangeNormalizer},
    restyle::restyle,
    scheduler::{Clock, CoalescingScheduler, ManualClock, SlotId, SystemClock},
};

pub use crate::input::events::{OverlayEvent, OverlayEventKind};

pub use crate::plugins::{
    base::PluginTrait,
    draw::{DrawPlugin, SessionCallback, ShapeChange},
};

pub use crate::provider::{
    memory::{MemoryOverlay, MemoryProvider},
    EventHandler, MapProvider, NativeOverlay, OverlayOptions, Subscription,
};

pub use crate::{Error as MapError, Result};

pub use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
    time::Duration,
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
