/// Events an overlay emits while it is edited or dragged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEvent {
    /// Position, center, radius, bounds or path changed
    GeometryChanged,
    /// Start of a drag of the whole overlay
    DragStart,
    /// End of a drag of the whole overlay
    DragEnd,
    /// A vertex was inserted into the path
    InsertAt { index: usize },
    /// A vertex was removed from the path
    RemoveAt { index: usize },
    /// A vertex was replaced in place
    SetAt { index: usize },
}

/// Subscription key for [`OverlayEvent`]s, without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayEventKind {
    GeometryChanged,
    DragStart,
    DragEnd,
    InsertAt,
    RemoveAt,
    SetAt,
}

impl OverlayEventKind {
    /// Vertex-level events, only emitted by path overlays
    pub const PATH: [OverlayEventKind; 3] = [
        OverlayEventKind::InsertAt,
        OverlayEventKind::RemoveAt,
        OverlayEventKind::SetAt,
    ];
}

impl OverlayEvent {
    pub fn kind(&self) -> OverlayEventKind {
        match self {
            OverlayEvent::GeometryChanged => OverlayEventKind::GeometryChanged,
            OverlayEvent::DragStart => OverlayEventKind::DragStart,
            OverlayEvent::DragEnd => OverlayEventKind::DragEnd,
            OverlayEvent::InsertAt { .. } => OverlayEventKind::InsertAt,
            OverlayEvent::RemoveAt { .. } => OverlayEventKind::RemoveAt,
            OverlayEvent::SetAt { .. } => OverlayEventKind::SetAt,
        }
    }

    /// Index of the touched vertex, if any
    pub fn vertex(&self) -> Option<usize> {
        match self {
            OverlayEvent::InsertAt { index }
            | OverlayEvent::RemoveAt { index }
            | OverlayEvent::SetAt { index } => Some(*index),
            _ => None,
        }
    }

    /// Checks if this is a drag lifecycle event
    pub fn is_drag_event(&self) -> bool {
        matches!(self, OverlayEvent::DragStart | OverlayEvent::DragEnd)
    }

    /// Checks if this is a vertex-level path event
    pub fn is_path_event(&self) -> bool {
        self.vertex().is_some()
    }
}
