use crate::{
    editing::normalizer::ListenerSet,
    shapes::{descriptor::ShapeKind, factory::LiveOverlay, style::ShapeStyle},
    MapError, Result,
};

/// Applies a partial style update to `overlay`.
///
/// Unset fields keep their value. For polylines the fill keys are forwarded
/// as stroke keys; markers take no style. When `listeners` is given, exactly
/// one change is emitted synchronously afterwards, so style-only edits reach
/// the same consumers as geometry edits.
pub fn restyle(
    overlay: &LiveOverlay,
    kind: ShapeKind,
    delta: &ShapeStyle,
    listeners: Option<&ListenerSet>,
) -> Result<()> {
    if overlay.kind() != kind {
        return Err(MapError::KindMismatch {
            expected: overlay.kind(),
            actual: kind,
        });
    }
    delta.validate()?;

    let forwarded = delta.delta_for(kind);
    if !forwarded.is_empty() {
        overlay.native().set_style(&forwarded);
        log::debug!("restyled {} overlay {}", kind, overlay.id());
    }

    if let Some(listeners) = listeners {
        listeners.emit_now();
    }
    Ok(())
}
