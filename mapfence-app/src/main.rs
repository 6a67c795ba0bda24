use anyhow::{Context, Result};
use mapfence::{
    prelude::*,
    constants::COALESCE_INTERVAL_MS,
};
use std::{env, fs, thread};

/// Headless geofence editing session against the in-memory provider.
///
/// Loads a shape (from the JSON file given as first argument, or a default
/// polygon), then replays a drag and a vertex insert and prints every
/// descriptor the session reports.
fn main() -> Result<()> {
    env_logger::init();

    let descriptor = match env::args().nth(1) {
        Some(path) => {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("failed to read descriptor from {path}"))?;
            ShapeDescriptor::from_json_str(&json)?
        }
        None => ShapeDescriptor::new(Geometry::polygon(vec![
            LatLng::new(37.7749, -122.4194),
            LatLng::new(37.7849, -122.4094),
            LatLng::new(37.7649, -122.4044),
        ])),
    };

    let provider = Rc::new(MemoryProvider::new());
    let mut plugin = DrawPlugin::new(provider.clone(), DrawConfig::default());
    plugin.on_add()?;
    plugin.set_session_callback(Some(Rc::new(|change: &ShapeChange| match change {
        ShapeChange::Updated(descriptor) => match descriptor.to_json_string() {
            Ok(json) => println!("{json}"),
            Err(err) => log::error!("could not serialize descriptor: {err}"),
        },
        ShapeChange::Cleared => println!("{{}}"),
    })));

    let bounds = plugin.load_existing(&descriptor)?;
    if let Some(bounds) = bounds {
        log::info!(
            "fit view to north {:.4} south {:.4} east {:.4} west {:.4}",
            bounds.north(),
            bounds.south(),
            bounds.east(),
            bounds.west()
        );
    }

    let overlay = plugin
        .session_shape()
        .cloned()
        .context("session shape missing after load")?;
    let native = provider
        .overlay(overlay.id())
        .context("overlay missing from provider")?;

    native.begin_drag()?;
    for _ in 0..5 {
        native.drag_by(0.001, 0.001)?;
    }
    native.end_drag()?;

    if let Some(path) = overlay.geometry().path() {
        native.insert_at(path.len(), LatLng::new(37.7700, -122.4250))?;
    }
    thread::sleep(Duration::from_millis(COALESCE_INTERVAL_MS + 50));
    plugin.update(0.0)?;

    plugin.on_remove()?;
    Ok(())
}
