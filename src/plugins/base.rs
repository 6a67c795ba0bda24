use crate::Result;

/// Lifecycle hooks of a component driven by the host event loop
pub trait PluginTrait {
    fn name(&self) -> &str;
    fn on_add(&mut self) -> Result<()> {
        Ok(())
    }
    fn on_remove(&mut self) -> Result<()> {
        Ok(())
    }
    /// Called once per tick of the event loop
    fn update(&mut self, _delta_time: f64) -> Result<()> {
        Ok(())
    }
}
