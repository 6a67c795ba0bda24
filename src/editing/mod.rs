pub mod normalizer;
pub mod restyle;
pub mod scheduler;

pub use normalizer::{describe_overlay, ChangeCallback, DragState, ListenerSet, OverlayChangeNormalizer};
pub use restyle::restyle;
pub use scheduler::{Clock, CoalescingScheduler, ManualClock, SlotId, SystemClock};
