//! Detection pipeline: handoff, worker task and debouncing.
//!
//! ```text
//! sensor context ──raise──▶ DetectionHandoff ──wait──▶ SensorWorker
//!                                                        │ process_pending_event
//!                                                        ▼
//!                         ProximityService ◀── DetectionDebouncer::observe
//! ```

pub mod debouncer;
pub mod handoff;
pub mod worker;

pub use debouncer::{DetectionDebouncer, Notification};
pub use handoff::{DetectionHandoff, HandoffSignal};
pub use worker::{CommandSender, SensorCommand, SensorWorker};
