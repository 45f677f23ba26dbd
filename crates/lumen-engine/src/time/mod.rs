//! Time subsystem.
//!
//! Provides stable, testable frame timing utilities without coupling to the runtime.
//! Intended usage:
//! - one `FrameClock` per window
//! - call `tick()` once per presented frame to obtain `FrameTime`
//! - `FrameTime::elapsed` is the sample's global time

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
