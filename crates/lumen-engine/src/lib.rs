//! Lumen engine crate.
//!
//! This crate owns the platform + GPU runtime pieces and the small render
//! object model (state objects, programs, vars, full-screen passes) samples
//! are written against.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod render;
