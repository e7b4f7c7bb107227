//! Channel density attribution for multi-channel inkjet calibration.
//!
//! Given a measured L* ramp and the per-channel ink draw curves of a
//! QuadToneRIP `.quad` file, work out how much of the measured density each
//! ink channel is responsible for.
pub mod data;
pub mod solver;
