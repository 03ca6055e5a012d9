//! State module for tracking run progress
//!
//! A harvest run moves through a fixed sequence of phases, repeating the
//! per-category phases once for every category link.
//!
//! # Components
//!
//! - `RunPhase`: the phase a run is in and the transitions allowed out of it

mod run_phase;

pub use run_phase::RunPhase;
