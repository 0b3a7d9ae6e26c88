//! Internal implementation details.

pub(crate) mod blocking;
pub(crate) mod circular;

pub(crate) use blocking::{drive, relay, FRAMES_PER_THREAD};
pub(crate) use circular::{enter_gate, GateGraph, ResolutionStack};
