//! Mode-set and power sequencing engine for an embedded LCD controller.
//!
//! The crate owns no hardware: callers inject a [`mmio::RegisterBank`]
//! over the controller's register window, a [`platform::ClockSource`] for
//! the core clock, and a [`platform::Delay`] for busy-wait settle loops.
//! [`sequencer::Sequencer`] then drives configure/start/stop transitions,
//! with the timing math in [`timing`] and the per-mode register program in
//! [`program`].

#[macro_use]
extern crate static_assertions;

#[macro_use]
extern crate log;

pub mod caps;
pub mod error;
pub mod mmio;
pub mod mode;
pub mod platform;
pub mod program;
pub mod regs;
pub mod sequencer;
pub mod timing;
