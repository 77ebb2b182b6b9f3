//! thermoloop: closed-loop PWM heater controller.
//!
//! Exposes the pure-logic modules (PID, command parser, mode FSM,
//! scheduler, fault recovery, supervisor) for integration testing, plus
//! host adapters for the simulation binary.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod fsm;
pub mod safety;
pub mod scheduler;
pub mod sensors;
pub mod serial;

pub use error::{Error, Result};
