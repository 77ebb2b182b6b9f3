//! Control algorithms.

pub mod pid;
