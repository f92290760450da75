#![cfg_attr(not(test), no_std)]

//! Execution core of a preemptive scheduler on the RL78.
//!
//! Builds the stack image of tasks that have never run, saves and restores
//! task contexts around interrupts, keeps the critical section nesting count
//! per task, switches interrupt handlers onto their own stack and starts the
//! first task. Which task runs next is decided outside of this crate and
//! passed in through [`rlport_traits::task::CurrentTask`].

pub mod arch;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod frame;
pub mod isr_stack;
pub mod port;
pub mod stack;
pub mod task;
pub mod tick;

pub use error::{PortError, PortResult};
pub use port::{Port, PortConfig};
pub use rlport_macros::{kernel_isr, nestable_isr};
pub use rlport_traits as traits;
