//! CPU adapters.
//!
//! The context switch protocol is written once against
//! [`rlport_traits::cpu::RawCpu`]. An adapter only supplies the individual
//! opcodes and the processor-specific constants.

pub mod rl78;

pub use rl78::{CODE_ADDRESS_MASK, INITIAL_PSW, Psw, TaskEntry};
