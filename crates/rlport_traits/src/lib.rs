#![cfg_attr(not(test), no_std)]

pub mod cpu;
pub mod interrupt;
pub mod memory;
pub mod task;
