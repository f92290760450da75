/// critical sections
pub mod critical {
    pub use rlport_critical::{INITIAL_CRITICAL_NESTING, NO_CRITICAL_NESTING};
}

/// initial task frame
pub mod frame {
    use rlport_traits::cpu::SegmentSelectors;

    // Register contents a new task starts with. Recognisable in a debugger.
    pub const POISON_BC: u16 = 0xBCBC;
    pub const POISON_DE: u16 = 0xDEDE;
    pub const POISON_HL: u16 = 0x2222;

    /// Segment pair shared by every task: code in segment 0, far data in 0x0F.
    pub const DEFAULT_SEGMENTS: SegmentSelectors = SegmentSelectors::new(0x00, 0x0F);

    /// Where a task function that returns lands.
    pub const TASK_EXIT_TRAP: u32 = 0x0_00C0;
}

/// stacks
pub mod stack {
    /// An initial frame plus one interrupt entry worth of headroom.
    pub const MINIMAL_STACK_SIZE: u16 = 64;

    pub const STACK_ALIGN: u16 = 2;
}

/// tick
pub mod tick {
    /// The low-speed on-chip oscillator feeding the interval timer.
    pub const INTERVAL_TIMER_CLOCK_HZ: u32 = 15_000;

    pub const DEFAULT_TICK_RATE_HZ: u32 = 1_000;

    /// Tick vector of the interval timer on most RL78 parts.
    pub const TICK_VECTOR: u16 = 0x38;
}
