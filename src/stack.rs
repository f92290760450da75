use crate::{
    arch::{INITIAL_PSW, TaskEntry},
    config::{
        frame::{DEFAULT_SEGMENTS, POISON_BC, POISON_DE, POISON_HL, TASK_EXIT_TRAP},
        stack::{MINIMAL_STACK_SIZE, STACK_ALIGN},
    },
    error::{PortError, PortResult},
    frame::InitialFrame,
};
use rlport_traits::{cpu::GeneralRegisters, memory::StackMemory};

/// A stack handed over by the allocator. Grows downwards from `top()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRegion {
    base: u16,
    len: u16,
}

impl StackRegion {
    pub fn new(base: u16, len: u16) -> PortResult<Self> {
        if base % STACK_ALIGN != 0 {
            return Err(PortError::StackMisaligned(base));
        }

        if len % STACK_ALIGN != 0 {
            return Err(PortError::StackMisaligned(base.wrapping_add(len)));
        }

        if len < MINIMAL_STACK_SIZE {
            return Err(PortError::StackTooSmall {
                len,
                min: MINIMAL_STACK_SIZE,
            });
        }

        // `top()` must stay representable as a 16-bit address.
        if base.checked_add(len).is_none() {
            return Err(PortError::StackWraps { base, len });
        }

        Ok(Self { base, len })
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    pub fn len(&self) -> u16 {
        self.len
    }

    /// One past the highest byte of the region.
    pub fn top(&self) -> u16 {
        self.base + self.len
    }

    pub fn contains(&self, addr: u16) -> bool {
        (self.base..self.top()).contains(&addr)
    }
}

/// Lays down the context a task has before it has ever run.
///
/// Restoring from the returned stack pointer starts `entry` with `arg` in AX,
/// interrupts enabled and no critical section held. If `entry` ever returns
/// it lands on [`TASK_EXIT_TRAP`].
pub fn initialise_stack(
    mem: &mut impl StackMemory,
    region: &StackRegion,
    entry: TaskEntry,
    arg: u16,
) -> u16 {
    let frame = InitialFrame::new(
        entry,
        INITIAL_PSW,
        GeneralRegisters {
            ax: arg,
            bc: POISON_BC,
            de: POISON_DE,
            hl: POISON_HL,
        },
        DEFAULT_SEGMENTS,
        TASK_EXIT_TRAP,
    );

    let top_of_stack = region.top() - InitialFrame::SIZE;
    frame.write_to(mem, top_of_stack);

    top_of_stack
}
