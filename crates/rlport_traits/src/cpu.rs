use crate::{interrupt::InterruptMask, memory::StackMemory};

/// The register pairs of the active register bank.
///
/// Only bank 0 belongs to task context. Bank 3 is reserved for interrupt
/// handlers and is never saved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GeneralRegisters {
    pub ax: u16,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
}

/// The code and data segment selectors.
///
/// A saved frame stores the pair as one word: `cs` in the low byte and `es`
/// in the high byte.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SegmentSelectors {
    pub cs: u8,
    pub es: u8,
}

impl SegmentSelectors {
    pub const fn new(cs: u8, es: u8) -> Self {
        Self { cs, es }
    }

    pub const fn to_word(self) -> u16 {
        ((self.es as u16) << 8) | self.cs as u16
    }

    pub const fn from_word(word: u16) -> Self {
        Self {
            cs: word as u8,
            es: (word >> 8) as u8,
        }
    }
}

/// The capabilities the context switch protocol needs from a CPU.
///
/// Implementors supply the individual opcodes (push, pop, moves to and from
/// the stack pointer, return from interrupt). The order in which they are
/// issued is fixed by the protocol and never by the implementor.
pub trait RawCpu: InterruptMask + StackMemory {
    fn stack_pointer(&self) -> u16;
    fn set_stack_pointer(&mut self, sp: u16);

    /// Decrements the stack pointer by one word and stores `value` there.
    fn push_word(&mut self, value: u16);

    /// Loads the word at the stack pointer and increments it by one word.
    fn pop_word(&mut self) -> u16;

    fn program_counter(&self) -> u32;

    fn general_registers(&self) -> GeneralRegisters;
    fn set_general_registers(&mut self, regs: GeneralRegisters);

    fn segment_selectors(&self) -> SegmentSelectors;
    fn set_segment_selectors(&mut self, segments: SegmentSelectors);

    /// Raises the software interrupt a task yields with. Taken even while
    /// interrupts are disabled.
    fn software_interrupt(&mut self);

    /// Pops the program counter and the processor status word pushed on
    /// interrupt entry and resumes execution there.
    ///
    /// On hardware this does not return to the caller.
    fn return_from_interrupt(&mut self);

    /// Stops the processor for good.
    ///
    /// On hardware this does not return to the caller.
    fn halt(&mut self);
}
