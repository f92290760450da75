//! Byte layout of a suspended task at the top of its stack.
//!
//! ```text
//!   high   │ exit_trap (u32)  │  initial frame only
//!          │ psw   │ pc_high  │  pushed by the interrupt entry
//!          │ pc_low           │
//!          │ ax               │
//!          │ bc               │
//!          │ de               │
//!          │ hl               │
//!          │ es    │ cs       │
//!   low    │ critical_nesting │  <- saved stack pointer
//! ```
//!
//! Save builds the same bytes by pushing, so Restore cannot tell a task that
//! never ran from one that was interrupted.

use crate::arch::{Psw, TaskEntry};
use core::mem::{offset_of, size_of};
use rlport_traits::{
    cpu::{GeneralRegisters, SegmentSelectors},
    memory::StackMemory,
};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedContext {
    pub critical_nesting: u16,
    pub segments: SegmentSelectors,
    pub hl: u16,
    pub de: u16,
    pub bc: u16,
    pub ax: u16,
    pub pc_low: u16,
    pub pc_high: u8,
    pub psw: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialFrame {
    pub context: SavedContext,
    /// Return address of the task function.
    pub exit_trap: u32,
}

impl SavedContext {
    pub const SIZE: u16 = size_of::<Self>() as u16;

    pub fn registers(&self) -> GeneralRegisters {
        GeneralRegisters {
            ax: self.ax,
            bc: self.bc,
            de: self.de,
            hl: self.hl,
        }
    }

    pub fn program_counter(&self) -> u32 {
        self.pc_low as u32 | ((self.pc_high as u32 & 0x0F) << 16)
    }

    pub fn psw(&self) -> Psw {
        Psw::from_bits_retain(self.psw)
    }

    pub fn read_from(mem: &impl StackMemory, addr: u16) -> Self {
        let at = |offset: usize| addr.wrapping_add(offset as u16);

        Self {
            critical_nesting: mem.read_word(at(offset_of!(Self, critical_nesting))),
            segments: SegmentSelectors::from_word(mem.read_word(at(offset_of!(Self, segments)))),
            hl: mem.read_word(at(offset_of!(Self, hl))),
            de: mem.read_word(at(offset_of!(Self, de))),
            bc: mem.read_word(at(offset_of!(Self, bc))),
            ax: mem.read_word(at(offset_of!(Self, ax))),
            pc_low: mem.read_word(at(offset_of!(Self, pc_low))),
            pc_high: mem.read_byte(at(offset_of!(Self, pc_high))),
            psw: mem.read_byte(at(offset_of!(Self, psw))),
        }
    }

    pub fn write_to(&self, mem: &mut impl StackMemory, addr: u16) {
        let at = |offset: usize| addr.wrapping_add(offset as u16);

        mem.write_word(at(offset_of!(Self, critical_nesting)), self.critical_nesting);
        mem.write_word(at(offset_of!(Self, segments)), self.segments.to_word());
        mem.write_word(at(offset_of!(Self, hl)), self.hl);
        mem.write_word(at(offset_of!(Self, de)), self.de);
        mem.write_word(at(offset_of!(Self, bc)), self.bc);
        mem.write_word(at(offset_of!(Self, ax)), self.ax);
        mem.write_word(at(offset_of!(Self, pc_low)), self.pc_low);
        mem.write_byte(at(offset_of!(Self, pc_high)), self.pc_high);
        mem.write_byte(at(offset_of!(Self, psw)), self.psw);
    }
}

impl InitialFrame {
    pub const SIZE: u16 = size_of::<Self>() as u16;

    /// `regs.ax` carries the task argument.
    pub fn new(
        entry: TaskEntry,
        psw: Psw,
        regs: GeneralRegisters,
        segments: SegmentSelectors,
        exit_trap: u32,
    ) -> Self {
        Self {
            context: SavedContext {
                critical_nesting: rlport_critical::NO_CRITICAL_NESTING,
                segments,
                hl: regs.hl,
                de: regs.de,
                bc: regs.bc,
                ax: regs.ax,
                pc_low: entry.low(),
                pc_high: entry.high(),
                psw: psw.bits(),
            },
            exit_trap,
        }
    }

    pub fn write_to(&self, mem: &mut impl StackMemory, addr: u16) {
        self.context.write_to(mem, addr);

        let [b0, b1, b2, b3] = self.exit_trap.to_le_bytes();
        mem.write_bytes(addr.wrapping_add(offset_of!(Self, exit_trap) as u16), &[b0, b1, b2, b3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::rl78::sim::Rl78Sim;

    #[test]
    fn field_offsets() {
        assert_eq!(offset_of!(SavedContext, critical_nesting), 0);
        assert_eq!(offset_of!(SavedContext, segments), 2);
        assert_eq!(offset_of!(SegmentSelectors, cs), 0);
        assert_eq!(offset_of!(SegmentSelectors, es), 1);
        assert_eq!(offset_of!(SavedContext, hl), 4);
        assert_eq!(offset_of!(SavedContext, de), 6);
        assert_eq!(offset_of!(SavedContext, bc), 8);
        assert_eq!(offset_of!(SavedContext, ax), 10);
        assert_eq!(offset_of!(SavedContext, pc_low), 12);
        assert_eq!(offset_of!(SavedContext, pc_high), 14);
        assert_eq!(offset_of!(SavedContext, psw), 15);
        assert_eq!(SavedContext::SIZE, 16);

        assert_eq!(offset_of!(InitialFrame, context), 0);
        assert_eq!(offset_of!(InitialFrame, exit_trap), 16);
        assert_eq!(InitialFrame::SIZE, 20);
    }

    #[test]
    fn written_bytes_read_back() {
        let mut mem = Rl78Sim::new();
        let context = SavedContext {
            critical_nesting: 3,
            segments: SegmentSelectors::new(0x01, 0x0F),
            hl: 0x4444,
            de: 0x3333,
            bc: 0x2222,
            ax: 0x1111,
            pc_low: 0x5678,
            pc_high: 0x02,
            psw: 0x86,
        };

        context.write_to(&mut mem, 0xF000);

        assert_eq!(mem.read_byte(0xF002), 0x01);
        assert_eq!(mem.read_byte(0xF003), 0x0F);
        assert_eq!(mem.read_byte(0xF00F), 0x86);
        assert_eq!(SavedContext::read_from(&mem, 0xF000), context);
        assert_eq!(context.program_counter(), 0x2_5678);
    }

    #[test]
    fn initial_frame_takes_argument_from_ax() {
        let regs = GeneralRegisters {
            ax: 0x1234,
            bc: 0xBCBC,
            de: 0xDEDE,
            hl: 0x2222,
        };
        let frame = InitialFrame::new(
            TaskEntry::new(0x2345),
            Psw::IE,
            regs,
            SegmentSelectors::default(),
            0xC0,
        );

        assert_eq!(frame.context.registers(), regs);
        assert_eq!(frame.context.critical_nesting, 0);
        assert_eq!(frame.context.program_counter(), 0x2345);
        assert_eq!(frame.exit_trap, 0xC0);
    }
}
