//! A software model of the RL78 core.
//!
//! Covers what the port relies on: the bank 0 register pairs, the segment
//! selectors, SP, PC, PSW, the 64 KiB near address space, the interrupt
//! entry sequence and `RETI`/`RET`.

use super::Psw;
use crate::tick::IntervalTimerRegs;
use rlport_traits::{
    cpu::{GeneralRegisters, RawCpu, SegmentSelectors},
    interrupt::InterruptMask,
    memory::StackMemory,
};

const MEMORY_SIZE: usize = 0x1_0000;

/// Vector table slot `BRK` jumps through.
pub const BRK_VECTOR: u32 = 0x7E;

pub struct Rl78Sim {
    memory: [u8; MEMORY_SIZE],
    regs: GeneralRegisters,
    segments: SegmentSelectors,
    sp: u16,
    pc: u32,
    psw: Psw,
    halted: bool,
}

impl Rl78Sim {
    /// Reset state: interrupts disabled, lowest in-service priority.
    pub fn new() -> Self {
        Self {
            memory: [0; MEMORY_SIZE],
            regs: GeneralRegisters::default(),
            segments: SegmentSelectors::default(),
            sp: 0,
            pc: 0,
            psw: Psw::ISP1 | Psw::ISP0,
            halted: false,
        }
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc & 0xF_FFFF;
    }

    pub fn psw(&self) -> Psw {
        self.psw
    }

    pub fn set_psw(&mut self, psw: Psw) {
        self.psw = psw;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Hardware interrupt acknowledge.
    ///
    /// Refused while IE is clear. Otherwise pushes PSW and the 20-bit PC,
    /// clears IE and continues at `vector`.
    pub fn accept_interrupt(&mut self, vector: u32) -> bool {
        if !self.psw.contains(Psw::IE) {
            return false;
        }

        self.push_interrupt_frame(self.pc);
        self.psw.remove(Psw::IE);
        self.pc = vector & 0xF_FFFF;
        true
    }

    /// `BRK`: the software interrupt used to yield. Taken even with IE clear.
    pub fn brk(&mut self) {
        self.push_interrupt_frame(self.pc.wrapping_add(2));
        self.psw.remove(Psw::IE);
        self.pc = BRK_VECTOR;
    }

    fn push_interrupt_frame(&mut self, return_pc: u32) {
        let sp = self.sp;
        self.write_byte(sp.wrapping_sub(1), self.psw.bits());
        self.write_byte(sp.wrapping_sub(2), (return_pc >> 16) as u8 & 0x0F);
        self.write_byte(sp.wrapping_sub(3), (return_pc >> 8) as u8);
        self.write_byte(sp.wrapping_sub(4), return_pc as u8);
        self.sp = sp.wrapping_sub(4);
    }

    /// `RET`: pops a 4-byte return address.
    pub fn ret(&mut self) {
        let sp = self.sp;
        let low = self.read_word(sp) as u32;
        let high = self.read_byte(sp.wrapping_add(2)) as u32 & 0x0F;

        self.pc = low | (high << 16);
        self.sp = sp.wrapping_add(4);
    }
}

impl Default for Rl78Sim {
    fn default() -> Self {
        Self::new()
    }
}

impl StackMemory for Rl78Sim {
    fn read_byte(&self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        self.memory[addr as usize] = value;
    }
}

impl InterruptMask for Rl78Sim {
    fn disable_interrupts(&mut self) {
        self.psw.remove(Psw::IE);
    }

    fn enable_interrupts(&mut self) {
        self.psw.insert(Psw::IE);
    }

    fn is_interrupt_enabled(&self) -> bool {
        self.psw.contains(Psw::IE)
    }
}

impl RawCpu for Rl78Sim {
    fn stack_pointer(&self) -> u16 {
        self.sp
    }

    fn set_stack_pointer(&mut self, sp: u16) {
        // SP bit 0 is hardwired to zero.
        self.sp = sp & !1;
    }

    fn push_word(&mut self, value: u16) {
        self.sp = self.sp.wrapping_sub(2);
        self.write_word(self.sp, value);
    }

    fn pop_word(&mut self) -> u16 {
        let value = self.read_word(self.sp);
        self.sp = self.sp.wrapping_add(2);
        value
    }

    fn program_counter(&self) -> u32 {
        self.pc
    }

    fn general_registers(&self) -> GeneralRegisters {
        self.regs
    }

    fn set_general_registers(&mut self, regs: GeneralRegisters) {
        self.regs = regs;
    }

    fn segment_selectors(&self) -> SegmentSelectors {
        self.segments
    }

    fn set_segment_selectors(&mut self, segments: SegmentSelectors) {
        self.segments = segments;
    }

    fn software_interrupt(&mut self) {
        self.brk();
    }

    fn return_from_interrupt(&mut self) {
        let sp = self.sp;
        let low = self.read_word(sp) as u32;
        let high = self.read_byte(sp.wrapping_add(2)) as u32 & 0x0F;
        let psw = self.read_byte(sp.wrapping_add(3));

        self.pc = low | (high << 16);
        self.psw = Psw::from_bits_retain(psw);
        self.sp = sp.wrapping_add(4);
    }

    fn halt(&mut self) {
        self.halted = true;
    }
}

/// Interval timer registers, recorded instead of driving a peripheral.
#[derive(Debug, Default)]
pub struct SimTimerRegs {
    pub clock_supplied: bool,
    pub masked: bool,
    pub request_cleared: bool,
    /// Every value written to ITMC, oldest first.
    pub itmc_writes: [Option<u16>; 4],
}

impl IntervalTimerRegs for SimTimerRegs {
    fn supply_clock(&mut self) {
        self.clock_supplied = true;
    }

    fn set_masked(&mut self, masked: bool) {
        self.masked = masked;
    }

    fn write_itmc(&mut self, value: u16) {
        if let Some(slot) = self.itmc_writes.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(value);
        }
    }

    fn clear_request(&mut self) {
        self.request_cleared = true;
    }
}
