use bitflags::bitflags;
use cfg_if::cfg_if;

pub mod sim;

bitflags! {
    /// Processor status word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Psw: u8 {
        const CY = 1 << 0;
        const ISP0 = 1 << 1;
        const ISP1 = 1 << 2;
        const RBS0 = 1 << 3;
        const AC = 1 << 4;
        const RBS1 = 1 << 5;
        const Z = 1 << 6;
        const IE = 1 << 7;
    }
}

impl Psw {
    /// In-service priority. 3 is the least urgent level.
    pub const fn in_service_priority(self) -> u8 {
        (self.bits() >> 1) & 0b11
    }

    /// Register bank selected by RBS1:RBS0.
    pub const fn register_bank(self) -> u8 {
        ((self.bits() >> 4) & 0b10) | ((self.bits() >> 3) & 0b01)
    }
}

/// Status word of a task that has never run: interrupts enabled, lowest
/// in-service priority, register bank 0, carry flags cleared.
pub const INITIAL_PSW: Psw = Psw::IE
    .union(Psw::Z)
    .union(Psw::ISP1)
    .union(Psw::ISP0);

cfg_if! {
    if #[cfg(feature = "code-model-small")] {
        /// Small code model: function pointers are 16 bits wide.
        pub const CODE_ADDRESS_MASK: u32 = 0x0_FFFF;
    } else {
        /// Medium code model: function pointers cover the 20-bit space.
        pub const CODE_ADDRESS_MASK: u32 = 0xF_FFFF;
    }
}

/// Address of a task function.
///
/// The function takes one 16-bit parameter in AX and must never return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskEntry(u32);

impl TaskEntry {
    pub const fn new(addr: u32) -> Self {
        Self(addr & CODE_ADDRESS_MASK)
    }

    pub const fn addr(self) -> u32 {
        self.0
    }

    /// Bits 0..16 of the address.
    pub const fn low(self) -> u16 {
        self.0 as u16
    }

    /// Bits 16..20 of the address.
    pub const fn high(self) -> u8 {
        (self.0 >> 16) as u8 & 0x0F
    }
}
