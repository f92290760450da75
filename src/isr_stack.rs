use crate::stack::StackRegion;
use rlport_traits::cpu::RawCpu;

/// The dedicated stack interrupt handlers run on, and how deep they nest.
///
/// Depth 0 means no handler is active. The outermost handler moves SP onto
/// this stack on entry and back to the interrupted stack on exit. Nested
/// handlers are already here and leave SP alone.
#[derive(Debug)]
pub struct InterruptStack {
    region: StackRegion,
    depth: u8,
    outer_sp: u16,
}

impl InterruptStack {
    pub const fn new(region: StackRegion) -> Self {
        Self {
            region,
            depth: 0,
            outer_sp: 0,
        }
    }

    pub fn region(&self) -> &StackRegion {
        &self.region
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn is_active(&self) -> bool {
        self.depth != 0
    }

    /// SP of the interrupted task, valid while `is_active()`.
    pub fn outer_sp(&self) -> u16 {
        self.outer_sp
    }

    /// Called with interrupts disabled after the interrupted registers are
    /// pushed. Returns whether SP was moved.
    pub fn enter(&mut self, cpu: &mut impl RawCpu) -> bool {
        self.depth = self
            .depth
            .checked_add(1)
            .unwrap_or_else(|| panic!("interrupt nesting overflow"));

        if self.depth == 1 {
            self.outer_sp = cpu.stack_pointer();
            cpu.set_stack_pointer(self.region.top());
            true
        } else {
            false
        }
    }

    /// Called with interrupts disabled before the interrupted registers are
    /// popped. Returns whether SP was moved.
    pub fn leave(&mut self, cpu: &mut impl RawCpu) -> bool {
        assert!(self.depth != 0, "leaving the interrupt stack without entering it");
        self.depth -= 1;

        if self.depth == 0 {
            cpu.set_stack_pointer(self.outer_sp);
            true
        } else {
            false
        }
    }
}
