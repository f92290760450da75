pub trait InterruptMask {
    fn disable_interrupts(&mut self);
    fn enable_interrupts(&mut self);
    fn is_interrupt_enabled(&self) -> bool;
}

/// How an interrupt source interacts with the scheduler.
///
/// The class is configured per handler and is never inferred from the
/// interrupt priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptClass {
    /// May call scheduler APIs and switch tasks. Saves the full task
    /// context and must never nest.
    Kernel,
    /// Higher priority, never calls scheduler APIs. Saves registers only
    /// and may nest freely.
    Nestable,
}

impl InterruptClass {
    pub const fn may_nest(self) -> bool {
        matches!(self, Self::Nestable)
    }
}
