/// The scheduler's per-task record, seen from the port.
///
/// Only the saved stack pointer is visible here. The scheduler owns the
/// record and everything else in it.
pub trait TaskControlBlock {
    fn top_of_stack(&self) -> u16;
    fn set_top_of_stack(&mut self, sp: u16);
}

/// The scheduler's selection of the task that runs next.
///
/// The scheduler updates the selection with interrupts disabled before the
/// port restores a context. This is its only way to tell the port what to
/// run.
pub trait CurrentTask {
    type Handle: Copy;
    type Tcb: TaskControlBlock;

    fn get_current(&self) -> Self::Handle;
    fn set_current(&mut self, handle: Self::Handle);

    fn tcb(&self, handle: Self::Handle) -> &Self::Tcb;
    fn tcb_mut(&mut self, handle: Self::Handle) -> &mut Self::Tcb;

    fn current_tcb(&self) -> &Self::Tcb {
        self.tcb(self.get_current())
    }

    fn current_tcb_mut(&mut self) -> &mut Self::Tcb {
        let handle = self.get_current();
        self.tcb_mut(handle)
    }
}
