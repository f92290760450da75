use rlport_traits::task::{CurrentTask, TaskControlBlock};

/// The port-visible part of a task control block.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskControl {
    top_of_stack: u16,
}

impl TaskControl {
    pub const fn new(top_of_stack: u16) -> Self {
        Self { top_of_stack }
    }
}

impl TaskControlBlock for TaskControl {
    fn top_of_stack(&self) -> u16 {
        self.top_of_stack
    }

    fn set_top_of_stack(&mut self, sp: u16) {
        self.top_of_stack = sp;
    }
}

/// A fixed table of control blocks plus the index of the selected one.
///
/// Deciding which slot runs next is up to the scheduler; this only records
/// the decision.
#[derive(Debug)]
pub struct TaskSlots<const N: usize> {
    tcbs: [TaskControl; N],
    current: usize,
}

impl<const N: usize> TaskSlots<N> {
    pub const fn new() -> Self {
        Self {
            tcbs: [TaskControl::new(0); N],
            current: 0,
        }
    }
}

impl<const N: usize> Default for TaskSlots<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CurrentTask for TaskSlots<N> {
    type Handle = usize;
    type Tcb = TaskControl;

    fn get_current(&self) -> usize {
        self.current
    }

    fn set_current(&mut self, handle: usize) {
        assert!(handle < N, "task slot {handle} out of range");
        self.current = handle;
    }

    fn tcb(&self, handle: usize) -> &TaskControl {
        &self.tcbs[handle]
    }

    fn tcb_mut(&mut self, handle: usize) -> &mut TaskControl {
        &mut self.tcbs[handle]
    }
}
