use crate::{
    arch::TaskEntry,
    config::{frame::TASK_EXIT_TRAP, tick::DEFAULT_TICK_RATE_HZ},
    frame::SavedContext,
    isr_stack::InterruptStack,
    stack::{StackRegion, initialise_stack},
};
use rlport_critical::CriticalNesting;
use rlport_log::{println_fatal, println_trace};
use rlport_traits::{
    cpu::{GeneralRegisters, RawCpu, SegmentSelectors},
    interrupt::InterruptClass,
    task::{CurrentTask, TaskControlBlock},
};

#[derive(Debug, Clone, Copy)]
pub struct PortConfig {
    /// Stack for interrupt handlers. Without one, handlers run on the
    /// interrupted task's stack with interrupts disabled.
    pub interrupt_stack: Option<StackRegion>,
    pub tick_rate_hz: u32,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            interrupt_stack: None,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
        }
    }
}

/// The execution core: carries out task switches decided elsewhere.
///
/// `C` is the CPU adapter. `S` is the scheduler's current task selection,
/// which is read on every restore and written only by the scheduler.
pub struct Port<C, S> {
    cpu: C,
    tasks: S,
    nesting: CriticalNesting,
    isr_stack: Option<InterruptStack>,
    tick_rate_hz: u32,
    in_kernel_isr: bool,
    exit_error_signaled: bool,
}

impl<C, S> Port<C, S>
where
    C: RawCpu,
    S: CurrentTask,
{
    /// The nesting counter starts at its boot sentinel, so nothing here can
    /// turn interrupts on before the first task runs.
    pub fn new(cpu: C, tasks: S, config: PortConfig) -> Self {
        Self {
            cpu,
            tasks,
            nesting: CriticalNesting::new(),
            isr_stack: config.interrupt_stack.map(InterruptStack::new),
            tick_rate_hz: config.tick_rate_hz,
            in_kernel_isr: false,
            exit_error_signaled: false,
        }
    }

    pub fn cpu(&self) -> &C {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut C {
        &mut self.cpu
    }

    pub fn tasks(&self) -> &S {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut S {
        &mut self.tasks
    }

    pub fn critical_nesting(&self) -> &CriticalNesting {
        &self.nesting
    }

    pub fn interrupt_stack(&self) -> Option<&InterruptStack> {
        self.isr_stack.as_ref()
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
    }

    /// Builds the initial frame of a new task in `region`. The scheduler
    /// stores the returned stack pointer in the task's control block.
    pub fn initialise_stack(&mut self, region: &StackRegion, entry: TaskEntry, arg: u16) -> u16 {
        initialise_stack(&mut self.cpu, region, entry, arg)
    }

    /// Decodes the frame a suspended task will resume from.
    pub fn saved_context(&self, handle: S::Handle) -> SavedContext {
        SavedContext::read_from(&self.cpu, self.tasks.tcb(handle).top_of_stack())
    }

    pub fn enter_critical(&mut self) {
        self.nesting.enter(&mut self.cpu);
    }

    pub fn exit_critical(&mut self) {
        self.nesting.exit(&mut self.cpu);
    }

    fn push_registers(&mut self) {
        let regs = self.cpu.general_registers();
        let segments = self.cpu.segment_selectors();

        self.cpu.push_word(regs.ax);
        self.cpu.push_word(regs.bc);
        self.cpu.push_word(regs.de);
        self.cpu.push_word(regs.hl);
        self.cpu.push_word(segments.to_word());
    }

    fn pop_registers(&mut self) {
        let segments = SegmentSelectors::from_word(self.cpu.pop_word());
        let hl = self.cpu.pop_word();
        let de = self.cpu.pop_word();
        let bc = self.cpu.pop_word();
        let ax = self.cpu.pop_word();

        self.cpu.set_segment_selectors(segments);
        self.cpu.set_general_registers(GeneralRegisters { ax, bc, de, hl });
    }

    fn enter_interrupt_stack(&mut self) {
        if let Some(isr_stack) = self.isr_stack.as_mut() {
            isr_stack.enter(&mut self.cpu);

            // Nested handlers may only run once SP is off the task stack.
            self.cpu.enable_interrupts();
        }
    }

    fn leave_interrupt_stack(&mut self) {
        if let Some(isr_stack) = self.isr_stack.as_mut() {
            isr_stack.leave(&mut self.cpu);
        }
    }

    /// Loads the selected task's stack pointer and unwinds its saved frame
    /// into the CPU, ending with the return from interrupt.
    pub(crate) fn resume_current(&mut self) {
        let sp = self.tasks.current_tcb().top_of_stack();
        self.cpu.set_stack_pointer(sp);

        let nesting = self.cpu.pop_word();
        self.nesting.load(nesting);
        self.pop_registers();

        println_trace!(
            "trace_context",
            "resume sp={:#06x} nesting={}",
            sp,
            nesting
        );

        self.cpu.return_from_interrupt();
    }

    /// Entry half of a kernel-class interrupt.
    ///
    /// Must run first thing in the handler, with interrupts still disabled
    /// by the interrupt acknowledge.
    pub fn save_context(&mut self) {
        let nested = self.in_kernel_isr
            || self
                .isr_stack
                .as_ref()
                .is_some_and(InterruptStack::is_active);
        assert!(!nested, "kernel-class interrupts must not nest");
        self.in_kernel_isr = true;

        self.push_registers();
        self.cpu.push_word(self.nesting.count());

        let sp = self.cpu.stack_pointer();
        self.tasks.current_tcb_mut().set_top_of_stack(sp);

        println_trace!(
            "trace_context",
            "save sp={:#06x} nesting={}",
            sp,
            self.nesting.count()
        );

        self.enter_interrupt_stack();
    }

    /// Exit half of a kernel-class interrupt. Resumes whichever task the
    /// scheduler has selected by now.
    pub fn restore_context(&mut self) {
        self.cpu.disable_interrupts();
        self.leave_interrupt_stack();
        self.in_kernel_isr = false;

        self.resume_current();
    }

    /// Entry half of a nestable interrupt: registers only, no control block
    /// or nesting counter involved.
    pub fn save_registers(&mut self) {
        self.push_registers();
        self.enter_interrupt_stack();
    }

    /// Exit half of a nestable interrupt.
    pub fn restore_registers(&mut self) {
        self.cpu.disable_interrupts();
        self.leave_interrupt_stack();
        self.pop_registers();
        self.cpu.return_from_interrupt();
    }

    /// Runs `handler` as a kernel-class interrupt. The handler may select a
    /// different task through [`Port::tasks_mut`].
    pub fn kernel_interrupt(&mut self, handler: impl FnOnce(&mut Self)) {
        self.save_context();
        handler(self);
        self.restore_context();
    }

    /// Runs `handler` as a nestable interrupt.
    pub fn nestable_interrupt(&mut self, handler: impl FnOnce(&mut Self)) {
        self.save_registers();
        handler(self);
        self.restore_registers();
    }

    /// Called by the running task to give up the CPU. `select` runs as the
    /// yield handler and picks the task to resume. The caller continues
    /// after the yield once it is selected again.
    pub fn yield_from_task(&mut self, select: impl FnOnce(&mut Self)) {
        self.cpu.software_interrupt();
        self.kernel_interrupt(select);
    }

    /// Runs `handler` the way its configured class requires.
    pub fn handle_interrupt(&mut self, class: InterruptClass, handler: impl FnOnce(&mut Self)) {
        match class {
            InterruptClass::Kernel => self.kernel_interrupt(handler),
            InterruptClass::Nestable => self.nestable_interrupt(handler),
        }
    }

    /// Where a task function that returned ends up. Fatal: interrupts stay
    /// off and the CPU halts. Reported once.
    pub fn task_exit_error(&mut self) {
        if !self.exit_error_signaled {
            self.exit_error_signaled = true;
            println_fatal!("a task returned from its entry function, halting");
        }

        self.cpu.disable_interrupts();
        self.cpu.halt();
    }

    /// Invokes [`Port::task_exit_error`] if execution reached the exit trap.
    pub fn check_exit_trap(&mut self) -> bool {
        if self.cpu.program_counter() != TASK_EXIT_TRAP {
            return false;
        }

        self.task_exit_error();
        true
    }

    pub fn exit_error_signaled(&self) -> bool {
        self.exit_error_signaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        arch::{INITIAL_PSW, Psw, rl78::sim::Rl78Sim},
        config::critical::INITIAL_CRITICAL_NESTING,
        task::TaskSlots,
    };
    use rlport_traits::{interrupt::InterruptMask, memory::StackMemory};

    const TICK: u32 = 0x38;

    fn port(interrupt_stack: Option<StackRegion>) -> Port<Rl78Sim, TaskSlots<2>> {
        let config = PortConfig {
            interrupt_stack,
            ..PortConfig::default()
        };
        Port::new(Rl78Sim::new(), TaskSlots::new(), config)
    }

    fn spawn(port: &mut Port<Rl78Sim, TaskSlots<2>>, slot: usize, base: u16, entry: u32, arg: u16) {
        let region = StackRegion::new(base, 0x100).unwrap();
        let sp = port.initialise_stack(&region, TaskEntry::new(entry), arg);
        port.tasks_mut().tcb_mut(slot).set_top_of_stack(sp);
    }

    #[test]
    fn starts_with_sentinel_nesting() {
        let port = port(None);
        assert_eq!(port.critical_nesting().count(), INITIAL_CRITICAL_NESTING);
    }

    #[test]
    fn restore_of_fresh_frame_starts_task() {
        let mut port = port(None);
        spawn(&mut port, 0, 0xE000, 0x2000, 0x1234);

        port.restore_context();

        let cpu = port.cpu();
        assert_eq!(cpu.pc(), 0x2000);
        assert_eq!(cpu.general_registers().ax, 0x1234);
        assert_eq!(cpu.psw(), INITIAL_PSW);
        assert!(cpu.is_interrupt_enabled());
        assert_eq!(cpu.stack_pointer(), 0xE100 - 4);
        assert_eq!(port.critical_nesting().count(), 0);
    }

    #[test]
    fn save_writes_frame_and_control_block() {
        let mut port = port(None);
        spawn(&mut port, 0, 0xE000, 0x2000, 0);
        port.start_first_task();

        let regs = GeneralRegisters {
            ax: 0xA1A1,
            bc: 0xB2B2,
            de: 0xD3D3,
            hl: 0x4545,
        };
        port.cpu_mut().set_general_registers(regs);
        port.cpu_mut().set_pc(0x2010);
        port.enter_critical();

        port.cpu_mut().brk();
        port.save_context();

        let sp = port.cpu().stack_pointer();
        assert_eq!(port.tasks().tcb(0).top_of_stack(), sp);
        assert_eq!(sp, 0xE100 - 4 - 16);

        let context = port.saved_context(0);
        assert_eq!(context.critical_nesting, 1);
        assert_eq!(context.registers(), regs);
        assert_eq!(context.program_counter(), 0x2012);
        assert!(!context.psw().contains(Psw::IE));
    }

    #[test]
    fn save_then_restore_is_identity() {
        let mut port = port(None);
        spawn(&mut port, 0, 0xE000, 0x2000, 7);
        port.start_first_task();

        let regs = GeneralRegisters {
            ax: 1,
            bc: 2,
            de: 3,
            hl: 4,
        };
        let segments = SegmentSelectors::new(0x02, 0x0E);
        port.cpu_mut().set_general_registers(regs);
        port.cpu_mut().set_segment_selectors(segments);
        port.cpu_mut().set_pc(0x2044);
        let sp = port.cpu().stack_pointer();

        port.cpu_mut().accept_interrupt(TICK);
        port.kernel_interrupt(|port| {
            // Handler code is free to clobber the working registers.
            port.cpu_mut().set_general_registers(GeneralRegisters::default());
            port.cpu_mut().set_segment_selectors(SegmentSelectors::default());
        });

        let cpu = port.cpu();
        assert_eq!(cpu.general_registers(), regs);
        assert_eq!(cpu.segment_selectors(), segments);
        assert_eq!(cpu.pc(), 0x2044);
        assert_eq!(cpu.stack_pointer(), sp);
        assert!(cpu.is_interrupt_enabled());
        assert_eq!(port.critical_nesting().count(), 0);
    }

    #[test]
    fn save_frame_matches_cold_frame_layout() {
        let mut port = port(None);
        spawn(&mut port, 0, 0xE000, 0x2000, 0x55);
        let cold = port.saved_context(0);

        let cold_sp = port.tasks().tcb(0).top_of_stack();

        port.start_first_task();
        port.cpu_mut().accept_interrupt(TICK);
        port.save_context();

        // Nothing ran in between, so the warm frame lands exactly on the
        // cold one.
        assert_eq!(port.tasks().tcb(0).top_of_stack(), cold_sp);
        assert_eq!(port.saved_context(0), cold);
    }

    #[test]
    fn switches_between_tasks() {
        let mut port = port(None);
        spawn(&mut port, 0, 0xE000, 0x2000, 0xAAAA);
        spawn(&mut port, 1, 0xE200, 0x3000, 0xBBBB);

        port.start_first_task();
        assert_eq!(port.cpu().pc(), 0x2000);

        port.cpu_mut().accept_interrupt(TICK);
        port.kernel_interrupt(|port| port.tasks_mut().set_current(1));
        assert_eq!(port.cpu().pc(), 0x3000);
        assert_eq!(port.cpu().general_registers().ax, 0xBBBB);

        port.cpu_mut().accept_interrupt(TICK);
        port.kernel_interrupt(|port| port.tasks_mut().set_current(0));
        assert_eq!(port.cpu().pc(), 0x2000);
        assert_eq!(port.cpu().general_registers().ax, 0xAAAA);
        assert_eq!(port.cpu().stack_pointer(), 0xE100 - 4);
    }

    #[test]
    fn interrupt_stack_isolates_handler() {
        let isr_region = StackRegion::new(0xF800, 0x100).unwrap();
        let mut port = port(Some(isr_region));
        spawn(&mut port, 0, 0xE000, 0x2000, 0);
        port.start_first_task();

        let task_sp = port.cpu().stack_pointer();
        port.cpu_mut().accept_interrupt(TICK);
        port.save_context();

        let saved_sp = port.tasks().tcb(0).top_of_stack();
        assert_eq!(port.cpu().stack_pointer(), 0xF900);
        assert_eq!(port.interrupt_stack().unwrap().outer_sp(), saved_sp);
        assert!(port.cpu().is_interrupt_enabled());

        port.restore_context();
        assert_eq!(port.cpu().stack_pointer(), task_sp);
        assert_eq!(port.interrupt_stack().unwrap().depth(), 0);
    }

    #[test]
    fn handlers_without_interrupt_stack_keep_interrupts_off() {
        let mut port = port(None);
        spawn(&mut port, 0, 0xE000, 0x2000, 0);
        port.start_first_task();

        port.cpu_mut().accept_interrupt(TICK);
        port.kernel_interrupt(|port| {
            assert!(!port.cpu().is_interrupt_enabled());
        });
    }

    #[test]
    #[should_panic(expected = "must not nest")]
    fn kernel_interrupts_do_not_nest() {
        let mut port = port(None);
        spawn(&mut port, 0, 0xE000, 0x2000, 0);
        port.start_first_task();

        port.cpu_mut().accept_interrupt(TICK);
        port.save_context();
        port.save_context();
    }

    #[test]
    #[should_panic(expected = "must not nest")]
    fn kernel_interrupt_inside_nestable_is_rejected() {
        let isr_region = StackRegion::new(0xF800, 0x100).unwrap();
        let mut port = port(Some(isr_region));
        spawn(&mut port, 0, 0xE000, 0x2000, 0);
        port.start_first_task();

        port.cpu_mut().accept_interrupt(0x10);
        port.save_registers();
        port.cpu_mut().accept_interrupt(TICK);
        port.save_context();
    }

    #[test]
    fn task_return_hits_exit_trap_once() {
        let mut port = port(None);
        spawn(&mut port, 0, 0xE000, 0x2000, 0);
        port.start_first_task();
        assert!(!port.check_exit_trap());

        // The task function returns through the address below its frame.
        port.cpu_mut().ret();
        assert_eq!(port.cpu().pc(), TASK_EXIT_TRAP);

        assert!(port.check_exit_trap());
        assert!(port.exit_error_signaled());
        assert!(port.cpu().is_halted());
        assert!(!port.cpu().is_interrupt_enabled());

        assert!(port.check_exit_trap());
        assert!(port.exit_error_signaled());
    }

    #[test]
    fn critical_section_survives_preemption() {
        let mut port = port(None);
        spawn(&mut port, 0, 0xE000, 0x2000, 0);
        spawn(&mut port, 1, 0xE200, 0x3000, 0);
        port.start_first_task();

        port.enter_critical();
        assert_eq!(port.critical_nesting().count(), 1);

        // A yield from inside the critical section.
        port.yield_from_task(|port| port.tasks_mut().set_current(1));

        assert_eq!(port.critical_nesting().count(), 0);
        assert!(port.cpu().is_interrupt_enabled());
        port.enter_critical();
        port.enter_critical();
        port.exit_critical();
        port.exit_critical();
        assert!(port.cpu().is_interrupt_enabled());

        port.cpu_mut().accept_interrupt(TICK);
        port.kernel_interrupt(|port| port.tasks_mut().set_current(0));

        assert_eq!(port.critical_nesting().count(), 1);
        assert!(!port.cpu().is_interrupt_enabled());

        port.exit_critical();
        assert!(port.cpu().is_interrupt_enabled());
    }

    #[test]
    fn class_selects_what_is_saved() {
        let isr_region = StackRegion::new(0xF800, 0x100).unwrap();
        let mut port = port(Some(isr_region));
        spawn(&mut port, 0, 0xE000, 0x2000, 0);
        spawn(&mut port, 1, 0xE200, 0x3000, 0);
        port.start_first_task();
        let cold_sp = port.tasks().tcb(0).top_of_stack();

        port.cpu_mut().accept_interrupt(0x10);
        port.handle_interrupt(InterruptClass::Nestable, |port| {
            assert!(InterruptClass::Nestable.may_nest());
            assert_eq!(port.interrupt_stack().unwrap().depth(), 1);
        });
        assert_eq!(port.tasks().tcb(0).top_of_stack(), cold_sp);
        assert_eq!(port.cpu().pc(), 0x2000);

        port.cpu_mut().accept_interrupt(TICK);
        port.handle_interrupt(InterruptClass::Kernel, |port| {
            assert!(!InterruptClass::Kernel.may_nest());
            port.tasks_mut().set_current(1);
        });
        assert_eq!(port.tasks().tcb(0).top_of_stack(), cold_sp);
        assert_eq!(port.cpu().pc(), 0x3000);
    }

    #[test]
    fn yield_resumes_after_the_trap() {
        let mut port = port(None);
        spawn(&mut port, 0, 0xE000, 0x2000, 0);
        spawn(&mut port, 1, 0xE200, 0x3000, 0);
        port.start_first_task();

        port.cpu_mut().set_pc(0x2010);
        port.yield_from_task(|port| port.tasks_mut().set_current(1));
        assert_eq!(port.cpu().pc(), 0x3000);
        assert_eq!(port.saved_context(0).program_counter(), 0x2012);

        port.yield_from_task(|port| port.tasks_mut().set_current(0));
        assert_eq!(port.cpu().pc(), 0x2012);
        assert!(port.cpu().is_interrupt_enabled());
        assert_eq!(port.cpu().stack_pointer(), 0xE100 - 4);
    }

    #[test]
    fn fresh_frame_bytes_sit_in_task_memory() {
        let mut port = port(None);
        spawn(&mut port, 0, 0xE000, 0x2000, 0);
        let sp = port.tasks().tcb(0).top_of_stack();
        assert_eq!(port.cpu().read_word(sp), 0);
    }
}
