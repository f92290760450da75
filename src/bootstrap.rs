use crate::{
    config::critical::INITIAL_CRITICAL_NESTING, error::PortResult, port::Port, tick::TickSource,
};
use rlport_critical::assert_critical_nesting_eq;
use rlport_log::println_info;
use rlport_traits::{cpu::RawCpu, task::CurrentTask};

impl<C, S> Port<C, S>
where
    C: RawCpu,
    S: CurrentTask,
{
    /// Starts the tick and then the task the scheduler has selected.
    ///
    /// Called with interrupts disabled and the nesting counter still at its
    /// boot sentinel. On hardware this never returns: execution continues in
    /// the first task. Only a rejected tick configuration comes back.
    pub fn start_scheduler(&mut self, tick: &mut impl TickSource) -> PortResult<()> {
        tick.start(self.tick_rate_hz())?;
        println_info!("scheduler starting, tick at {} Hz", self.tick_rate_hz());

        self.start_first_task();
        Ok(())
    }

    /// Restores the selected task without a matching save.
    ///
    /// The nesting counter drops from its sentinel to the zero stored in the
    /// task's initial frame as part of the restore, and the return from
    /// interrupt turns interrupts on.
    pub fn start_first_task(&mut self) {
        assert!(
            self.interrupt_stack().is_none_or(|isr_stack| !isr_stack.is_active()),
            "first task started from inside an interrupt"
        );
        assert_critical_nesting_eq!(
            self.critical_nesting(),
            INITIAL_CRITICAL_NESTING,
            "first task already started"
        );

        self.cpu_mut().disable_interrupts();
        self.resume_current();
    }
}
