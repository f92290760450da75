use crate::{
    config::tick::INTERVAL_TIMER_CLOCK_HZ,
    error::{PortError, PortResult},
};

/// ITMC bit that starts the counter.
pub const ITMC_RINTE: u16 = 0x8000;

/// Largest compare value of the 12-bit interval counter.
pub const ITMC_COMPARE_MAX: u16 = 0x0FFF;

/// Whatever produces the periodic tick interrupt.
///
/// The tick handler itself is an ordinary kernel-class interrupt. Boards
/// with their own tick hardware implement this instead of using
/// [`IntervalTimer`].
pub trait TickSource {
    fn start(&mut self, tick_rate_hz: u32) -> PortResult<()>;
}

/// Register access for the interval timer.
pub trait IntervalTimerRegs {
    /// Turn on the peripheral clock (RTCEN or TMKAEN depending on part).
    fn supply_clock(&mut self);
    /// Mask or unmask the INTIT request.
    fn set_masked(&mut self, masked: bool);
    fn write_itmc(&mut self, value: u16);
    /// Clear the INTIT request flag.
    fn clear_request(&mut self);
}

/// Compare value making the interval timer fire at `tick_rate_hz`.
pub fn interval_compare(clock_hz: u32, tick_rate_hz: u32) -> PortResult<u16> {
    if tick_rate_hz == 0 {
        return Err(PortError::TickRateZero);
    }

    if tick_rate_hz > clock_hz {
        return Err(PortError::TickRateTooHigh(tick_rate_hz));
    }

    let compare = clock_hz / tick_rate_hz - 1;
    if compare > ITMC_COMPARE_MAX as u32 {
        return Err(PortError::TickRateTooLow(tick_rate_hz));
    }

    Ok(compare as u16)
}

/// The on-chip 12-bit interval timer, clocked from the low-speed oscillator.
pub struct IntervalTimer<R> {
    regs: R,
    clock_hz: u32,
}

impl<R> IntervalTimer<R>
where
    R: IntervalTimerRegs,
{
    pub fn new(regs: R) -> Self {
        Self::with_clock(regs, INTERVAL_TIMER_CLOCK_HZ)
    }

    pub fn with_clock(regs: R, clock_hz: u32) -> Self {
        Self { regs, clock_hz }
    }

    pub fn regs(&self) -> &R {
        &self.regs
    }
}

impl<R> TickSource for IntervalTimer<R>
where
    R: IntervalTimerRegs,
{
    fn start(&mut self, tick_rate_hz: u32) -> PortResult<()> {
        let compare = interval_compare(self.clock_hz, tick_rate_hz)?;

        self.regs.supply_clock();
        self.regs.set_masked(true);
        self.regs.write_itmc(0);
        self.regs.clear_request();
        self.regs.write_itmc(compare | ITMC_RINTE);
        self.regs.set_masked(false);

        Ok(())
    }
}
