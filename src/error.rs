use core::fmt;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum PortError {
    StackTooSmall { len: u16, min: u16 },
    StackMisaligned(u16),
    StackWraps { base: u16, len: u16 },
    TickRateZero,
    TickRateTooHigh(u32),
    TickRateTooLow(u32),
}

impl fmt::Debug for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackTooSmall { len, min } => {
                write!(f, "StackTooSmall({len:#x} < {min:#x})")
            }
            Self::StackMisaligned(addr) => write!(f, "StackMisaligned({addr:#06x})"),
            Self::StackWraps { base, len } => write!(f, "StackWraps({base:#06x}+{len:#x})"),
            Self::TickRateZero => write!(f, "TickRateZero"),
            Self::TickRateTooHigh(rate) => write!(f, "TickRateTooHigh({rate})"),
            Self::TickRateTooLow(rate) => write!(f, "TickRateTooLow({rate})"),
        }
    }
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackTooSmall { len, min } => {
                write!(f, "stack of {len} bytes is below the minimum of {min}")
            }
            Self::StackMisaligned(addr) => {
                write!(f, "stack boundary {addr:#06x} is not word aligned")
            }
            Self::StackWraps { base, len } => write!(
                f,
                "stack at {base:#06x} with {len} bytes wraps the address space"
            ),
            Self::TickRateZero => write!(f, "tick rate must not be zero"),
            Self::TickRateTooHigh(rate) => {
                write!(f, "tick rate {rate} Hz exceeds the timer clock")
            }
            Self::TickRateTooLow(rate) => {
                write!(f, "tick rate {rate} Hz needs a compare value beyond the timer range")
            }
        }
    }
}

impl core::error::Error for PortError {}

pub type PortResult<T> = Result<T, PortError>;
