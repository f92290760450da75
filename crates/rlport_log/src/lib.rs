#![cfg_attr(not(test), no_std)]

use core::fmt::{self, Write};
use spin::Mutex;

pub trait ConsoleWrite: Send + Sync {
    fn write(&self, s: &str);
}

struct Console {
    console: Option<&'static dyn ConsoleWrite>,
}

static CONSOLE: Mutex<Console> = Mutex::new(Console::new());

impl Console {
    const fn new() -> Self {
        Self { console: None }
    }
}

impl Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if let Some(console) = self.console {
            console.write(s);
        }
        Ok(())
    }
}

pub fn set_console(console: &'static dyn ConsoleWrite) {
    CONSOLE.lock().console.replace(console);
}

/// Output from an interrupt that preempted a print in progress is dropped.
/// Spinning there would never end: the holder cannot run until we return.
#[doc(hidden)]
pub fn do_print(args: fmt::Arguments) {
    if let Some(mut console) = CONSOLE.try_lock() {
        let _ = console.write_fmt(args);
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::do_print(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! println {
    () => {
        $crate::print!("\n")
    };
    ($($arg:tt)*) => {
        $crate::print!("{}\n", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! println_info {
    ($($arg:tt)*) => {
        $crate::println!("[port: info] {}", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! println_fatal {
    () => {
        $crate::println!("[port:fatal] ")
    };
    ($($arg:tt)*) => {
        $crate::println!("[port:fatal] {}", format_args!($($arg)*))
    };
}

/// Prints only when the calling crate enables feature `$feat`.
#[macro_export]
macro_rules! println_trace {
    ($feat:literal) => {{
        #[deny(unexpected_cfgs)]
        #[cfg(feature = $feat)]
        $crate::println!("[port:trace] ");
    }};
    ($feat:literal, $($arg:tt)*) => {{
        #[deny(unexpected_cfgs)]
        #[cfg(feature = $feat)]
        $crate::println!("[port:trace] {}", format_args!($($arg)*));
    }};
}
