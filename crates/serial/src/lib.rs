//! Serial console output.
//!
//! Print utilities over the first serial interface, used for early firmware
//! diagnostics.
#![no_std]

use core::fmt;
use core::fmt::Write;

use lazy_static::lazy_static;
use spin::Mutex;
use uart_16550::SerialPort;
use x86_64::instructions::interrupts;

/// I/O port of the first serial interface.
const SERIAL1_PORT: u16 = 0x3F8;

lazy_static! {
    static ref SERIAL1: Mutex<SerialPort> = {
        // SAFETY: 0x3F8 is the standard COM1 base port on PC platforms.
        let mut port = unsafe { SerialPort::new(SERIAL1_PORT) };
        port.init();
        Mutex::new(port)
    };
}

// ———————————————————————————— Print Utilities ————————————————————————————— //

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::_print(core::format_args!($($arg)*));
    };
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", core::format_args!($($arg)*)));
}

/// Internal function used to print to the serial console.
///
/// Interrupts are masked for the duration of the write so that a handler
/// printing on the same CPU cannot deadlock on the port mutex.
pub fn _print(args: fmt::Arguments) {
    interrupts::without_interrupts(|| {
        SERIAL1
            .lock()
            .write_fmt(args)
            .expect("Printing to serial failed");
    });
}
