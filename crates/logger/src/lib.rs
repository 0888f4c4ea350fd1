//! Logger for the `log` facade, writing to the serial console.
#![no_std]

use core::sync::atomic::{AtomicBool, Ordering};

use log::{LevelFilter, Metadata, Record};

static LOGGER: SerialLogger = SerialLogger;
static IS_INITIALIZED: AtomicBool = AtomicBool::new(false);

struct SerialLogger;

impl log::Log for SerialLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        // Filtering is done globally through `log::set_max_level`.
        true
    }

    fn log(&self, record: &Record) {
        serial::_print(core::format_args!(
            "[{} | {}] {}\n",
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}

/// Installs the serial logger.
///
/// Safe to call more than once: later calls are ignored with a warning.
pub fn init(level: LevelFilter) {
    match IS_INITIALIZED.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst) {
        Ok(_) => {
            log::set_logger(&LOGGER).unwrap();
            log::set_max_level(level);
        }
        Err(_) => {
            log::warn!("Logger is already initialized, skipping init");
        }
    };
}
