//! Routes `log` records to the host: the browser console on wasm32, the
//! core's terminal logger everywhere else.

use dynsim_core::LogLevel;

#[cfg(target_arch = "wasm32")]
mod console {
    use log::{Level, Log, Metadata, Record};
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_namespace = console, js_name = error)]
        fn console_error(message: &str);
        #[wasm_bindgen(js_namespace = console, js_name = warn)]
        fn console_warn(message: &str);
        #[wasm_bindgen(js_namespace = console, js_name = log)]
        fn console_log(message: &str);
    }

    pub struct ConsoleLogger;

    impl Log for ConsoleLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record) {
            if !self.enabled(record.metadata()) {
                return;
            }
            let message = format!("[{}] {}", record.level(), record.args());
            match record.level() {
                Level::Error => console_error(&message),
                Level::Warn => console_warn(&message),
                _ => console_log(&message),
            }
        }

        fn flush(&self) {}
    }

    pub static LOGGER: ConsoleLogger = ConsoleLogger;
}

/// Installs the host logger if needed and applies `level`.
#[cfg(target_arch = "wasm32")]
pub fn install(level: LogLevel) {
    // Only the first call installs; later calls just move the level.
    let _ = log::set_logger(&console::LOGGER);
    log::set_max_level(level.into());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn install(level: LogLevel) {
    dynsim_core::logging::init_logging(level);
}
