use std::sync::{Mutex, OnceLock};

use flexi_logger::{Logger, LoggerHandle, WriteMode};
use persistent_trees::AggregatedData;
use scopeguard::{OnUnwind, ScopeGuard};

#[allow(dead_code)]
pub mod slow_map;

/// Concatenation of decimal digits in order. Not commutative, so it catches merges done in the wrong order.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggDigits {
    pub value: u64,
    pub digits: u32,
}

impl AggregatedData for AggDigits {
    type Data = u8;

    fn from(data: &Self::Data) -> Self {
        Self {
            value: *data as u64,
            digits: 1,
        }
    }

    fn merge(self, right: Self) -> Self {
        Self {
            value: self.value * 10u64.pow(right.digits) + right.value,
            digits: self.digits + right.digits,
        }
    }
}

impl PartialEq<u64> for AggDigits {
    fn eq(&self, other: &u64) -> bool {
        self.value == *other
    }
}

#[allow(dead_code)]
static LOGGER: OnceLock<Mutex<LoggerHandle>> = OnceLock::new();

/// Starts logging to stdout once per test binary. `RUST_LOG` picks the level, `info` by default.
#[allow(dead_code)]
pub fn init_logger() {
    LOGGER.get_or_init(|| {
        let handle = Logger::try_with_env_or_str("info")
            .and_then(|logger| {
                logger
                    .log_to_stdout()
                    .write_mode(WriteMode::SupportCapture)
                    .format(flexi_logger::colored_opt_format)
                    .start()
            })
            .unwrap_or_else(|e| panic!("cannot start test logger: {e}"));
        Mutex::new(handle)
    });
}

/// Logs the structure if the test panics while it is alive.
#[allow(dead_code)]
pub fn guard<T: std::fmt::Debug>(t: T) -> ScopeGuard<T, impl FnOnce(T), OnUnwind> {
    scopeguard::guard_on_unwind(t, |t| log::error!("Crash with {t:?}"))
}
