// SPDX-License-Identifier: Apache-2.0

//! Debug output. No `log`/`tracing` dependency: this crate drives a
//! hand-rolled `kprint!`/`kprintln!` pair that compiles to a raw UART write
//! on bare metal and to `std::println!` everywhere else, plus a pair of
//! `trace_*!` macros for the swap path that are silent unless their feature
//! is enabled.

#[cfg(all(baremetal, any(feature = "debug-print", feature = "print-panics")))]
pub struct DebugUart {
    pub base: *mut u8,
}

#[cfg(all(baremetal, any(feature = "debug-print", feature = "print-panics")))]
unsafe impl Sync for DebugUart {}

#[cfg(all(baremetal, any(feature = "debug-print", feature = "print-panics")))]
impl core::fmt::Write for DebugUart {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for b in s.bytes() {
            unsafe { core::ptr::write_volatile(self.base, b) };
        }
        Ok(())
    }
}

#[cfg(all(baremetal, any(feature = "debug-print", feature = "print-panics")))]
pub static DEBUG_UART: DebugUart = DebugUart { base: 0xffcf_0000 as *mut u8 };

#[cfg(all(baremetal, any(feature = "debug-print", feature = "print-panics")))]
#[macro_export]
macro_rules! kprint {
    ($($args:tt)+) => {{
        use core::fmt::Write;
        let mut uart = $crate::macros::DebugUart { base: $crate::macros::DEBUG_UART.base };
        let _ = write!(uart, $($args)+);
    }};
}

#[cfg(all(baremetal, not(any(feature = "debug-print", feature = "print-panics"))))]
#[macro_export]
macro_rules! kprint {
    ($($args:tt)+) => {{}};
}

#[cfg(not(baremetal))]
#[macro_export]
macro_rules! kprint {
    ($($args:tt)+) => {{ std::print!($($args)+) }};
}

#[macro_export]
macro_rules! kprintln {
    () => { $crate::kprint!("\r\n") };
    ($fmt:expr) => { $crate::kprint!(concat!($fmt, "\r\n")) };
    ($fmt:expr, $($args:tt)+) => { $crate::kprint!(concat!($fmt, "\r\n"), $($args)+) };
}

/// Traces a Replacer eviction decision; compiled out unless `debug-swap`.
#[cfg(feature = "debug-swap")]
#[macro_export]
macro_rules! trace_evict {
    ($($args:tt)+) => { $crate::kprintln!($($args)+) };
}
#[cfg(not(feature = "debug-swap"))]
#[macro_export]
macro_rules! trace_evict {
    ($($args:tt)+) => {{}};
}

/// Traces a FaultHandler swap-in; compiled out unless `debug-swap`.
#[cfg(feature = "debug-swap")]
#[macro_export]
macro_rules! trace_fault {
    ($($args:tt)+) => { $crate::kprintln!($($args)+) };
}
#[cfg(not(feature = "debug-swap"))]
#[macro_export]
macro_rules! trace_fault {
    ($($args:tt)+) => {{}};
}
