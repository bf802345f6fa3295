//! Busy-wait, single-shot and periodic scheduling on one 24 bit down-counter.
//!
//! A single [`TimerDrv`] owns the counter. It either blocks the caller for a number of
//! microseconds, or invokes a callback from the zero-cross interrupt once or periodically.
//! Starting a new schedule replaces the one in flight.
//!
//! With the `systick` feature the counter is the Cortex-M SysTick:
//!
//! ```ignore
//! static TIMER: TimerDrv<'static, SysTickRegisters> =
//!     TimerDrv::new(unsafe { SysTickRegisters::steal() });
//!
//! #[cortex_m_rt::exception]
//! fn SysTick() {
//!     TIMER.on_zero_cross();
//! }
//!
//! fn blink() {
//!     // Toggle a led.
//! }
//!
//! #[cortex_m_rt::entry]
//! fn main() -> ! {
//!     TIMER.init(8_000_000).unwrap();
//!     TIMER.set_busy_wait(100).unwrap();
//!     TIMER.set_interval_periodic(500_000, Some(&blink)).unwrap();
//!     loop {}
//! }
//! ```
#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

#[macro_use]
mod fmt;

mod adapters;
mod convert;
mod delay;
mod dispatch;
pub mod drivers;
mod error;
mod state;
mod timer_drv;

pub use self::{
    adapters::registers::TickRegisters,
    convert::{
        micros_for, ticks_for, ticks_to_micros, total_ticks, ClockConfig, MAX_RELOAD, PERIOD,
    },
    delay::{AsyncDelay, Delay},
    dispatch::Dispatch,
    error::Error,
    state::{Callback, Mode},
    timer_drv::TimerDrv,
};
