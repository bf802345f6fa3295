use core::cell::RefCell;

use critical_section::Mutex;
use futures::task::AtomicWaker;

use crate::{
    convert::{self, ClockConfig, PERIOD},
    state::{Callback, Handler, Mode, Schedule, TimerState},
    Error, TickRegisters,
};

/// Busy-wait, single-shot and periodic scheduling multiplexed onto one down-counter.
///
/// Only one schedule is active at a time. Every `set_*` call replaces the
/// schedule in flight, and the replaced callback never fires.
///
/// The zero-cross interrupt handler must call [`TimerDrv::on_zero_cross`].
pub struct TimerDrv<'a, R: TickRegisters> {
    inner: Mutex<RefCell<Inner<'a, R>>>,
    pub(crate) waker: AtomicWaker,
}

pub(crate) struct Inner<'a, R> {
    pub(crate) regs: R,
    pub(crate) state: TimerState<'a>,
    pub(crate) clock: Option<ClockConfig>,
}

impl<'a, R: TickRegisters> TimerDrv<'a, R> {
    /// Create a new idle timer driver on top of `regs`.
    pub const fn new(regs: R) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                regs,
                state: TimerState::new(),
                clock: None,
            })),
            waker: AtomicWaker::new(),
        }
    }

    /// Record the counter clock frequency and stop the counter.
    pub fn init(&self, clock_hz: u32) -> Result<(), Error> {
        if clock_hz == 0 {
            return Err(Error::InvalidArgument);
        }

        self.with(|inner| {
            inner.regs.stop();
            inner.regs.disable_interrupt();
            inner.regs.select_core_clock();
            let reload = inner.state.reload;
            inner.state.replace(Schedule::Idle, reload);
            inner.state.running = false;
            inner.clock = Some(ClockConfig::new(clock_hz));
        });

        info!("Timer initialized at {}Hz", clock_hz);
        Ok(())
    }

    /// Resume counting without touching the schedule.
    pub fn start(&self) {
        self.with(|inner| {
            if !inner.state.running {
                inner.regs.start();
                inner.state.running = true;
            }
        });
    }

    /// Pause counting without touching the schedule.
    ///
    /// A zero-cross interrupt that is already pending is dropped, so no callback runs after this returns.
    pub fn stop(&self) {
        self.with(|inner| {
            if inner.state.running {
                inner.regs.stop();
                inner.state.running = false;
            }
        });
    }

    /// Stop the counter and return to idle, forgetting the reload value and any callback.
    pub fn reset(&self) {
        self.with(|inner| {
            inner.regs.stop();
            inner.regs.disable_interrupt();
            inner.regs.program(0);
            inner.state.clear();
        });

        debug!("Timer reset");
    }

    /// Get the number of ticks remaining in the current period.
    pub fn current_count(&self) -> u32 {
        self.with(|inner| inner.regs.current_value())
    }

    /// Block for `micros` microseconds.
    ///
    /// This is the only blocking operation. It replaces any active schedule and returns to idle once the
    /// counter has reached zero. Nothing is touched if the duration is rejected.
    pub fn set_busy_wait(&self, micros: u32) -> Result<(), Error> {
        let clock = self.clock().ok_or(Error::NotInitialized)?;
        let reload = convert::ticks_for(micros, clock.hz)?;

        trace!("Busy-wait {}us, reload {}", micros, reload);
        self.busy_wait_ticks(reload);
        Ok(())
    }

    /// Block for `micros` microseconds, which may exceed a single counter period.
    ///
    /// The wait is split into full counter periods followed by the remainder.
    pub fn busy_wait_long(&self, micros: u64) -> Result<(), Error> {
        let clock = self.clock().ok_or(Error::NotInitialized)?;
        if micros == 0 {
            return Err(Error::OutOfRange);
        }

        let mut remaining = convert::total_ticks(micros, clock.hz);
        if remaining == 0 {
            return Err(Error::OutOfRange);
        }

        while remaining > 0 {
            let chunk = remaining.min(PERIOD);
            self.busy_wait_ticks((chunk - 1) as u32);
            remaining -= chunk;
        }

        Ok(())
    }

    /// Invoke `callback` from the zero-cross interrupt once, `micros` microseconds from now.
    pub fn set_interval_single(
        &self,
        micros: u32,
        callback: Option<Callback<'a>>,
    ) -> Result<(), Error> {
        let callback = callback.ok_or(Error::InvalidArgument)?;
        self.arm(micros, false, Handler::Call(callback)).map(|_| ())
    }

    /// Invoke `callback` from the zero-cross interrupt every `micros` microseconds until stopped or reset.
    pub fn set_interval_periodic(
        &self,
        micros: u32,
        callback: Option<Callback<'a>>,
    ) -> Result<(), Error> {
        let callback = callback.ok_or(Error::InvalidArgument)?;
        self.arm(micros, true, Handler::Call(callback)).map(|_| ())
    }

    /// Get the active scheduling mode.
    pub fn mode(&self) -> Mode {
        self.with(|inner| inner.state.mode())
    }

    /// Get whether a callback is registered.
    pub fn has_callback(&self) -> bool {
        self.with(|inner| inner.state.has_handler())
    }

    /// Get the reload value of the active schedule.
    pub fn reload_ticks(&self) -> u32 {
        self.with(|inner| inner.state.reload)
    }

    /// Get whether the counter is counting.
    pub fn is_running(&self) -> bool {
        self.with(|inner| inner.state.running)
    }

    /// Get the clock recorded by `init()`.
    pub fn clock(&self) -> Option<ClockConfig> {
        self.with(|inner| inner.clock)
    }

    /// Get the number of microseconds consumed of the current counter period.
    pub fn elapsed_micros(&self) -> Option<u64> {
        self.with(|inner| {
            let clock = inner.clock?;
            let consumed = inner.state.reload.saturating_sub(inner.regs.current_value());
            Some(convert::ticks_to_micros(consumed as u64, clock.hz))
        })
    }

    /// Run `f` with the state and registers inside a critical section.
    pub(crate) fn with<T>(&self, f: impl FnOnce(&mut Inner<'a, R>) -> T) -> T {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Replace the schedule with an interrupt driven one and start counting.
    ///
    /// Returns the epoch of the new schedule.
    pub(crate) fn arm(
        &self,
        micros: u32,
        periodic: bool,
        handler: Handler<'a>,
    ) -> Result<u32, Error> {
        self.with(|inner| {
            let clock = inner.clock.ok_or(Error::NotInitialized)?;
            let reload = convert::ticks_for(micros, clock.hz)?;
            if reload == 0 {
                // The counter never fires with a zero reload.
                return Err(Error::OutOfRange);
            }

            if inner.state.has_handler() {
                debug!("Replacing {:?} schedule", inner.state.mode());
            }

            let schedule = if periodic {
                Schedule::Periodic(handler)
            } else {
                Schedule::SingleShot(handler)
            };

            inner.regs.stop();
            inner.regs.disable_interrupt();
            let epoch = inner.state.replace(schedule, reload);
            inner.regs.program(reload);
            inner.regs.enable_interrupt();
            inner.regs.start();
            inner.state.running = true;

            debug!("{:?} every {}us, reload {}", inner.state.mode(), micros, reload);
            Ok(epoch)
        })
    }

    fn busy_wait_ticks(&self, reload: u32) {
        self.with(|inner| {
            inner.regs.stop();
            inner.regs.disable_interrupt();
            if reload == 0 {
                // A single tick passes before the call returns anyway.
                inner.state.clear();
            } else {
                inner.state.replace(Schedule::BusyWait, reload);
                inner.regs.program(reload);
                inner.regs.start();
                inner.state.running = true;
            }
        });

        if reload == 0 {
            return;
        }

        loop {
            let done = self.with(|inner| {
                let counted = inner.regs.consume_zero_flag();
                let elapsed = core::mem::replace(&mut inner.state.elapsed, false);
                counted || elapsed || !matches!(inner.state.schedule, Schedule::BusyWait)
            });
            if done {
                break;
            }
        }

        self.with(|inner| {
            if let Schedule::BusyWait = inner.state.schedule {
                inner.regs.stop();
                inner.state.schedule = Schedule::Idle;
                inner.state.running = false;
            }
        });
    }

    #[cfg(test)]
    pub(crate) fn with_registers<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        self.with(|inner| f(&mut inner.regs))
    }
}
