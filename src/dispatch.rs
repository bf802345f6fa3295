use crate::{
    state::{Handler, Schedule},
    TickRegisters, TimerDrv,
};

/// What a zero-cross event did.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing was scheduled, or the schedule is stopped.
    Spurious,
    /// A busy-wait was flagged as elapsed.
    Elapsed,
    /// A single-shot callback was invoked and the counter stopped.
    Fired,
    /// A periodic callback was invoked and the counter rearmed.
    Rearmed,
}

impl<'a, R: TickRegisters> TimerDrv<'a, R> {
    /// Handle a zero-cross of the counter.
    ///
    /// Call this from the counter interrupt, e.g. the `SysTick` exception handler.
    /// A periodic schedule is rearmed by rewriting the reload register only, so the
    /// interrupt latency does not stretch the period. An event for a stopped schedule is ignored.
    /// The state is updated before the callback runs, so a single-shot callback sees the timer idle
    /// and may schedule again. The callback runs in interrupt context and must not block.
    /// A panicking callback is fatal.
    pub fn on_zero_cross(&self) -> Dispatch {
        let (dispatch, handler) = self.with(|inner| match inner.state.schedule {
            Schedule::Idle => (Dispatch::Spurious, None),
            Schedule::BusyWait => {
                inner.state.elapsed = true;
                (Dispatch::Elapsed, None)
            }
            // Stopped by the caller; the exception raced with stop().
            Schedule::SingleShot(_) | Schedule::Periodic(_) if !inner.state.running => {
                (Dispatch::Spurious, None)
            }
            Schedule::SingleShot(handler) => {
                inner.regs.stop();
                inner.regs.disable_interrupt();
                inner.state.schedule = Schedule::Idle;
                inner.state.running = false;
                if let Handler::Wake = handler {
                    inner.state.fired = Some(inner.state.epoch);
                }
                (Dispatch::Fired, Some(handler))
            }
            Schedule::Periodic(handler) => {
                // The counter has already wrapped and keeps counting.
                let reload = inner.state.reload;
                inner.regs.reload(reload);
                (Dispatch::Rearmed, Some(handler))
            }
        });

        match handler {
            Some(Handler::Call(callback)) => callback(),
            Some(Handler::Wake) => self.waker.wake(),
            None => {}
        }

        if dispatch == Dispatch::Spurious {
            trace!("Spurious zero-cross ignored");
        }

        dispatch
    }
}
