use alloc::boxed::Box;
use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use async_trait::async_trait;

use crate::{state::Handler, Error, TickRegisters, TimerDrv};

/// Asynchronous delays backed by the single-shot schedule.
#[async_trait]
pub trait AsyncDelay: Sync {
    /// Complete after `micros` microseconds.
    async fn delay_us(&self, micros: u32) -> Result<(), Error>;

    /// Complete after `millis` milliseconds, one interrupt per millisecond.
    async fn delay_ms(&self, millis: u32) -> Result<(), Error> {
        for _ in 0..millis {
            self.delay_us(1000).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<'a, R: TickRegisters> AsyncDelay for TimerDrv<'a, R> {
    async fn delay_us(&self, micros: u32) -> Result<(), Error> {
        self.sleep(micros).await
    }
}

enum DelayState {
    Unarmed,
    Armed(u32),
    Done,
}

/// A future that completes when a single-shot schedule fires.
///
/// The schedule is armed on first poll. It resolves to `Err(Error::Cancelled)` if another
/// schedule replaces it or the timer is reset, and dropping it before it fires stops the timer.
pub struct Delay<'t, 'a, R: TickRegisters> {
    timer: &'t TimerDrv<'a, R>,
    micros: u32,
    state: DelayState,
}

impl<'a, R: TickRegisters> TimerDrv<'a, R> {
    /// Get a future that completes after a delay of `micros` microseconds.
    pub fn sleep(&self, micros: u32) -> Delay<'_, 'a, R> {
        Delay {
            timer: self,
            micros,
            state: DelayState::Unarmed,
        }
    }
}

impl<'t, 'a, R: TickRegisters> Future for Delay<'t, 'a, R> {
    type Output = Result<(), Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        // Register before arming or checking so that a zero-cross in between is not lost.
        this.timer.waker.register(cx.waker());

        match this.state {
            DelayState::Unarmed => match this.timer.arm(this.micros, false, Handler::Wake) {
                Ok(epoch) => {
                    this.state = DelayState::Armed(epoch);
                    Poll::Pending
                }
                Err(err) => {
                    this.state = DelayState::Done;
                    Poll::Ready(Err(err))
                }
            },
            DelayState::Armed(epoch) => {
                let outcome = this.timer.with(|inner| {
                    if inner.state.fired == Some(epoch) {
                        // Fired, possibly replaced since.
                        Some(Ok(()))
                    } else if inner.state.epoch != epoch {
                        Some(Err(Error::Cancelled))
                    } else {
                        None
                    }
                });

                match outcome {
                    Some(result) => {
                        if result.is_err() {
                            debug!("Delay of {}us cancelled", this.micros);
                        }
                        this.state = DelayState::Done;
                        Poll::Ready(result)
                    }
                    None => Poll::Pending,
                }
            }
            // Polled after completion.
            DelayState::Done => Poll::Pending,
        }
    }
}

impl<'t, 'a, R: TickRegisters> Drop for Delay<'t, 'a, R> {
    fn drop(&mut self) {
        if let DelayState::Armed(epoch) = self.state {
            self.timer.with(|inner| {
                if inner.state.epoch == epoch && inner.state.fired != Some(epoch) {
                    inner.regs.stop();
                    inner.regs.disable_interrupt();
                    inner.state.clear();
                }
            });
        }
    }
}

#[cfg(test)]
pub mod tests {
    use futures::future::{self, FutureExt};
    use futures_await_test::async_test;

    use crate::{adapters::registers::fakes::FakeRegisters, Dispatch, Mode};

    use super::*;

    fn timer<'a>() -> TimerDrv<'a, FakeRegisters> {
        let timer = TimerDrv::new(FakeRegisters::new());
        timer.init(8_000_000).unwrap();
        timer
    }

    #[async_test]
    async fn sleep_completes_on_zero_cross() {
        let timer = timer();

        let (result, dispatch) = future::join(timer.sleep(1000), async {
            timer.on_zero_cross()
        })
        .await;

        assert_eq!(Ok(()), result);
        assert_eq!(Dispatch::Fired, dispatch);
        assert_eq!(Mode::Idle, timer.mode());
        assert_eq!(vec![7999], timer.with_registers(|r| r.programmed.clone()));
    }

    #[async_test]
    async fn delay_us_through_trait_object() {
        let timer = timer();
        let delay: &dyn AsyncDelay = &timer;

        let (result, _) = future::join(delay.delay_us(100), async {
            timer.on_zero_cross()
        })
        .await;

        assert_eq!(Ok(()), result);
    }

    #[async_test]
    async fn sleep_out_of_range() {
        let timer = timer();

        assert_eq!(Err(Error::OutOfRange), timer.sleep(0).await);
        assert_eq!(Err(Error::OutOfRange), timer.sleep(3_000_000).await);
        assert_eq!(Mode::Idle, timer.mode());
    }

    #[async_test]
    async fn sleep_not_initialized() {
        let timer = TimerDrv::new(FakeRegisters::new());
        assert_eq!(Err(Error::NotInitialized), timer.sleep(1000).await);
    }

    #[test]
    fn sleep_pending_until_zero_cross() {
        let timer = timer();
        let mut sleep = timer.sleep(1000);

        assert_eq!(None, (&mut sleep).now_or_never());
        assert_eq!(Mode::SingleShot, timer.mode());
        assert_eq!(None, (&mut sleep).now_or_never());

        timer.on_zero_cross();

        assert_eq!(Some(Ok(())), (&mut sleep).now_or_never());
    }

    #[test]
    fn sleep_cancelled_by_new_schedule() {
        let cb = || {};
        let timer = timer();
        let mut sleep = timer.sleep(1000);
        assert_eq!(None, (&mut sleep).now_or_never());

        timer.set_interval_single(500, Some(&cb)).unwrap();

        assert_eq!(Some(Err(Error::Cancelled)), (&mut sleep).now_or_never());
        drop(sleep);

        // The replacing schedule is left alone.
        assert_eq!(Mode::SingleShot, timer.mode());
        assert!(timer.is_running());
    }

    #[test]
    fn sleep_fired_then_replaced_completes() {
        let cb = || {};
        let timer = timer();
        let mut sleep = timer.sleep(1000);
        assert_eq!(None, (&mut sleep).now_or_never());

        timer.on_zero_cross();
        timer.set_interval_single(500, Some(&cb)).unwrap();

        assert_eq!(Some(Ok(())), (&mut sleep).now_or_never());
        drop(sleep);

        assert_eq!(Mode::SingleShot, timer.mode());
        assert!(timer.is_running());
    }

    #[test]
    fn sleep_fired_then_reset_completes() {
        let timer = timer();
        let mut sleep = timer.sleep(1000);
        assert_eq!(None, (&mut sleep).now_or_never());

        timer.on_zero_cross();
        timer.reset();

        assert_eq!(Some(Ok(())), (&mut sleep).now_or_never());
    }

    #[test]
    fn sleep_cancelled_by_reset() {
        let timer = timer();
        let mut sleep = timer.sleep(1000);
        assert_eq!(None, (&mut sleep).now_or_never());

        timer.reset();

        assert_eq!(Some(Err(Error::Cancelled)), (&mut sleep).now_or_never());
    }

    #[test]
    fn sleep_drop() {
        let timer = timer();
        let mut sleep = timer.sleep(1000);
        assert_eq!(None, (&mut sleep).now_or_never());

        drop(sleep);

        assert_eq!(Mode::Idle, timer.mode());
        assert!(!timer.is_running());
        assert!(!timer.with_registers(|r| r.running));
    }

    #[test]
    fn sleep_drop_unpolled() {
        let cb = || {};
        let timer = timer();
        timer.set_interval_periodic(500, Some(&cb)).unwrap();

        drop(timer.sleep(1000));

        assert_eq!(Mode::Periodic, timer.mode());
    }
}
