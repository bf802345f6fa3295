/// A callback invoked from the zero-cross interrupt.
///
/// The driver only borrows the callback; it must outlive the driver it is registered with.
pub type Callback<'a> = &'a (dyn Fn() + Sync);

/// The scheduling mode of the timer.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    BusyWait,
    SingleShot,
    Periodic,
}

/// What to do when a scheduled zero-cross fires.
#[derive(Clone, Copy)]
pub(crate) enum Handler<'a> {
    /// Invoke a registered callback.
    Call(Callback<'a>),
    /// Wake the task awaiting a `Delay`.
    Wake,
}

/// The active schedule. The handler lives inside the variants that need one,
/// so no handler can exist while idle or busy-waiting.
#[derive(Clone, Copy)]
pub(crate) enum Schedule<'a> {
    Idle,
    BusyWait,
    SingleShot(Handler<'a>),
    Periodic(Handler<'a>),
}

pub(crate) struct TimerState<'a> {
    pub(crate) schedule: Schedule<'a>,
    pub(crate) reload: u32,
    pub(crate) running: bool,
    pub(crate) elapsed: bool,
    /// Bumped every time a caller replaces or clears the schedule.
    pub(crate) epoch: u32,
    /// The epoch of the last `Handler::Wake` schedule that fired. Survives replacement.
    pub(crate) fired: Option<u32>,
}

impl<'a> TimerState<'a> {
    pub(crate) const fn new() -> Self {
        Self {
            schedule: Schedule::Idle,
            reload: 0,
            running: false,
            elapsed: false,
            epoch: 0,
            fired: None,
        }
    }

    pub(crate) fn mode(&self) -> Mode {
        match self.schedule {
            Schedule::Idle => Mode::Idle,
            Schedule::BusyWait => Mode::BusyWait,
            Schedule::SingleShot(_) => Mode::SingleShot,
            Schedule::Periodic(_) => Mode::Periodic,
        }
    }

    pub(crate) fn has_handler(&self) -> bool {
        matches!(
            self.schedule,
            Schedule::SingleShot(_) | Schedule::Periodic(_)
        )
    }

    /// Replace the schedule, discarding any previous handler.
    pub(crate) fn replace(&mut self, schedule: Schedule<'a>, reload: u32) -> u32 {
        self.schedule = schedule;
        self.reload = reload;
        self.elapsed = false;
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }

    pub(crate) fn clear(&mut self) {
        self.replace(Schedule::Idle, 0);
        self.running = false;
    }
}
