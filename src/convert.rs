use core::convert::TryFrom;

use crate::Error;

/// The largest value the 24 bit reload register can hold.
pub const MAX_RELOAD: u32 = 0x00FF_FFFF;

/// The counter period in ticks, i.e. the number of ticks from a full reload to the next zero-cross.
pub const PERIOD: u64 = MAX_RELOAD as u64 + 1;

const MICROS_PER_SECOND: u64 = 1_000_000;

/// The system clock driving the counter.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    /// The clock frequency in Hz.
    pub hz: u32,
}

impl ClockConfig {
    pub const fn new(hz: u32) -> Self {
        Self { hz }
    }

    /// The length of one tick in microseconds, rounded up, or `None` for a zero frequency.
    pub fn tick_micros(&self) -> Option<u64> {
        match self.hz as u64 {
            0 => None,
            hz => Some((MICROS_PER_SECOND + hz - 1) / hz),
        }
    }
}

/// Get the number of ticks in `micros` microseconds, rounded to nearest.
pub fn total_ticks(micros: u64, clock_hz: u32) -> u64 {
    let scaled = micros as u128 * clock_hz as u128;
    ((scaled + MICROS_PER_SECOND as u128 / 2) / MICROS_PER_SECOND as u128) as u64
}

/// Get the reload value that makes the counter reach zero after `micros` microseconds.
///
/// The counter counts down to and including zero, so the reload is one less than the tick count.
pub fn ticks_for(micros: u32, clock_hz: u32) -> Result<u32, Error> {
    if micros == 0 {
        return Err(Error::OutOfRange);
    }

    match total_ticks(micros as u64, clock_hz) {
        0 => Err(Error::OutOfRange),
        ticks if ticks > PERIOD => Err(Error::OutOfRange),
        ticks => Ok((ticks - 1) as u32),
    }
}

/// Get the number of microseconds spent counting down from `reload` to zero.
///
/// Panics if `clock_hz` is zero.
pub fn micros_for(reload: u32, clock_hz: u32) -> u64 {
    ticks_to_micros(reload as u64 + 1, clock_hz)
}

/// Get the duration of `ticks` ticks in microseconds, rounded to nearest.
///
/// Saturates at `u64::MAX`. Panics if `clock_hz` is zero.
pub fn ticks_to_micros(ticks: u64, clock_hz: u32) -> u64 {
    let scaled = ticks as u128 * MICROS_PER_SECOND as u128 + clock_hz as u128 / 2;
    let micros = scaled / clock_hz as u128;
    u64::try_from(micros).unwrap_or(u64::MAX)
}

#[cfg(test)]
pub mod tests {
    use super::*;

    const CLOCKS: [u32; 6] = [1, 32_768, 1_000_000, 8_000_000, 48_000_000, 72_000_000];

    #[test]
    fn ticks_for_eight_mhz() {
        assert_eq!(Ok(799), ticks_for(100, 8_000_000));
        assert_eq!(Ok(7), ticks_for(1, 8_000_000));
        assert_eq!(Ok(7_999_999), ticks_for(1_000_000, 8_000_000));
    }

    #[test]
    fn ticks_for_rounds_to_nearest() {
        // 32768 Hz: 1000us is 32.768 ticks
        assert_eq!(Ok(32), ticks_for(1000, 32_768));
        // 14us is 0.458752 ticks, which is no tick at all
        assert_eq!(Err(Error::OutOfRange), ticks_for(14, 32_768));
        // 16us is 0.524288 ticks, which rounds to a single tick
        assert_eq!(Ok(0), ticks_for(16, 32_768));
    }

    #[test]
    fn ticks_for_zero_is_out_of_range() {
        for &hz in CLOCKS.iter() {
            assert_eq!(Err(Error::OutOfRange), ticks_for(0, hz));
        }
    }

    #[test]
    fn ticks_for_beyond_counter_width() {
        // 2_097_152us at 8MHz is exactly one full period.
        assert_eq!(Ok(MAX_RELOAD), ticks_for(2_097_152, 8_000_000));
        assert_eq!(Err(Error::OutOfRange), ticks_for(2_097_153, 8_000_000));
        assert_eq!(Err(Error::OutOfRange), ticks_for(1_000_000, 72_000_000));
        assert_eq!(Err(Error::OutOfRange), ticks_for(u32::MAX, 1_000_000));
    }

    #[test]
    fn ticks_for_zero_clock() {
        assert_eq!(Err(Error::OutOfRange), ticks_for(1000, 0));
    }

    #[test]
    fn micros_for_inverts_ticks_for() {
        assert_eq!(100, micros_for(799, 8_000_000));
        assert_eq!(1_000_000, micros_for(7_999_999, 8_000_000));
        assert_eq!(16_000_000, micros_for(15, 1));
    }

    #[test]
    fn ticks_to_micros_large_counts() {
        assert_eq!(
            2_305_843_009_213_694,
            ticks_to_micros(u64::MAX / 1000, 8_000_000)
        );
        assert_eq!(u64::MAX, ticks_to_micros(u64::MAX / 1000, 1));
        assert_eq!(u64::MAX, ticks_to_micros(u64::MAX, 1));
    }

    #[test]
    fn tick_micros_of_clocks() {
        assert_eq!(Some(1_000_000), ClockConfig::new(1).tick_micros());
        assert_eq!(Some(31), ClockConfig::new(32_768).tick_micros());
        assert_eq!(Some(1), ClockConfig::new(8_000_000).tick_micros());
        assert_eq!(None, ClockConfig::new(0).tick_micros());
    }

    #[test]
    fn round_trip_within_one_tick() {
        let durations = [
            1, 2, 3, 7, 10, 99, 100, 101, 999, 1000, 4095, 65_535, 100_000, 524_287, 1_000_000,
            2_097_152, 9_999_999, 16_000_000,
        ];

        for &hz in CLOCKS.iter() {
            let tick = ClockConfig::new(hz).tick_micros().unwrap();
            for &us in durations.iter() {
                if let Ok(reload) = ticks_for(us, hz) {
                    let back = micros_for(reload, hz);
                    let diff = if back > us as u64 {
                        back - us as u64
                    } else {
                        us as u64 - back
                    };
                    assert!(diff <= tick, "{}us at {}Hz came back as {}us", us, hz, back);
                }
            }
        }
    }

    #[test]
    fn total_ticks_beyond_one_period() {
        assert_eq!(40_000_000, total_ticks(5_000_000, 8_000_000));
        assert_eq!(3 * PERIOD, total_ticks(3 * 2_097_152, 8_000_000));
    }
}
