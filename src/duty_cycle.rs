//! Decides, tick by tick, whether the sensor is polled, woken first, or
//! left alone. Pure bookkeeping over a caller-supplied millisecond clock;
//! the driver performs the actual bus traffic.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for the next deadline, sensor powered up.
    Idle,
    /// Wake command is on its way out, settle delay pending.
    AwaitingWake,
    /// A poll attempt is running.
    PollDue,
    /// Waiting for the next deadline, sensor put to sleep.
    CoolingDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Skip,
    Poll { wake_first: bool },
}

/// Sensor power mode as left behind by a finished poll attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PowerState {
    Awake,
    Asleep,
}

pub(crate) struct DutyCycle {
    interval_ms: u32,
    sleep_capable: bool,
    state: State,
    deadline: Option<u32>,
}

impl DutyCycle {
    pub(crate) fn new(interval_ms: u32, sleep_capable: bool) -> Self {
        Self {
            interval_ms,
            sleep_capable,
            state: State::Idle,
            deadline: None,
        }
    }

    /// Decides what this tick does and advances the cadence deadline.
    ///
    /// The deadline moves to `now + interval` the moment a poll becomes
    /// due, before the poll runs, so the minimum cadence holds even when
    /// every poll fails. An interval of zero disables throttling and the
    /// power commands with it.
    pub(crate) fn decide(&mut self, now_ms: u32) -> Decision {
        if self.interval_ms == 0 {
            self.state = State::PollDue;
            return Decision::Poll { wake_first: false };
        }

        match self.deadline {
            None => {
                // First observed tick arms the cadence; the first poll
                // lands one interval later.
                self.deadline = Some(now_ms.wrapping_add(self.interval_ms));
                Decision::Skip
            }
            Some(deadline) if !reached(now_ms, deadline) => Decision::Skip,
            Some(_) => {
                self.deadline = Some(now_ms.wrapping_add(self.interval_ms));
                if self.sleep_capable && self.state == State::CoolingDown {
                    self.state = State::AwaitingWake;
                    Decision::Poll { wake_first: true }
                } else {
                    self.state = State::PollDue;
                    Decision::Poll { wake_first: false }
                }
            }
        }
    }

    /// The wake command went out; the settle delay and the poll follow
    /// within the same tick.
    pub(crate) fn wake_issued(&mut self) {
        self.state = State::PollDue;
    }

    /// Whether a finished poll should put the sensor back to sleep.
    pub(crate) fn sleep_after_poll(&self) -> bool {
        self.sleep_capable && self.interval_ms != 0
    }

    /// Records how the poll attempt left the sensor. `Asleep` routes the
    /// next due poll through a wake command.
    pub(crate) fn finish(&mut self, power: PowerState) {
        self.state = match power {
            PowerState::Asleep => State::CoolingDown,
            PowerState::Awake => State::Idle,
        };
    }
}

fn reached(now: u32, deadline: u32) -> bool {
    // Wrap-safe `now >= deadline` on a millisecond clock.
    now.wrapping_sub(deadline) < u32::MAX / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_polls_on_every_tick() {
        let mut duty = DutyCycle::new(0, true);
        for now in [0, 1, 2, 1000] {
            assert_eq!(duty.decide(now), Decision::Poll { wake_first: false });
            duty.finish(PowerState::Awake);
        }
        assert!(!duty.sleep_after_poll());
    }

    #[test]
    fn first_tick_arms_the_deadline() {
        let mut duty = DutyCycle::new(30_000, false);
        assert_eq!(duty.decide(0), Decision::Skip);
        assert_eq!(duty.decide(29_999), Decision::Skip);
        assert_eq!(duty.decide(30_000), Decision::Poll { wake_first: false });
    }

    #[test]
    fn polls_once_per_interval_at_one_second_ticks() {
        let mut duty = DutyCycle::new(30_000, false);
        let mut polls = 0;
        for second in 0..120u32 {
            if let Decision::Poll { .. } = duty.decide(second * 1000) {
                polls += 1;
                duty.finish(PowerState::Awake);
            }
        }
        assert_eq!(polls, 3);
    }

    #[test]
    fn cadence_advances_even_when_polls_fail() {
        let mut duty = DutyCycle::new(30_000, false);
        duty.decide(0);
        assert_eq!(duty.decide(30_000), Decision::Poll { wake_first: false });
        // The failed poll does not restore the old deadline.
        duty.finish(PowerState::Awake);
        assert_eq!(duty.decide(30_001), Decision::Skip);
        assert_eq!(duty.decide(59_999), Decision::Skip);
        assert_eq!(duty.decide(60_000), Decision::Poll { wake_first: false });
    }

    #[test]
    fn wake_is_required_after_a_sleep() {
        let mut duty = DutyCycle::new(30_000, true);
        duty.decide(0);
        assert_eq!(duty.decide(30_000), Decision::Poll { wake_first: false });
        duty.wake_issued();
        duty.finish(PowerState::Asleep);
        assert_eq!(duty.decide(60_000), Decision::Poll { wake_first: true });
    }

    #[test]
    fn no_wake_when_the_sensor_was_left_awake() {
        let mut duty = DutyCycle::new(30_000, true);
        duty.decide(0);
        duty.decide(30_000);
        duty.finish(PowerState::Awake);
        assert_eq!(duty.decide(60_000), Decision::Poll { wake_first: false });
    }

    #[test]
    fn sleep_incapable_variant_never_wakes_first() {
        let mut duty = DutyCycle::new(30_000, false);
        duty.decide(0);
        duty.decide(30_000);
        assert!(!duty.sleep_after_poll());
        duty.finish(PowerState::Awake);
        assert_eq!(duty.decide(60_000), Decision::Poll { wake_first: false });
    }

    #[test]
    fn deadline_survives_clock_wraparound() {
        let mut duty = DutyCycle::new(30_000, false);
        let start = u32::MAX - 10_000;
        assert_eq!(duty.decide(start), Decision::Skip);
        assert_eq!(duty.decide(u32::MAX), Decision::Skip);
        let wrapped = start.wrapping_add(30_000);
        assert_eq!(duty.decide(wrapped), Decision::Poll { wake_first: false });
    }
}
