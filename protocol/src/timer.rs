use crate::{
    endpoint::{Scheduler, Tick},
    errors::{ProtocolError, ProtocolResult},
};
use log::trace;
use std::fmt;

/// Identifies one scheduled timeout. Handed out by the [`Scheduler`] and used as the
/// cancellation token: only the id of the currently armed timer can fire.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl TimerId {
    pub const fn new(id: u64) -> Self {
        TimerId(id)
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// A cancellable one-shot alarm.
///
/// Cancelling does not reach into the scheduler. The scheduled timeout still comes back later,
/// but [`Timer::expire`] no longer recognises its id, so it has no effect. The same holds for a
/// timeout that was already handled: it fires exactly once.
#[derive(Debug)]
pub struct Timer {
    delay: Tick,
    running: Option<TimerId>,
}

impl Timer {
    pub fn new(delay: Tick) -> Self {
        Self {
            delay,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn start<S: Scheduler>(&mut self, scheduler: &mut S) -> ProtocolResult<TimerId> {
        if self.running.is_some() {
            return Err(ProtocolError::TimerAlreadyRunning);
        }
        let id = scheduler.schedule(self.delay);
        trace!("{} armed for {} ticks", id, self.delay);
        self.running = Some(id);
        Ok(id)
    }

    pub fn cancel(&mut self) -> ProtocolResult<()> {
        match self.running.take() {
            Some(id) => {
                trace!("{} cancelled", id);
                Ok(())
            }
            None => Err(ProtocolError::TimerNotRunning),
        }
    }

    /// Called when the scheduler reports that `id` went off. Returns true if it was the armed
    /// timer, which is now idle.
    pub fn expire(&mut self, id: TimerId) -> bool {
        if self.running == Some(id) {
            self.running = None;
            true
        } else {
            trace!("{} ignored, no longer armed", id);
            false
        }
    }
}

#[cfg(test)]
mod test {
    use super::{ProtocolError, Timer};
    use crate::endpoint::recorder::Recorder;

    #[test]
    fn start_schedules_a_single_alarm() {
        let mut scheduler = Recorder::default();
        let mut timer = Timer::new(6);
        let id = timer.start(&mut scheduler).unwrap();
        assert!(timer.is_running());
        assert_eq!(scheduler.scheduled, vec![(id, 6)]);
    }

    #[test]
    fn starting_twice_is_a_usage_error() {
        let mut scheduler = Recorder::default();
        let mut timer = Timer::new(6);
        timer.start(&mut scheduler).unwrap();
        assert_eq!(
            timer.start(&mut scheduler).unwrap_err(),
            ProtocolError::TimerAlreadyRunning
        );
        assert_eq!(scheduler.scheduled.len(), 1);
    }

    #[test]
    fn cancelling_an_idle_timer_is_a_usage_error() {
        let mut timer = Timer::new(6);
        assert_eq!(timer.cancel().unwrap_err(), ProtocolError::TimerNotRunning);
    }

    #[test]
    fn expiry_fires_exactly_once() {
        let mut scheduler = Recorder::default();
        let mut timer = Timer::new(6);
        let id = timer.start(&mut scheduler).unwrap();
        assert!(timer.expire(id));
        assert!(!timer.is_running());
        assert!(!timer.expire(id));
    }

    #[test]
    fn cancelled_alarm_has_no_effect() {
        let mut scheduler = Recorder::default();
        let mut timer = Timer::new(6);
        let id = timer.start(&mut scheduler).unwrap();
        timer.cancel().unwrap();
        assert!(!timer.expire(id));
    }

    #[test]
    fn stale_alarm_does_not_stop_its_successor() {
        let mut scheduler = Recorder::default();
        let mut timer = Timer::new(6);
        let first = timer.start(&mut scheduler).unwrap();
        timer.cancel().unwrap();
        let second = timer.start(&mut scheduler).unwrap();
        assert!(!timer.expire(first));
        assert!(timer.is_running());
        assert!(timer.expire(second));
    }
}
