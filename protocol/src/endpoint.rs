//! The collaborators an engine talks to. The protocol never owns a channel, a clock or an
//! application; whoever drives the engines hands them in on every call.
use crate::{packet::Packet, timer::TimerId};
use bytes::Bytes;

/// Simulated time, in ticks.
pub type Tick = u64;

/// The unreliable lower layer. A transmitted packet may arrive intact, arrive corrupted, or not
/// arrive at all.
pub trait Channel {
    fn transmit(&mut self, packet: Packet);
}

/// Source of one-shot alarms.
///
/// Once `delay` ticks have elapsed the scheduler must hand the returned id back to
/// [`crate::Sender::on_timeout`]. Ids must be unique for the lifetime of the scheduler.
pub trait Scheduler {
    fn schedule(&mut self, delay: Tick) -> TimerId;
}

/// The upper layer on the receiving side.
pub trait Application {
    fn deliver(&mut self, payload: Bytes);
}

impl Application for Vec<Bytes> {
    fn deliver(&mut self, payload: Bytes) {
        self.push(payload);
    }
}

#[cfg(test)]
pub(crate) mod recorder {
    use super::{Channel, Scheduler, Tick};
    use crate::{packet::Packet, timer::TimerId};

    /// Records everything an engine asks of its surroundings.
    #[derive(Default)]
    pub struct Recorder {
        pub transmitted: Vec<Packet>,
        pub scheduled: Vec<(TimerId, Tick)>,
        next_timer: u64,
    }

    impl Recorder {
        pub fn last_timer(&self) -> TimerId {
            self.scheduled.last().map(|(id, _)| *id).unwrap()
        }

        pub fn drain(&mut self) -> Vec<Packet> {
            self.transmitted.drain(..).collect()
        }
    }

    impl Channel for Recorder {
        fn transmit(&mut self, packet: Packet) {
            self.transmitted.push(packet);
        }
    }

    impl Scheduler for Recorder {
        fn schedule(&mut self, delay: Tick) -> TimerId {
            self.next_timer += 1;
            let id = TimerId::new(self.next_timer);
            self.scheduled.push((id, delay));
            id
        }
    }
}
