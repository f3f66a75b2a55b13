//! A discrete-event simulation of one sender/receiver pair. Acts as the scheduler, the channel
//! and both applications, without doing any I/O.
//!
//! Every input is stamped with the simulated time it is due and processed one at a time, in time
//! order. Inputs due at the same tick are processed in the order they were scheduled: a timeout
//! armed before an acknowledgment was put on the wire fires before that acknowledgment arrives.
use crate::{
    application::{ReceivingApplication, SendingApplication},
    channel::{FaultModel, Link},
};
use bytes::Bytes;
use log::*;
use rdt_protocol::{
    Channel, Config, Packet, ProtocolError, ProtocolResult, Receiver, Scheduler, Sender, Tick,
    TimerId,
};
use std::{cmp, collections::BTreeMap, fmt};

/// Simulated input, delivered to one of the engines.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// The sending application offers its next message.
    Generate,
    /// A message is handed straight to the sender, bypassing the sending application and its
    /// retries. A busy sender turns it away with a usage error.
    Send(Bytes),
    /// A packet arrives at the receiver.
    ToReceiver(Packet),
    /// A packet arrives at the sender.
    ToSender(Packet),
    /// A sender alarm goes off.
    Timeout(TimerId),
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Input::Generate => write!(f, "application: generate"),
            Input::Send(message) => write!(f, "application: send {:?}", message),
            Input::ToReceiver(packet) => write!(f, "receiver <- {}", packet),
            Input::ToSender(packet) => write!(f, "sender <- {}", packet),
            Input::Timeout(id) => write!(f, "sender: {} fired", id),
        }
    }
}

/// Inbox of scheduled inputs. Keyed by due time, then by insertion order.
#[derive(Debug, Default)]
struct Inbox {
    messages: BTreeMap<(Tick, u64), Input>,
    inserted: u64,
}

impl Inbox {
    fn insert(&mut self, time: Tick, input: Input) {
        self.messages.insert((time, self.inserted), input);
        self.inserted += 1;
    }

    /// Removes and returns the next input to be delivered.
    fn next(&mut self) -> Option<(Tick, Input)> {
        let key = *self.messages.keys().next()?;
        self.messages.remove(&key).map(|input| (key.0, input))
    }
}

/// What the sender sees of the world: the forward link and the alarm clock.
struct SenderPort<'a> {
    now: Tick,
    inbox: &'a mut Inbox,
    link: &'a mut Link,
    timers: &'a mut u64,
}

impl<'a> Channel for SenderPort<'a> {
    fn transmit(&mut self, packet: Packet) {
        if let Some((time, packet)) = self.link.carry(self.now, packet) {
            self.inbox.insert(time, Input::ToReceiver(packet));
        }
    }
}

impl<'a> Scheduler for SenderPort<'a> {
    fn schedule(&mut self, delay: Tick) -> TimerId {
        *self.timers += 1;
        let id = TimerId::new(*self.timers);
        self.inbox.insert(self.now + delay, Input::Timeout(id));
        id
    }
}

/// What the receiver sees of the world: the backward link.
struct ReceiverPort<'a> {
    now: Tick,
    inbox: &'a mut Inbox,
    link: &'a mut Link,
}

impl<'a> Channel for ReceiverPort<'a> {
    fn transmit(&mut self, packet: Packet) {
        if let Some((time, packet)) = self.link.carry(self.now, packet) {
            self.inbox.insert(time, Input::ToSender(packet));
        }
    }
}

pub struct Simulation {
    /// Current simulation time. Updated when a scheduled input is processed.
    time: Tick,
    inbox: Inbox,
    sender: Sender,
    receiver: Receiver,
    source: SendingApplication,
    sink: ReceivingApplication,
    /// Sender to receiver.
    forward: Link,
    /// Receiver to sender.
    backward: Link,
    /// Last alarm id handed out.
    timers: u64,
    /// Acknowledgments that reached an idle sender.
    stray_acks: u64,
    usage_errors: u64,
}

impl Simulation {
    pub fn new(
        config: Config,
        source: SendingApplication,
        forward: Box<dyn FaultModel>,
        backward: Box<dyn FaultModel>,
    ) -> ProtocolResult<Self> {
        config.validate()?;
        if source.interval() == 0 {
            return Err(ProtocolError::InvalidConfiguration(
                "message interval must be at least one tick",
            ));
        }

        let mut inbox = Inbox::default();
        inbox.insert(0, Input::Generate);

        Ok(Self {
            time: 0,
            inbox,
            sender: Sender::new(&config),
            receiver: Receiver::new(),
            source,
            sink: ReceivingApplication::new(),
            forward: Link::new("sender -> receiver", forward),
            backward: Link::new("receiver -> sender", backward),
            timers: 0,
            stray_acks: 0,
            usage_errors: 0,
        })
    }

    pub fn time(&self) -> Tick {
        self.time
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn source(&self) -> &SendingApplication {
        &self.source
    }

    pub fn sink(&self) -> &ReceivingApplication {
        &self.sink
    }

    pub fn stray_acks(&self) -> u64 {
        self.stray_acks
    }

    /// Protocol-usage errors raised by the engines during the run.
    pub fn usage_errors(&self) -> u64 {
        self.usage_errors
    }

    /// Check whether the simulation is done, ie. there are no more inputs to process.
    pub fn is_done(&self) -> bool {
        self.inbox.messages.is_empty()
    }

    /// Schedules `input` at time `at`, or now if `at` is in the past.
    pub fn schedule(&mut self, at: Tick, input: Input) {
        self.inbox.insert(cmp::max(at, self.time), input);
    }

    /// Run the simulation while the given predicate holds.
    pub fn run_while(&mut self, pred: impl Fn(&Self) -> bool) {
        while pred(self) && self.step() {}
    }

    /// Run until `count` messages have been delivered, the simulation runs dry, or time passes
    /// `deadline`. Returns true if `count` messages were delivered.
    pub fn run_until_delivered(&mut self, count: usize, deadline: Tick) -> bool {
        self.run_while(|sim| sim.sink.count() < count && sim.time <= deadline);
        info!(
            target: "sim",
            "{:05} delivered {} (sender: {}) (receiver: {})",
            self.time,
            self.sink.count(),
            self.sender.metrics(),
            self.receiver.metrics()
        );
        self.sink.count() >= count
    }

    /// Process one scheduled input. Returns `true` if there are more inputs to process.
    pub fn step(&mut self) -> bool {
        let (time, input) = match self.inbox.next() {
            Some(next) => next,
            None => return false,
        };
        debug_assert!(time >= self.time, "Time only moves forwards!");
        self.time = time;

        if let Input::Timeout(_) = input {
            trace!(target: "sim", "{:05} {}", time, input);
        } else {
            info!(target: "sim", "{:05} {}", time, input);
        }

        let result = match input {
            Input::Generate => {
                let mut port = SenderPort {
                    now: time,
                    inbox: &mut self.inbox,
                    link: &mut self.forward,
                    timers: &mut self.timers,
                };
                let result = self.source.generate(&mut self.sender, &mut port);
                if !self.source.is_finished() {
                    self.inbox
                        .insert(time + self.source.interval(), Input::Generate);
                }
                result.map(|_| ())
            }
            Input::Send(message) => {
                let mut port = SenderPort {
                    now: time,
                    inbox: &mut self.inbox,
                    link: &mut self.forward,
                    timers: &mut self.timers,
                };
                self.sender.send(&mut port, message)
            }
            Input::ToReceiver(packet) => {
                let mut port = ReceiverPort {
                    now: time,
                    inbox: &mut self.inbox,
                    link: &mut self.backward,
                };
                self.receiver.receive(&mut port, &mut self.sink, packet);
                Ok(())
            }
            Input::ToSender(packet) => {
                let mut port = SenderPort {
                    now: time,
                    inbox: &mut self.inbox,
                    link: &mut self.forward,
                    timers: &mut self.timers,
                };
                match self.sender.receive(&mut port, packet) {
                    Err(ProtocolError::NotAwaitingAck) => {
                        // A late copy of an acknowledgment that was already accepted.
                        debug!(target: "sim", "{:05} sender idle, acknowledgment discarded", time);
                        self.stray_acks += 1;
                        Ok(())
                    }
                    other => other.map(|_| ()),
                }
            }
            Input::Timeout(id) => {
                let mut port = SenderPort {
                    now: time,
                    inbox: &mut self.inbox,
                    link: &mut self.forward,
                    timers: &mut self.timers,
                };
                self.sender.on_timeout(&mut port, id).map(|_| ())
            }
        };

        if let Err(e) = result {
            warn!(target: "sim", "{:05} {}", time, e);
            self.usage_errors += 1;
        }
        !self.is_done()
    }
}

#[cfg(test)]
mod test {
    use super::{Input, Simulation};
    use crate::{
        application::SendingApplication,
        channel::{ChannelOptions, EveryNth, RandomFaults, Scripted, Verdict},
    };
    use bytes::Bytes;
    use rdt_protocol::{Bit, Config, DataPoint, ReceiverState, SenderState};

    fn logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn single(forward: Scripted, backward: Scripted) -> Simulation {
        Simulation::new(
            Config::default(),
            SendingApplication::scripted(1, vec!["A"]),
            Box::new(forward),
            Box::new(backward),
        )
        .unwrap()
    }

    fn finish(sim: &mut Simulation) {
        while sim.step() {}
        assert_eq!(sim.usage_errors(), 0);
    }

    #[test]
    fn clean_round_trip() {
        logger();
        let mut sim = single(Scripted::perfect(2), Scripted::perfect(2));
        finish(&mut sim);

        assert_eq!(sim.sink().delivered(), &[Bytes::from("A")][..]);
        assert_eq!(sim.sender().state(), SenderState::Idle(Bit::One));
        assert_eq!(sim.receiver().state(), ReceiverState::Expect(Bit::One));
        assert!(!sim.sender().timer_running());
        assert_eq!(sim.sender().metrics().get_count(DataPoint::Retransmissions), 0);
    }

    #[test]
    fn corrupted_ack_is_recovered_without_redelivery() {
        logger();
        let mut sim = single(
            Scripted::perfect(2),
            Scripted::new(vec![Verdict::Corrupt], 2),
        );
        finish(&mut sim);

        assert_eq!(sim.sink().delivered(), &[Bytes::from("A")][..]);
        assert_eq!(sim.sender().state(), SenderState::Idle(Bit::One));
        let sender = sim.sender().metrics();
        assert_eq!(sender.get_count(DataPoint::AcksInvalid), 1);
        assert_eq!(sender.get_count(DataPoint::Retransmissions), 1);
        assert_eq!(sender.get_count(DataPoint::Timeouts), 0);
        let receiver = sim.receiver().metrics();
        assert_eq!(receiver.get_count(DataPoint::PacketsDuplicate), 1);
        assert_eq!(receiver.get_count(DataPoint::PacketsDelivered), 1);
    }

    #[test]
    fn dropped_packet_is_resent_after_timeout() {
        logger();
        let mut sim = single(
            Scripted::new(vec![Verdict::Drop], 2),
            Scripted::perfect(2),
        );
        finish(&mut sim);

        assert_eq!(sim.sink().delivered(), &[Bytes::from("A")][..]);
        assert_eq!(sim.sender().metrics().get_count(DataPoint::Timeouts), 1);
        assert_eq!(sim.receiver().metrics().get_count(DataPoint::PacketsReceived), 1);
        // Sent at 0 and lost, resent when the timer fires at 6, acknowledged at 10.
        assert_eq!(sim.time(), 12);
    }

    #[test]
    fn dropped_ack_is_recovered_by_timeout() {
        logger();
        let mut sim = single(
            Scripted::perfect(2),
            Scripted::new(vec![Verdict::Drop], 2),
        );
        finish(&mut sim);

        assert_eq!(sim.sink().delivered(), &[Bytes::from("A")][..]);
        assert_eq!(sim.sender().metrics().get_count(DataPoint::Timeouts), 1);
        assert_eq!(
            sim.receiver().metrics().get_count(DataPoint::PacketsDuplicate),
            1
        );
    }

    #[test]
    fn timeout_due_with_the_ack_fires_first() {
        logger();
        // Round trip equals the timeout: the alarm was scheduled before the ACK, so it wins the tie.
        let mut sim = Simulation::new(
            Config::default().with_timeout(6),
            SendingApplication::scripted(1, vec!["A"]),
            Box::new(Scripted::perfect(3)),
            Box::new(Scripted::perfect(3)),
        )
        .unwrap();
        finish(&mut sim);

        assert_eq!(sim.sink().delivered(), &[Bytes::from("A")][..]);
        assert_eq!(sim.sender().metrics().get_count(DataPoint::Timeouts), 1);
        assert_eq!(sim.sender().metrics().get_count(DataPoint::AcksAccepted), 1);
        // The retransmitted copy is acknowledged again after the sender went idle.
        assert_eq!(sim.stray_acks(), 1);
    }

    #[test]
    fn every_nth_corruption_still_delivers_everything() {
        logger();
        let mut sim = Simulation::new(
            Config::default(),
            SendingApplication::new(1).with_limit(20),
            Box::new(EveryNth::new(3, 1).unwrap()),
            Box::new(EveryNth::new(4, 1).unwrap()),
        )
        .unwrap();

        assert!(sim.run_until_delivered(20, 10_000));
        assert_eq!(sim.sink().delivered(), sim.source().accepted());
        assert_eq!(sim.usage_errors(), 0);
        assert!(sim.sender().metrics().get_count(DataPoint::Retransmissions) > 0);
    }

    #[test]
    fn lossy_channel_delivers_exactly_once_in_order() {
        logger();
        let opts = ChannelOptions::default()
            .with_latency(1..4)
            .with_corruption_rate(0.2)
            .with_loss_rate(0.2);
        let mut sim = Simulation::new(
            Config::default().with_timeout(10),
            SendingApplication::new(1).with_limit(100),
            Box::new(RandomFaults::new(opts.clone(), 1).unwrap()),
            Box::new(RandomFaults::new(opts, 2).unwrap()),
        )
        .unwrap();

        assert!(sim.run_until_delivered(100, 100_000));
        assert_eq!(sim.sink().delivered(), sim.source().accepted());
        assert_eq!(sim.usage_errors(), 0);

        let sender = sim.sender().metrics();
        assert_eq!(sender.get_count(DataPoint::MessagesAccepted), 100);
        assert!(sender.get_count(DataPoint::Timeouts) > 0);
        let receiver = sim.receiver().metrics();
        assert_eq!(receiver.get_count(DataPoint::PacketsDelivered), 100);
    }

    #[test]
    fn sequence_bits_alternate_across_a_run() {
        logger();
        let mut sim = Simulation::new(
            Config::default(),
            SendingApplication::new(1).with_limit(5),
            Box::new(Scripted::perfect(1)),
            Box::new(Scripted::perfect(1)),
        )
        .unwrap();

        let mut states = Vec::new();
        while sim.step() {
            if states.last() != Some(&sim.sender().state()) {
                states.push(sim.sender().state());
            }
        }

        let awaited: Vec<u8> = states
            .iter()
            .filter_map(|state| match state {
                SenderState::AwaitAck(bit) => Some(u8::from(*bit)),
                SenderState::Idle(_) => None,
            })
            .collect();
        assert_eq!(awaited, vec![0, 1, 0, 1, 0]);
        assert_eq!(sim.receiver().state(), ReceiverState::Expect(Bit::One));
    }

    #[test]
    fn corruption_only_variant_recovers_from_corruption() {
        logger();
        let opts = ChannelOptions::default().with_corruption_rate(0.3);
        let mut sim = Simulation::new(
            Config::default().with_retransmit_timer(false),
            SendingApplication::new(1).with_limit(50),
            Box::new(RandomFaults::new(opts.clone(), 3).unwrap()),
            Box::new(RandomFaults::new(opts, 4).unwrap()),
        )
        .unwrap();

        assert!(sim.run_until_delivered(50, 100_000));
        assert_eq!(sim.sink().delivered(), sim.source().accepted());
        assert_eq!(sim.sender().metrics().get_count(DataPoint::Timeouts), 0);
    }

    #[test]
    fn corruption_only_variant_stalls_on_loss() {
        logger();
        let mut sim = Simulation::new(
            Config::default().with_retransmit_timer(false),
            SendingApplication::scripted(1, vec!["A", "B"]),
            Box::new(Scripted::new(vec![Verdict::Drop], 2)),
            Box::new(Scripted::perfect(2)),
        )
        .unwrap();

        assert!(!sim.run_until_delivered(1, 1_000));
        assert!(sim.sink().delivered().is_empty());
        assert_eq!(sim.sender().state(), SenderState::AwaitAck(Bit::Zero));
        assert!(sim.source().rejected() > 0);
    }

    #[test]
    fn send_to_a_busy_sender_is_counted_as_a_usage_error() {
        logger();
        let mut sim = single(Scripted::perfect(2), Scripted::perfect(2));
        // "A" goes out at 0 and is acknowledged at 4.
        sim.schedule(1, Input::Send(Bytes::from("B")));
        while sim.step() {}

        assert_eq!(sim.usage_errors(), 1);
        assert_eq!(sim.sink().delivered(), &[Bytes::from("A")][..]);
        assert_eq!(sim.sender().state(), SenderState::Idle(Bit::One));
        assert_eq!(
            sim.sender().metrics().get_count(DataPoint::MessagesRejected),
            1
        );
    }

    #[test]
    fn send_to_an_idle_sender_goes_through() {
        logger();
        let mut sim = single(Scripted::perfect(2), Scripted::perfect(2));
        sim.schedule(5, Input::Send(Bytes::from("B")));
        finish(&mut sim);

        assert_eq!(
            sim.sink().delivered(),
            &[Bytes::from("A"), Bytes::from("B")][..]
        );
        assert_eq!(sim.sender().state(), SenderState::Idle(Bit::Zero));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = Simulation::new(
            Config::default(),
            SendingApplication::new(0),
            Box::new(Scripted::perfect(1)),
            Box::new(Scripted::perfect(1)),
        );
        assert!(result.is_err());
    }
}
