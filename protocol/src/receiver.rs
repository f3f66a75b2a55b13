//! Receive side of the alternating-bit protocol.
//!
//! Every arriving packet is answered with exactly one acknowledgment. An intact packet carrying
//! the expected bit is acknowledged with that bit and delivered; anything else is answered with
//! the bit of the last packet accepted, which tells the sender its copy was already handled (or
//! that nothing has been handled yet). There is no separate negative acknowledgment.
use crate::{
    endpoint::{Application, Channel},
    metrics::{DataPoint, Metrics},
    packet::{Packet, Payload},
    state::{Bit, ReceiverState},
};
use log::debug;

/// What happened to a packet handed to [`Receiver::receive`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Receipt {
    /// Delivered to the application and acknowledged.
    Delivered,
    /// A repeat of the previously accepted packet; re-acknowledged only.
    Duplicate,
    /// Damaged in transit (or not a data packet); the previous round is re-acknowledged.
    Corrupted,
}

#[derive(Debug, Default)]
pub struct Receiver {
    expected: Bit,
    metrics: Metrics,
}

impl Receiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReceiverState {
        ReceiverState::Expect(self.expected)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn receive<C, A>(&mut self, channel: &mut C, app: &mut A, packet: Packet) -> Receipt
    where
        C: Channel,
        A: Application,
    {
        self.metrics.increment(DataPoint::PacketsReceived);

        let receipt = match packet.payload() {
            _ if packet.is_corrupted() => Receipt::Corrupted,
            // An acknowledgment has no business here, whatever its bit.
            Payload::Ack => Receipt::Corrupted,
            Payload::Data(_) if packet.sequence_bit() != self.expected => Receipt::Duplicate,
            Payload::Data(message) => {
                let bit = self.expected;
                debug!("receiver {}: accepted {}", self.state(), packet);
                self.acknowledge(channel, bit);
                app.deliver(message.clone());
                self.expected = bit.flip();
                self.metrics.increment(DataPoint::PacketsDelivered);
                return Receipt::Delivered;
            }
        };

        match receipt {
            Receipt::Duplicate => self.metrics.increment(DataPoint::PacketsDuplicate),
            _ => self.metrics.increment(DataPoint::PacketsCorrupted),
        }
        debug!("receiver {}: discarded {} ({:?})", self.state(), packet, receipt);
        self.acknowledge(channel, self.expected.flip());
        receipt
    }

    fn acknowledge<C: Channel>(&mut self, channel: &mut C, bit: Bit) {
        channel.transmit(Packet::ack(bit));
        self.metrics.increment(DataPoint::AcksSent);
    }
}
