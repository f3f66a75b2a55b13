//! Send side of the alternating-bit protocol.
//!
//! [`Sender`] keeps at most one packet in flight. It is driven from three directions: the
//! application calls [`Sender::send`], the channel hands acknowledgments to [`Sender::receive`],
//! and the scheduler reports expired alarms through [`Sender::on_timeout`].
//!
//! A corrupted acknowledgment, a stale acknowledgment for the previous round and an expired timer
//! all lead to the same action: resend the retained packet and re-arm the timer. Each
//! retransmission replaces the armed timer id, so when a stale acknowledgment and the timer race
//! within one round the superseded alarm fires into nothing and the packet is resent once per
//! event, never twice for the same one.
use crate::{
    config::Config,
    endpoint::{Channel, Scheduler},
    errors::{ProtocolError, ProtocolResult},
    metrics::{DataPoint, Metrics},
    packet::Packet,
    state::{Bit, SenderState},
    timer::{Timer, TimerId},
};
use bytes::Bytes;
use log::debug;

/// What an arriving acknowledgment did to the sender.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AckOutcome {
    /// The in-flight packet is acknowledged; the sender is idle again.
    Accepted,
    /// The acknowledgment was corrupted or stale; the in-flight packet went out again.
    Retransmitted,
}

#[derive(Debug)]
enum Phase {
    Idle(Bit),
    /// The retained packet lives here, and only here.
    AwaitAck(Packet),
}

#[derive(Debug)]
pub struct Sender {
    phase: Phase,
    // `None` when the timer path is wired out.
    timer: Option<Timer>,
    metrics: Metrics,
}

impl Sender {
    pub fn new(config: &Config) -> Self {
        Self {
            phase: Phase::Idle(Bit::Zero),
            timer: if config.retransmit_timer() {
                Some(Timer::new(config.timeout()))
            } else {
                None
            },
            metrics: Metrics::new(),
        }
    }

    pub fn state(&self) -> SenderState {
        match &self.phase {
            Phase::Idle(bit) => SenderState::Idle(*bit),
            Phase::AwaitAck(packet) => SenderState::AwaitAck(packet.sequence_bit()),
        }
    }

    /// The packet awaiting acknowledgment, if any.
    pub fn in_flight(&self) -> Option<&Packet> {
        match &self.phase {
            Phase::Idle(_) => None,
            Phase::AwaitAck(packet) => Some(packet),
        }
    }

    pub fn is_idle(&self) -> bool {
        match self.phase {
            Phase::Idle(_) => true,
            Phase::AwaitAck(_) => false,
        }
    }

    pub fn timer_running(&self) -> bool {
        self.timer.as_ref().map_or(false, Timer::is_running)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Hands `message` to the channel under the current sequence bit.
    ///
    /// Fails with [`ProtocolError::SenderBusy`], and does nothing else, while the previous
    /// message is unacknowledged.
    pub fn send<C, T>(&mut self, ctx: &mut C, message: T) -> ProtocolResult<()>
    where
        C: Channel + Scheduler,
        T: Into<Bytes>,
    {
        let bit = match &self.phase {
            Phase::Idle(bit) => *bit,
            Phase::AwaitAck(_) => {
                self.metrics.increment(DataPoint::MessagesRejected);
                return Err(ProtocolError::SenderBusy);
            }
        };

        if let Some(timer) = &mut self.timer {
            timer.start(ctx)?;
        }
        let packet = Packet::data(bit, message);
        debug!("sender {}: sending {}", self.state(), packet);
        ctx.transmit(packet.clone());
        self.phase = Phase::AwaitAck(packet);
        self.metrics.increment(DataPoint::MessagesAccepted);
        self.metrics.increment(DataPoint::PacketsSent);
        Ok(())
    }

    /// Processes a packet arriving from the receiver.
    ///
    /// Fails with [`ProtocolError::NotAwaitingAck`] while idle, leaving the sender untouched.
    pub fn receive<C>(&mut self, ctx: &mut C, packet: Packet) -> ProtocolResult<AckOutcome>
    where
        C: Channel + Scheduler,
    {
        let expected = match &self.phase {
            Phase::Idle(_) => return Err(ProtocolError::NotAwaitingAck),
            Phase::AwaitAck(in_flight) => in_flight.sequence_bit(),
        };

        if packet.is_ack() && !packet.is_corrupted() && packet.sequence_bit() == expected {
            if let Some(timer) = &mut self.timer {
                timer.cancel()?;
            }
            debug!("sender {}: accepted {}", self.state(), packet);
            self.phase = Phase::Idle(expected.flip());
            self.metrics.increment(DataPoint::AcksAccepted);
            return Ok(AckOutcome::Accepted);
        }

        debug!("sender {}: rejected {}", self.state(), packet);
        self.metrics.increment(DataPoint::AcksInvalid);
        if let Some(timer) = &mut self.timer {
            // The alarm for this round is superseded by the one retransmit() arms.
            timer.cancel()?;
        }
        self.retransmit(ctx)?;
        Ok(AckOutcome::Retransmitted)
    }

    /// Called by the scheduler when the alarm `id` goes off. Returns true if the in-flight packet
    /// was retransmitted; alarms that were cancelled or superseded return false.
    pub fn on_timeout<C>(&mut self, ctx: &mut C, id: TimerId) -> ProtocolResult<bool>
    where
        C: Channel + Scheduler,
    {
        let expired = match &mut self.timer {
            Some(timer) => timer.expire(id),
            None => false,
        };
        if !expired {
            return Ok(false);
        }
        if self.is_idle() {
            // A live alarm never outlasts its round; an acknowledgment cancels it first.
            return Ok(false);
        }

        debug!("sender {}: {} expired", self.state(), id);
        self.metrics.increment(DataPoint::Timeouts);
        self.retransmit(ctx)?;
        Ok(true)
    }

    // Resends the retained packet unchanged and re-arms the timer. The timer must be idle.
    fn retransmit<C>(&mut self, ctx: &mut C) -> ProtocolResult<()>
    where
        C: Channel + Scheduler,
    {
        let packet = match &self.phase {
            Phase::AwaitAck(packet) => packet.clone(),
            Phase::Idle(_) => return Err(ProtocolError::NotAwaitingAck),
        };
        if let Some(timer) = &mut self.timer {
            timer.start(ctx)?;
        }
        debug!("sender {}: retransmitting {}", self.state(), packet);
        ctx.transmit(packet);
        self.metrics.increment(DataPoint::Retransmissions);
        Ok(())
    }
}
