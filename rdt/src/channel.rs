//! The unreliable channel between the two engines.
//!
//! Each direction is a [`Link`] with its own [`FaultModel`]. A link may corrupt or drop any
//! packet and delays each by some latency, but never lets a packet overtake one sent before it
//! in the same direction.
use log::info;
use rdt_protocol::{Packet, ProtocolError, ProtocolResult, Tick};
use std::{cmp, collections::VecDeque, ops::Range};

/// The fate of a single transmission.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Deliver,
    Corrupt,
    Drop,
}

/// Decides what happens to each packet handed to a [`Link`].
pub trait FaultModel {
    fn judge(&mut self, packet: &Packet) -> Verdict;
    /// Ticks between transmission and arrival.
    fn latency(&mut self) -> Tick;
}

/// Channel options.
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// Minimum and maximum (exclusive) latency, in ticks.
    pub latency: Range<Tick>,
    /// Probability that a packet arrives corrupted.
    pub corruption_rate: f64,
    /// Probability that a packet is lost.
    /// A rate of `1.0` means nothing ever arrives.
    pub loss_rate: f64,
}

impl ChannelOptions {
    pub fn with_latency(mut self, latency: Range<Tick>) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_corruption_rate(mut self, rate: f64) -> Self {
        self.corruption_rate = rate;
        self
    }

    pub fn with_loss_rate(mut self, rate: f64) -> Self {
        self.loss_rate = rate;
        self
    }

    pub fn validate(&self) -> ProtocolResult<()> {
        if self.latency.start >= self.latency.end {
            return Err(ProtocolError::InvalidConfiguration(
                "latency range must not be empty",
            ));
        }
        if !(0.0..=1.0).contains(&self.corruption_rate) {
            return Err(ProtocolError::InvalidConfiguration(
                "corruption rate must be between 0 and 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.loss_rate) {
            return Err(ProtocolError::InvalidConfiguration(
                "loss rate must be between 0 and 1",
            ));
        }
        if self.corruption_rate + self.loss_rate > 1.0 {
            return Err(ProtocolError::InvalidConfiguration(
                "corruption and loss rates must not add up to more than 1",
            ));
        }
        Ok(())
    }
}

impl Default for ChannelOptions {
    fn default() -> Self {
        // No faults by default, every packet takes two ticks.
        Self {
            latency: 2..3,
            corruption_rate: 0.,
            loss_rate: 0.,
        }
    }
}

/// Corrupts and drops packets at random, with a seeded RNG so runs are reproducible.
pub struct RandomFaults {
    opts: ChannelOptions,
    rng: fastrand::Rng,
}

impl RandomFaults {
    pub fn new(opts: ChannelOptions, seed: u64) -> ProtocolResult<Self> {
        opts.validate()?;
        Ok(Self {
            opts,
            rng: fastrand::Rng::with_seed(seed),
        })
    }
}

impl FaultModel for RandomFaults {
    fn judge(&mut self, _packet: &Packet) -> Verdict {
        let roll = self.rng.f64();
        if roll < self.opts.loss_rate {
            Verdict::Drop
        } else if roll < self.opts.loss_rate + self.opts.corruption_rate {
            Verdict::Corrupt
        } else {
            Verdict::Deliver
        }
    }

    fn latency(&mut self) -> Tick {
        self.rng.u64(self.opts.latency.clone())
    }
}

/// Applies a fixed list of verdicts in order, then delivers everything.
pub struct Scripted {
    verdicts: VecDeque<Verdict>,
    latency: Tick,
}

impl Scripted {
    pub fn new<I: IntoIterator<Item = Verdict>>(verdicts: I, latency: Tick) -> Self {
        Self {
            verdicts: verdicts.into_iter().collect(),
            latency,
        }
    }

    /// A channel that never fails.
    pub fn perfect(latency: Tick) -> Self {
        Self::new(Vec::new(), latency)
    }
}

impl FaultModel for Scripted {
    fn judge(&mut self, _packet: &Packet) -> Verdict {
        self.verdicts.pop_front().unwrap_or(Verdict::Deliver)
    }

    fn latency(&mut self) -> Tick {
        self.latency
    }
}

/// Corrupts every `n`th transmission.
pub struct EveryNth {
    n: u64,
    seen: u64,
    latency: Tick,
}

impl EveryNth {
    pub fn new(n: u64, latency: Tick) -> ProtocolResult<Self> {
        if n < 2 {
            // n = 1 would corrupt everything and nothing could ever get through.
            return Err(ProtocolError::InvalidConfiguration(
                "at least every second transmission must get through",
            ));
        }
        Ok(Self { n, seen: 0, latency })
    }
}

impl FaultModel for EveryNth {
    fn judge(&mut self, _packet: &Packet) -> Verdict {
        self.seen += 1;
        if self.seen % self.n == 0 {
            Verdict::Corrupt
        } else {
            Verdict::Deliver
        }
    }

    fn latency(&mut self) -> Tick {
        self.latency
    }
}

/// One direction of the channel.
pub struct Link {
    name: &'static str,
    faults: Box<dyn FaultModel>,
    /// Arrival time of the last packet scheduled on this link.
    tail: Tick,
}

impl Link {
    pub fn new(name: &'static str, faults: Box<dyn FaultModel>) -> Self {
        Self {
            name,
            faults,
            tail: 0,
        }
    }

    /// Carries `packet`, sent at `now`, across the link. Returns the arrival time and the packet
    /// as it arrives, or `None` if it is lost.
    pub fn carry(&mut self, now: Tick, packet: Packet) -> Option<(Tick, Packet)> {
        let packet = match self.faults.judge(&packet) {
            Verdict::Drop => {
                info!(target: "sim", "{:05} {} {} (DROPPED)", now, self.name, packet);
                return None;
            }
            Verdict::Corrupt => packet.corrupt(),
            Verdict::Deliver => packet,
        };

        // Never arrive before a packet sent earlier on this link; ties keep send order.
        let arrival = cmp::max(now + self.faults.latency(), self.tail);
        self.tail = arrival;
        info!(
            target: "sim",
            "{:05} {} {} (+{})",
            now, self.name, packet, arrival - now
        );
        Some((arrival, packet))
    }
}
