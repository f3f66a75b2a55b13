//! The applications on either end of the protocol.
use bytes::Bytes;
use log::debug;
use rdt_protocol::{Application, Channel, ProtocolError, ProtocolResult, Scheduler, Sender, Tick};
use std::collections::VecDeque;

/// The payload of the `n`th numbered message.
pub fn message(n: u64) -> Bytes {
    Bytes::from(format!("message-{}", n))
}

enum Messages {
    Numbered { next: u64, limit: Option<u64> },
    Scripted(VecDeque<Bytes>),
}

/// Offers a message to the sender every `interval` ticks.
///
/// A message the sender rejects is offered again on the next attempt, so the messages reach the
/// sender in order and none are skipped.
pub struct SendingApplication {
    interval: Tick,
    messages: Messages,
    accepted: Vec<Bytes>,
    rejected: u64,
}

impl SendingApplication {
    /// Produces `message-0`, `message-1`, ... without end.
    pub fn new(interval: Tick) -> Self {
        Self {
            interval,
            messages: Messages::Numbered {
                next: 0,
                limit: None,
            },
            accepted: Vec::new(),
            rejected: 0,
        }
    }

    /// Produces exactly the given messages.
    pub fn scripted<I, T>(interval: Tick, messages: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        Self {
            interval,
            messages: Messages::Scripted(messages.into_iter().map(Into::into).collect()),
            accepted: Vec::new(),
            rejected: 0,
        }
    }

    /// Stops numbered messages after `limit` have been accepted.
    pub fn with_limit(mut self, limit: u64) -> Self {
        if let Messages::Numbered { limit: l, .. } = &mut self.messages {
            *l = Some(limit);
        }
        self
    }

    pub fn interval(&self) -> Tick {
        self.interval
    }

    /// Messages the sender accepted, in order.
    pub fn accepted(&self) -> &[Bytes] {
        &self.accepted
    }

    /// Number of attempts the sender turned away as busy.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn is_finished(&self) -> bool {
        self.pending().is_none()
    }

    fn pending(&self) -> Option<Bytes> {
        match &self.messages {
            Messages::Numbered { next, limit } => match limit {
                Some(limit) if next >= limit => None,
                _ => Some(message(*next)),
            },
            Messages::Scripted(queue) => queue.front().cloned(),
        }
    }

    fn advance(&mut self) {
        match &mut self.messages {
            Messages::Numbered { next, .. } => *next += 1,
            Messages::Scripted(queue) => {
                queue.pop_front();
            }
        }
    }

    /// Offers the pending message to `sender`. Returns true if it was accepted.
    pub fn generate<C>(&mut self, sender: &mut Sender, ctx: &mut C) -> ProtocolResult<bool>
    where
        C: Channel + Scheduler,
    {
        let payload = match self.pending() {
            Some(payload) => payload,
            None => return Ok(false),
        };
        match sender.send(ctx, payload.clone()) {
            Ok(()) => {
                self.accepted.push(payload);
                self.advance();
                Ok(true)
            }
            Err(ProtocolError::SenderBusy) => {
                debug!("sender busy, holding {:?}", payload);
                self.rejected += 1;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

/// Collects everything the receiver delivers.
#[derive(Debug, Default)]
pub struct ReceivingApplication {
    delivered: Vec<Bytes>,
}

impl ReceivingApplication {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> &[Bytes] {
        &self.delivered
    }

    pub fn count(&self) -> usize {
        self.delivered.len()
    }
}

impl Application for ReceivingApplication {
    fn deliver(&mut self, payload: Bytes) {
        debug!("delivered {:?}", payload);
        self.delivered.push(payload);
    }
}
