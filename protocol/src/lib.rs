//! Sender and receiver engines for an alternating-bit reliable data transfer protocol.
//!
//! One sequence bit, positive acknowledgments, and a retransmission timer are enough to deliver
//! every message exactly once and in order over a channel that corrupts or drops packets, as long
//! as it does not reorder them. The engines do no I/O: they are handed a [`Channel`], a
//! [`Scheduler`] and an [`Application`] on each call.
mod config;
mod endpoint;
mod errors;
mod metrics;
mod packet;
mod receiver;
mod sender;
mod state;
mod timer;

pub use crate::{
    config::Config,
    endpoint::{Application, Channel, Scheduler, Tick},
    errors::{ProtocolError, ProtocolResult},
    metrics::{DataPoint, Metrics},
    packet::{Packet, Payload},
    receiver::{Receipt, Receiver},
    sender::{AckOutcome, Sender},
    state::{Bit, ReceiverState, SenderState},
    timer::{Timer, TimerId},
};
