//! A discrete-event testbench for the alternating-bit protocol in [`rdt_protocol`].
//!
//! ```text
//!  SendingApplication ──send──▶ Sender ──▶ Link (forward) ──▶ Receiver ──deliver──▶ ReceivingApplication
//!                                 ▲  ▲                            │
//!                       timeouts  │  └──── Link (backward) ◀──ACK─┘
//!                                 │
//!                            Simulation (inbox ordered by time, then insertion)
//! ```
pub mod application;
pub mod channel;
pub mod simulation;

pub use rdt_protocol as protocol;

pub use crate::{
    application::{ReceivingApplication, SendingApplication},
    channel::{ChannelOptions, EveryNth, FaultModel, Link, RandomFaults, Scripted, Verdict},
    simulation::{Input, Simulation},
};
