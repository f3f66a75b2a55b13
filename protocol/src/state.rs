use crate::errors::ProtocolError;
use std::{
    convert::TryFrom,
    fmt::{self, Display, Formatter},
};

/// The alternating sequence number carried by every packet.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Bit {
    Zero,
    One,
}

impl Bit {
    /// The other bit. Both engines advance by flipping.
    #[inline]
    pub fn flip(self) -> Self {
        match self {
            Bit::Zero => Bit::One,
            Bit::One => Bit::Zero,
        }
    }
}

impl Default for Bit {
    fn default() -> Self {
        Bit::Zero
    }
}

impl From<Bit> for u8 {
    fn from(bit: Bit) -> u8 {
        match bit {
            Bit::Zero => 0,
            Bit::One => 1,
        }
    }
}

impl TryFrom<u8> for Bit {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Bit::Zero),
            1 => Ok(Bit::One),
            other => Err(ProtocolError::InvalidSequenceBit(other)),
        }
    }
}

impl Display for Bit {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Sender state labels, shared by the timer and timer-less variants.
///
/// ```text
/// Idle(0) ──send──▶ AwaitAck(0) ──ACK 0──▶ Idle(1) ──send──▶ AwaitAck(1) ──ACK 1──▶ Idle(0)
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SenderState {
    /// Waiting for the application; the next send uses this bit.
    Idle(Bit),
    /// A packet with this bit is in flight.
    AwaitAck(Bit),
}

impl Default for SenderState {
    fn default() -> Self {
        SenderState::Idle(Bit::Zero)
    }
}

impl Display for SenderState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            SenderState::Idle(bit) => write!(f, "IDLE({})", bit),
            SenderState::AwaitAck(bit) => write!(f, "AWAIT_ACK({})", bit),
        }
    }
}

/// Receiver state labels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReceiverState {
    /// The next data packet accepted must carry this bit.
    Expect(Bit),
}

impl Default for ReceiverState {
    fn default() -> Self {
        ReceiverState::Expect(Bit::Zero)
    }
}

impl Display for ReceiverState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ReceiverState::Expect(bit) => write!(f, "EXPECT({})", bit),
        }
    }
}
