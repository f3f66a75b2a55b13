use crate::state::Bit;
use bytes::{Bytes, BytesMut};
use crc::crc32;
use lazy_static::lazy_static;
use std::fmt;

const DATA_TAG: u8 = 0;
const ACK_TAG: u8 = 1;

/// What a packet carries: an application message or the acknowledgment sentinel.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Data(Bytes),
    Ack,
}

/// An immutable value exchanged over the channel.
///
/// Only the channel marks a packet as corrupted; the endpoints just ask [`Packet::is_corrupted`].
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    sequence_bit: Bit,
    payload: Payload,
    checksum: u32,
    corrupted: bool,
}

impl Packet {
    pub fn data<T: Into<Bytes>>(sequence_bit: Bit, message: T) -> Self {
        Self::new(sequence_bit, Payload::Data(message.into()))
    }

    pub fn ack(sequence_bit: Bit) -> Self {
        Self::new(sequence_bit, Payload::Ack)
    }

    fn new(sequence_bit: Bit, payload: Payload) -> Self {
        let checksum = calc_checksum(sequence_bit, &payload);
        Self {
            sequence_bit,
            payload,
            checksum,
            corrupted: false,
        }
    }

    pub fn sequence_bit(&self) -> Bit {
        self.sequence_bit
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The message carried by a data packet, `None` for acknowledgments.
    pub fn message(&self) -> Option<&Bytes> {
        match &self.payload {
            Payload::Data(message) => Some(message),
            Payload::Ack => None,
        }
    }

    pub fn is_ack(&self) -> bool {
        self.payload == Payload::Ack
    }

    /// True when the channel flagged the packet or its bits no longer match the checksum.
    pub fn is_corrupted(&self) -> bool {
        self.corrupted || self.checksum != calc_checksum(self.sequence_bit, &self.payload)
    }

    /// Damages the packet in transit. Flips the lowest bit of the first payload byte, or a
    /// checksum bit when there is no payload to damage.
    pub fn corrupt(mut self) -> Self {
        self.corrupted = true;
        match &mut self.payload {
            Payload::Data(message) if !message.is_empty() => {
                let mut damaged = BytesMut::from(&message[..]);
                damaged[0] ^= 0x01;
                *message = damaged.freeze();
            }
            _ => self.checksum ^= 0x01,
        }
        self
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.payload {
            Payload::Data(message) => write!(
                f,
                "Packet(bit={}, {:?})",
                self.sequence_bit,
                String::from_utf8_lossy(message)
            )?,
            Payload::Ack => write!(f, "ACK(bit={})", self.sequence_bit)?,
        }
        if self.corrupted {
            write!(f, " [corrupted]")?;
        }
        Ok(())
    }
}

lazy_static! {
    static ref PROTOCOL_VERSION: String = format!(
        "{}-{}.{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION_MAJOR"),
        env!("CARGO_PKG_VERSION_MINOR")
    );
}

fn calc_checksum(sequence_bit: Bit, payload: &Payload) -> u32 {
    let (tag, body): (u8, &[u8]) = match payload {
        Payload::Data(message) => (DATA_TAG, &message[..]),
        Payload::Ack => (ACK_TAG, &[] as &[u8]),
    };
    let header = [u8::from(sequence_bit), tag];
    crc32::checksum_ieee(&[PROTOCOL_VERSION.as_bytes(), &header[..], body].concat())
}
