use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Protocol-usage errors. These mean the surrounding code called into an engine at the wrong
/// moment; corrupted or lost packets are never reported through this type.
#[derive(Debug)]
pub enum ProtocolError {
    SenderBusy,
    NotAwaitingAck,
    TimerNotRunning,
    TimerAlreadyRunning,

    InvalidSequenceBit(u8),
    InvalidConfiguration(&'static str),
}

impl Display for ProtocolError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ProtocolError::SenderBusy => write!(
                f,
                "Attempted to send while the previous packet is still awaiting an acknowledgment."
            ),
            ProtocolError::NotAwaitingAck => write!(
                f,
                "Received an acknowledgment while no acknowledgment was awaited."
            ),
            ProtocolError::TimerNotRunning => {
                write!(f, "Attempted to cancel a timer that is not running.")
            }
            ProtocolError::TimerAlreadyRunning => {
                write!(f, "Attempted to start a timer that is already running.")
            }
            ProtocolError::InvalidSequenceBit(bit) => {
                write!(f, "The sequence bit must be 0 or 1, got {}.", bit)
            }
            ProtocolError::InvalidConfiguration(s) => write!(f, "Invalid Configuration: {}", s),
        }
    }
}

impl Error for ProtocolError {}

impl PartialEq for ProtocolError {
    fn eq(&self, other: &ProtocolError) -> bool {
        match (self, other) {
            (ProtocolError::SenderBusy, ProtocolError::SenderBusy) => true,
            (ProtocolError::NotAwaitingAck, ProtocolError::NotAwaitingAck) => true,
            (ProtocolError::TimerNotRunning, ProtocolError::TimerNotRunning) => true,
            (ProtocolError::TimerAlreadyRunning, ProtocolError::TimerAlreadyRunning) => true,
            (ProtocolError::InvalidSequenceBit(a), ProtocolError::InvalidSequenceBit(b)) => a == b,
            (ProtocolError::InvalidConfiguration(_), ProtocolError::InvalidConfiguration(_)) => {
                true
            }
            (_, _) => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::ProtocolError;

    #[test]
    fn configuration_errors_compare_by_kind() {
        assert_eq!(
            ProtocolError::InvalidConfiguration("a"),
            ProtocolError::InvalidConfiguration("b")
        );
        assert_ne!(ProtocolError::SenderBusy, ProtocolError::NotAwaitingAck);
    }

    #[test]
    fn display_names_the_offending_bit() {
        let message = ProtocolError::InvalidSequenceBit(7).to_string();
        assert!(message.contains('7'));
    }
}
