use crate::{
    endpoint::Tick,
    errors::{ProtocolError, ProtocolResult},
};

#[derive(Clone, Debug)]
pub struct Config {
    /// Ticks the sender waits for an acknowledgment before retransmitting.
    /// Should exceed the channel's round trip, otherwise every packet is sent at least twice.
    timeout: Tick,
    /// Without the retransmission timer the sender only recovers from corruption, never from loss.
    retransmit_timer: bool,
}

impl Config {
    #[inline]
    pub const fn timeout(&self) -> Tick {
        self.timeout
    }

    #[inline]
    pub const fn retransmit_timer(&self) -> bool {
        self.retransmit_timer
    }

    pub fn with_timeout(mut self, timeout: Tick) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retransmit_timer(mut self, enabled: bool) -> Self {
        self.retransmit_timer = enabled;
        self
    }

    pub fn validate(&self) -> ProtocolResult<()> {
        if self.retransmit_timer && self.timeout == 0 {
            return Err(ProtocolError::InvalidConfiguration(
                "timeout must be at least one tick",
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: 6,
            retransmit_timer: true,
        }
    }
}
