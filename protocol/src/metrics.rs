use std::fmt;

/// Event counters kept by each engine. e.g. number of packets sent, retransmissions, duplicates
/// discarded.
#[derive(Debug, Default)]
pub struct Metrics {
    counters: [u64; DataPoint::Length as usize],
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    // Returns the count of a particular data point.
    pub fn get_count(&self, data_point: DataPoint) -> u64 {
        self.counters[data_point as usize]
    }

    // Increments the value of a particular data point.
    pub(crate) fn increment(&mut self, data_point: DataPoint) {
        self.counters[data_point as usize] += 1;
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for data_point in DataPoint::ALL.iter() {
            let count = self.get_count(*data_point);
            if count == 0 {
                continue;
            }
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{:?}={}", data_point, count)?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialOrd, PartialEq)]
pub enum DataPoint {
    MessagesAccepted = 0,
    MessagesRejected = 1,
    PacketsSent = 2,
    Retransmissions = 3,
    Timeouts = 4,
    AcksAccepted = 5,
    AcksInvalid = 6,
    PacketsReceived = 7,
    PacketsDelivered = 8,
    PacketsDuplicate = 9,
    PacketsCorrupted = 10,
    AcksSent = 11,
    Length = 12,
}

impl DataPoint {
    const ALL: [DataPoint; DataPoint::Length as usize] = [
        DataPoint::MessagesAccepted,
        DataPoint::MessagesRejected,
        DataPoint::PacketsSent,
        DataPoint::Retransmissions,
        DataPoint::Timeouts,
        DataPoint::AcksAccepted,
        DataPoint::AcksInvalid,
        DataPoint::PacketsReceived,
        DataPoint::PacketsDelivered,
        DataPoint::PacketsDuplicate,
        DataPoint::PacketsCorrupted,
        DataPoint::AcksSent,
    ];
}
