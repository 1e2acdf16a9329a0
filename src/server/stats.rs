//! Per-transfer statistics
// (c) 2026 tftpd contributors

use std::{fmt::Display, time::Duration};

use human_repr::{HumanCount as _, HumanDuration as _, HumanThroughput as _};

/// Human friendly output helper
#[derive(Debug, Clone, Copy)]
struct DataRate {
    /// Bytes per second; if None, we were unable to compute a rate.
    rate: Option<f64>,
}

impl DataRate {
    fn new(bytes: u64, time: Duration) -> Self {
        if time.is_zero() {
            // divide by zero is not meaningful
            return Self { rate: None };
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = (bytes as f64) / time.as_secs_f64();
        Self { rate: Some(rate) }
    }
}

impl Display for DataRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.rate {
            None => f.write_str("unknown"),
            Some(rate) => rate.human_throughput_bytes().fmt(f),
        }
    }
}

/// What happened during a completed transfer
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// File bytes carried
    pub bytes: u64,
    /// DATA blocks carried, counting each block once
    pub blocks: u64,
    /// Packets we had to send again because the peer went quiet
    pub retransmissions: u64,
    /// Wall-clock time from first send to completion
    pub elapsed: Duration,
}

impl TransferStats {
    pub(super) fn record_block(&mut self, payload_len: usize) {
        self.blocks += 1;
        self.bytes += u64::try_from(payload_len).unwrap_or_default();
    }
}

impl Display for TransferStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} in {} ({} blocks, {}, {} retransmitted)",
            self.bytes.human_count_bytes(),
            self.elapsed.human_duration(),
            self.blocks,
            DataRate::new(self.bytes, self.elapsed),
            self.retransmissions,
        )
    }
}
