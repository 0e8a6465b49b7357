use serde::Serialize;

/// Structured trace events emitted across all vaultlock crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    LeaseAcquired {
        subject: String,
        key: String,
        exclusive: bool,
        ttl_secs: u64,
    },
    LeaseReleased {
        subject: String,
        key: String,
        existed: bool,
    },
    LeaseChecked {
        subject: String,
        held: bool,
    },
    SweepCompleted {
        pattern: String,
        deleted: u64,
        iterations: u32,
        truncated: bool,
    },
    PoolStopped {
        workers: usize,
        dropped_jobs: usize,
        abandoned_jobs: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "vl_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let ev = TraceEvent::LeaseChecked {
            subject: "11111111-1111-1111-1111-111111111111".into(),
            held: true,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "LeaseChecked");
        assert_eq!(json["held"], true);
    }
}
