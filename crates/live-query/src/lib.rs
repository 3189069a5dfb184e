//! Throttled delivery of live query results.
//!
//! [`LiveQuery::start`] takes a compiled subscription document and a
//! [`Transport`] and spawns a delivery task. Push mode subscribes to the
//! transport's live stream and rate-limits updates with a leading plus
//! trailing edge throttle; poll mode re-runs the document on an interval
//! and suppresses unchanged results. Either way the consumer reads a plain
//! [`Stream`](futures_util::Stream) of result values, with transport
//! failures forwarded as a terminal `Err` item.

use std::time::Duration;

mod live_query;
mod throttle;
mod transport;

pub use live_query::{LiveQuery, LiveQueryError, LiveQueryState, SubscriptionQuery};
pub use transport::{Transport, TransportClient, TransportError, TransportResult};

/// Delivery tuning for one live query.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LiveQueryConfig {
    /// Allows push delivery when the transport supports it.
    pub push_enabled: bool,
    /// Minimum spacing between push deliveries. Defaults to 1s
    #[serde(deserialize_with = "duration_str::deserialize_duration")]
    pub min_delivery_interval: Duration,
    /// Re-fetch cadence in poll mode. Defaults to 5s
    #[serde(deserialize_with = "duration_str::deserialize_duration")]
    pub poll_interval: Duration,
}

impl Default for LiveQueryConfig {
    fn default() -> Self {
        LiveQueryConfig {
            push_enabled: true,
            min_delivery_interval: Duration::from_secs(1),
            poll_interval: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserializes_duration_strings_over_defaults() {
        let config: LiveQueryConfig = serde_json::from_value(serde_json::json!({
            "push_enabled": false,
            "min_delivery_interval": "250ms"
        }))
        .unwrap();

        assert!(!config.push_enabled);
        assert_eq!(config.min_delivery_interval, Duration::from_millis(250));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn config_rejects_unknown_fields() {
        let result = serde_json::from_value::<LiveQueryConfig>(serde_json::json!({
            "poll_interval_ms": 5000
        }));
        assert!(result.is_err());
    }
}
