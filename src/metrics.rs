//! Metric names and descriptions.
//!
//! herald only emits counters through the `metrics` facade; which
//! recorder (if any) collects them is up to the embedding application.

/// Successful deliveries, labelled by `service`.
pub const NOTIFICATIONS_SENT: &str = "herald_notifications_sent_total";

/// Failed deliveries, labelled by `service` and `error_type`.
pub const NOTIFY_ERRORS: &str = "herald_notify_errors_total";

/// Identifiers rejected at construction, labelled by `scheme`.
pub const NOTIFIER_CONFIG_ERRORS: &str = "herald_notifier_config_errors_total";

/// Register HELP text for every herald metric.
///
/// Call once after installing a recorder.
pub fn register_metric_descriptions() {
    use metrics::describe_counter;

    describe_counter!(
        NOTIFICATIONS_SENT,
        "Total number of notifications accepted by a service"
    );
    describe_counter!(
        NOTIFY_ERRORS,
        "Total number of notifications a service failed to accept"
    );
    describe_counter!(
        NOTIFIER_CONFIG_ERRORS,
        "Total number of identifiers rejected while building a notifier"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_share_prefix() {
        for name in [NOTIFICATIONS_SENT, NOTIFY_ERRORS, NOTIFIER_CONFIG_ERRORS] {
            assert!(name.starts_with("herald_"));
            assert!(name.ends_with("_total"));
        }
    }

    #[test]
    fn descriptions_without_recorder_are_noop() {
        register_metric_descriptions();
        register_metric_descriptions();
    }
}
