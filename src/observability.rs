use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("parley.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("parley.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("parley.client.request_duration_seconds");
pub(crate) static CLIENT_EMPTY_CHOICES: Counter = Counter::new("parley.client.empty_choices");

pub(crate) static SESSION_SUBMISSIONS: Counter = Counter::new("parley.session.submissions");
pub(crate) static SESSION_REJECTED_EMPTY: Counter =
    Counter::new("parley.session.rejected_empty");
pub(crate) static SESSION_REJECTED_IN_FLIGHT: Counter =
    Counter::new("parley.session.rejected_in_flight");
pub(crate) static SESSION_REPLIES: Counter = Counter::new("parley.session.replies");
pub(crate) static SESSION_EMPTY_REPLIES: Counter = Counter::new("parley.session.empty_replies");
pub(crate) static SESSION_FAILURES: Counter = Counter::new("parley.session.failures");
pub(crate) static SESSION_STALE_RESULTS: Counter = Counter::new("parley.session.stale_results");
pub(crate) static SESSION_UNKNOWN_RESULTS: Counter =
    Counter::new("parley.session.unknown_results");
pub(crate) static SESSION_ROUND_TRIP: Moments =
    Moments::new("parley.session.round_trip_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);
    collector.register_counter(&CLIENT_EMPTY_CHOICES);

    collector.register_counter(&SESSION_SUBMISSIONS);
    collector.register_counter(&SESSION_REJECTED_EMPTY);
    collector.register_counter(&SESSION_REJECTED_IN_FLIGHT);
    collector.register_counter(&SESSION_REPLIES);
    collector.register_counter(&SESSION_EMPTY_REPLIES);
    collector.register_counter(&SESSION_FAILURES);
    collector.register_counter(&SESSION_STALE_RESULTS);
    collector.register_counter(&SESSION_UNKNOWN_RESULTS);
    collector.register_moments(&SESSION_ROUND_TRIP);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_sensor() {
        register_biometrics(Collector::new());
    }
}
