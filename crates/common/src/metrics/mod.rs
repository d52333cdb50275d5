//! Metrics and observability utilities
//!
//! Prometheus counters for the domain operations, with standardized
//! naming conventions.

use metrics::{counter, describe_counter, Unit};

/// Metrics prefix for all LearnTrack metrics
pub const METRICS_PREFIX: &str = "learntrack";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_classes_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total classes created"
    );

    describe_counter!(
        format!("{}_enrollments_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total enrollments created (auto and manual)"
    );

    describe_counter!(
        format!("{}_assignments_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total assignments created"
    );

    describe_counter!(
        format!("{}_submissions_received_total", METRICS_PREFIX),
        Unit::Count,
        "Total submissions received"
    );

    describe_counter!(
        format!("{}_grades_recorded_total", METRICS_PREFIX),
        Unit::Count,
        "Total submissions graded"
    );

    describe_counter!(
        format!("{}_notifications_fanned_out_total", METRICS_PREFIX),
        Unit::Count,
        "Total notifications persisted by fan-out"
    );

    tracing::info!("Metrics registered");
}

/// Record a class creation with its auto-enrollment count
pub fn record_class_created(auto_enrolled: usize) {
    counter!(format!("{}_classes_created_total", METRICS_PREFIX)).increment(1);

    if auto_enrolled > 0 {
        counter!(
            format!("{}_enrollments_created_total", METRICS_PREFIX),
            "kind" => "auto"
        )
        .increment(auto_enrolled as u64);
    }
}

/// Record a manual enrollment
pub fn record_enrollment() {
    counter!(
        format!("{}_enrollments_created_total", METRICS_PREFIX),
        "kind" => "manual"
    )
    .increment(1);
}

/// Record an assignment creation
pub fn record_assignment_created() {
    counter!(format!("{}_assignments_created_total", METRICS_PREFIX)).increment(1);
}

/// Record a submission (first or overwrite)
pub fn record_submission(resubmission: bool) {
    let kind = if resubmission { "resubmission" } else { "first" };
    counter!(
        format!("{}_submissions_received_total", METRICS_PREFIX),
        "kind" => kind
    )
    .increment(1);
}

/// Record a grading action
pub fn record_grade() {
    counter!(format!("{}_grades_recorded_total", METRICS_PREFIX)).increment(1);
}

/// Record persisted fan-out notifications
pub fn record_fan_out(count: usize) {
    if count > 0 {
        counter!(format!("{}_notifications_fanned_out_total", METRICS_PREFIX))
            .increment(count as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorders_run_without_panic() {
        register_metrics();
        record_class_created(3);
        record_class_created(0);
        record_enrollment();
        record_assignment_created();
        record_submission(false);
        record_submission(true);
        record_grade();
        record_fan_out(0);
        record_fan_out(4);
    }
}
