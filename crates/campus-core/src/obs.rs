//! Structured observability hooks for workflow activity.
//!
//! Provides a `WorkflowSpan` RAII guard plus emitters for state transitions,
//! event fan-out and ranking recomputation. Everything is logged with an
//! `event = "..."` field so JSON output can be filtered by kind.

use tracing::{info, warn};

/// RAII guard that enters a span tagged with the workflow and entity id.
///
/// ```ignore
/// let _span = WorkflowSpan::enter("registration", &registration_id);
/// ```
pub struct WorkflowSpan {
    _span: tracing::span::EnteredSpan,
}

impl WorkflowSpan {
    pub fn enter(workflow: &str, entity_id: &str) -> Self {
        let span = tracing::info_span!("campus.workflow", workflow = %workflow, entity_id = %entity_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: an entity moved between states.
pub fn emit_transition(machine: &str, entity_id: &str, from: &str, to: &str) {
    info!(
        event = "state.transition",
        machine = %machine,
        entity_id = %entity_id,
        from = %from,
        to = %to,
    );
}

/// Emit event: a domain event was fanned out to its observers.
pub fn emit_event_published(event_type: &str, delivered: usize, failed: usize) {
    info!(
        event = "event.published",
        event_type = %event_type,
        delivered = delivered,
        failed = failed,
    );
}

/// Emit event: an observer failed while handling an event (warning level).
pub fn emit_observer_failed(event_type: &str, observer: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "event.observer_failed",
        event_type = %event_type,
        observer = %observer,
        error = %error,
    );
}

/// Emit event: a department cohort was re-ranked.
pub fn emit_rankings_recomputed(
    department_id: &str,
    semester: &str,
    academic_year: &str,
    students: usize,
) {
    info!(
        event = "results.rankings_recomputed",
        department_id = %department_id,
        semester = %semester,
        academic_year = %academic_year,
        students = students,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_span_create() {
        let _span = WorkflowSpan::enter("election", "e-1");
    }
}
