//! Collapse a request's raw workflow log into one entry per step.

use std::collections::HashMap;

use super::run_research::RETRY_STEP;
use crate::domains::research::data::WorkflowStep;
use crate::domains::research::models::{WorkflowLog, WorkflowLogStatus};

/// Latest entry per step, in pipeline order.
///
/// Steps of the fixed taxonomy come first in pipeline order; any other step
/// names follow, oldest first. Within a step the entry appended last wins,
/// so a step that was retried reports its final outcome. Once Result
/// Persistence has completed, the retry note of an earlier attempt is dropped.
pub fn aggregate(logs: Vec<WorkflowLog>) -> Vec<WorkflowLog> {
    let mut latest: HashMap<WorkflowStep, (usize, WorkflowLog)> = HashMap::new();
    for (position, log) in logs.into_iter().enumerate() {
        latest.insert(log.step.clone(), (position, log));
    }

    let persisted = latest
        .get(&WorkflowStep::ResultPersistence)
        .is_some_and(|(_, log)| log.status == WorkflowLogStatus::Completed);
    if persisted {
        latest.remove(&WorkflowStep::from(RETRY_STEP));
    }

    let mut known: Vec<(usize, usize, WorkflowLog)> = Vec::new();
    let mut others: Vec<(usize, WorkflowLog)> = Vec::new();
    for (_, (position, log)) in latest {
        match log.step.rank() {
            Some(rank) => known.push((rank, position, log)),
            None => others.push((position, log)),
        }
    }

    known.sort_by_key(|(rank, _, _)| *rank);
    others.sort_by(|(pa, a), (pb, b)| a.timestamp.cmp(&b.timestamp).then(pa.cmp(pb)));

    known
        .into_iter()
        .map(|(_, _, log)| log)
        .chain(others.into_iter().map(|(_, log)| log))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn log(step: &str, status: WorkflowLogStatus, message: &str, offset_secs: i64) -> WorkflowLog {
        let mut log = WorkflowLog::new(Uuid::nil(), WorkflowStep::from(step), status, message);
        log.timestamp = Utc::now() + Duration::seconds(offset_secs);
        log
    }

    fn steps(logs: &[WorkflowLog]) -> Vec<String> {
        logs.iter().map(|l| l.step.as_str().to_string()).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(Vec::new()).is_empty());
    }

    #[test]
    fn test_latest_entry_wins_per_step() {
        let aggregated = aggregate(vec![
            log("Input Parsing", WorkflowLogStatus::Started, "start", 0),
            log("Input Parsing", WorkflowLogStatus::Completed, "done", 1),
        ]);

        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].status, WorkflowLogStatus::Completed);
        assert_eq!(aggregated[0].message, "done");
    }

    #[test]
    fn test_taxonomy_order_regardless_of_arrival() {
        let aggregated = aggregate(vec![
            log("Error", WorkflowLogStatus::Failed, "boom", 0),
            log("Result Persistence", WorkflowLogStatus::Started, "", 1),
            log("Input Parsing", WorkflowLogStatus::Completed, "", 2),
            log("AI Processing", WorkflowLogStatus::Completed, "", 3),
            log("Data Gathering", WorkflowLogStatus::Completed, "", 4),
        ]);

        assert_eq!(
            steps(&aggregated),
            vec![
                "Input Parsing",
                "Data Gathering",
                "AI Processing",
                "Result Persistence",
                "Error"
            ]
        );
    }

    #[test]
    fn test_unknown_steps_follow_in_timestamp_order() {
        let aggregated = aggregate(vec![
            log("Zeta", WorkflowLogStatus::Started, "", 5),
            log("Retry", WorkflowLogStatus::Failed, "", 2),
            log("Input Parsing", WorkflowLogStatus::Started, "", 3),
        ]);

        assert_eq!(steps(&aggregated), vec!["Input Parsing", "Retry", "Zeta"]);
    }

    #[test]
    fn test_retry_note_dropped_once_results_persist() {
        let retried = vec![
            log("Input Parsing", WorkflowLogStatus::Completed, "", 0),
            log("AI Processing", WorkflowLogStatus::Failed, "malformed plan", 1),
            log("Retry", WorkflowLogStatus::Failed, "Attempt 1/3 failed", 2),
            log("Input Parsing", WorkflowLogStatus::Completed, "", 3),
            log("Data Gathering", WorkflowLogStatus::Completed, "", 4),
            log("AI Processing", WorkflowLogStatus::Completed, "", 5),
            log("Result Persistence", WorkflowLogStatus::Started, "", 6),
        ];

        // Still in flight: the retry stays visible
        assert!(steps(&aggregate(retried.clone())).contains(&"Retry".to_string()));

        let mut finished = retried;
        finished.push(log("Result Persistence", WorkflowLogStatus::Completed, "", 7));
        let aggregated = aggregate(finished);

        assert_eq!(
            steps(&aggregated),
            vec!["Input Parsing", "Data Gathering", "AI Processing", "Result Persistence"]
        );
        assert!(aggregated
            .iter()
            .all(|l| l.status == WorkflowLogStatus::Completed));
    }

    #[test]
    fn test_unknown_steps_with_equal_timestamps_keep_arrival_order() {
        let at = Utc::now();
        let mut first = log("Beta", WorkflowLogStatus::Started, "", 0);
        let mut second = log("Alpha", WorkflowLogStatus::Started, "", 0);
        first.timestamp = at;
        second.timestamp = at;

        assert_eq!(steps(&aggregate(vec![first, second])), vec!["Beta", "Alpha"]);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let once = aggregate(vec![
            log("AI Processing", WorkflowLogStatus::Started, "", 0),
            log("Custom", WorkflowLogStatus::Started, "", 1),
            log("Input Parsing", WorkflowLogStatus::Completed, "", 2),
            log("AI Processing", WorkflowLogStatus::Failed, "bad", 3),
            log("Another", WorkflowLogStatus::Completed, "", 4),
        ]);
        let twice = aggregate(once.clone());

        assert_eq!(once, twice);
    }

    #[test]
    fn test_output_never_longer_than_input() {
        let input = vec![
            log("Data Gathering", WorkflowLogStatus::Started, "", 0),
            log("Data Gathering", WorkflowLogStatus::Completed, "", 1),
            log("Data Gathering", WorkflowLogStatus::Failed, "", 2),
        ];
        let len = input.len();
        let aggregated = aggregate(input);

        assert!(aggregated.len() <= len);
        assert_eq!(aggregated.len(), 1);
    }
}
