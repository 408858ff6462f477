use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::cohort::{merge_week, WeekKey};
use crate::models::{AgentRecord, ChangeEvent};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeDetector {
    threshold: f64,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(15.0)
    }
}

impl ChangeDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compares each week with the one before it. `weeks` must already be in
    /// chronological order; fewer than two weeks yields nothing.
    pub fn scan(&self, agent: &str, weeks: &[&AgentRecord]) -> Vec<ChangeEvent> {
        weeks
            .windows(2)
            .filter_map(|pair| {
                let (before, after) = (pair[0], pair[1]);
                let preferred_change = after.preferred_percent - before.preferred_percent;
                let gi_change = after.gi_percent - before.gi_percent;
                let conversion_change = after.conversion_rate() - before.conversion_rate();
                let severity = preferred_change
                    .abs()
                    .max(gi_change.abs())
                    .max(conversion_change.abs());

                (severity >= self.threshold).then(|| ChangeEvent {
                    agent: agent.to_string(),
                    from_week: before.week.trim().to_string(),
                    to_week: after.week.trim().to_string(),
                    preferred_change,
                    gi_change,
                    conversion_change,
                    severity,
                })
            })
            .collect()
    }

    pub fn detect(&self, records: &[AgentRecord], agents: &BTreeSet<String>) -> Vec<ChangeEvent> {
        let mut timelines: BTreeMap<&str, BTreeMap<&str, Vec<&AgentRecord>>> = BTreeMap::new();
        for record in records.iter().filter(|record| record.is_weekly()) {
            let agent = record.agent.trim();
            if agents.contains(agent) {
                timelines
                    .entry(agent)
                    .or_default()
                    .entry(record.week.trim())
                    .or_default()
                    .push(record);
            }
        }

        let mut events: Vec<ChangeEvent> = timelines
            .into_iter()
            .flat_map(|(agent, by_week)| {
                // one row per week; repeated labels are merged like aggregation does
                let mut weeks: Vec<AgentRecord> = by_week
                    .into_iter()
                    .map(|(week, rows)| match rows.as_slice() {
                        [only] => (*only).clone(),
                        _ => merge_week(agent, week, &rows),
                    })
                    .collect();
                weeks.sort_by_cached_key(|record| WeekKey::new(&record.week));
                let ordered: Vec<&AgentRecord> = weeks.iter().collect();
                self.scan(agent, &ordered)
            })
            .collect();

        events.sort_by(|a, b| b.severity.total_cmp(&a.severity));
        debug!(agents = agents.len(), events = events.len(), "scanned weekly timelines");
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week(agent: &str, week: &str, preferred: f64, gi: f64) -> AgentRecord {
        AgentRecord {
            week: week.to_string(),
            agent: agent.to_string(),
            first_quotes: 60,
            second_quotes: 40,
            submitted: 15,
            preferred_percent: preferred,
            gi_percent: gi,
            ..Default::default()
        }
    }

    fn agents(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn twenty_point_drop_is_one_event() {
        let records = vec![week("A", "1", 50.0, 10.0), week("A", "2", 30.0, 10.0)];
        let events = ChangeDetector::default().detect(&records, &agents(&["A"]));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].preferred_change, -20.0);
        assert_eq!(events[0].severity, 20.0);
    }

    #[test]
    fn ten_point_drop_is_ignored() {
        let records = vec![week("A", "1", 50.0, 10.0), week("A", "2", 40.0, 10.0)];
        assert!(ChangeDetector::default()
            .detect(&records, &agents(&["A"]))
            .is_empty());
    }

    #[test]
    fn exact_threshold_fires() {
        let records = vec![week("A", "1", 50.0, 10.0), week("A", "2", 50.0, 25.0)];
        let events = ChangeDetector::default().detect(&records, &agents(&["A"]));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].gi_change, 15.0);
    }

    #[test]
    fn conversion_swing_alone_fires() {
        let mut later = week("A", "2", 50.0, 10.0);
        later.submitted = 30;
        let records = vec![week("A", "1", 50.0, 10.0), later];
        let events = ChangeDetector::default().detect(&records, &agents(&["A"]));
        assert_eq!(events.len(), 1);
        assert!((events[0].conversion_change - 37.5).abs() < 1e-9);
    }

    #[test]
    fn weeks_are_compared_chronologically_not_by_input_order() {
        let records = vec![
            week("A", "Week 10", 20.0, 10.0),
            week("A", "Week 2", 50.0, 10.0),
            week("A", "Week 9", 50.0, 10.0),
        ];
        let events = ChangeDetector::default().detect(&records, &agents(&["A"]));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from_week, "Week 9");
        assert_eq!(events[0].to_week, "Week 10");
    }

    #[test]
    fn single_week_and_unlisted_agents_yield_nothing() {
        let records = vec![
            week("A", "1", 50.0, 10.0),
            week("B", "1", 50.0, 10.0),
            week("B", "2", 0.0, 90.0),
        ];
        let events = ChangeDetector::default().detect(&records, &agents(&["A"]));
        assert!(events.is_empty());
    }

    #[test]
    fn total_rows_are_not_part_of_the_timeline() {
        let records = vec![
            week("A", "1", 50.0, 10.0),
            week("A", "2", 50.0, 10.0),
            week("A", "Total", 0.0, 80.0),
        ];
        assert!(ChangeDetector::default()
            .detect(&records, &agents(&["A"]))
            .is_empty());
    }

    #[test]
    fn repeated_week_rows_are_merged_before_comparing() {
        let records = vec![
            week("A", "1", 50.0, 10.0),
            week("A", "1", 20.0, 10.0),
            week("A", "2", 20.0, 10.0),
        ];
        let events = ChangeDetector::default().detect(&records, &agents(&["A"]));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from_week, "1");
        assert_eq!(events[0].to_week, "2");
        assert!((events[0].preferred_change + 15.0).abs() < 1e-9);
        assert!(events.iter().all(|event| event.from_week != event.to_week));
    }

    #[test]
    fn events_sorted_by_severity() {
        let records = vec![
            week("A", "1", 50.0, 10.0),
            week("A", "2", 30.0, 10.0),
            week("B", "1", 50.0, 10.0),
            week("B", "2", 50.0, 50.0),
        ];
        let events = ChangeDetector::default().detect(&records, &agents(&["A", "B"]));
        let order: Vec<&str> = events.iter().map(|e| e.agent.as_str()).collect();
        assert_eq!(order, vec!["B", "A"]);
    }
}
