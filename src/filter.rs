use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::cohort::distinct_weeks;
use crate::models::{AgentRecord, QualityTier};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeekWindow {
    #[default]
    All,
    Last(usize),
    Range { from: String, to: String },
}

impl WeekWindow {
    pub fn select(&self, weeks: &[String]) -> Option<BTreeSet<String>> {
        match self {
            WeekWindow::All => None,
            WeekWindow::Last(count) => {
                let skip = weeks.len().saturating_sub(*count);
                Some(weeks[skip..].iter().cloned().collect())
            }
            WeekWindow::Range { from, to } => {
                let start = weeks.iter().position(|week| week == from.trim())?;
                let end = weeks.iter().position(|week| week == to.trim())?;
                (start <= end).then(|| weeks[start..=end].iter().cloned().collect())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisFilter {
    /// Keep only these agents; empty keeps everyone.
    pub agents: Vec<String>,
    pub weeks: WeekWindow,
    /// Keep only qualified agents in these tiers; empty keeps every tier.
    pub quality_tiers: Vec<QualityTier>,
}

impl AnalysisFilter {
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty() && self.weeks == WeekWindow::All && self.quality_tiers.is_empty()
    }

    pub fn apply(&self, records: &[AgentRecord]) -> Vec<AgentRecord> {
        let agents: BTreeSet<&str> = self.agents.iter().map(|agent| agent.trim()).collect();
        let weeks = self.weeks.select(&distinct_weeks(records));

        records
            .iter()
            .filter(|record| agents.is_empty() || agents.contains(record.agent.trim()))
            .filter(|record| match &weeks {
                None => true,
                Some(selected) => !record.is_total_row() && selected.contains(record.week.trim()),
            })
            .cloned()
            .collect()
    }

    pub fn admits_tier(&self, tier: QualityTier) -> bool {
        self.quality_tiers.is_empty() || self.quality_tiers.contains(&tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(agent: &str, week: &str) -> AgentRecord {
        AgentRecord {
            week: week.to_string(),
            agent: agent.to_string(),
            ..Default::default()
        }
    }

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn last_window_keeps_most_recent_weeks() {
        let weeks = labels(&["1", "2", "3", "4", "5"]);
        let selected = WeekWindow::Last(2).select(&weeks).unwrap();
        assert_eq!(selected.into_iter().collect::<Vec<_>>(), labels(&["4", "5"]));

        let everything = WeekWindow::Last(10).select(&weeks).unwrap();
        assert_eq!(everything.len(), 5);
    }

    #[test]
    fn range_window_is_inclusive_and_ignores_bad_endpoints() {
        let weeks = labels(&["1", "2", "3", "4"]);
        let range = |from: &str, to: &str| WeekWindow::Range {
            from: from.to_string(),
            to: to.to_string(),
        };
        assert_eq!(range("2", "3").select(&weeks).unwrap().len(), 2);
        assert_eq!(range("3", "2").select(&weeks), None);
        assert_eq!(range("2", "9").select(&weeks), None);
        assert_eq!(WeekWindow::All.select(&weeks), None);
    }

    #[test]
    fn apply_filters_agents_and_weeks() {
        let records = vec![
            record("A", "1"),
            record("A", "2"),
            record("A", "3"),
            record("A", "Total"),
            record("B", "3"),
        ];
        let filter = AnalysisFilter {
            agents: vec!["A ".to_string()],
            weeks: WeekWindow::Last(2),
            quality_tiers: Vec::new(),
        };
        let kept = filter.apply(&records);
        let weeks: Vec<&str> = kept.iter().map(|r| r.week.as_str()).collect();
        assert_eq!(weeks, vec!["2", "3"]);
        assert!(kept.iter().all(|r| r.agent == "A"));
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let records = vec![record("A", "1"), record("B", "Total")];
        let filter = AnalysisFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&records), records);
        assert!(filter.admits_tier(QualityTier::Poor));
    }

    #[test]
    fn tier_selection() {
        let filter = AnalysisFilter {
            quality_tiers: vec![QualityTier::Good],
            ..Default::default()
        };
        assert!(filter.admits_tier(QualityTier::Good));
        assert!(!filter.admits_tier(QualityTier::Poor));
        assert!(!filter.is_empty());
    }
}
