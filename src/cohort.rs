use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{AgentRecord, AgentTotal, PERCENT_FIELD_COUNT, TOTAL_WEEK};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualificationThresholds {
    pub min_first_quotes: u64,
    pub min_submitted: u64,
    pub min_weeks_active: usize,
}

impl Default for QualificationThresholds {
    fn default() -> Self {
        Self {
            min_first_quotes: 50,
            min_submitted: 10,
            min_weeks_active: 2,
        }
    }
}

impl QualificationThresholds {
    pub fn admits(&self, total: &AgentTotal) -> bool {
        total.totals.first_quotes >= self.min_first_quotes
            && total.totals.submitted >= self.min_submitted
            && total.weeks_active >= self.min_weeks_active
    }
}

/// Chronological ordering key for free-form week labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekKey {
    number: Option<u64>,
    label: String,
}

impl WeekKey {
    pub fn new(label: &str) -> Self {
        let label = label.trim();
        let number = label
            .split(|c: char| !c.is_ascii_digit())
            .find(|run| !run.is_empty())
            .and_then(|run| run.parse().ok());
        Self {
            number,
            label: label.to_string(),
        }
    }
}

impl Ord for WeekKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.number, other.number) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.label.cmp(&other.label)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.label.cmp(&other.label),
        }
    }
}

impl PartialOrd for WeekKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn distinct_weeks(records: &[AgentRecord]) -> Vec<String> {
    let mut weeks: Vec<String> = records
        .iter()
        .filter(|record| !record.is_total_row())
        .map(|record| record.week.trim().to_string())
        .filter(|week| !week.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    weeks.sort_by_cached_key(|week| WeekKey::new(week));
    weeks
}

/// Weighted mean of `(value, weight)` pairs; 0 when the weights sum to 0.
pub fn weighted_average<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (weighted, weight) = pairs
        .into_iter()
        .fold((0.0, 0.0), |(sum, total), (value, weight)| {
            (sum + value * weight, total + weight)
        });
    if weight > 0.0 {
        weighted / weight
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Default)]
struct Accumulator {
    first_quotes: u64,
    second_quotes: u64,
    submitted: u64,
    free_looked: u64,
    pre_lapse_cases: u64,
    weight: f64,
    weighted: [f64; PERCENT_FIELD_COUNT],
    weeks: BTreeSet<String>,
    records: usize,
}

impl Accumulator {
    fn absorb(mut self, record: &AgentRecord) -> Self {
        let weight = record.submitted as f64;
        self.first_quotes = self.first_quotes.saturating_add(record.first_quotes);
        self.second_quotes = self.second_quotes.saturating_add(record.second_quotes);
        self.submitted = self.submitted.saturating_add(record.submitted);
        self.free_looked = self.free_looked.saturating_add(record.free_looked);
        self.pre_lapse_cases = self.pre_lapse_cases.saturating_add(record.pre_lapse_cases);
        self.weight += weight;
        for (slot, value) in self.weighted.iter_mut().zip(record.percentages()) {
            *slot += value * weight;
        }
        let week = record.week.trim();
        if !week.is_empty() {
            self.weeks.insert(week.to_string());
        }
        self.records += 1;
        self
    }

    fn finish(self, agent: String) -> AgentTotal {
        let weight = self.weight;
        let percentages = self
            .weighted
            .map(|sum| if weight > 0.0 { sum / weight } else { 0.0 });
        let mut totals = AgentRecord {
            week: TOTAL_WEEK.to_string(),
            agent: agent.clone(),
            first_quotes: self.first_quotes,
            second_quotes: self.second_quotes,
            submitted: self.submitted,
            free_looked: self.free_looked,
            pre_lapse_cases: self.pre_lapse_cases,
            ..Default::default()
        };
        totals.set_percentages(percentages);
        AgentTotal {
            agent,
            weeks_active: self.weeks.len(),
            record_count: self.records,
            totals,
        }
    }
}

pub fn aggregate(records: &[AgentRecord]) -> Vec<AgentTotal> {
    records
        .iter()
        .filter(|record| record.is_weekly())
        .fold(BTreeMap::<String, Accumulator>::new(), |mut groups, record| {
            let slot = groups.entry(record.agent.trim().to_string()).or_default();
            *slot = std::mem::take(slot).absorb(record);
            groups
        })
        .into_iter()
        .map(|(agent, accumulator)| accumulator.finish(agent))
        .collect()
}

/// Collapses several rows for one agent and week into a single weekly row.
pub fn merge_week(agent: &str, week: &str, rows: &[&AgentRecord]) -> AgentRecord {
    let total = rows
        .iter()
        .fold(Accumulator::default(), |accumulator, record| accumulator.absorb(record))
        .finish(agent.to_string());
    AgentRecord {
        week: week.to_string(),
        ..total.totals
    }
}

pub fn qualify(records: &[AgentRecord], thresholds: &QualificationThresholds) -> Vec<AgentTotal> {
    let totals = aggregate(records);
    let seen = totals.len();
    let qualified: Vec<AgentTotal> = totals
        .into_iter()
        .filter(|total| thresholds.admits(total))
        .collect();
    debug!(agents = seen, qualified = qualified.len(), "applied qualification thresholds");
    qualified
}
