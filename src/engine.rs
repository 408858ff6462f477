use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cohort::{self, distinct_weeks};
use crate::config::AnalyticsConfig;
use crate::correlation::{CorrelationMatrix, Distribution, PortfolioSummary};
use crate::filter::AnalysisFilter;
use crate::metrics::{self, assess};
use crate::models::{AgentMetrics, AgentRecord, AgentTotal, ChangeEvent, RiskAssessment, WeeklyTrend};
use crate::timeline::ChangeDetector;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub record_count: usize,
    pub weeks: Vec<String>,
    pub qualified_agents: Vec<AgentTotal>,
    pub agent_metrics: Vec<AgentMetrics>,
    pub risk_assessments: Vec<RiskAssessment>,
    pub correlations: CorrelationMatrix,
    pub distribution: Distribution,
    pub summary: PortfolioSummary,
    pub top_performers: Vec<AgentMetrics>,
    pub weekly_trends: Vec<WeeklyTrend>,
    pub change_events: Vec<ChangeEvent>,
}

impl AnalysisReport {
    /// Medium and High risk agents, highest score first.
    pub fn attention(&self) -> Vec<&RiskAssessment> {
        let mut flagged: Vec<&RiskAssessment> = self
            .risk_assessments
            .iter()
            .filter(|risk| risk.level.needs_attention())
            .collect();
        flagged.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.agent.cmp(&b.agent)));
        flagged
    }

    pub fn is_empty(&self) -> bool {
        self.qualified_agents.is_empty()
    }
}

pub fn analyze(
    records: &[AgentRecord],
    filter: &AnalysisFilter,
    config: &AnalyticsConfig,
) -> AnalysisReport {
    let scoped = if filter.is_empty() {
        records.to_vec()
    } else {
        filter.apply(records)
    };

    let (qualified_agents, agent_metrics): (Vec<AgentTotal>, Vec<AgentMetrics>) =
        cohort::qualify(&scoped, &config.thresholds)
            .into_iter()
            .map(|total| {
                let metrics = AgentMetrics::from_total(&total);
                (total, metrics)
            })
            .filter(|(_, metrics)| filter.admits_tier(metrics.quality_tier))
            .unzip();

    let risk_assessments: Vec<RiskAssessment> = agent_metrics.iter().map(assess).collect();
    let agents: BTreeSet<String> = qualified_agents
        .iter()
        .map(|total| total.agent.clone())
        .collect();

    let mut top_performers = agent_metrics.clone();
    top_performers.sort_by(|a, b| b.submitted.cmp(&a.submitted).then_with(|| a.agent.cmp(&b.agent)));
    top_performers.truncate(config.top_performers);

    let report = AnalysisReport {
        record_count: scoped.len(),
        weeks: distinct_weeks(&scoped),
        correlations: CorrelationMatrix::compute(&agent_metrics),
        distribution: Distribution::compute(&qualified_agents, &agent_metrics, &risk_assessments),
        summary: PortfolioSummary::compute(&agent_metrics),
        weekly_trends: metrics::weekly_trends(&scoped, &agents),
        change_events: ChangeDetector::new(config.change_threshold).detect(&scoped, &agents),
        top_performers,
        qualified_agents,
        agent_metrics,
        risk_assessments,
    };

    info!(
        records = report.record_count,
        qualified = report.qualified_agents.len(),
        flagged = report.attention().len(),
        changes = report.change_events.len(),
        "analysis complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QualityTier, RiskLevel};

    fn week(agent: &str, week: &str, submitted: u64, preferred: f64, gi: f64) -> AgentRecord {
        AgentRecord {
            week: week.to_string(),
            agent: agent.to_string(),
            first_quotes: 60,
            second_quotes: 40,
            submitted,
            preferred_percent: preferred,
            standard_percent: 30.0,
            gi_percent: gi,
            issued_paid_plus: 80.0,
            ..Default::default()
        }
    }

    fn dataset() -> Vec<AgentRecord> {
        vec![
            week("Avery", "1", 15, 50.0, 10.0),
            week("Avery", "2", 15, 20.0, 50.0),
            week("Jules", "1", 30, 45.0, 5.0),
            week("Jules", "2", 30, 45.0, 5.0),
            week("Jules", "3", 30, 44.0, 6.0),
            week("Kiara", "1", 2, 10.0, 60.0),
            week("Kiara", "Total", 2, 10.0, 60.0),
        ]
    }

    #[test]
    fn empty_input_gives_empty_collections() {
        let report = analyze(&[], &AnalysisFilter::default(), &AnalyticsConfig::default());
        assert!(report.is_empty());
        assert!(report.agent_metrics.is_empty());
        assert!(report.risk_assessments.is_empty());
        assert!(report.weekly_trends.is_empty());
        assert!(report.change_events.is_empty());
        assert!(report.top_performers.is_empty());
        assert_eq!(report.summary.qualified_agents, 0);
        assert_eq!(report.correlations.samples, 0);
    }

    #[test]
    fn qualifies_and_orders_by_agent() {
        let report = analyze(&dataset(), &AnalysisFilter::default(), &AnalyticsConfig::default());
        let agents: Vec<&str> = report.qualified_agents.iter().map(|t| t.agent.as_str()).collect();
        assert_eq!(agents, vec!["Avery", "Jules"]);
        assert_eq!(report.agent_metrics.len(), 2);
        assert_eq!(report.risk_assessments.len(), 2);
        assert_eq!(report.weeks, vec!["1", "2", "3"]);
        assert_eq!(report.top_performers[0].agent, "Jules");
        assert_eq!(report.summary.total_submissions, 120);
    }

    #[test]
    fn change_events_only_for_qualified_agents() {
        let report = analyze(&dataset(), &AnalysisFilter::default(), &AnalyticsConfig::default());
        assert_eq!(report.change_events.len(), 1);
        let event = &report.change_events[0];
        assert_eq!(event.agent, "Avery");
        assert_eq!((event.from_week.as_str(), event.to_week.as_str()), ("1", "2"));
    }

    #[test]
    fn tier_filter_narrows_every_collection() {
        let filter = AnalysisFilter {
            quality_tiers: vec![QualityTier::Excellent],
            ..Default::default()
        };
        let report = analyze(&dataset(), &filter, &AnalyticsConfig::default());
        assert_eq!(report.qualified_agents.len(), 1);
        assert_eq!(report.qualified_agents[0].agent, "Jules");
        assert!(report.change_events.is_empty());
        assert!(report
            .weekly_trends
            .iter()
            .all(|trend| trend.active_agents == 1));
    }

    #[test]
    fn attention_lists_flagged_agents_by_score() {
        let mut records = dataset();
        records.push(week("Dana", "1", 6, 5.0, 70.0));
        records.push(week("Dana", "2", 6, 5.0, 70.0));
        let report = analyze(&records, &AnalysisFilter::default(), &AnalyticsConfig::default());
        let flagged = report.attention();
        assert_eq!(flagged[0].agent, "Dana");
        assert_eq!(flagged[0].level, RiskLevel::High);
        for pair in flagged.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn repeated_runs_are_identical() {
        let config = AnalyticsConfig::default();
        let first = analyze(&dataset(), &AnalysisFilter::default(), &config);
        let second = analyze(&dataset(), &AnalysisFilter::default(), &config);
        assert_eq!(first, second);
    }
}
