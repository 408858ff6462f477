use std::collections::{BTreeMap, BTreeSet};

use crate::cohort::{weighted_average, WeekKey};
use crate::models::{
    percent_of, AgentMetrics, AgentRecord, AgentTotal, QualityTier, RiskAssessment, RiskLevel,
    RiskProfile, WeeklyTrend,
};

pub const LOW_CONVERSION_RATE: f64 = 20.0;
pub const HIGH_FREE_LOOK_RATE: f64 = 15.0;
pub const ELEVATED_FREE_LOOK_RATE: f64 = 10.0;
pub const HIGH_GI_PERCENT: f64 = 40.0;
pub const LOW_PREFERRED_PERCENT: f64 = 20.0;
/// GI plus Graded share above which the underwriting mix is considered risky.
pub const HIGH_RISK_MIX_PERCENT: f64 = 60.0;
pub const LOW_WEEKLY_SUBMISSIONS: f64 = 5.0;
pub const POOR_QUALITY_SCORE: f64 = 50.0;
pub const LOW_ISSUED_PAID_PERCENT: f64 = 50.0;

pub fn quality_score(preferred_percent: f64, standard_percent: f64) -> f64 {
    (preferred_percent * 1.5 + standard_percent * 1.0) / 2.5
}

impl QualityTier {
    pub fn classify(preferred_percent: f64) -> Self {
        if preferred_percent >= 40.0 {
            QualityTier::Excellent
        } else if preferred_percent >= 30.0 {
            QualityTier::Good
        } else if preferred_percent >= 20.0 {
            QualityTier::Average
        } else {
            QualityTier::Poor
        }
    }
}

impl RiskProfile {
    pub fn classify(gi_percent: f64) -> Self {
        if gi_percent <= 20.0 {
            RiskProfile::LowRisk
        } else if gi_percent <= 35.0 {
            RiskProfile::MediumRisk
        } else {
            RiskProfile::HighRisk
        }
    }
}

impl AgentMetrics {
    pub fn from_total(total: &AgentTotal) -> Self {
        let t = &total.totals;
        let first = t.first_quotes as f64;
        let second = t.second_quotes as f64;
        let submitted = t.submitted as f64;
        let avg_weekly_submissions = if total.weeks_active > 0 {
            submitted / total.weeks_active as f64
        } else {
            0.0
        };

        Self {
            agent: total.agent.clone(),
            weeks_active: total.weeks_active,
            submitted: t.submitted,
            conversion_rate: percent_of(submitted, second),
            quote_progression_rate: percent_of(second, first),
            overall_conversion_rate: percent_of(submitted, first),
            efficiency: percent_of(submitted, first + second + submitted),
            quality_score: quality_score(t.preferred_percent, t.standard_percent),
            free_look_rate: percent_of(t.free_looked as f64, submitted),
            avg_weekly_submissions,
            preferred_percent: t.preferred_percent,
            standard_percent: t.standard_percent,
            graded_percent: t.graded_percent,
            gi_percent: t.gi_percent,
            issued_paid_plus: t.issued_paid_plus,
            quality_tier: QualityTier::classify(t.preferred_percent),
            risk_profile: RiskProfile::classify(t.gi_percent),
        }
    }
}

struct RiskRule {
    points: u32,
    check: fn(&AgentMetrics) -> Option<String>,
}

const RISK_RULES: &[RiskRule] = &[
    RiskRule {
        points: 3,
        check: |m| {
            (m.conversion_rate < LOW_CONVERSION_RATE)
                .then(|| format!("Low conversion rate ({:.1}%)", m.conversion_rate))
        },
    },
    RiskRule {
        points: 3,
        check: |m| {
            (m.free_look_rate > HIGH_FREE_LOOK_RATE)
                .then(|| format!("High free look rate ({:.1}%)", m.free_look_rate))
        },
    },
    RiskRule {
        points: 1,
        check: |m| {
            (m.free_look_rate > ELEVATED_FREE_LOOK_RATE && m.free_look_rate <= HIGH_FREE_LOOK_RATE)
                .then(|| format!("Elevated free look rate ({:.1}%)", m.free_look_rate))
        },
    },
    RiskRule {
        points: 2,
        check: |m| {
            (m.gi_percent > HIGH_GI_PERCENT)
                .then(|| format!("High GI percentage ({:.1}%)", m.gi_percent))
        },
    },
    RiskRule {
        points: 2,
        check: |m| {
            (m.preferred_percent < LOW_PREFERRED_PERCENT)
                .then(|| format!("Low preferred rate ({:.1}%)", m.preferred_percent))
        },
    },
    RiskRule {
        points: 2,
        check: |m| {
            let mix = m.gi_percent + m.graded_percent;
            (mix > HIGH_RISK_MIX_PERCENT)
                .then(|| format!("High-risk underwriting mix ({mix:.1}% GI+Graded)"))
        },
    },
    RiskRule {
        points: 1,
        check: |m| {
            (m.avg_weekly_submissions < LOW_WEEKLY_SUBMISSIONS).then(|| {
                format!(
                    "Low weekly productivity ({:.1}/week)",
                    m.avg_weekly_submissions
                )
            })
        },
    },
    RiskRule {
        points: 2,
        check: |m| {
            (m.quality_score < POOR_QUALITY_SCORE)
                .then(|| format!("Poor quality score ({:.1})", m.quality_score))
        },
    },
    RiskRule {
        points: 1,
        check: |m| {
            (m.issued_paid_plus < LOW_ISSUED_PAID_PERCENT)
                .then(|| format!("Low policy success ({:.1}% issued & paid)", m.issued_paid_plus))
        },
    },
];

pub fn assess(metrics: &AgentMetrics) -> RiskAssessment {
    let (score, issues) = RISK_RULES.iter().fold(
        (0u32, Vec::new()),
        |(score, mut issues), rule| match (rule.check)(metrics) {
            Some(issue) => {
                issues.push(issue);
                (score + rule.points, issues)
            }
            None => (score, issues),
        },
    );

    RiskAssessment {
        agent: metrics.agent.clone(),
        score,
        level: RiskLevel::from_score(score),
        issues,
        weeks_active: metrics.weeks_active,
        submitted: metrics.submitted,
    }
}

pub fn weekly_trends(records: &[AgentRecord], agents: &BTreeSet<String>) -> Vec<WeeklyTrend> {
    let mut by_week: BTreeMap<String, Vec<&AgentRecord>> = BTreeMap::new();
    for record in records
        .iter()
        .filter(|record| record.is_weekly() && agents.contains(record.agent.trim()))
    {
        let week = record.week.trim();
        if !week.is_empty() {
            by_week.entry(week.to_string()).or_default().push(record);
        }
    }

    let mut trends: Vec<WeeklyTrend> = by_week
        .into_iter()
        .map(|(week, rows)| {
            let sum = |count: fn(&AgentRecord) -> u64| {
                rows.iter().copied().map(count).fold(0u64, u64::saturating_add)
            };
            let first_quotes = sum(|r| r.first_quotes);
            let second_quotes = sum(|r| r.second_quotes);
            let submitted = sum(|r| r.submitted);
            let preferred_percent =
                weighted_average(rows.iter().map(|r| (r.preferred_percent, r.submitted as f64)));
            let standard_percent =
                weighted_average(rows.iter().map(|r| (r.standard_percent, r.submitted as f64)));
            let active_agents = rows
                .iter()
                .map(|r| r.agent.trim())
                .collect::<BTreeSet<_>>()
                .len();

            WeeklyTrend {
                week,
                active_agents,
                first_quotes,
                second_quotes,
                submitted,
                free_looked: sum(|r| r.free_looked),
                conversion_rate: percent_of(submitted as f64, second_quotes as f64),
                preferred_percent,
                gi_percent: weighted_average(rows.iter().map(|r| (r.gi_percent, r.submitted as f64))),
                quality_score: quality_score(preferred_percent, standard_percent),
            }
        })
        .collect();

    trends.sort_by_cached_key(|trend| WeekKey::new(&trend.week));
    trends
}
