use std::fmt;

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::cohort::weighted_average;
use crate::models::{AgentMetrics, AgentTotal, QualityTier, RiskAssessment, RiskLevel, RiskProfile};

/// Pearson correlation over the paired prefix of `x` and `y`; 0 when either
/// side is constant or fewer than two samples are paired.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let (Some(spread_x), Some(spread_y)) = (spread(x), spread(y)) else {
        return 0.0;
    };
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let n = n as f64;

    let coefficient = (n * sum_xy - sum_x * sum_y) / (spread_x * spread_y).sqrt();
    if coefficient.is_finite() {
        coefficient.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

// `nΣv² - (Σv)²`, or None when it is zero up to rounding.
fn spread(values: &[f64]) -> Option<f64> {
    let first = values[0];
    if values.iter().all(|value| *value == first) {
        return None;
    }
    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    let sum_sq: f64 = values.iter().map(|value| value * value).sum();
    let term = n * sum_sq - sum * sum;
    (term > f64::EPSILON * n * n * sum_sq).then_some(term)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    ConversionRate,
    QualityScore,
    PreferredPercent,
    GiPercent,
    FreeLookRate,
    Submitted,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::ConversionRate,
        Metric::QualityScore,
        Metric::PreferredPercent,
        Metric::GiPercent,
        Metric::FreeLookRate,
        Metric::Submitted,
    ];

    pub fn value(self, metrics: &AgentMetrics) -> f64 {
        match self {
            Metric::ConversionRate => metrics.conversion_rate,
            Metric::QualityScore => metrics.quality_score,
            Metric::PreferredPercent => metrics.preferred_percent,
            Metric::GiPercent => metrics.gi_percent,
            Metric::FreeLookRate => metrics.free_look_rate,
            Metric::Submitted => metrics.submitted as f64,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Metric::ConversionRate => "Conversion Rate",
            Metric::QualityScore => "Quality Score",
            Metric::PreferredPercent => "Preferred %",
            Metric::GiPercent => "GI %",
            Metric::FreeLookRate => "Free Look Rate",
            Metric::Submitted => "Submitted",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub x: Metric,
    pub y: Metric,
    pub coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub metrics: Vec<Metric>,
    pub coefficients: Vec<Vec<f64>>,
    pub pairs: Vec<CorrelationPair>,
    pub samples: usize,
}

impl CorrelationMatrix {
    pub fn compute(agents: &[AgentMetrics]) -> Self {
        let series: Vec<Vec<f64>> = Metric::ALL
            .iter()
            .map(|metric| agents.iter().map(|agent| metric.value(agent)).collect())
            .collect();

        let coefficients: Vec<Vec<f64>> = series
            .iter()
            .map(|x| series.iter().map(|y| pearson(x, y)).collect())
            .collect();

        let mut pairs = Vec::new();
        for (i, x) in Metric::ALL.iter().enumerate() {
            for (j, y) in Metric::ALL.iter().enumerate().skip(i + 1) {
                pairs.push(CorrelationPair {
                    x: *x,
                    y: *y,
                    coefficient: coefficients[i][j],
                });
            }
        }

        Self {
            metrics: Metric::ALL.to_vec(),
            coefficients,
            pairs,
            samples: agents.len(),
        }
    }

    pub fn get(&self, x: Metric, y: Metric) -> f64 {
        let index = |metric: Metric| self.metrics.iter().position(|m| *m == metric);
        match (index(x), index(y)) {
            (Some(i), Some(j)) => self.coefficients[i][j],
            _ => 0.0,
        }
    }

    /// Pairs ordered by absolute coefficient, strongest first.
    pub fn strongest(&self, limit: usize) -> Vec<CorrelationPair> {
        let mut pairs = self.pairs.clone();
        pairs.sort_by(|a, b| b.coefficient.abs().total_cmp(&a.coefficient.abs()));
        pairs.truncate(limit);
        pairs
    }
}

impl Default for CorrelationMatrix {
    fn default() -> Self {
        Self::compute(&[])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnderwritingMix {
    pub preferred: f64,
    pub standard: f64,
    pub graded: f64,
    pub gi: f64,
}

impl UnderwritingMix {
    pub fn compute(totals: &[AgentTotal]) -> Self {
        let weighted = |pick: fn(&AgentTotal) -> f64| {
            weighted_average(
                totals
                    .iter()
                    .map(|total| (pick(total), total.totals.submitted as f64)),
            )
        };
        Self {
            preferred: weighted(|t| t.totals.preferred_percent),
            standard: weighted(|t| t.totals.standard_percent),
            graded: weighted(|t| t.totals.graded_percent),
            gi: weighted(|t| t.totals.gi_percent),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket<T> {
    pub label: T,
    pub agents: usize,
}

fn buckets<T, I>(labels: &[T], values: I) -> Vec<Bucket<T>>
where
    T: Copy + PartialEq,
    I: IntoIterator<Item = T> + Clone,
{
    labels
        .iter()
        .map(|label| Bucket {
            label: *label,
            agents: values.clone().into_iter().filter(|value| value == label).count(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub quality_tiers: Vec<Bucket<QualityTier>>,
    pub risk_profiles: Vec<Bucket<RiskProfile>>,
    pub risk_levels: Vec<Bucket<RiskLevel>>,
    pub underwriting_mix: UnderwritingMix,
}

impl Distribution {
    pub fn compute(totals: &[AgentTotal], metrics: &[AgentMetrics], risks: &[RiskAssessment]) -> Self {
        Self {
            quality_tiers: buckets(&QualityTier::ALL, metrics.iter().map(|m| m.quality_tier)),
            risk_profiles: buckets(&RiskProfile::ALL, metrics.iter().map(|m| m.risk_profile)),
            risk_levels: buckets(&RiskLevel::ALL, risks.iter().map(|r| r.level)),
            underwriting_mix: UnderwritingMix::compute(totals),
        }
    }
}

impl Default for Distribution {
    fn default() -> Self {
        Self::compute(&[], &[], &[])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl SummaryStats {
    pub fn describe(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let finite = |value: f64| if value.is_finite() { value } else { 0.0 };

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Self {
            mean: finite(values.mean()),
            median,
            std_dev: if values.len() < 2 { 0.0 } else { finite(values.std_dev()) },
            min: finite(Statistics::min(values)),
            max: finite(Statistics::max(values)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub qualified_agents: usize,
    pub total_submissions: u64,
    pub avg_conversion_rate: f64,
    pub avg_free_look_rate: f64,
    pub conversion_rate: SummaryStats,
    pub quality_score: SummaryStats,
}

impl PortfolioSummary {
    pub fn compute(metrics: &[AgentMetrics]) -> Self {
        let conversion: Vec<f64> = metrics.iter().map(|m| m.conversion_rate).collect();
        let quality: Vec<f64> = metrics.iter().map(|m| m.quality_score).collect();
        let free_look: Vec<f64> = metrics.iter().map(|m| m.free_look_rate).collect();
        let conversion_rate = SummaryStats::describe(&conversion);

        Self {
            qualified_agents: metrics.len(),
            total_submissions: metrics.iter().map(|m| m.submitted).fold(0, u64::saturating_add),
            avg_conversion_rate: conversion_rate.mean,
            avg_free_look_rate: SummaryStats::describe(&free_look).mean,
            conversion_rate,
            quality_score: SummaryStats::describe(&quality),
        }
    }
}
