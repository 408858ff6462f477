use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Week label used by exports for the pre-aggregated per-agent row.
pub const TOTAL_WEEK: &str = "Total";

pub const PERCENT_FIELD_COUNT: usize = 10;

/// `numerator / denominator * 100`, or 0 when the denominator is not positive.
pub fn percent_of(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    pub week: String,
    pub agent: String,
    pub first_quotes: u64,
    pub second_quotes: u64,
    pub submitted: u64,
    pub free_looked: u64,
    pub pre_lapse_cases: u64,
    pub first_quote_smoker_percent: f64,
    pub second_quote_smoker_percent: f64,
    pub smoker_percent: f64,
    pub preferred_percent: f64,
    pub standard_percent: f64,
    pub graded_percent: f64,
    pub gi_percent: f64,
    pub cc_percent: f64,
    pub issued_paid_minus: f64,
    pub issued_paid_plus: f64,
}

impl AgentRecord {
    pub fn is_total_row(&self) -> bool {
        self.week.trim().eq_ignore_ascii_case(TOTAL_WEEK)
    }

    pub fn has_agent(&self) -> bool {
        !self.agent.trim().is_empty()
    }

    /// Weekly rows are the ones that feed aggregation, trends and timelines.
    pub fn is_weekly(&self) -> bool {
        self.has_agent() && !self.is_total_row()
    }

    pub fn conversion_rate(&self) -> f64 {
        percent_of(self.submitted as f64, self.second_quotes as f64)
    }

    pub fn percentages(&self) -> [f64; PERCENT_FIELD_COUNT] {
        [
            self.first_quote_smoker_percent,
            self.second_quote_smoker_percent,
            self.smoker_percent,
            self.preferred_percent,
            self.standard_percent,
            self.graded_percent,
            self.gi_percent,
            self.cc_percent,
            self.issued_paid_minus,
            self.issued_paid_plus,
        ]
    }

    pub fn set_percentages(&mut self, values: [f64; PERCENT_FIELD_COUNT]) {
        let [first_smoker, second_smoker, smoker, preferred, standard, graded, gi, cc, ip_minus, ip_plus] =
            values;
        self.first_quote_smoker_percent = first_smoker;
        self.second_quote_smoker_percent = second_smoker;
        self.smoker_percent = smoker;
        self.preferred_percent = preferred;
        self.standard_percent = standard;
        self.graded_percent = graded;
        self.gi_percent = gi;
        self.cc_percent = cc;
        self.issued_paid_minus = ip_minus;
        self.issued_paid_plus = ip_plus;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTotal {
    pub agent: String,
    pub weeks_active: usize,
    pub record_count: usize,
    #[serde(flatten)]
    pub totals: AgentRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetrics {
    pub agent: String,
    pub weeks_active: usize,
    pub submitted: u64,
    pub conversion_rate: f64,
    pub quote_progression_rate: f64,
    pub overall_conversion_rate: f64,
    pub efficiency: f64,
    pub quality_score: f64,
    pub free_look_rate: f64,
    pub avg_weekly_submissions: f64,
    pub preferred_percent: f64,
    pub standard_percent: f64,
    pub graded_percent: f64,
    pub gi_percent: f64,
    pub issued_paid_plus: f64,
    pub quality_tier: QualityTier,
    pub risk_profile: RiskProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low];

    pub fn from_score(score: u32) -> Self {
        match score {
            6.. => RiskLevel::High,
            4..=5 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    pub fn needs_attention(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Medium)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    Excellent,
    Good,
    Average,
    Poor,
}

impl QualityTier {
    pub const ALL: [QualityTier; 4] = [
        QualityTier::Excellent,
        QualityTier::Good,
        QualityTier::Average,
        QualityTier::Poor,
    ];
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QualityTier::Excellent => "Excellent",
            QualityTier::Good => "Good",
            QualityTier::Average => "Average",
            QualityTier::Poor => "Poor",
        };
        f.write_str(label)
    }
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        QualityTier::ALL
            .into_iter()
            .find(|tier| tier.to_string().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown quality tier '{value}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskProfile {
    #[serde(rename = "Low Risk")]
    LowRisk,
    #[serde(rename = "Medium Risk")]
    MediumRisk,
    #[serde(rename = "High Risk")]
    HighRisk,
}

impl RiskProfile {
    pub const ALL: [RiskProfile; 3] = [
        RiskProfile::LowRisk,
        RiskProfile::MediumRisk,
        RiskProfile::HighRisk,
    ];
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskProfile::LowRisk => "Low Risk",
            RiskProfile::MediumRisk => "Medium Risk",
            RiskProfile::HighRisk => "High Risk",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub agent: String,
    pub score: u32,
    pub level: RiskLevel,
    pub issues: Vec<String>,
    pub weeks_active: usize,
    pub submitted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub agent: String,
    pub from_week: String,
    pub to_week: String,
    pub preferred_change: f64,
    pub gi_change: f64,
    pub conversion_change: f64,
    pub severity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTrend {
    pub week: String,
    pub active_agents: usize,
    pub first_quotes: u64,
    pub second_quotes: u64,
    pub submitted: u64,
    pub free_looked: u64,
    pub conversion_rate: f64,
    pub preferred_percent: f64,
    pub gi_percent: f64,
    pub quality_score: f64,
}
