use std::fmt::Write;

use chrono::Utc;

use crate::engine::AnalysisReport;
use crate::models::RiskAssessment;

const TOP_CORRELATIONS: usize = 5;
const TOP_CHANGES: usize = 10;

pub fn format_risk_line(risk: &RiskAssessment) -> String {
    let issues = if risk.issues.is_empty() {
        "no issues".to_string()
    } else {
        risk.issues.join("; ")
    };
    format!(
        "- {} ({} risk, score {}, {} weeks, {} submitted): {}",
        risk.agent, risk.level, risk.score, risk.weeks_active, risk.submitted, issues
    )
}

pub fn build_report(analysis: &AnalysisReport, source: &str) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Agent Performance Report");
    let _ = writeln!(
        output,
        "Generated from {} on {} ({} records, {} weeks)",
        source,
        Utc::now().format("%Y-%m-%d %H:%M UTC"),
        analysis.record_count,
        analysis.weeks.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Key Metrics");

    if analysis.is_empty() {
        let _ = writeln!(output, "No agents met the qualification thresholds.");
        return output;
    }

    let summary = &analysis.summary;
    let _ = writeln!(output, "- Qualified agents: {}", summary.qualified_agents);
    let _ = writeln!(output, "- Total submissions: {}", summary.total_submissions);
    let _ = writeln!(
        output,
        "- Avg conversion rate: {:.1}%",
        summary.avg_conversion_rate
    );
    let _ = writeln!(output, "- Avg free look rate: {:.1}%", summary.avg_free_look_rate);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Performers");
    let _ = writeln!(
        output,
        "| Agent | Submissions | Conversion % | Quality Score | Preferred % | GI % | Free Look % | Tier |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|---|");
    for agent in &analysis.top_performers {
        let _ = writeln!(
            output,
            "| {} | {} | {:.1} | {:.1} | {:.1} | {:.1} | {:.1} | {} |",
            agent.agent,
            agent.submitted,
            agent.conversion_rate,
            agent.quality_score,
            agent.preferred_percent,
            agent.gi_percent,
            agent.free_look_rate,
            agent.quality_tier
        );
    }

    let distribution = &analysis.distribution;
    let mix = &distribution.underwriting_mix;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Underwriting Mix");
    let _ = writeln!(
        output,
        "- Preferred {:.1}%, Standard {:.1}%, Graded {:.1}%, GI {:.1}% (submission weighted)",
        mix.preferred, mix.standard, mix.graded, mix.gi
    );
    let tiers: Vec<String> = distribution
        .quality_tiers
        .iter()
        .map(|bucket| format!("{} {}", bucket.label, bucket.agents))
        .collect();
    let _ = writeln!(output, "- Quality tiers: {}", tiers.join(", "));
    let profiles: Vec<String> = distribution
        .risk_profiles
        .iter()
        .map(|bucket| format!("{} {}", bucket.label, bucket.agents))
        .collect();
    let _ = writeln!(output, "- Risk profiles: {}", profiles.join(", "));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Agents Requiring Attention");
    let flagged = analysis.attention();
    if flagged.is_empty() {
        let _ = writeln!(output, "No medium or high risk agents in this selection.");
    } else {
        for risk in flagged {
            let _ = writeln!(output, "{}", format_risk_line(risk));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Portfolio Statistics");
    for (label, stats, unit) in [
        ("Conversion rate", &summary.conversion_rate, "%"),
        ("Quality score", &summary.quality_score, ""),
    ] {
        let _ = writeln!(
            output,
            "- {}: mean {:.1}{unit}, median {:.1}{unit}, std dev {:.1}{unit}, range {:.1}{unit} - {:.1}{unit}",
            label, stats.mean, stats.median, stats.std_dev, stats.min, stats.max
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Correlation Highlights");
    if analysis.correlations.samples < 2 {
        let _ = writeln!(output, "Not enough qualified agents to correlate metrics.");
    } else {
        for pair in analysis.correlations.strongest(TOP_CORRELATIONS) {
            let _ = writeln!(output, "- {} vs {}: {:+.2}", pair.x, pair.y, pair.coefficient);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Significant Weekly Changes");
    if analysis.change_events.is_empty() {
        let _ = writeln!(output, "No week-over-week shifts above the threshold.");
    } else {
        for event in analysis.change_events.iter().take(TOP_CHANGES) {
            let _ = writeln!(
                output,
                "- {} week {} -> {}: preferred {:+.1}, GI {:+.1}, conversion {:+.1}",
                event.agent,
                event.from_week,
                event.to_week,
                event.preferred_change,
                event.gi_change,
                event.conversion_change
            );
        }
    }

    output
}
