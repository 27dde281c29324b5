//! Rule and trust metrics report

use anyhow::{Context, Result};
use arc_trainer_kg::{DashboardReport, KnowledgeStore};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub rules_tracked: usize,
    pub rules_causally_valid: usize,
    pub trust_checks: usize,
    /// `None` until a trust check has been logged
    pub mean_trust_score: Option<f64>,
    pub total_counterfactual_failures: i64,
}

impl DashboardSummary {
    pub fn from_report(report: &DashboardReport) -> Self {
        let scores = &report.ai_trust_verification;
        let mean_trust_score = if scores.is_empty() {
            None
        } else {
            Some(scores.values().sum::<f64>() / scores.len() as f64)
        };
        Self {
            rules_tracked: report.causal_validation.len(),
            rules_causally_valid: report.causal_validation.values().filter(|v| **v).count(),
            trust_checks: scores.len(),
            mean_trust_score,
            total_counterfactual_failures: report.counterfactual_failures.values().sum(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub summary: DashboardSummary,
    #[serde(flatten)]
    pub report: DashboardReport,
}

pub async fn build(store: &dyn KnowledgeStore) -> Result<Dashboard> {
    let report = store
        .dashboard_report()
        .await
        .context("Failed to load dashboard metrics")?;
    let summary = DashboardSummary::from_report(&report);
    tracing::debug!(
        "Dashboard: {} rules tracked, {} trust checks",
        summary.rules_tracked,
        summary.trust_checks
    );
    Ok(Dashboard { summary, report })
}

pub fn to_json(dashboard: &Dashboard) -> Result<String> {
    serde_json::to_string_pretty(dashboard).context("Failed to serialise dashboard")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_trainer_kg::MemoryStore;

    #[tokio::test]
    async fn test_dashboard_aggregates_metrics() {
        let store = MemoryStore::new();
        store.log_causal_validation("rule_a", true).await.unwrap();
        store.log_causal_validation("rule_b", false).await.unwrap();
        store.log_ai_trust_verification("q1", 1.0).await.unwrap();
        store.log_ai_trust_verification("q2", 0.5).await.unwrap();
        store.log_counterfactual_failures("rule_b", 2).await.unwrap();
        store.log_counterfactual_failures("rule_b", 1).await.unwrap();

        let dashboard = build(&store).await.unwrap();
        assert_eq!(dashboard.summary.rules_tracked, 2);
        assert_eq!(dashboard.summary.rules_causally_valid, 1);
        assert_eq!(dashboard.summary.mean_trust_score, Some(0.75));
        assert_eq!(dashboard.summary.total_counterfactual_failures, 3);

        let json: serde_json::Value = serde_json::from_str(&to_json(&dashboard).unwrap()).unwrap();
        assert_eq!(json["causal_validation"]["rule_a"], true);
        assert_eq!(json["counterfactual_failures"]["rule_b"], 3);
    }

    #[tokio::test]
    async fn test_empty_dashboard() {
        let dashboard = build(&MemoryStore::new()).await.unwrap();
        assert_eq!(dashboard.summary.mean_trust_score, None);
        assert_eq!(dashboard.summary.trust_checks, 0);
    }
}
