//! Logical-fallacy and bias screening of the original input text.

use claimlens_common::ReasoningReport;
use tracing::warn;

use crate::model::{extract, LanguageModel};

const SYSTEM_PROMPT: &str = "You analyze statements for logical fallacies and signs of bias.";

/// One structured analysis pass. Degrades to `None` on any failure; the
/// report is provenance, not a gate.
pub async fn analyze(model: &dyn LanguageModel, text: &str) -> Option<ReasoningReport> {
    let user = format!(
        "Analyze the following statement for logical fallacies or signs of bias.\n\n\
         Return:\n\
         1. A list of any logical fallacies (e.g., Strawman, Slippery slope, False cause)\n\
         2. A list of any bias indicators (e.g., Emotionally charged language, \
         Cherry-picking, Loaded language)\n\
         3. A short explanation of what was found.\n\n\
         Text: \"{}\"",
        text.trim()
    );

    match extract::<ReasoningReport>(model, SYSTEM_PROMPT, &user, 1).await {
        Ok(report) => Some(report),
        Err(e) => {
            warn!(error = %e, "fallacy analysis failed, continuing without it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;

    #[tokio::test]
    async fn returns_report_on_success() {
        let model = MockModel::always(
            r#"{"fallacies":["Slippery slope"],"bias_indicators":[],"explanation":"One fallacy found."}"#,
        );
        let report = analyze(&model, "If we allow X, soon Y will happen.")
            .await
            .unwrap();
        assert_eq!(report.fallacies, vec!["Slippery slope".to_string()]);
        assert!(report.bias_indicators.is_empty());
    }

    #[tokio::test]
    async fn outage_degrades_to_none() {
        let model = MockModel::failing();
        assert!(analyze(&model, "some text").await.is_none());
    }
}
