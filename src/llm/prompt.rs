use crate::present::table_text;
use crate::types::ObservationTable;

pub const SYSTEM_PROMPT: &str = "You are an AI that helps analyze datasets for cost optimization.";

const TABLE_SLOT: &str = "{table}";

pub const ANALYSIS_PROMPT: &str = r#"Analyze the following dataset and suggest ways to optimize energy costs using an energy-management platform.
Don't complain about any lack of data, just use what you have. Quote numbers from the dataset as much as you can, with examples where possible.
Write it as a short pitch for the platform's services.
Draw on the following capabilities where relevant (there is no need to cite all of them):

1. Built for mission-critical sites where availability comes first: redundancy, failover and the ability to scale across many sites and devices.
2. Language-model assisted monitoring, anomaly detection and predictive maintenance, so operators act before downtime happens.
3. Designed by people who know energy markets and industrial operations, with controls that follow grid conditions to keep costs down without hurting performance.
4. Round-the-clock support, guided onboarding and training.
5. Integration with data-center infrastructure management tools for temperature strategies that protect quality of service and cut emissions.
6. Orchestration of multiple energy sources to improve economics and reduce carbon for sites that depend on more than one supply.
7. Demand-response participation and peak avoidance driven by real-time data from thousands of grid nodes.
8. Day-ahead market trading of energy and ancillary services.

{table}
"#;

/// The analysis request for one table. Built per run, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPrompt {
    table_text: String,
}

impl AnalysisPrompt {
    pub fn from_table(table: &ObservationTable) -> Self {
        AnalysisPrompt {
            table_text: table_text(table),
        }
    }

    pub fn render(&self) -> String {
        ANALYSIS_PROMPT.replacen(TABLE_SLOT, &self.table_text, 1)
    }
}
