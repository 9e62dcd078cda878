/// What one inference run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    Narrative(String),
    Failed(String),
}

impl AnalysisResult {
    pub fn failed(message: impl Into<String>) -> Self {
        AnalysisResult::Failed(message.into())
    }

    pub fn text(&self) -> &str {
        match self {
            AnalysisResult::Narrative(t) | AnalysisResult::Failed(t) => t,
        }
    }

    pub fn is_narrative(&self) -> bool {
        matches!(self, AnalysisResult::Narrative(_))
    }
}
