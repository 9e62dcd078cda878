use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bevy::prelude::*;
use bevy_egui::{
    EguiContexts,
    egui::{self, Align2, Color32, RichText},
};
use thiserror::Error;

use crate::eia::{DEFAULT_EIA_URL, EiaClient};
use crate::form::JobContext;
use crate::http::{Transport, UreqTransport};
use crate::llm::{
    DEFAULT_HF_URL, DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_URL, InferenceClient, Provider,
    RetryPolicy,
};
use crate::present::DEFAULT_PREVIEW_ROWS;

/// Files read before the process environment is consulted. Values already
/// set in the environment win.
const ENV_FILES: [&str; 2] = ["api.env", ".env"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{key} should be {expected}, got `{value}`")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    Eia,
    OpenAi,
    HuggingFace,
}

impl CredentialKind {
    pub fn label(&self) -> &'static str {
        match self {
            CredentialKind::Eia => "EIA API key",
            CredentialKind::OpenAi => "OpenAI API key",
            CredentialKind::HuggingFace => "Hugging Face API key",
        }
    }

    /// Environment variables checked in order.
    fn env_keys(&self) -> &'static [&'static str] {
        match self {
            CredentialKind::Eia => &["EIA_API_KEY"],
            CredentialKind::OpenAi => &["CHAT_GPT_API_KEY", "OPENAI_API_KEY"],
            CredentialKind::HuggingFace => &["HF_API_KEY", "HUGGINGFACE_API_KEY"],
        }
    }
}

#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    keys: HashMap<CredentialKind, String>,
}

impl Credentials {
    pub fn get(&self, kind: CredentialKind) -> Option<&str> {
        self.keys.get(&kind).map(String::as_str)
    }

    /// Blank values are treated as absent.
    pub fn set(&mut self, kind: CredentialKind, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.keys.remove(&kind);
        } else {
            self.keys.insert(kind, value.to_string());
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set: Vec<&str> = self.keys.keys().map(|k| k.label()).collect();
        set.sort_unstable();
        f.debug_struct("Credentials").field("set", &set).finish()
    }
}

/// Runtime configuration, read once at startup.
#[derive(Resource, Debug, Clone)]
pub struct Settings {
    pub eia_url: String,
    pub provider: Provider,
    pub http_timeout: Duration,
    pub preview_rows: usize,
    pub max_fetch_rows: usize,
    pub retry: RetryPolicy,
    pub route_limit: Option<usize>,
    pub credentials: Credentials,
    /// Values that could not be parsed and fell back to their defaults.
    pub warnings: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            eia_url: DEFAULT_EIA_URL.to_string(),
            provider: Provider::openai(),
            http_timeout: Duration::from_secs(30),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            max_fetch_rows: 10,
            retry: RetryPolicy::default(),
            route_limit: None,
            credentials: Credentials::default(),
            warnings: Vec::new(),
        }
    }
}

/// The preview shows either five or ten rows.
pub fn clamp_preview_rows(rows: usize) -> usize {
    if rows <= 5 { 5 } else { 10 }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                key,
                value,
                expected,
            }),
    }
}

fn or_warn<T>(warnings: &mut Vec<String>, parsed: Result<Option<T>, ConfigError>) -> Option<T> {
    parsed.unwrap_or_else(|e| {
        warnings.push(e.to_string());
        None
    })
}

/// Missing files are fine; the environment may carry everything.
fn load_env_file(path: impl AsRef<std::path::Path>) -> Result<(), dotenvy::Error> {
    match dotenvy::from_filename(path) {
        Err(e) if e.not_found() => Ok(()),
        other => other.map(|_| ()),
    }
}

impl Settings {
    pub fn from_env() -> Self {
        for file in ENV_FILES {
            if let Err(e) = load_env_file(file) {
                warn!("Could not read {file}: {e}");
            }
        }
        Settings::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Settings::default();
        let mut warnings = Vec::new();

        if let Some(url) = lookup("EIA_BASE_URL") {
            settings.eia_url = url;
        }

        let timeout: Option<u64> = or_warn(
            &mut warnings,
            parse(&lookup, "HTTP_TIMEOUT_SECS", "a number of seconds"),
        );
        if let Some(secs) = timeout {
            settings.http_timeout = Duration::from_secs(secs);
        }
        let preview: Option<usize> = or_warn(
            &mut warnings,
            parse(&lookup, "PREVIEW_ROWS", "5 or 10"),
        );
        if let Some(rows) = preview {
            settings.preview_rows = clamp_preview_rows(rows);
        }
        let max_rows: Option<usize> = or_warn(
            &mut warnings,
            parse(&lookup, "MAX_FETCH_ROWS", "a row count"),
        );
        if let Some(rows) = max_rows {
            settings.max_fetch_rows = rows.max(1);
        }
        let route_limit: Option<NonZeroUsize> = or_warn(
            &mut warnings,
            parse(&lookup, "MAX_ROUTES", "a positive route count"),
        );
        settings.route_limit = route_limit.map(NonZeroUsize::get);

        let attempts: Option<u32> = or_warn(
            &mut warnings,
            parse(&lookup, "RETRY_ATTEMPTS", "an attempt count"),
        );
        let interval: Option<u64> = or_warn(
            &mut warnings,
            parse(&lookup, "RETRY_INTERVAL_SECS", "a number of seconds"),
        );
        let mut retry = RetryPolicy::default();
        if let Some(secs) = interval {
            retry = retry.with_interval(Duration::from_secs(secs));
        }
        if let Some(attempts) = attempts {
            retry.max_attempts = attempts;
        }
        settings.retry = retry;

        let temperature: Option<f64> = or_warn(
            &mut warnings,
            parse(&lookup, "OPENAI_TEMPERATURE", "a number"),
        );
        settings.provider = match lookup("ANALYSIS_PROVIDER").map(|p| p.trim().to_lowercase()) {
            Some(p) if p == "huggingface" || p == "hf" => Provider::HuggingFace {
                url: lookup("HF_MODEL_URL").unwrap_or_else(|| DEFAULT_HF_URL.to_string()),
            },
            other => {
                if let Some(p) = other.filter(|p| p != "openai") {
                    warnings.push(format!(
                        "ANALYSIS_PROVIDER should be openai or huggingface, got `{p}`"
                    ));
                }
                Provider::OpenAiChat {
                    url: lookup("OPENAI_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
                    model: lookup("OPENAI_MODEL")
                        .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                    temperature: temperature.unwrap_or(0.7),
                }
            }
        };

        for kind in [CredentialKind::Eia, CredentialKind::OpenAi, CredentialKind::HuggingFace] {
            if let Some(value) = kind.env_keys().iter().find_map(|&key| lookup(key)) {
                settings.credentials.set(kind, &value);
            }
        }

        settings.warnings = warnings;
        settings
    }

    pub fn analysis_credential(&self) -> CredentialKind {
        match self.provider {
            Provider::OpenAiChat { .. } => CredentialKind::OpenAi,
            Provider::HuggingFace { .. } => CredentialKind::HuggingFace,
        }
    }

    /// Keys the active configuration needs but does not have.
    pub fn missing_credentials(&self) -> Vec<CredentialKind> {
        [CredentialKind::Eia, self.analysis_credential()]
            .into_iter()
            .filter(|kind| self.credentials.get(*kind).is_none())
            .collect()
    }

    pub fn is_ready(&self) -> bool {
        self.missing_credentials().is_empty()
    }

    /// Clients for the form's jobs, sharing one HTTP agent.
    pub fn job_context(&self) -> JobContext {
        let transport: Arc<dyn Transport> = Arc::new(UreqTransport::new(self.http_timeout));
        let source = EiaClient::new(
            &self.eia_url,
            self.credentials.get(CredentialKind::Eia).unwrap_or_default(),
            transport.clone(),
        );
        let analyst = InferenceClient::new(
            self.provider.clone(),
            self.credentials
                .get(self.analysis_credential())
                .map(str::to_string),
            transport,
        )
        .with_retry(self.retry.clone());
        JobContext {
            source: Arc::new(source),
            analyst: Arc::new(analyst),
        }
    }
}

/// Text typed into the credentials panel, not yet saved.
#[derive(Resource, Default)]
pub struct CredentialDrafts(HashMap<CredentialKind, String>);

pub struct SettingsPlugin;

impl Plugin for SettingsPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Settings::from_env())
            .init_resource::<CredentialDrafts>()
            .add_systems(Startup, report_settings)
            .add_systems(Update, credentials_ui);
    }
}

fn report_settings(settings: Res<Settings>) {
    for warning in &settings.warnings {
        warn!("{warning}; using the default");
    }
    info!(
        "Statistics API at {}, analysis via {}",
        settings.eia_url,
        settings.provider.name()
    );
    for kind in settings.missing_credentials() {
        info!("{} not configured; asking for it", kind.label());
    }
}

fn credentials_ui(
    mut contexts: EguiContexts,
    mut settings: ResMut<Settings>,
    mut drafts: ResMut<CredentialDrafts>,
) {
    let missing = settings.missing_credentials();
    if missing.is_empty() {
        return;
    }
    let ctx = contexts.ctx_mut();

    egui::Window::new("API Credentials")
        .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(
                RichText::new("These keys are needed before data can be loaded.")
                    .color(Color32::GRAY),
            );
            ui.add_space(6.0);
            for kind in &missing {
                ui.label(kind.label());
                let draft = drafts.0.entry(*kind).or_default();
                ui.add(
                    egui::TextEdit::singleline(draft)
                        .password(true)
                        .desired_width(320.0),
                );
            }
            ui.add_space(6.0);
            if ui.button("Save").clicked() {
                for kind in &missing {
                    if let Some(value) = drafts.0.remove(kind) {
                        settings.credentials.set(*kind, &value);
                    }
                }
                if settings.is_ready() {
                    info!("Credentials saved");
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_environment() {
        let s = settings(&[]);
        assert_eq!(s.eia_url, DEFAULT_EIA_URL);
        assert_eq!(s.provider, Provider::openai());
        assert_eq!(s.http_timeout, Duration::from_secs(30));
        assert_eq!(s.preview_rows, 10);
        assert_eq!(s.max_fetch_rows, 10);
        assert_eq!(s.retry, RetryPolicy::default());
        assert_eq!(
            s.missing_credentials(),
            vec![CredentialKind::Eia, CredentialKind::OpenAi]
        );
    }

    #[test]
    fn preview_rows_are_clamped() {
        assert_eq!(settings(&[("PREVIEW_ROWS", "3")]).preview_rows, 5);
        assert_eq!(settings(&[("PREVIEW_ROWS", "5")]).preview_rows, 5);
        assert_eq!(settings(&[("PREVIEW_ROWS", "50")]).preview_rows, 10);
    }

    #[test]
    fn bad_values_fall_back_with_a_warning() {
        let s = settings(&[("HTTP_TIMEOUT_SECS", "soon"), ("ANALYSIS_PROVIDER", "bard")]);
        assert_eq!(s.http_timeout, Duration::from_secs(30));
        assert_eq!(s.provider, Provider::openai());
        assert_eq!(s.warnings.len(), 2);
    }

    #[test]
    fn hugging_face_needs_its_own_key() {
        let s = settings(&[
            ("ANALYSIS_PROVIDER", "huggingface"),
            ("EIA_API_KEY", "eia"),
            ("OPENAI_API_KEY", "sk"),
        ]);
        assert_eq!(s.missing_credentials(), vec![CredentialKind::HuggingFace]);

        let s = settings(&[
            ("ANALYSIS_PROVIDER", "HuggingFace"),
            ("EIA_API_KEY", "eia"),
            ("HUGGINGFACE_API_KEY", "hf"),
        ]);
        assert!(s.is_ready());
        assert_eq!(s.provider.url(), DEFAULT_HF_URL);
    }

    #[test]
    fn retry_settings_shape_the_policy() {
        let s = settings(&[("RETRY_ATTEMPTS", "5"), ("RETRY_INTERVAL_SECS", "2")]);
        assert_eq!(s.retry.max_attempts, 5);
        assert_eq!(s.retry.loading_interval, Duration::from_secs(2));
        assert_eq!(s.retry.rate_limit_max, Duration::from_secs(8));
    }

    #[test]
    fn debug_output_hides_keys() {
        let s = settings(&[("EIA_API_KEY", "super-secret")]);
        assert!(!format!("{s:?}").contains("super-secret"));
    }

    #[test]
    fn blank_credentials_are_absent() {
        let mut credentials = Credentials::default();
        credentials.set(CredentialKind::Eia, "  ");
        assert_eq!(credentials.get(CredentialKind::Eia), None);
    }

    #[test]
    fn zero_route_limit_is_rejected() {
        let s = settings(&[("MAX_ROUTES", "0")]);
        assert_eq!(s.route_limit, None);
        assert_eq!(s.warnings.len(), 1);
        assert_eq!(settings(&[("MAX_ROUTES", "25")]).route_limit, Some(25));
    }

    #[test]
    fn env_files_report_errors_but_not_absence() {
        let dir = std::env::temp_dir();
        assert!(load_env_file(dir.join("energy-cost-advisor-missing.env")).is_ok());

        let broken = dir.join(format!("energy-cost-advisor-{}.env", std::process::id()));
        std::fs::write(&broken, "THIS LINE HAS NO EQUALS SIGN\n").unwrap();
        let result = load_env_file(&broken);
        std::fs::remove_file(&broken).unwrap();
        assert!(result.is_err());
    }
}
