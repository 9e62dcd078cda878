use std::collections::HashMap;

use bevy::log;
use thiserror::Error;

use super::jobs::{FacetSetup, Job, JobKind, JobOutcome, RouteSetup};
use crate::eia::{PeriodQuery, TableQuery, probe_field};
use crate::llm::{AnalysisPrompt, CancelToken};
use crate::types::{
    AnalysisResult, DataField, Facet, FacetOption, FacetSelection, Fetched, Frequency,
    ObservationTable, Period, RouteDetails, RouteSummary, default_bounds,
};

/// Facet that gets an "all values" default instead of its first option.
const SECTOR_FACET: &str = "sectorid";
const ALL_SECTORS: &str = "ALL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    RouteConfigured,
    DataLoaded,
    AnalysisComplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Select a data route first.")]
    NoRoute,
    #[error("This route offers no frequency to fetch.")]
    NoFrequency,
    #[error("Select at least one data field.")]
    NoFields,
    #[error("Start Date must be earlier than End Date.")]
    InvertedRange,
    #[error("Fetch data before running the analysis.")]
    NoTable,
}

/// Marks a queued job. Outcomes whose ticket is no longer the one the
/// session waits for are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    serial: u64,
}

#[derive(Debug, Clone)]
pub struct JobRequest {
    pub ticket: Ticket,
    pub job: Job,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacetControl {
    pub facet: Facet,
    pub options: Vec<FacetOption>,
    pub selected: String,
}

impl FacetControl {
    pub fn selected_label(&self) -> &str {
        self.options
            .iter()
            .find(|o| o.value == self.selected)
            .map(|o| o.label.as_str())
            .unwrap_or(self.selected.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldToggle {
    pub field: DataField,
    pub selected: bool,
}

/// The option a facet control starts on: `ALL` for the sector facet when
/// offered, otherwise the first option.
pub fn default_option<'a>(facet_id: &str, options: &'a [FacetOption]) -> Option<&'a FacetOption> {
    if facet_id == SECTOR_FACET {
        if let Some(all) = options.iter().find(|o| o.value == ALL_SECTORS) {
            return Some(all);
        }
    }
    options.first()
}

/// Selection state behind the form. User actions go through its methods,
/// which return the remote work to queue; outcomes come back via
/// [`FormSession::apply`].
#[derive(Debug, Clone, Default)]
pub struct FormSession {
    pub stage: Stage,
    pub routes: Vec<RouteSummary>,
    pub route: Option<RouteDetails>,
    pub frequency: Option<String>,
    pub facets: Vec<FacetControl>,
    /// Facets left out because the API listed no options for them.
    pub skipped_facets: Vec<String>,
    pub fields: Vec<FieldToggle>,
    pub periods: Vec<Period>,
    pub start: Option<Period>,
    pub end: Option<Period>,
    pub table: Option<ObservationTable>,
    pub analysis: Option<AnalysisResult>,
    /// Inline message for the user: validation problems, empty results,
    /// failed calls.
    pub notice: Option<String>,
    max_rows: usize,
    route_limit: Option<usize>,
    generation: u64,
    serial: u64,
    awaiting: HashMap<JobKind, u64>,
    cancel: Option<CancelToken>,
}

impl FormSession {
    pub fn new(max_rows: usize, route_limit: Option<usize>) -> Self {
        FormSession {
            max_rows,
            route_limit,
            ..Default::default()
        }
    }

    fn issue(&mut self, job: Job) -> JobRequest {
        self.serial += 1;
        self.awaiting.insert(job.kind(), self.serial);
        JobRequest {
            ticket: Ticket {
                generation: self.generation,
                serial: self.serial,
            },
            job,
        }
    }

    pub fn is_busy(&self, kind: JobKind) -> bool {
        self.awaiting.contains_key(&kind)
    }

    pub fn any_busy(&self) -> bool {
        !self.awaiting.is_empty()
    }

    pub fn frequency_enabled(&self) -> bool {
        self.route
            .as_ref()
            .is_some_and(|route| !route.frequencies.is_empty())
    }

    pub fn frequencies(&self) -> &[Frequency] {
        self.route
            .as_ref()
            .map(|r| r.frequencies.as_slice())
            .unwrap_or_default()
    }

    pub fn selected_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.selected)
            .map(|f| f.field.id.clone())
            .collect()
    }

    pub fn facet_selection(&self) -> FacetSelection {
        self.facets
            .iter()
            .map(|c| (c.facet.id.clone(), vec![c.selected.clone()]))
            .collect()
    }

    pub fn load_routes(&mut self) -> JobRequest {
        self.issue(Job::ListRoutes)
    }

    /// Starts over on a new route. Anything still in flight for the previous
    /// route is ignored when it lands.
    pub fn choose_route(&mut self, route_id: &str) -> JobRequest {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.generation += 1;
        self.awaiting.retain(|kind, _| *kind == JobKind::Routes);

        self.stage = Stage::Idle;
        self.route = None;
        self.frequency = None;
        self.facets.clear();
        self.skipped_facets.clear();
        self.fields.clear();
        self.periods.clear();
        self.start = None;
        self.end = None;
        self.table = None;
        self.analysis = None;
        self.notice = None;

        log::info!("Configuring route `{route_id}`");
        self.issue(Job::ConfigureRoute {
            route_id: route_id.to_string(),
        })
    }

    pub fn change_frequency(&mut self, frequency: &str) -> Option<JobRequest> {
        if self.frequency.as_deref() == Some(frequency) {
            return None;
        }
        self.frequency = Some(frequency.to_string());
        self.refresh_periods()
    }

    pub fn change_facet(&mut self, facet_id: &str, value: &str) -> Option<JobRequest> {
        let control = self.facets.iter_mut().find(|c| c.facet.id == facet_id)?;
        if control.selected == value {
            return None;
        }
        control.selected = value.to_string();
        self.refresh_periods()
    }

    pub fn toggle_field(&mut self, field_id: &str, selected: bool) {
        if let Some(toggle) = self.fields.iter_mut().find(|f| f.field.id == field_id) {
            toggle.selected = selected;
        }
    }

    fn refresh_periods(&mut self) -> Option<JobRequest> {
        let route = self.route.as_ref()?;
        let frequency = self.frequency.clone()?;
        let query = PeriodQuery {
            route_id: route.id.clone(),
            frequency,
            facets: self.facet_selection(),
            probe_field: probe_field(self.fields.iter().map(|f| f.field.id.as_str())),
        };
        Some(self.issue(Job::RefreshPeriods(query)))
    }

    fn validate_fetch(&self) -> Result<TableQuery, ValidationError> {
        let route = self.route.as_ref().ok_or(ValidationError::NoRoute)?;
        let frequency = self.frequency.clone().ok_or(ValidationError::NoFrequency)?;
        let fields = self.selected_fields();
        if fields.is_empty() {
            return Err(ValidationError::NoFields);
        }
        if let (Some(start), Some(end)) = (&self.start, &self.end) {
            if start > end {
                return Err(ValidationError::InvertedRange);
            }
        }
        Ok(TableQuery {
            route_id: route.id.clone(),
            frequency,
            facets: self.facet_selection(),
            fields,
            start: self.start.clone(),
            end: self.end.clone(),
            max_rows: Some(self.max_rows),
        })
    }

    /// Validates the selection and queues the data fetch. A rejected
    /// selection leaves the stage and any loaded table as they were.
    pub fn request_fetch(&mut self) -> Result<JobRequest, ValidationError> {
        match self.validate_fetch() {
            Ok(query) => {
                self.notice = None;
                Ok(self.issue(Job::FetchTable(query)))
            }
            Err(e) => {
                self.notice = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn request_analysis(&mut self) -> Result<JobRequest, ValidationError> {
        let Some(table) = self.table.as_ref().filter(|t| !t.is_empty()) else {
            self.notice = Some(ValidationError::NoTable.to_string());
            return Err(ValidationError::NoTable);
        };
        let prompt = AnalysisPrompt::from_table(table).render();

        let cancel = CancelToken::new();
        self.cancel = Some(cancel.clone());
        self.notice = None;
        Ok(self.issue(Job::Analyze { prompt, cancel }))
    }

    pub fn cancel_analysis(&mut self) {
        if let Some(cancel) = &self.cancel {
            log::info!("Cancelling analysis");
            cancel.cancel();
        }
    }

    /// Applies a finished job. Returns `false` when the outcome was stale
    /// and dropped.
    pub fn apply(&mut self, ticket: Ticket, kind: JobKind, outcome: JobOutcome) -> bool {
        // The route listing does not depend on which route is chosen.
        let current = kind == JobKind::Routes || ticket.generation == self.generation;
        if !current || self.awaiting.get(&kind) != Some(&ticket.serial) {
            log::debug!("Dropping stale {kind:?} outcome");
            return false;
        }
        self.awaiting.remove(&kind);

        match outcome {
            JobOutcome::Routes(routes) => self.apply_routes(routes),
            JobOutcome::Configured(setup) => self.apply_setup(setup),
            JobOutcome::Periods(periods) => self.apply_periods(periods),
            JobOutcome::Table(table) => self.apply_table(table),
            JobOutcome::Analysis(result) => {
                self.cancel = None;
                self.analysis = Some(result);
                self.stage = Stage::AnalysisComplete;
            }
        }
        true
    }

    fn apply_routes(&mut self, routes: Fetched<Vec<RouteSummary>>) {
        match routes {
            Fetched::Ready(mut routes) => {
                if let Some(limit) = self.route_limit {
                    routes.truncate(limit);
                }
                self.routes = routes;
            }
            Fetched::Empty => {
                self.routes.clear();
                self.notice = Some("No data routes are available.".to_string());
            }
            Fetched::Failed(e) => {
                self.routes.clear();
                self.notice = Some(format!("Could not load data routes: {e}"));
            }
        }
    }

    fn apply_setup(&mut self, setup: Fetched<RouteSetup>) {
        let setup = match setup {
            Fetched::Ready(setup) => setup,
            Fetched::Empty => {
                self.notice = Some("That route does not exist.".to_string());
                return;
            }
            Fetched::Failed(e) => {
                self.notice = Some(format!("Could not load route details: {e}"));
                return;
            }
        };

        self.frequency = setup.details.preferred_frequency().map(|f| f.id.clone());
        for FacetSetup { facet, options } in setup.facets {
            let options = options.into_inner();
            match default_option(&facet.id, &options).map(|o| o.value.clone()) {
                Some(selected) => self.facets.push(FacetControl {
                    facet,
                    options,
                    selected,
                }),
                None => self.skipped_facets.push(facet.id),
            }
        }
        self.fields = setup
            .fields
            .into_iter()
            .map(|field| FieldToggle {
                field,
                selected: false,
            })
            .collect();
        self.route = Some(setup.details);
        self.stage = Stage::RouteConfigured;
        self.apply_periods(setup.periods);
    }

    fn apply_periods(&mut self, periods: Fetched<Vec<Period>>) {
        match periods {
            Fetched::Ready(periods) => {
                let bounds = default_bounds(&periods);
                self.start = bounds.as_ref().map(|(start, _)| start.clone());
                self.end = bounds.map(|(_, end)| end);
                self.periods = periods;
            }
            other => {
                self.periods.clear();
                self.start = None;
                self.end = None;
                if let Some(e) = other.error() {
                    self.notice = Some(format!("Could not load available dates: {e}"));
                } else if self.frequency_enabled() {
                    self.notice = Some("No dates are available for this selection.".to_string());
                }
            }
        }
    }

    fn apply_table(&mut self, table: Fetched<ObservationTable>) {
        match table {
            Fetched::Ready(mut table) => {
                table.sort_by_period_desc();
                log::info!("Loaded {} rows", table.len());
                // An analysis still running describes the table being replaced.
                if let Some(cancel) = self.cancel.take() {
                    cancel.cancel();
                }
                self.awaiting.remove(&JobKind::Analyze);
                self.table = Some(table);
                self.analysis = None;
                self.stage = Stage::DataLoaded;
            }
            Fetched::Empty => self.notice = Some("No data returned.".to_string()),
            Fetched::Failed(e) => self.notice = Some(format!("Data request failed: {e}")),
        }
    }
}
