use bevy::log;

use crate::eia::{DataSource, PeriodQuery, TableQuery, probe_field};
use crate::llm::{Analyst, CancelToken};
use crate::types::{
    AnalysisResult, DataField, Facet, FacetOption, Fetched, ObservationTable, Period,
    RouteDetails, RouteSummary,
};

use super::session::default_option;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Routes,
    Configure,
    Periods,
    Fetch,
    Analyze,
}

/// A unit of remote work queued by the session.
#[derive(Debug, Clone)]
pub enum Job {
    ListRoutes,
    ConfigureRoute { route_id: String },
    RefreshPeriods(PeriodQuery),
    FetchTable(TableQuery),
    Analyze { prompt: String, cancel: CancelToken },
}

impl Job {
    pub fn kind(&self) -> JobKind {
        match self {
            Job::ListRoutes => JobKind::Routes,
            Job::ConfigureRoute { .. } => JobKind::Configure,
            Job::RefreshPeriods(_) => JobKind::Periods,
            Job::FetchTable(_) => JobKind::Fetch,
            Job::Analyze { .. } => JobKind::Analyze,
        }
    }
}

/// One facet of a configured route and the options the API offered for it.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetSetup {
    pub facet: Facet,
    pub options: Fetched<Vec<FacetOption>>,
}

/// Everything discovered when a route is chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSetup {
    pub details: RouteDetails,
    pub facets: Vec<FacetSetup>,
    pub fields: Vec<DataField>,
    pub periods: Fetched<Vec<Period>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Routes(Fetched<Vec<RouteSummary>>),
    Configured(Fetched<RouteSetup>),
    Periods(Fetched<Vec<Period>>),
    Table(Fetched<ObservationTable>),
    Analysis(AnalysisResult),
}

/// Runs a job to completion on the calling thread.
pub fn run_job(job: Job, source: &dyn DataSource, analyst: &dyn Analyst) -> JobOutcome {
    match job {
        Job::ListRoutes => JobOutcome::Routes(source.list_routes()),
        Job::ConfigureRoute { route_id } => JobOutcome::Configured(configure(source, &route_id)),
        Job::RefreshPeriods(query) => JobOutcome::Periods(source.available_periods(&query)),
        Job::FetchTable(query) => JobOutcome::Table(source.fetch_table(&query)),
        Job::Analyze { prompt, cancel } => JobOutcome::Analysis(analyst.analyze(&prompt, &cancel)),
    }
}

fn configure(source: &dyn DataSource, route_id: &str) -> Fetched<RouteSetup> {
    let details = match source.route_details(route_id) {
        Fetched::Ready(details) => details,
        Fetched::Empty => return Fetched::Empty,
        Fetched::Failed(e) => return Fetched::Failed(e),
    };

    let facets: Vec<FacetSetup> = details
        .facets
        .iter()
        .map(|facet| FacetSetup {
            facet: facet.clone(),
            options: source.facet_options(route_id, &facet.id),
        })
        .collect();

    let fields = details.data_fields.clone();

    // Periods for the defaults the form will start from.
    let periods = match details.preferred_frequency() {
        Some(frequency) => {
            let query = PeriodQuery {
                route_id: route_id.to_string(),
                frequency: frequency.id.clone(),
                facets: facets
                    .iter()
                    .filter_map(|setup| {
                        let Fetched::Ready(options) = &setup.options else {
                            return None;
                        };
                        default_option(&setup.facet.id, options)
                            .map(|option| (setup.facet.id.clone(), vec![option.value.clone()]))
                    })
                    .collect(),
                probe_field: probe_field(fields.iter().map(|f| f.id.as_str())),
            };
            source.available_periods(&query)
        }
        None => {
            log::info!("Route `{route_id}` offers no frequency; skipping period discovery");
            Fetched::Empty
        }
    };

    Fetched::Ready(RouteSetup {
        details,
        facets,
        fields,
        periods,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::fakes::{CannedAnalyst, FakeSource};

    #[test]
    fn configure_discovers_facets_fields_and_periods() {
        let source = FakeSource::retail_sales(6);
        let outcome = run_job(
            Job::ConfigureRoute {
                route_id: "retail-sales".into(),
            },
            &source,
            &CannedAnalyst,
        );
        let JobOutcome::Configured(Fetched::Ready(setup)) = outcome else {
            panic!("expected a configured route");
        };
        assert_eq!(setup.facets.len(), 2);
        assert_eq!(setup.fields.len(), 2);
        assert_eq!(setup.periods.clone().into_inner().len(), 6);

        let query = source.last_period_query().unwrap();
        assert_eq!(query.frequency, "monthly");
        assert_eq!(query.facets["sectorid"], vec!["ALL".to_string()]);
        assert_eq!(query.facets["stateid"], vec!["AK".to_string()]);
        assert_eq!(query.probe_field.as_deref(), Some("price"));
    }

    #[test]
    fn unknown_route_configures_to_empty() {
        let source = FakeSource::retail_sales(6);
        let outcome = run_job(
            Job::ConfigureRoute {
                route_id: "nope".into(),
            },
            &source,
            &CannedAnalyst,
        );
        assert_eq!(outcome, JobOutcome::Configured(Fetched::Empty));
    }

    #[test]
    fn route_without_frequencies_skips_period_discovery() {
        let source = FakeSource::retail_sales(6).without_frequencies();
        let outcome = run_job(
            Job::ConfigureRoute {
                route_id: "retail-sales".into(),
            },
            &source,
            &CannedAnalyst,
        );
        let JobOutcome::Configured(Fetched::Ready(setup)) = outcome else {
            panic!("expected a configured route");
        };
        assert_eq!(setup.periods, Fetched::Empty);
        assert!(source.last_period_query().is_none());
    }
}
