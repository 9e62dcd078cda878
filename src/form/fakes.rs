//! In-memory stand-ins for the remote clients.

use std::sync::Mutex;

use serde_json::{Map, Value, json};

use crate::eia::{DataSource, PeriodQuery, TableQuery};
use crate::llm::{Analyst, CancelToken};
use crate::types::{
    AnalysisResult, DataField, Facet, FacetOption, Fetched, Frequency, ObservationTable, Period,
    RouteDetails, RouteSummary,
};

/// A single `retail-sales` route with monthly data, one row per period.
pub struct FakeSource {
    details: RouteDetails,
    periods: Vec<Period>,
    empty_facet: Option<String>,
    rows: bool,
    period_queries: Mutex<Vec<PeriodQuery>>,
    table_queries: Mutex<Vec<TableQuery>>,
}

fn option(label: &str, value: &str) -> FacetOption {
    FacetOption {
        label: format!("{label} ({value})"),
        value: value.to_string(),
    }
}

impl FakeSource {
    /// `months` consecutive monthly periods: from 2024-01 when there are at
    /// most twelve, otherwise ending at 2024-12.
    pub fn retail_sales(months: u32) -> Self {
        let first = if months <= 12 { 2024 * 12 } else { 2024 * 12 + 12 - months };
        let periods = (first..first + months)
            .map(|m| Period::new(format!("{}-{:02}", m / 12, m % 12 + 1)))
            .collect();

        let field = |id: &str, label: &str| DataField {
            id: id.to_string(),
            label: label.to_string(),
            units: None,
        };
        FakeSource {
            details: RouteDetails {
                id: "retail-sales".into(),
                name: "Electricity Sales to Ultimate Customers".into(),
                frequencies: vec![
                    Frequency {
                        id: "monthly".into(),
                        ..Default::default()
                    },
                    Frequency {
                        id: "annual".into(),
                        ..Default::default()
                    },
                ],
                default_frequency: Some("monthly".into()),
                facets: vec![
                    Facet {
                        id: "stateid".into(),
                        description: "State / Census Region".into(),
                    },
                    Facet {
                        id: "sectorid".into(),
                        description: "Sector".into(),
                    },
                ],
                data_fields: vec![field("revenue", "Revenue"), field("price", "Average Price")],
                ..Default::default()
            },
            periods,
            empty_facet: None,
            rows: true,
            period_queries: Mutex::new(Vec::new()),
            table_queries: Mutex::new(Vec::new()),
        }
    }

    pub fn without_frequencies(mut self) -> Self {
        self.details.frequencies.clear();
        self.details.default_frequency = None;
        self
    }

    pub fn with_empty_facet(mut self, facet_id: &str) -> Self {
        self.empty_facet = Some(facet_id.to_string());
        self
    }

    pub fn without_rows(mut self) -> Self {
        self.rows = false;
        self
    }

    pub fn last_period_query(&self) -> Option<PeriodQuery> {
        self.period_queries.lock().ok()?.last().cloned()
    }

    pub fn fetch_calls(&self) -> usize {
        self.table_queries.lock().map(|q| q.len()).unwrap_or_default()
    }
}

impl DataSource for FakeSource {
    fn list_routes(&self) -> Fetched<Vec<RouteSummary>> {
        Fetched::Ready(vec![
            RouteSummary {
                id: "retail-sales".into(),
                name: self.details.name.clone(),
                description: String::new(),
            },
            RouteSummary {
                id: "rto".into(),
                name: "Electric Power Operations (Daily and Hourly)".into(),
                description: String::new(),
            },
        ])
    }

    fn route_details(&self, route_id: &str) -> Fetched<RouteDetails> {
        if route_id == self.details.id {
            Fetched::Ready(self.details.clone())
        } else {
            Fetched::Empty
        }
    }

    fn facet_options(&self, _route_id: &str, facet_id: &str) -> Fetched<Vec<FacetOption>> {
        if self.empty_facet.as_deref() == Some(facet_id) {
            return Fetched::Empty;
        }
        match facet_id {
            "stateid" => Fetched::Ready(vec![option("Alaska", "AK"), option("California", "CA")]),
            "sectorid" => Fetched::Ready(vec![
                option("Commercial", "COM"),
                option("All Sectors", "ALL"),
                option("Residential", "RES"),
            ]),
            _ => Fetched::Empty,
        }
    }

    fn available_periods(&self, query: &PeriodQuery) -> Fetched<Vec<Period>> {
        if let Ok(mut queries) = self.period_queries.lock() {
            queries.push(query.clone());
        }
        Fetched::Ready(self.periods.clone())
    }

    fn fetch_table(&self, query: &TableQuery) -> Fetched<ObservationTable> {
        if let Ok(mut queries) = self.table_queries.lock() {
            queries.push(query.clone());
        }
        if !self.rows {
            return Fetched::Empty;
        }

        // Rows come back oldest first; ordering is the caller's job.
        let records: Vec<Map<String, Value>> = self
            .periods
            .iter()
            .filter(|p| query.start.as_ref().is_none_or(|s| *p >= s))
            .filter(|p| query.end.as_ref().is_none_or(|e| *p <= e))
            .enumerate()
            .filter_map(|(i, period)| {
                let mut record = json!({"period": period.as_str(), "stateid": "CA", "sectorid": "ALL"});
                for field in &query.fields {
                    record[field.as_str()] = json!(10.0 + i as f64);
                }
                record.as_object().cloned()
            })
            .collect();
        if records.is_empty() {
            return Fetched::Empty;
        }
        Fetched::Ready(ObservationTable::from_records(&records))
    }
}

/// Answers every prompt with a fixed narrative.
pub struct CannedAnalyst;

impl Analyst for CannedAnalyst {
    fn analyze(&self, prompt: &str, _cancel: &CancelToken) -> AnalysisResult {
        AnalysisResult::Narrative(format!("Read {} characters of data.", prompt.len()))
    }
}
