use std::collections::BTreeSet;

use bevy::log;
use serde_json::Value;

use super::eia_types::{
    FacetValueWire, RouteDetailsWire, RouteWire, member, records_of, response_of, total_of,
};
use super::{DataSource, EiaClient, PeriodQuery, TableQuery};
use crate::types::{
    FacetOption, FetchError, Fetched, ObservationTable, PERIOD_COLUMN, Period, RouteDetails,
    RouteSummary,
};

/// Largest `length` the data endpoint accepts in one request.
pub const MAX_PAGE_ROWS: u64 = 5000;

impl EiaClient {
    /// GETs `url` and returns the decoded body. Non-2xx answers are failures.
    fn get_body(&self, url: &str, mut params: Vec<(String, String)>) -> Result<Value, FetchError> {
        if !params.iter().any(|(k, _)| k == "api_key") {
            params.insert(0, ("api_key".to_string(), self.api_key.clone()));
        }
        let reply = self.transport.get(url, &params)?;
        if !reply.is_success() {
            return Err(FetchError::Status(reply.status));
        }
        reply.json()
    }

    fn data_url(&self, route_id: &str) -> String {
        format!("{}{}/data/", self.url, route_id)
    }

    fn routes(&self) -> Result<Vec<RouteSummary>, FetchError> {
        let body = self.get_body(&self.url, Vec::new())?;
        let routes = member(response_of(&body)?, "routes")?;
        let routes: Vec<RouteWire> = serde_json::from_value(routes.clone())?;
        Ok(routes.into_iter().map(RouteSummary::from).collect())
    }

    fn facet_values(&self, route_id: &str, facet_id: &str) -> Result<Vec<FacetOption>, FetchError> {
        let url = format!("{}{}/facet/{}", self.url, route_id, facet_id);
        let body = self.get_body(&url, Vec::new())?;
        let facets = member(response_of(&body)?, "facets")?;
        let values: Vec<FacetValueWire> = serde_json::from_value(facets.clone())?;
        Ok(values.into_iter().map(FacetOption::from).collect())
    }

    fn periods(&self, query: &PeriodQuery) -> Result<Vec<Period>, FetchError> {
        let url = self.data_url(&query.route_id);

        // The data endpoint has no "everything" length, so count first.
        let body = self.get_body(&url, query.params(&self.api_key, 0, 1))?;
        let total = total_of(response_of(&body)?)?;
        log::debug!("{} rows carry periods for {}", total, query.route_id);

        let mut periods = BTreeSet::new();
        let mut offset = 0;
        while offset < total {
            let length = (total - offset).min(MAX_PAGE_ROWS);
            let body = self.get_body(&url, query.params(&self.api_key, offset, length))?;
            let records = records_of(response_of(&body)?)?;
            if records.is_empty() {
                break;
            }
            for record in &records {
                match record.get(PERIOD_COLUMN) {
                    Some(Value::String(s)) => {
                        periods.insert(Period::new(s));
                    }
                    Some(Value::Number(n)) => {
                        periods.insert(Period::new(n));
                    }
                    _ => {}
                }
            }
            offset += length;
        }
        Ok(periods.into_iter().collect())
    }

    fn table(&self, query: &TableQuery) -> Result<ObservationTable, FetchError> {
        let params = query.params(&self.api_key)?;
        let body = self.get_body(&self.data_url(&query.route_id), params)?;
        let records = records_of(response_of(&body)?)?;
        Ok(ObservationTable::from_records(&records))
    }
}

fn logged<T>(what: &str, fetched: Fetched<T>) -> Fetched<T> {
    if let Fetched::Failed(e) = &fetched {
        log::warn!("{what}: {e}");
    }
    fetched
}

impl DataSource for EiaClient {
    fn list_routes(&self) -> Fetched<Vec<RouteSummary>> {
        logged("listing routes", self.routes().into())
    }

    fn route_details(&self, route_id: &str) -> Fetched<RouteDetails> {
        let url = format!("{}{}/", self.url, route_id);
        let result = self.get_body(&url, Vec::new()).and_then(|body| {
            let response = response_of(&body)?;
            let wire: RouteDetailsWire = serde_json::from_value(response.clone())?;
            Ok(wire.into_details(route_id))
        });
        match result {
            Ok(details) => Fetched::Ready(details),
            // An unknown route is absent, not broken.
            Err(FetchError::Status(404)) => Fetched::Empty,
            Err(e) => logged(&format!("details for route `{route_id}`"), Fetched::Failed(e)),
        }
    }

    fn facet_options(&self, route_id: &str, facet_id: &str) -> Fetched<Vec<FacetOption>> {
        logged(
            &format!("options for facet `{facet_id}` of `{route_id}`"),
            self.facet_values(route_id, facet_id).into(),
        )
    }

    fn available_periods(&self, query: &PeriodQuery) -> Fetched<Vec<Period>> {
        logged(
            &format!("periods for route `{}`", query.route_id),
            self.periods(query).into(),
        )
    }

    fn fetch_table(&self, query: &TableQuery) -> Fetched<ObservationTable> {
        logged(
            &format!("data for route `{}`", query.route_id),
            self.table(query).into(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::http::testing::ScriptedTransport;
    use crate::types::FacetSelection;

    fn client(transport: &Arc<ScriptedTransport>) -> EiaClient {
        EiaClient::new("https://example.test/v2/electricity", "KEY", transport.clone())
    }

    #[test]
    fn lists_routes_from_the_envelope() {
        let transport = Arc::new(ScriptedTransport::new().reply(
            200,
            json!({"response": {"routes": [
                {"id": "retail-sales", "name": "Electricity Sales to Ultimate Customers", "description": "..."},
                {"id": "electric-power-operational-data", "name": "Electric Power Operations"}
            ]}}),
        ));
        let routes = client(&transport).list_routes().into_inner();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].id, "retail-sales");

        let sent = transport.sent();
        assert_eq!(sent[0].url, "https://example.test/v2/electricity/");
        assert_eq!(sent[0].param("api_key"), Some("KEY"));
    }

    #[test]
    fn route_listing_failures_are_tagged() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .fail(FetchError::Transport("connection refused".into()))
                .reply(200, json!({"unexpected": true})),
        );
        let c = client(&transport);
        assert!(matches!(c.list_routes(), Fetched::Failed(FetchError::Transport(_))));
        assert_eq!(c.list_routes(), Fetched::Failed(FetchError::Shape("response")));
    }

    #[test]
    fn unknown_route_is_absent() {
        let transport = Arc::new(ScriptedTransport::new().reply(404, json!({"error": "not found"})));
        assert_eq!(client(&transport).route_details("nope"), Fetched::Empty);
    }

    #[test]
    fn data_fields_come_from_route_details() {
        let transport = Arc::new(ScriptedTransport::new().reply(
            200,
            json!({"response": {
                "id": "retail-sales",
                "frequency": [{"id": "monthly"}, {"id": "annual"}],
                "defaultFrequency": "annual",
                "facets": [{"id": "stateid", "description": "State / Census Region"}],
                "data": {"price": {"alias": "Average Price"}, "revenue": {"alias": "Revenue"}}
            }}),
        ));
        let fields = client(&transport).data_fields("retail-sales").into_inner();
        let labels: Vec<_> = fields.iter().map(|f| (f.label.as_str(), f.id.as_str())).collect();
        assert_eq!(labels, vec![("Average Price", "price"), ("Revenue", "revenue")]);
        assert_eq!(transport.sent()[0].url, "https://example.test/v2/electricity/retail-sales/");
    }

    #[test]
    fn data_fields_are_empty_when_details_are_absent() {
        let transport = Arc::new(ScriptedTransport::new().reply(404, json!({})));
        assert_eq!(client(&transport).data_fields("retail-sales"), Fetched::Empty);
    }

    #[test]
    fn facet_options_keep_remote_order() {
        let transport = Arc::new(ScriptedTransport::new().reply(
            200,
            json!({"response": {"totalFacets": 3, "facets": [
                {"id": "TX", "name": "Texas"},
                {"id": "CA", "name": "California"},
                {"id": "AK", "name": "Alaska"}
            ]}}),
        ));
        let options = client(&transport).facet_options("retail-sales", "stateid").into_inner();
        let values: Vec<_> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["TX", "CA", "AK"]);
        assert_eq!(
            transport.sent()[0].url,
            "https://example.test/v2/electricity/retail-sales/facet/stateid"
        );
    }

    #[test]
    fn periods_are_counted_then_fetched_sorted_and_unique() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(200, json!({"response": {"total": "5", "data": [{"period": "2024-03"}]}}))
                .reply(
                    200,
                    json!({"response": {"total": "5", "data": [
                        {"period": "2024-03", "sectorid": "ALL"},
                        {"period": "2024-01", "sectorid": "ALL"},
                        {"period": "2024-02", "sectorid": "RES"},
                        {"period": "2024-01", "sectorid": "RES"},
                        {"period": "2024-02", "sectorid": "ALL"}
                    ]}}),
                ),
        );
        let mut facets = FacetSelection::new();
        facets.insert("stateid".into(), vec!["CA".into()]);
        let query = PeriodQuery {
            route_id: "retail-sales".into(),
            frequency: "Monthly".into(),
            facets,
            probe_field: Some("revenue".into()),
        };
        let periods = client(&transport).available_periods(&query).into_inner();
        let periods: Vec<_> = periods.iter().map(Period::as_str).collect();
        assert_eq!(periods, vec!["2024-01", "2024-02", "2024-03"]);

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].param("length"), Some("1"));
        assert_eq!(sent[1].param("length"), Some("5"));
        assert_eq!(sent[1].param("frequency"), Some("monthly"));
        assert_eq!(sent[1].param("facets[stateid][]"), Some("CA"));
        assert_eq!(sent[1].param("data[0]"), Some("revenue"));
    }

    #[test]
    fn large_period_sets_are_paged() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(200, json!({"response": {"total": 7000, "data": []}}))
                .reply(200, json!({"response": {"data": [{"period": "2023-12"}]}}))
                .reply(200, json!({"response": {"data": [{"period": "2023-11"}]}})),
        );
        let query = PeriodQuery {
            route_id: "retail-sales".into(),
            frequency: "monthly".into(),
            ..Default::default()
        };
        let periods = client(&transport).available_periods(&query).into_inner();
        assert_eq!(periods, vec![Period::from("2023-11"), Period::from("2023-12")]);
        let sent = transport.sent();
        assert_eq!(sent[1].param("offset"), Some("0"));
        assert_eq!(sent[1].param("length"), Some("5000"));
        assert_eq!(sent[2].param("offset"), Some("5000"));
        assert_eq!(sent[2].param("length"), Some("2000"));
    }

    #[test]
    fn zero_total_skips_the_second_request() {
        let transport = Arc::new(
            ScriptedTransport::new().reply(200, json!({"response": {"total": 0, "data": []}})),
        );
        let query = PeriodQuery::default();
        assert_eq!(client(&transport).available_periods(&query), Fetched::Empty);
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn failed_count_yields_no_periods() {
        let transport = Arc::new(ScriptedTransport::new().reply(500, json!({})));
        let fetched = client(&transport).available_periods(&PeriodQuery::default());
        assert_eq!(fetched, Fetched::Failed(FetchError::Status(500)));
        assert!(fetched.into_inner().is_empty());
    }

    #[test]
    fn empty_field_selection_never_reaches_the_network() {
        let transport = Arc::new(ScriptedTransport::new());
        let query = TableQuery {
            route_id: "retail-sales".into(),
            frequency: "monthly".into(),
            ..Default::default()
        };
        let fetched = client(&transport).fetch_table(&query);
        assert!(matches!(fetched, Fetched::Failed(FetchError::InvalidInput(_))));
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn fetch_table_decodes_rows() {
        let transport = Arc::new(ScriptedTransport::new().reply(
            200,
            json!({"response": {"total": "2", "data": [
                {"period": "2024-06", "stateid": "CA", "sectorid": "ALL", "price": "22.1", "revenue": "4100.5"},
                {"period": "2024-05", "stateid": "CA", "sectorid": "ALL", "price": "21.7", "revenue": "3900.2"}
            ]}}),
        ));
        let query = TableQuery {
            route_id: "retail-sales".into(),
            frequency: "monthly".into(),
            fields: vec!["price".into(), "revenue".into()],
            max_rows: Some(10),
            ..Default::default()
        };
        let table = client(&transport).fetch_table(&query).into_inner();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns()[0], "period");
        assert_eq!(transport.sent()[0].url, "https://example.test/v2/electricity/retail-sales/data/");
    }

    #[test]
    fn fetch_table_with_no_rows_is_empty() {
        let transport = Arc::new(
            ScriptedTransport::new().reply(200, json!({"response": {"total": 0, "data": []}})),
        );
        let query = TableQuery {
            fields: vec!["price".into()],
            ..Default::default()
        };
        assert_eq!(client(&transport).fetch_table(&query), Fetched::Empty);
    }
}
