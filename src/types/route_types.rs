use std::collections::BTreeMap;

/// Facet id -> selected option values. Ordered so requests are reproducible.
pub type FacetSelection = BTreeMap<String, Vec<String>>;

/// A data category listed by the statistics API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteSummary {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frequency {
    pub id: String,
    pub description: String,
}

impl Frequency {
    /// `monthly` -> `Monthly`
    pub fn label(&self) -> String {
        let mut chars = self.id.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facet {
    pub id: String,
    pub description: String,
}

/// One selectable value of a facet, in the order the API listed it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataField {
    pub id: String,
    pub label: String,
    pub units: Option<String>,
}

/// Full metadata for one route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteDetails {
    pub id: String,
    pub name: String,
    pub description: String,
    pub frequencies: Vec<Frequency>,
    pub default_frequency: Option<String>,
    pub facets: Vec<Facet>,
    pub data_fields: Vec<DataField>,
}

impl RouteDetails {
    /// The route's advertised default when it is one of its frequencies,
    /// otherwise the first frequency.
    pub fn preferred_frequency(&self) -> Option<&Frequency> {
        self.default_frequency
            .as_deref()
            .and_then(|wanted| {
                self.frequencies
                    .iter()
                    .find(|f| f.id.eq_ignore_ascii_case(wanted))
            })
            .or_else(|| self.frequencies.first())
    }
}
