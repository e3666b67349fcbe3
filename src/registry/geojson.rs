//! GeoJSON wire types shared by the registry endpoints.
//!
//! Both the radius query and the per-commune files return a
//! `FeatureCollection` whose feature properties carry the DVF mutation
//! fields. Every field is optional on the wire.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{lenient_f64, PropertyType, TransactionRecord, TransactionType};

#[derive(Debug, Deserialize)]
pub struct FeatureCollection<P> {
    #[serde(default = "Vec::new")]
    pub features: Vec<Feature<P>>,
}

#[derive(Debug, Deserialize)]
pub struct Feature<P> {
    #[serde(default = "Option::default")]
    pub properties: Option<P>,
}

impl<P> FeatureCollection<P> {
    /// Properties of every feature that has them.
    pub fn into_properties(self) -> impl Iterator<Item = P> {
        self.features.into_iter().filter_map(|f| f.properties)
    }
}

/// DVF mutation fields as published.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MutationProperties {
    #[serde(default)]
    pub nature_mutation: Option<String>,
    #[serde(default)]
    pub type_local: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub valeur_fonciere: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub surface_reelle_bati: Option<f64>,
    #[serde(default)]
    pub date_mutation: Option<String>,
}

impl From<MutationProperties> for TransactionRecord {
    fn from(p: MutationProperties) -> Self {
        TransactionRecord {
            transaction_type: TransactionType::from_registry(p.nature_mutation.as_deref()),
            property_type: PropertyType::from_registry(p.type_local.as_deref()),
            price: p.valeur_fonciere,
            built_area: p.surface_reelle_bati,
            transaction_date: p.date_mutation.as_deref().and_then(parse_mutation_date),
        }
    }
}

/// Parse the `YYYY-MM-DD` prefix of a mutation date.
fn parse_mutation_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Decode a mutation collection body into records.
pub fn parse_mutations(body: &str) -> Result<Vec<TransactionRecord>, serde_json::Error> {
    let collection: FeatureCollection<MutationProperties> = serde_json::from_str(body)?;
    Ok(collection.into_properties().map(TransactionRecord::from).collect())
}
