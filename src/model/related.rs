//! Related entities resolved per batch by id

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::value::{self, Reference};

/// An entity referenced from primary records and bulk-read by id
///
/// Implementors name the remote model and the small set of display fields
/// the export needs from it.
pub trait RelatedEntity: DeserializeOwned + Send + 'static {
    /// Remote model name
    const MODEL: &'static str;

    /// Fields requested by the bulk read (`id` is always returned)
    const FIELDS: &'static [&'static str];

    /// Primary key
    fn id(&self) -> i64;
}

/// Customer linked to a lead
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Partner {
    pub id: i64,
    #[serde(deserialize_with = "value::translatable")]
    pub name: String,
    #[serde(deserialize_with = "value::text")]
    pub email: Option<String>,
    #[serde(deserialize_with = "value::text")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "value::text")]
    pub mobile: Option<String>,
    #[serde(deserialize_with = "value::text")]
    pub street: Option<String>,
    #[serde(deserialize_with = "value::text")]
    pub city: Option<String>,
    #[serde(deserialize_with = "value::text")]
    pub zip: Option<String>,
    #[serde(rename = "country_id", deserialize_with = "value::many2one")]
    pub country: Option<Reference>,
}

/// Pipeline stage
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Stage {
    pub id: i64,
    #[serde(deserialize_with = "value::translatable")]
    pub name: String,
    #[serde(deserialize_with = "value::integer")]
    pub sequence: Option<i64>,
}

/// Salesperson
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(deserialize_with = "value::translatable")]
    pub name: String,
    #[serde(deserialize_with = "value::text")]
    pub login: Option<String>,
}

/// Lead tag
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tag {
    pub id: i64,
    #[serde(deserialize_with = "value::translatable")]
    pub name: String,
}

impl RelatedEntity for Partner {
    const MODEL: &'static str = "res.partner";
    const FIELDS: &'static [&'static str] = &[
        "name", "email", "phone", "mobile", "street", "city", "zip", "country_id",
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

impl RelatedEntity for Stage {
    const MODEL: &'static str = "crm.stage";
    const FIELDS: &'static [&'static str] = &["name", "sequence"];

    fn id(&self) -> i64 {
        self.id
    }
}

impl RelatedEntity for User {
    const MODEL: &'static str = "res.users";
    const FIELDS: &'static [&'static str] = &["name", "login"];

    fn id(&self) -> i64 {
        self.id
    }
}

impl RelatedEntity for Tag {
    const MODEL: &'static str = "crm.tag";
    const FIELDS: &'static [&'static str] = &["name"];

    fn id(&self) -> i64 {
        self.id
    }
}
