//! The primary record: one CRM lead or opportunity

use serde::Deserialize;

use super::value::{self, Reference};

/// Fields requested for every primary record, in fetch order
pub const PRIMARY_FIELDS: &[&str] = &[
    "id",
    "name",
    "type",
    "active",
    "probability",
    "expected_revenue",
    "recurring_revenue",
    "priority",
    "date_deadline",
    "date_open",
    "date_closed",
    "date_conversion",
    "create_date",
    "write_date",
    "stage_id",
    "partner_id",
    "email_from",
    "phone",
    "mobile",
    "street",
    "city",
    "zip",
    "country_id",
    "partner_name",
    "user_id",
    "team_id",
    "tag_ids",
    "lost_reason_id",
    "campaign_id",
    "medium_id",
    "source_id",
];

/// One lead/opportunity as returned by a search-read call
///
/// Every field listed in [`PRIMARY_FIELDS`] must be present in the response;
/// a missing key or a value of the wrong shape is a decode error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrimaryRecord {
    pub id: i64,
    #[serde(deserialize_with = "value::text")]
    pub name: Option<String>,
    #[serde(rename = "type", deserialize_with = "value::text")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "value::flag")]
    pub active: bool,
    #[serde(deserialize_with = "value::float")]
    pub probability: Option<f64>,
    #[serde(deserialize_with = "value::number")]
    pub expected_revenue: Option<serde_json::Number>,
    #[serde(deserialize_with = "value::number")]
    pub recurring_revenue: Option<serde_json::Number>,
    #[serde(deserialize_with = "value::text")]
    pub priority: Option<String>,

    #[serde(deserialize_with = "value::text")]
    pub date_deadline: Option<String>,
    #[serde(deserialize_with = "value::text")]
    pub date_open: Option<String>,
    #[serde(deserialize_with = "value::text")]
    pub date_closed: Option<String>,
    #[serde(deserialize_with = "value::text")]
    pub date_conversion: Option<String>,
    #[serde(deserialize_with = "value::text")]
    pub create_date: Option<String>,
    #[serde(deserialize_with = "value::text")]
    pub write_date: Option<String>,

    #[serde(rename = "stage_id", deserialize_with = "value::many2one")]
    pub stage: Option<Reference>,
    #[serde(rename = "partner_id", deserialize_with = "value::many2one")]
    pub partner: Option<Reference>,

    #[serde(deserialize_with = "value::text")]
    pub email_from: Option<String>,
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
    /// Contact name typed on the lead itself, independent of the partner
    #[serde(deserialize_with = "value::text")]
    pub partner_name: Option<String>,

    #[serde(rename = "user_id", deserialize_with = "value::many2one")]
    pub user: Option<Reference>,
    #[serde(rename = "team_id", deserialize_with = "value::many2one")]
    pub team: Option<Reference>,
    #[serde(rename = "tag_ids", deserialize_with = "value::many2many")]
    pub tags: Vec<i64>,
    #[serde(rename = "lost_reason_id", deserialize_with = "value::many2one")]
    pub lost_reason: Option<Reference>,

    #[serde(rename = "campaign_id", deserialize_with = "value::many2one")]
    pub campaign: Option<Reference>,
    #[serde(rename = "medium_id", deserialize_with = "value::many2one")]
    pub medium: Option<Reference>,
    #[serde(rename = "source_id", deserialize_with = "value::many2one")]
    pub source: Option<Reference>,
}


#[cfg(test)]
mod tests {
    use super::fixtures::{blank_lead, lead};
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_record() {
        let raw = lead(
            42,
            json!({
                "name": "Big deal",
                "type": "opportunity",
                "probability": 37.5,
                "expected_revenue": 12000.0,
                "stage_id": [2, "Qualified"],
                "partner_id": [9, "Acme"],
                "tag_ids": [3, 4],
                "create_date": "2024-05-01 10:00:00",
            }),
        );
        let record: PrimaryRecord = serde_json::from_value(raw).unwrap();

        assert_eq!(record.id, 42);
        assert_eq!(record.kind.as_deref(), Some("opportunity"));
        assert_eq!(record.probability, Some(37.5));
        assert_eq!(record.stage.as_ref().map(|r| r.id), Some(2));
        assert_eq!(record.partner.as_ref().map(|r| r.label.as_str()), Some("Acme"));
        assert_eq!(record.tags, vec![3, 4]);
        assert!(record.active);
    }

    #[test]
    fn test_decode_blank_record() {
        let record: PrimaryRecord = serde_json::from_value(blank_lead(1)).unwrap();
        assert_eq!(record.name, None);
        assert_eq!(record.probability, None);
        assert_eq!(record.expected_revenue, None);
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_missing_field_fails() {
        let mut raw = blank_lead(1);
        raw.as_object_mut().unwrap().remove("stage_id");
        assert!(serde_json::from_value::<PrimaryRecord>(raw).is_err());
    }

    #[test]
    fn test_field_list_has_no_duplicates() {
        let mut fields = PRIMARY_FIELDS.to_vec();
        fields.sort_unstable();
        fields.dedup();
        assert_eq!(fields.len(), PRIMARY_FIELDS.len());
    }
}
