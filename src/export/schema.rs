//! Versioned output schema
//!
//! Each column pairs its header with the rule that extracts its cell, so the
//! header row and the data rows cannot drift apart. Changing the export
//! layout means adding a new schema version, not editing two lists.

use std::fmt;

use super::flatten::{
    boolean, integer, join_labels, label, number, probability, reference_id, text,
};
use super::resolver::LookupMaps;
use crate::model::{Partner, PrimaryRecord, Stage, User};

/// Cell extractor for one column
pub type Extract = fn(&PrimaryRecord, &LookupMaps) -> String;

/// One output column
pub struct Column {
    pub header: &'static str,
    pub extract: Extract,
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Column").field(&self.header).finish()
    }
}

/// Known schema versions
///
/// V1 carried partner and lead contact details in shared columns; V2 splits
/// them and adds stage sequence and user login. Only V2 is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    V2,
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::V2 => write!(f, "v2"),
        }
    }
}

/// An ordered, versioned list of columns
#[derive(Debug)]
pub struct Schema {
    pub version: SchemaVersion,
    pub columns: &'static [Column],
}

impl Schema {
    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.header).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn partner<'a>(record: &PrimaryRecord, maps: &'a LookupMaps) -> Option<&'a Partner> {
    record
        .partner
        .as_ref()
        .and_then(|r| maps.partners.get(&r.id))
}

fn stage<'a>(record: &PrimaryRecord, maps: &'a LookupMaps) -> Option<&'a Stage> {
    record.stage.as_ref().and_then(|r| maps.stages.get(&r.id))
}

fn user<'a>(record: &PrimaryRecord, maps: &'a LookupMaps) -> Option<&'a User> {
    record.user.as_ref().and_then(|r| maps.users.get(&r.id))
}

fn partner_text(
    record: &PrimaryRecord,
    maps: &LookupMaps,
    field: fn(&Partner) -> Option<&str>,
) -> String {
    text(partner(record, maps).and_then(field))
}

/// CRM lead/opportunity export, version 2
#[rustfmt::skip]
pub static CRM_LEAD_V2: Schema = Schema {
    version: SchemaVersion::V2,
    columns: &[
        Column { header: "id", extract: |r, _| r.id.to_string() },
        Column { header: "opportunity_name", extract: |r, _| text(r.name.as_deref()) },
        Column { header: "type", extract: |r, _| text(r.kind.as_deref()) },
        Column { header: "active", extract: |r, _| boolean(r.active) },
        Column { header: "probability", extract: |r, _| probability(r.probability) },
        Column { header: "expected_revenue", extract: |r, _| number(r.expected_revenue.as_ref()) },
        Column { header: "recurring_revenue", extract: |r, _| number(r.recurring_revenue.as_ref()) },
        Column { header: "priority", extract: |r, _| text(r.priority.as_deref()) },
        Column { header: "date_deadline", extract: |r, _| text(r.date_deadline.as_deref()) },
        Column { header: "date_open", extract: |r, _| text(r.date_open.as_deref()) },
        Column { header: "date_closed", extract: |r, _| text(r.date_closed.as_deref()) },
        Column { header: "date_conversion", extract: |r, _| text(r.date_conversion.as_deref()) },
        Column { header: "create_date", extract: |r, _| text(r.create_date.as_deref()) },
        Column { header: "write_date", extract: |r, _| text(r.write_date.as_deref()) },
        // stage
        Column {
            header: "stage_name",
            extract: |r, m| text(stage(r, m).map(|s| s.name.as_str())),
        },
        Column {
            header: "stage_sequence",
            extract: |r, m| integer(stage(r, m).and_then(|s| s.sequence)),
        },
        // partner
        Column { header: "partner_id", extract: |r, _| reference_id(r.partner.as_ref()) },
        Column {
            header: "partner_name",
            extract: |r, m| text(partner(r, m).map(|p| p.name.as_str())),
        },
        Column { header: "partner_email", extract: |r, m| partner_text(r, m, |p| p.email.as_deref()) },
        Column { header: "partner_phone", extract: |r, m| partner_text(r, m, |p| p.phone.as_deref()) },
        Column { header: "partner_mobile", extract: |r, m| partner_text(r, m, |p| p.mobile.as_deref()) },
        Column { header: "partner_street", extract: |r, m| partner_text(r, m, |p| p.street.as_deref()) },
        Column { header: "partner_city", extract: |r, m| partner_text(r, m, |p| p.city.as_deref()) },
        Column { header: "partner_zip", extract: |r, m| partner_text(r, m, |p| p.zip.as_deref()) },
        Column {
            header: "partner_country",
            extract: |r, m| label(partner(r, m).and_then(|p| p.country.as_ref())),
        },
        // contact fields typed on the lead
        Column { header: "lead_contact_name", extract: |r, _| text(r.partner_name.as_deref()) },
        Column { header: "lead_email", extract: |r, _| text(r.email_from.as_deref()) },
        Column { header: "lead_phone", extract: |r, _| text(r.phone.as_deref()) },
        Column { header: "lead_mobile", extract: |r, _| text(r.mobile.as_deref()) },
        Column { header: "lead_street", extract: |r, _| text(r.street.as_deref()) },
        Column { header: "lead_city", extract: |r, _| text(r.city.as_deref()) },
        Column { header: "lead_zip", extract: |r, _| text(r.zip.as_deref()) },
        Column { header: "lead_country", extract: |r, _| label(r.country.as_ref()) },
        // user
        Column { header: "user_id", extract: |r, _| reference_id(r.user.as_ref()) },
        Column {
            header: "assigned_user",
            extract: |r, m| text(user(r, m).map(|u| u.name.as_str())),
        },
        Column {
            header: "user_login",
            extract: |r, m| text(user(r, m).and_then(|u| u.login.as_deref())),
        },
        // team
        Column { header: "team_id", extract: |r, _| reference_id(r.team.as_ref()) },
        Column { header: "sales_team", extract: |r, _| label(r.team.as_ref()) },
        // tags
        Column {
            header: "tags",
            extract: |r, m| join_labels(&r.tags, |id| m.tags.get(&id).map(|t| t.name.as_str())),
        },
        Column { header: "lost_reason", extract: |r, _| label(r.lost_reason.as_ref()) },
        // marketing attribution
        Column { header: "campaign", extract: |r, _| label(r.campaign.as_ref()) },
        Column { header: "medium", extract: |r, _| label(r.medium.as_ref()) },
        Column { header: "source", extract: |r, _| label(r.source.as_ref()) },
    ],
};
