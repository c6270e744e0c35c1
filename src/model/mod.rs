//! Typed records exchanged with the remote record store
//!
//! - `record`: the primary lead/opportunity record and its field list
//! - `related`: partner, stage, user and tag entities resolved by id
//! - `value`: decoders for the store's `false`-means-empty value encoding

pub mod record;
pub mod related;
pub mod value;

pub use record::{PRIMARY_FIELDS, PrimaryRecord};
pub use related::{Partner, RelatedEntity, Stage, Tag, User};
pub use value::Reference;
