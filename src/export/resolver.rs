//! Batch-scoped reference resolution
//!
//! For each relation, the distinct ids referenced anywhere in the batch are
//! pooled and fetched with a single bulk read. A relation nobody references
//! costs no round-trip. The resulting lookup maps live only as long as the
//! batch they were built for.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use tracing::debug;

use crate::connection::{Connector, RpcTransport};
use crate::error::{ExportError, PipelineError, Result};
use crate::model::{Partner, PrimaryRecord, RelatedEntity, Stage, Tag, User};

/// Related-entity id -> entity, for one batch
pub type LookupMap<E> = HashMap<i64, E>;

/// All lookup maps for one batch
#[derive(Debug, Default)]
pub struct LookupMaps {
    pub partners: LookupMap<Partner>,
    pub stages: LookupMap<Stage>,
    pub users: LookupMap<User>,
    pub tags: LookupMap<Tag>,
}

impl LookupMaps {
    /// Total number of resolved entities across relations
    pub fn len(&self) -> usize {
        self.partners.len() + self.stages.len() + self.users.len() + self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Relations resolved by bulk read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Partner,
    Stage,
    User,
    Tags,
}

impl Relation {
    pub const ALL: [Relation; 4] = [
        Relation::Partner,
        Relation::Stage,
        Relation::User,
        Relation::Tags,
    ];

    /// Field name on the primary record
    pub fn field(&self) -> &'static str {
        match self {
            Relation::Partner => "partner_id",
            Relation::Stage => "stage_id",
            Relation::User => "user_id",
            Relation::Tags => "tag_ids",
        }
    }

    /// Ids this record references through the relation
    fn ids<'a>(&self, record: &'a PrimaryRecord) -> Box<dyn Iterator<Item = i64> + 'a> {
        match self {
            Relation::Partner => Box::new(record.partner.iter().map(|r| r.id)),
            Relation::Stage => Box::new(record.stage.iter().map(|r| r.id)),
            Relation::User => Box::new(record.user.iter().map(|r| r.id)),
            Relation::Tags => Box::new(record.tags.iter().copied()),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// Distinct ids referenced through `relation` across the whole batch
pub fn distinct_ids(batch: &[PrimaryRecord], relation: Relation) -> BTreeSet<i64> {
    batch.iter().flat_map(|r| relation.ids(r)).collect()
}

/// Resolves the configured relations for one batch at a time
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    relations: Vec<Relation>,
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new(Relation::ALL.to_vec())
    }
}

impl ReferenceResolver {
    /// Create a resolver for the given relations
    ///
    /// Relations left out produce empty lookup maps, so their columns stay blank.
    pub fn new(relations: Vec<Relation>) -> Self {
        let mut seen = HashSet::new();
        let relations = relations.into_iter().filter(|r| seen.insert(*r)).collect();
        Self { relations }
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Build the lookup maps for `batch`
    ///
    /// Issues at most one bulk read per relation. Any failure aborts the
    /// batch; there is no partial resolution.
    ///
    /// # Arguments
    /// * `connector` - Authenticated connector
    /// * `batch` - Records of the current window
    /// * `batch_index` - 1-based batch number, used for error reporting
    pub async fn resolve<T: RpcTransport>(
        &self,
        connector: &Connector<T>,
        batch: &[PrimaryRecord],
        batch_index: u64,
    ) -> Result<LookupMaps> {
        let mut maps = LookupMaps::default();

        for relation in &self.relations {
            let ids = distinct_ids(batch, *relation);
            if ids.is_empty() {
                debug!("Batch {}: no '{}' references, skipping", batch_index, relation);
                continue;
            }

            let failed = |e: ExportError| PipelineError::BulkResolve {
                batch: batch_index,
                relation: relation.field(),
                message: format!("{e}"),
            };

            match relation {
                Relation::Partner => {
                    maps.partners = fetch(connector, &ids).await.map_err(failed)?;
                }
                Relation::Stage => maps.stages = fetch(connector, &ids).await.map_err(failed)?,
                Relation::User => maps.users = fetch(connector, &ids).await.map_err(failed)?,
                Relation::Tags => maps.tags = fetch(connector, &ids).await.map_err(failed)?,
            }
        }

        debug!(
            "Batch {}: resolved {} related entities",
            batch_index,
            maps.len()
        );
        Ok(maps)
    }
}

async fn fetch<E, T>(connector: &Connector<T>, ids: &BTreeSet<i64>) -> Result<LookupMap<E>>
where
    E: RelatedEntity,
    T: RpcTransport,
{
    let ids: Vec<i64> = ids.iter().copied().collect();
    let rows: Vec<E> = connector.bulk_read(&ids).await?;

    if rows.len() < ids.len() {
        debug!(
            "{}: {} of {} ids no longer exist",
            E::MODEL,
            ids.len() - rows.len(),
            ids.len()
        );
    }

    Ok(rows.into_iter().map(|e| (e.id(), e)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::connection::testing::FakeStore;
    use crate::model::record::fixtures::lead;
    use serde_json::{Value, json};

    fn records(raw: Vec<Value>) -> Vec<PrimaryRecord> {
        raw.into_iter()
            .map(|r| serde_json::from_value(r).unwrap())
            .collect()
    }

    async fn connector(store: FakeStore) -> Connector<FakeStore> {
        let mut conn = Connector::new(store, ConnectionConfig::default());
        conn.authenticate().await.unwrap();
        conn
    }

    fn tag_store() -> FakeStore {
        FakeStore::new()
            .with_related(
                "crm.tag",
                vec![
                    json!({ "id": 1, "name": "Hot" }),
                    json!({ "id": 2, "name": "Cold" }),
                ],
            )
            .with_related(
                "crm.stage",
                vec![json!({ "id": 1, "name": "New", "sequence": 1 })],
            )
    }

    #[test]
    fn test_distinct_ids_deduplicates() {
        let batch = records(vec![
            lead(1, json!({ "tag_ids": [2, 1, 2], "partner_id": [7, "A"] })),
            lead(2, json!({ "tag_ids": [1], "partner_id": [7, "A"] })),
            lead(3, json!({})),
        ]);
        assert_eq!(
            distinct_ids(&batch, Relation::Tags).into_iter().collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(distinct_ids(&batch, Relation::Partner).len(), 1);
        assert!(distinct_ids(&batch, Relation::User).is_empty());
    }

    #[tokio::test]
    async fn test_one_bulk_read_per_relation() {
        let conn = connector(tag_store()).await;
        let batch = records(vec![
            lead(1, json!({ "tag_ids": [1, 2], "stage_id": [1, "New"] })),
            lead(2, json!({ "tag_ids": [2, 1], "stage_id": [1, "New"] })),
            lead(3, json!({ "tag_ids": [1], "stage_id": [1, "New"] })),
        ]);

        let maps = ReferenceResolver::default()
            .resolve(&conn, &batch, 1)
            .await
            .unwrap();

        let tag_reads = conn_store(&conn).calls_to("crm.tag", "read");
        assert_eq!(tag_reads.len(), 1);
        assert_eq!(tag_reads[0].ids, vec![1, 2]);
        assert_eq!(conn_store(&conn).calls_to("crm.stage", "read").len(), 1);
        assert_eq!(maps.tags.len(), 2);
        assert_eq!(maps.stages[&1].name, "New");
    }

    #[tokio::test]
    async fn test_unreferenced_relations_are_skipped() {
        let conn = connector(tag_store()).await;
        let batch = records(vec![lead(1, json!({})), lead(2, json!({ "tag_ids": [] }))]);

        let maps = ReferenceResolver::default()
            .resolve(&conn, &batch, 1)
            .await
            .unwrap();

        assert!(maps.is_empty());
        assert!(conn_store(&conn).calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_entities_are_left_out() {
        let conn = connector(tag_store()).await;
        let batch = records(vec![lead(1, json!({ "tag_ids": [1, 99] }))]);

        let maps = ReferenceResolver::new(vec![Relation::Tags])
            .resolve(&conn, &batch, 1)
            .await
            .unwrap();

        assert!(maps.tags.contains_key(&1));
        assert!(!maps.tags.contains_key(&99));
    }

    #[tokio::test]
    async fn test_bulk_read_failure_aborts() {
        let conn = connector(tag_store().failing_on("crm.tag", "read", 0)).await;
        let batch = records(vec![lead(1, json!({ "tag_ids": [1] }))]);

        let err = ReferenceResolver::default()
            .resolve(&conn, &batch, 4)
            .await
            .unwrap_err();

        match err {
            ExportError::Pipeline(PipelineError::BulkResolve {
                batch, relation, ..
            }) => {
                assert_eq!(batch, 4);
                assert_eq!(relation, "tag_ids");
            }
            other => panic!("expected bulk resolve failure, got {other:?}"),
        }
    }

    #[test]
    fn test_resolver_relations() {
        let resolver = ReferenceResolver::new(vec![Relation::Tags, Relation::Tags]);
        assert_eq!(resolver.relations(), &[Relation::Tags]);

        let resolver =
            ReferenceResolver::new(vec![Relation::Tags, Relation::Stage, Relation::Tags]);
        assert_eq!(resolver.relations(), &[Relation::Tags, Relation::Stage]);
        assert_eq!(Relation::Partner.to_string(), "partner_id");
    }

    #[tokio::test]
    async fn test_repeated_relation_is_read_once() {
        let conn = connector(tag_store()).await;
        let batch = records(vec![lead(1, json!({ "tag_ids": [1, 2], "stage_id": [1, "New"] }))]);

        let maps = ReferenceResolver::new(vec![Relation::Tags, Relation::Stage, Relation::Tags])
            .resolve(&conn, &batch, 1)
            .await
            .unwrap();

        assert_eq!(conn_store(&conn).calls_to("crm.tag", "read").len(), 1);
        assert_eq!(conn_store(&conn).calls_to("crm.stage", "read").len(), 1);
        assert_eq!(maps.tags.len(), 2);
    }

    fn conn_store(conn: &Connector<FakeStore>) -> &FakeStore {
        conn.transport()
    }
}
