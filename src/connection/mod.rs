//! Connection to the remote record store
//!
//! This module provides:
//! - Authentication and session handling
//! - A generic `call(model, method, args, kwargs)` primitive
//! - Typed `count`, `fetch_batch` and `bulk_read` operations built on it
//!
//! Every operation is exactly one round-trip; there is no retry here.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::{AuthError, ConnectionError, ExportError, Result};
use crate::model::{PrimaryRecord, RelatedEntity};

pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use transport::{JsonRpcTransport, RpcTransport, SessionHandle};

/// Record filter shared by count and fetch
///
/// Count and fetch must use the same filter, otherwise progress totals drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Filter {
    /// Include archived (inactive) records
    pub include_archived: bool,
}

impl Filter {
    pub fn new(include_archived: bool) -> Self {
        Self { include_archived }
    }

    /// Search domain understood by the store
    pub fn domain(&self) -> Value {
        if self.include_archived {
            json!([["active", "in", [true, false]]])
        } else {
            json!([])
        }
    }
}

/// One offset window of a search-read
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub model: &'a str,
    pub filter: Filter,
    pub fields: &'a [&'a str],
    pub limit: u64,
    pub offset: u64,
    pub order: &'a str,
}

/// Authenticated client for the record store
pub struct Connector<T: RpcTransport> {
    transport: T,
    config: ConnectionConfig,
    session: Option<SessionHandle>,
}

impl<T: RpcTransport> Connector<T> {
    /// Create a connector; no network traffic happens until `authenticate`
    ///
    /// # Arguments
    /// * `transport` - RPC transport
    /// * `config` - Connection configuration with credentials
    pub fn new(transport: T, config: ConnectionConfig) -> Self {
        Self {
            transport,
            config,
            session: None,
        }
    }

    /// Authenticate with the configured credentials
    ///
    /// # Returns
    /// * `Result<&SessionHandle>` - Session or `AuthError` when rejected or unreachable
    pub async fn authenticate(&mut self) -> Result<&SessionHandle> {
        let ConnectionConfig {
            database,
            username,
            password,
            ..
        } = &self.config;

        debug!("Authenticating '{}' against database '{}'", username, database);

        let uid = match self.transport.authenticate(database, username, password).await {
            Ok(uid) => uid,
            Err(ExportError::Connection(ConnectionError::Remote(fault))) => {
                return Err(AuthError::Unreachable(fault.to_string()).into());
            }
            Err(ExportError::Connection(e)) => {
                return Err(AuthError::Unreachable(e.to_string()).into());
            }
            Err(e) => return Err(e),
        };

        let uid = uid.ok_or_else(|| AuthError::Rejected {
            login: username.clone(),
            database: database.clone(),
        })?;

        info!("Authenticated as UID {}", uid);
        Ok(self
            .session
            .insert(SessionHandle::new(database.clone(), uid, password.clone())))
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Current session, if authenticated
    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Generic RPC primitive: one round-trip to `model.method`
    pub async fn call(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value> {
        let session = self
            .session
            .as_ref()
            .ok_or(ConnectionError::NotAuthenticated)?;
        self.transport
            .execute(session, model, method, args, kwargs)
            .await
    }

    /// Count records of `model` matching `filter`
    pub async fn count(&self, model: &str, filter: Filter) -> Result<u64> {
        let value = self
            .call(model, "search_count", vec![filter.domain()], Map::new())
            .await?;
        value.as_u64().ok_or_else(|| {
            ConnectionError::InvalidResponse {
                model: model.to_string(),
                message: format!("search_count returned {value}"),
            }
            .into()
        })
    }

    /// Fetch one window of primary records, validated into typed records
    pub async fn fetch_batch(&self, request: &SearchRequest<'_>) -> Result<Vec<PrimaryRecord>> {
        let mut kwargs = Map::new();
        kwargs.insert("fields".into(), json!(request.fields));
        kwargs.insert("limit".into(), json!(request.limit));
        kwargs.insert("offset".into(), json!(request.offset));
        kwargs.insert("order".into(), json!(request.order));

        let value = self
            .call(
                request.model,
                "search_read",
                vec![request.filter.domain()],
                kwargs,
            )
            .await?;
        decode_rows(request.model, value)
    }

    /// Read display fields of related entities by id in one round-trip
    ///
    /// Ids that no longer exist are simply absent from the result.
    pub async fn bulk_read<E: RelatedEntity>(&self, ids: &[i64]) -> Result<Vec<E>> {
        let mut kwargs = Map::new();
        kwargs.insert("fields".into(), json!(E::FIELDS));

        let value = self.call(E::MODEL, "read", vec![json!(ids)], kwargs).await?;
        decode_rows(E::MODEL, value)
    }
}

/// Decode a list response into typed rows, failing on the first mismatch
fn decode_rows<R: DeserializeOwned>(model: &str, value: Value) -> Result<Vec<R>> {
    let Value::Array(rows) = value else {
        return Err(ConnectionError::InvalidResponse {
            model: model.to_string(),
            message: "expected a list of records".to_string(),
        }
        .into());
    };

    rows.into_iter()
        .map(|row| {
            let id = row.get("id").cloned().unwrap_or(Value::Null);
            serde_json::from_value(row).map_err(|e| {
                ConnectionError::InvalidResponse {
                    model: model.to_string(),
                    message: format!("record {id}: {e}"),
                }
                .into()
            })
        })
        .collect()
}
