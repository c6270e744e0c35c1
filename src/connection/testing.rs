//! In-memory record store for tests
//!
//! Implements [`RpcTransport`] over raw JSON rows and records every call so
//! tests can assert on round-trip counts and requested ids.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::transport::{RpcTransport, SessionHandle};
use crate::error::{ConnectionError, RemoteFault, Result};

/// One `execute` call as seen by the store
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub model: String,
    pub method: String,
    /// Ids passed to `read`, empty for other methods
    pub ids: Vec<i64>,
    pub offset: Option<u64>,
}

#[derive(Default)]
pub struct FakeStore {
    leads: Vec<Value>,
    related: HashMap<String, Vec<Value>>,
    reject_auth: bool,
    unreachable: bool,
    fail_on: Option<(String, String, usize)>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_leads(mut self, leads: Vec<Value>) -> Self {
        self.leads = leads;
        self
    }

    pub fn with_related(mut self, model: &str, rows: Vec<Value>) -> Self {
        self.related.insert(model.to_string(), rows);
        self
    }

    pub fn rejecting_auth(mut self) -> Self {
        self.reject_auth = true;
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Raise a remote fault on the `nth` (0-based) call of `model.method`
    pub fn failing_on(mut self, model: &str, method: &str, nth: usize) -> Self {
        self.fail_on = Some((model.to_string(), method.to_string(), nth));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls made to `model.method`
    pub fn calls_to(&self, model: &str, method: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.model == model && c.method == method)
            .collect()
    }

    fn matching_leads(&self, domain: &Value) -> Vec<&Value> {
        let include_archived = domain.as_array().is_some_and(|d| !d.is_empty());
        let mut rows: Vec<&Value> = self
            .leads
            .iter()
            .filter(|row| include_archived || row["active"] == json!(true))
            .collect();
        rows.sort_by_key(|row| row["id"].as_i64());
        rows
    }

    fn should_fail(&self, model: &str, method: &str) -> bool {
        let Some((fail_model, fail_method, nth)) = &self.fail_on else {
            return false;
        };
        fail_model == model
            && fail_method == method
            && self.calls_to(model, method).len() == nth + 1
    }
}

#[async_trait]
impl RpcTransport for FakeStore {
    async fn authenticate(
        &self,
        _database: &str,
        _login: &str,
        _password: &str,
    ) -> Result<Option<i64>> {
        if self.unreachable {
            return Err(ConnectionError::Transport("connection refused".into()).into());
        }
        Ok(if self.reject_auth { None } else { Some(2) })
    }

    async fn execute(
        &self,
        _session: &SessionHandle,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value> {
        let ids: Vec<i64> = match method {
            "read" => args[0]
                .as_array()
                .map(|a| a.iter().filter_map(Value::as_i64).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        self.calls.lock().unwrap().push(RecordedCall {
            model: model.to_string(),
            method: method.to_string(),
            ids: ids.clone(),
            offset: kwargs.get("offset").and_then(Value::as_u64),
        });

        if self.should_fail(model, method) {
            return Err(ConnectionError::Remote(RemoteFault {
                code: 200,
                message: format!("{model}.{method} failed"),
                data: None,
            })
            .into());
        }

        match method {
            "search_count" => Ok(json!(self.matching_leads(&args[0]).len())),
            "search_read" => {
                let offset = kwargs.get("offset").and_then(Value::as_u64).unwrap_or(0) as usize;
                let limit = kwargs
                    .get("limit")
                    .and_then(Value::as_u64)
                    .map_or(usize::MAX, |l| l as usize);
                let rows: Vec<Value> = self
                    .matching_leads(&args[0])
                    .into_iter()
                    .skip(offset)
                    .take(limit)
                    .cloned()
                    .collect();
                Ok(Value::Array(rows))
            }
            "read" => {
                let table = self.related.get(model).cloned().unwrap_or_default();
                let rows: Vec<Value> = ids
                    .iter()
                    .filter_map(|id| table.iter().find(|row| row["id"] == json!(id)).cloned())
                    .collect();
                Ok(Value::Array(rows))
            }
            other => Err(ConnectionError::Transport(format!("unsupported method {other}")).into()),
        }
    }
}
