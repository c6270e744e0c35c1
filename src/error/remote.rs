use std::fmt;

use serde::Deserialize;

/// Structured fault raised by the remote record store.
///
/// Mirrors the `error` member of a JSON-RPC response. The store nests the
/// useful part (exception name and message) under `data`.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct RemoteFault {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<FaultData>,
}

/// Exception details attached to a [`RemoteFault`].
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct FaultData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
}

impl RemoteFault {
    /// Most specific human-readable message carried by the fault.
    pub fn summary(&self) -> &str {
        match &self.data {
            Some(data) if !data.message.is_empty() => &data.message,
            _ => &self.message,
        }
    }

    /// Exception class name reported by the server, if any.
    pub fn exception(&self) -> Option<&str> {
        self.data
            .as_ref()
            .map(|d| d.name.as_str())
            .filter(|n| !n.is_empty())
    }
}

impl fmt::Display for RemoteFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exception() {
            Some(name) => write!(f, "{} ({name})", self.summary()),
            None => write!(f, "{}", self.summary()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_prefers_nested_message() {
        let fault: RemoteFault = serde_json::from_value(serde_json::json!({
            "code": 200,
            "message": "Odoo Server Error",
            "data": {
                "name": "odoo.exceptions.AccessError",
                "message": "You are not allowed to access 'Lead'",
                "debug": "Traceback ..."
            }
        }))
        .unwrap();

        assert_eq!(fault.summary(), "You are not allowed to access 'Lead'");
        assert_eq!(fault.exception(), Some("odoo.exceptions.AccessError"));
        assert_eq!(
            fault.to_string(),
            "You are not allowed to access 'Lead' (odoo.exceptions.AccessError)"
        );
    }

    #[test]
    fn test_fault_without_data() {
        let fault: RemoteFault =
            serde_json::from_value(serde_json::json!({ "code": -32601, "message": "not found" }))
                .unwrap();
        assert_eq!(fault.to_string(), "not found");
        assert_eq!(fault.code, -32601);
        assert_eq!(fault.exception(), None);
    }
}
