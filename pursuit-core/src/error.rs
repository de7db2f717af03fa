use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    Remove,
    Create,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::Remove => f.write_str("remove"),
            ServiceKind::Create => f.write_str("create"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{service} service unavailable after waiting {waited_ms} ms")]
    Unavailable { service: ServiceKind, waited_ms: u64 },
    #[error("{service} call failed: {reason}")]
    Failed { service: ServiceKind, reason: String },
}

impl ServiceError {
    pub fn failed(service: ServiceKind, reason: impl Into<String>) -> Self {
        Self::Failed {
            service,
            reason: reason.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Unavailable { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_service() {
        let unavailable = ServiceError::Unavailable {
            service: ServiceKind::Remove,
            waited_ms: 1500,
        };
        assert_eq!(
            unavailable.to_string(),
            "remove service unavailable after waiting 1500 ms"
        );
        assert!(unavailable.is_transient());

        let failed = ServiceError::failed(ServiceKind::Create, "name already taken");
        assert_eq!(failed.to_string(), "create call failed: name already taken");
        assert!(!failed.is_transient());
    }
}
