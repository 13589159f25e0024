//! Queue catalog: which queue names each team may file tasks against.

use crate::config::{DEFAULT_TEAM, QueuesConfig};
use crate::error::{ApiError, ApiResult};
use std::collections::HashMap;

/// Allowed queue names, loaded once from configuration.
#[derive(Debug, Clone)]
pub struct QueueCatalog {
    default: Vec<String>,
    teams: HashMap<String, Vec<String>>,
}

impl QueueCatalog {
    pub fn from_config(config: &QueuesConfig) -> Self {
        Self {
            default: config.default.clone(),
            teams: config.teams.clone(),
        }
    }

    /// Queue names for a team, falling back to the default list.
    pub fn allowed_for(&self, team: &str) -> &[String] {
        match self.teams.get(team) {
            Some(queues) if team != DEFAULT_TEAM => queues,
            _ => &self.default,
        }
    }

    pub fn is_allowed(&self, team: &str, queue_name: &str) -> bool {
        self.allowed_for(team).iter().any(|q| q == queue_name)
    }

    /// Check a submitted queue name, returning the trimmed form.
    pub fn validate(&self, team: &str, queue_name: &str) -> ApiResult<String> {
        let name = queue_name.trim();
        if name.is_empty() {
            return Err(ApiError::missing_field("queueName"));
        }
        if !self.is_allowed(team, name) {
            return Err(ApiError::invalid_value(
                "queueName",
                format!("Unknown queue: {}", name),
            ));
        }
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn catalog() -> QueueCatalog {
        let mut config = QueuesConfig::default();
        config
            .teams
            .insert("billing".into(), vec!["Invoices".into(), "Break".into()]);
        QueueCatalog::from_config(&config)
    }

    #[test]
    fn unlisted_team_uses_default() {
        let catalog = catalog();
        assert!(catalog.is_allowed("support", "Personal Email"));
        assert!(!catalog.is_allowed("support", "Invoices"));
    }

    #[test]
    fn listed_team_sees_only_its_queues() {
        let catalog = catalog();
        assert!(catalog.is_allowed("billing", "Invoices"));
        assert!(!catalog.is_allowed("billing", "Personal Email"));
    }

    #[test]
    fn validate_rejects_empty_and_unknown() {
        let catalog = catalog();
        assert_eq!(
            catalog.validate("billing", "  ").unwrap_err().code,
            ErrorCode::ValidationError
        );
        let err = catalog.validate("billing", "Chapel").unwrap_err();
        assert_eq!(err.field.as_deref(), Some("queueName"));
        assert_eq!(catalog.validate("billing", " Break ").unwrap(), "Break");
    }
}
