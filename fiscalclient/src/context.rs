//! Contexte fiscal du client

use crate::codes::{Environment, ServiceName, StateCode};
use crate::error::{FiscalError, Result};

/// Default schema version of the NFe layouts
pub const DEFAULT_SCHEMA_VERSION: &str = "4.00";

/// Environment, state, service and layout version of a client
///
/// Validated once at construction; lives as long as the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentContext {
    pub environment: Environment,
    pub state: StateCode,
    pub service: ServiceName,
    pub schema_version: String,
}

impl EnvironmentContext {
    /// Validates raw codes, as found in configuration files
    pub fn parse(
        environment: &str,
        state: &str,
        service: &str,
        schema_version: &str,
    ) -> Result<Self> {
        Self::new(
            environment.parse()?,
            state.parse()?,
            service.parse()?,
            schema_version,
        )
    }

    pub fn new(
        environment: Environment,
        state: StateCode,
        service: ServiceName,
        schema_version: &str,
    ) -> Result<Self> {
        let schema_version = schema_version.trim();
        let valid = !schema_version.is_empty()
            && schema_version
                .split('.')
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
        if !valid {
            return Err(FiscalError::configuration(format!(
                "invalid schema version `{schema_version}`"
            )));
        }

        Ok(Self {
            environment,
            state,
            service,
            schema_version: schema_version.to_string(),
        })
    }
}
