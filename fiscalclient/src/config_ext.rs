//! Extension pour intégrer la configuration fiscale dans fiscalconfig
//!
//! Ce module fournit le trait `FiscalConfigExt` qui expose les clés
//! `fiscal.*` de `fiscalconfig::Config`.

use crate::client::{FiscalClient, FiscalClientBuilder};
use crate::error::FiscalError;
use crate::retry::RetryPolicy;
use anyhow::{Result, anyhow};
use fiscalconfig::Config;
use serde_yaml::{Number, Value};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Trait d'extension pour la configuration du client fiscal
///
/// # Exemple
///
/// ```rust,ignore
/// use fiscalconfig::get_config;
/// use fiscalclient::{FiscalClient, FiscalConfigExt};
///
/// let config = get_config()?;
/// config.set_fiscal_state("43")?;
/// let client = FiscalClient::from_config(&config)?;
/// ```
pub trait FiscalConfigExt {
    /// Code d'environnement (`"1"` production, `"2"` homologation)
    fn get_fiscal_environment(&self) -> String;
    fn set_fiscal_environment(&self, environment: &str) -> Result<()>;

    /// Code IBGE de l'UF
    fn get_fiscal_state(&self) -> String;
    fn set_fiscal_state(&self, state: &str) -> Result<()>;

    fn get_fiscal_service(&self) -> String;
    fn get_fiscal_schema_version(&self) -> String;

    /// URL de base des web services, `None` pour les URLs déclarées par le WSDL
    fn get_fiscal_base_url(&self) -> Option<String>;
    fn set_fiscal_base_url(&self, base_url: &str) -> Result<()>;

    fn get_fiscal_soap12(&self) -> bool;
    fn get_fiscal_verify_ssl(&self) -> bool;
    fn get_fiscal_timeout(&self) -> Duration;
    fn get_fiscal_pretty_print(&self) -> bool;
    fn get_fiscal_fake_certificate(&self) -> bool;
    fn set_fiscal_fake_certificate(&self, fake: bool) -> Result<()>;

    /// Chemin du certificat PKCS#12, relatif au répertoire de configuration
    ///
    /// # Errors
    ///
    /// Retourne une erreur si aucun certificat n'est configuré
    fn get_fiscal_certificate_path(&self) -> Result<PathBuf>;
    fn set_fiscal_certificate(&self, path: &str, password: &str) -> Result<()>;
    fn get_fiscal_certificate_password(&self) -> String;

    /// Politique de retry (`fiscal.retry.*`)
    fn get_fiscal_retry_policy(&self) -> RetryPolicy;
    fn set_fiscal_retry_policy(&self, retry: &RetryPolicy) -> Result<()>;
}

const FISCAL: &str = "fiscal";

impl FiscalConfigExt for Config {
    fn get_fiscal_environment(&self) -> String {
        self.get_string_or(&[FISCAL, "environment"], "2".to_string())
    }

    fn set_fiscal_environment(&self, environment: &str) -> Result<()> {
        self.set_value(
            &[FISCAL, "environment"],
            Value::String(environment.to_string()),
        )
    }

    fn get_fiscal_state(&self) -> String {
        self.get_string_or(&[FISCAL, "state"], "42".to_string())
    }

    fn set_fiscal_state(&self, state: &str) -> Result<()> {
        self.set_value(&[FISCAL, "state"], Value::String(state.to_string()))
    }

    fn get_fiscal_service(&self) -> String {
        self.get_string_or(&[FISCAL, "service"], "nfe".to_string())
    }

    fn get_fiscal_schema_version(&self) -> String {
        self.get_string_or(&[FISCAL, "schema_version"], "4.00".to_string())
    }

    fn get_fiscal_base_url(&self) -> Option<String> {
        let url = self.get_string_or(&[FISCAL, "base_url"], String::new());
        (!url.trim().is_empty()).then_some(url)
    }

    fn set_fiscal_base_url(&self, base_url: &str) -> Result<()> {
        self.set_value(&[FISCAL, "base_url"], Value::String(base_url.to_string()))
    }

    fn get_fiscal_soap12(&self) -> bool {
        self.get_bool_or(&[FISCAL, "soap12_envelope"], false)
    }

    fn get_fiscal_verify_ssl(&self) -> bool {
        self.get_bool_or(&[FISCAL, "verify_ssl"], false)
    }

    fn get_fiscal_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64_or(&[FISCAL, "timeout_secs"], 20))
    }

    fn get_fiscal_pretty_print(&self) -> bool {
        self.get_bool_or(&[FISCAL, "pretty_print"], false)
    }

    fn get_fiscal_fake_certificate(&self) -> bool {
        self.get_bool_or(&[FISCAL, "fake_certificate"], false)
    }

    fn set_fiscal_fake_certificate(&self, fake: bool) -> Result<()> {
        self.set_value(&[FISCAL, "fake_certificate"], Value::Bool(fake))
    }

    fn get_fiscal_certificate_path(&self) -> Result<PathBuf> {
        match self.get_value(&[FISCAL, "certificate", "path"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Ok(self.resolve_path(&s)),
            _ => Err(anyhow!("Fiscal certificate path not configured")),
        }
    }

    fn set_fiscal_certificate(&self, path: &str, password: &str) -> Result<()> {
        self.set_value(
            &[FISCAL, "certificate", "path"],
            Value::String(path.to_string()),
        )?;
        self.set_value(
            &[FISCAL, "certificate", "password"],
            Value::String(password.to_string()),
        )
    }

    fn get_fiscal_certificate_password(&self) -> String {
        self.get_string_or(&[FISCAL, "certificate", "password"], String::new())
    }

    fn get_fiscal_retry_policy(&self) -> RetryPolicy {
        let default = RetryPolicy::default();
        let retryable_statuses = self
            .get_u64_list(&[FISCAL, "retry", "statuses"])
            .ok()
            .map(|codes| {
                codes
                    .into_iter()
                    .filter_map(|c| u16::try_from(c).ok())
                    .collect()
            })
            .unwrap_or(default.retryable_statuses);

        RetryPolicy {
            max_attempts: self
                .get_u64_or(&[FISCAL, "retry", "max_attempts"], default.max_attempts as u64)
                .clamp(1, u32::MAX as u64) as u32,
            backoff_factor: self.get_f64_or(
                &[FISCAL, "retry", "backoff_factor"],
                default.backoff_factor,
            ),
            retryable_statuses,
        }
    }

    fn set_fiscal_retry_policy(&self, retry: &RetryPolicy) -> Result<()> {
        self.set_value(
            &[FISCAL, "retry", "max_attempts"],
            Value::Number(Number::from(retry.max_attempts as u64)),
        )?;
        self.set_value(
            &[FISCAL, "retry", "backoff_factor"],
            Value::Number(Number::from(retry.backoff_factor)),
        )?;
        let statuses: Vec<u64> = retry.retryable_statuses.iter().map(|&s| s as u64).collect();
        self.set_u64_list(&[FISCAL, "retry", "statuses"], &statuses)
    }
}

impl FiscalClient {
    /// Builds a client from the `fiscal.*` configuration keys
    ///
    /// The PKCS#12 file is read from `fiscal.certificate.path` unless
    /// `fiscal.fake_certificate` is set.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let mut builder = FiscalClientBuilder::new(
            config.get_fiscal_environment(),
            config.get_fiscal_state(),
        )
        .service(config.get_fiscal_service())
        .schema_version(config.get_fiscal_schema_version())
        .soap12(config.get_fiscal_soap12())
        .verify_ssl(config.get_fiscal_verify_ssl())
        .timeout(config.get_fiscal_timeout())
        .pretty_print(config.get_fiscal_pretty_print())
        .retry_policy(config.get_fiscal_retry_policy())
        .base_url(config.get_fiscal_base_url().unwrap_or_default());

        if config.get_fiscal_fake_certificate() {
            builder = builder.fake_certificate(true);
        } else {
            let path = config.get_fiscal_certificate_path()?;
            info!(certificate = %path.display(), "Loading PKCS#12 certificate");
            let pkcs12 = fs::read(&path).map_err(|e| {
                FiscalError::configuration(format!(
                    "cannot read certificate {}: {e}",
                    path.display()
                ))
            })?;
            builder = builder.certificate(pkcs12, config.get_fiscal_certificate_password());
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_in(dir: &tempfile::TempDir) -> Config {
        Config::load_config(dir.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);

        assert_eq!(config.get_fiscal_environment(), "2");
        assert_eq!(config.get_fiscal_state(), "42");
        assert_eq!(config.get_fiscal_service(), "nfe");
        assert_eq!(config.get_fiscal_schema_version(), "4.00");
        assert_eq!(config.get_fiscal_base_url(), None);
        assert_eq!(config.get_fiscal_timeout(), Duration::from_secs(20));
        assert!(!config.get_fiscal_soap12());
        assert_eq!(config.get_fiscal_retry_policy(), RetryPolicy::default());
        assert!(config.get_fiscal_certificate_path().is_err());
    }

    #[test]
    fn test_certificate_path_is_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        config.set_fiscal_certificate("certs/a1.pfx", "1234").unwrap();

        assert_eq!(
            config.get_fiscal_certificate_path().unwrap(),
            dir.path().join("certs/a1.pfx")
        );
        assert_eq!(config.get_fiscal_certificate_password(), "1234");
    }

    #[test]
    fn test_values_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        load_in(&dir).set_fiscal_state("43").unwrap();

        let reloaded = load_in(&dir);
        assert_eq!(reloaded.get_fiscal_state(), "43");
    }

    #[test]
    fn test_client_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        config.set_fiscal_fake_certificate(true).unwrap();
        config.set_fiscal_state("43").unwrap();

        let client = FiscalClient::from_config(&config).unwrap();
        assert_eq!(
            client.to_string(),
            "FiscalClient(environment=2, state=43, service=nfe, version=4.00)"
        );
    }

    #[test]
    fn test_retry_policy_round_trips_through_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        let retry = RetryPolicy {
            max_attempts: 5,
            backoff_factor: 0.5,
            retryable_statuses: vec![502, 503],
        };
        config.set_fiscal_retry_policy(&retry).unwrap();

        assert_eq!(load_in(&dir).get_fiscal_retry_policy(), retry);
    }

    #[test]
    fn test_client_from_config_rejects_negative_backoff() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        config.set_fiscal_fake_certificate(true).unwrap();
        config
            .set_value(
                &[FISCAL, "retry", "backoff_factor"],
                Value::Number(Number::from(-1.0)),
            )
            .unwrap();

        let err = FiscalClient::from_config(&config).unwrap_err();
        assert!(matches!(err, FiscalError::Configuration(_)));
    }

    #[test]
    fn test_client_from_config_requires_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        let err = FiscalClient::from_config(&config).unwrap_err();
        assert!(err.is_configuration_error());

        config.set_fiscal_certificate("missing.pfx", "x").unwrap();
        let err = FiscalClient::from_config(&config).unwrap_err();
        assert!(matches!(err, FiscalError::Configuration(_)));
    }
}
