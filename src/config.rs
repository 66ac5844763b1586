//! Configuração do contrata carregada a partir de `contrata.toml`.
//!
//! A struct [`ContrataConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! Variáveis de ambiente `CONTRATA_*` têm precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::orchestrator::SagaTimeouts;

pub const DEFAULT_CONFIG_FILE: &str = "contrata.toml";

pub const ENV_DATABASE_PATH: &str = "CONTRATA_DATABASE_PATH";
pub const ENV_PROPOSAL_SERVICE_URL: &str = "CONTRATA_PROPOSAL_SERVICE_URL";
pub const ENV_EVENTS_DIR: &str = "CONTRATA_EVENTS_DIR";

/// Configuração de nível superior carregada de `contrata.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContrataConfig {
    /// Arquivo SQLite com propostas e contratos.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default)]
    pub proposal_service: ProposalServiceConfig,

    #[serde(default)]
    pub events: EventsConfig,
}

/// Autoridade de status das propostas.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposalServiceConfig {
    /// URL base do serviço remoto. Ausente: as propostas locais são a autoridade.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventsConfig {
    /// Diretório da fila durável, um arquivo por canal.
    #[serde(default = "default_spool_dir")]
    pub spool_dir: PathBuf,

    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("contrata.db")
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

fn default_spool_dir() -> PathBuf {
    PathBuf::from("events")
}

fn default_publish_timeout_ms() -> u64 {
    2000
}

impl Default for ContrataConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            proposal_service: ProposalServiceConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl Default for ProposalServiceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            spool_dir: default_spool_dir(),
            publish_timeout_ms: default_publish_timeout_ms(),
        }
    }
}

impl ContrataConfig {
    /// Carrega a configuração de `path`, ou de `contrata.toml` no diretório
    /// atual. Um arquivo passado explicitamente precisa existir; o padrão
    /// é opcional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Variáveis vazias são ignoradas.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = var(ENV_DATABASE_PATH) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(url) = var(ENV_PROPOSAL_SERVICE_URL) {
            self.proposal_service.base_url = Some(url);
        }
        if let Some(dir) = var(ENV_EVENTS_DIR) {
            self.events.spool_dir = PathBuf::from(dir);
        }
    }

    pub fn saga_timeouts(&self) -> SagaTimeouts {
        SagaTimeouts {
            remote: Duration::from_millis(self.proposal_service.timeout_ms),
            publish: self.publish_timeout(),
        }
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.events.publish_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = ContrataConfig::default();
        assert_eq!(config.database_path, PathBuf::from("contrata.db"));
        assert_eq!(config.proposal_service.base_url, None);
        assert_eq!(config.proposal_service.timeout_ms, 5000);
        assert_eq!(config.proposal_service.connect_timeout_ms, 2000);
        assert_eq!(config.events.spool_dir, PathBuf::from("events"));
        assert_eq!(config.publish_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            database_path = "/var/lib/contrata/data.db"

            [proposal_service]
            base_url = "http://propostas:8080"
            timeout_ms = 1500
        "#;
        let config: ContrataConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/var/lib/contrata/data.db"));
        assert_eq!(
            config.proposal_service.base_url.as_deref(),
            Some("http://propostas:8080")
        );
        assert_eq!(config.proposal_service.connect_timeout_ms, 2000);
        assert_eq!(config.events, EventsConfig::default());
        assert_eq!(config.saga_timeouts().remote, Duration::from_millis(1500));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = toml::from_str::<ContrataConfig>("databse_path = \"typo.db\"");
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = ContrataConfig::default();
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_DATABASE_PATH, "/tmp/other.db"),
            (ENV_PROPOSAL_SERVICE_URL, "http://localhost:9000"),
            (ENV_EVENTS_DIR, "   "),
        ]);
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(
            config.proposal_service.base_url.as_deref(),
            Some("http://localhost:9000")
        );
        // Blank values leave the file setting alone.
        assert_eq!(config.events.spool_dir, PathBuf::from("events"));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        std::fs::write(&path, "[events]\npublish_timeout_ms = 750\n").unwrap();

        let config = ContrataConfig::from_file(&path).unwrap();
        assert_eq!(config.publish_timeout(), Duration::from_millis(750));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = ContrataConfig::load(Some(tmp.path().join("absent.toml").as_path())).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
