use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_FILE: &str = "setting.json";
pub const DEFAULT_ELEMENTS_HOST: &str = "127.0.0.1";
pub const DEFAULT_ELEMENTS_PORT: u16 = 7041;

/// Per-invocation configuration, read from a JSON file such as:
///
/// ```json
/// {
///   "elements": { "username": "user", "password": "pass", "port": 7041, "wallet": "main" },
///   "assets": { "USD": "aaaa...64 hex chars" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub elements: ElementsConfig,
    /// Asset label -> asset id overrides
    pub assets: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementsConfig {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub wallet: Option<String>,
    pub passphrase: Option<String>,
}

impl Default for ElementsConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            host: DEFAULT_ELEMENTS_HOST.to_string(),
            port: DEFAULT_ELEMENTS_PORT,
            wallet: None,
            passphrase: None,
        }
    }
}

impl ElementsConfig {
    /// Node URL without credentials, pointing at the wallet endpoint when a
    /// wallet name is configured.
    pub fn rpc_url(&self) -> String {
        match self.wallet.as_deref().filter(|w| !w.is_empty()) {
            Some(wallet) => format!(
                "http://{host}:{port}/wallet/{wallet}",
                host = self.host,
                port = self.port
            ),
            None => format!("http://{host}:{port}", host = self.host, port = self.port),
        }
    }

    /// Basic auth credentials, if a username is configured.
    pub fn credentials(&self) -> Option<(String, String)> {
        if self.username.is_empty() {
            None
        } else {
            Some((self.username.clone(), self.password.clone()))
        }
    }
}

impl Config {
    /// Loads the configuration file. A missing, unreadable or malformed file
    /// yields the default configuration.
    pub fn load(path: &Path) -> Self {
        if !path.is_file() {
            debug!("No configuration file at {}", path.display());
            return Self::default();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Ignoring unreadable configuration {}: {e}", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str::<Self>(&content) {
            Ok(config) => {
                debug!(
                    "Loaded configuration from {} ({count} asset labels)",
                    path.display(),
                    count = config.assets.len()
                );
                config
            }
            Err(e) => {
                warn!("Ignoring malformed configuration {}: {e}", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load(Path::new("/nonexistent/liquidtx/setting.json"));
        assert_eq!(config, Config::default());
        assert_eq!(config.elements.host, "127.0.0.1");
        assert_eq!(config.elements.port, 7041);
    }

    #[test]
    fn test_malformed_file_gives_defaults() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, "{{ not json")?;

        assert_eq!(Config::load(file.path()), Config::default());
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"{{"elements": {{"username": "rpcuser", "password": "rpcpass", "wallet": "main"}},
                "assets": {{"USD": "{id}"}}}}"#,
            id = "a".repeat(64)
        )?;

        let config = Config::load(file.path());
        assert_eq!(config.elements.username, "rpcuser");
        assert_eq!(config.elements.port, DEFAULT_ELEMENTS_PORT);
        assert_eq!(config.elements.wallet.as_deref(), Some("main"));
        assert_eq!(config.assets.get("USD"), Some(&"a".repeat(64)));
        Ok(())
    }

    #[test]
    fn test_rpc_url() {
        let mut elements = ElementsConfig::default();
        assert_eq!(elements.rpc_url(), "http://127.0.0.1:7041");

        elements.host = "node.local".to_string();
        elements.port = 18884;
        elements.wallet = Some("hot".to_string());
        assert_eq!(elements.rpc_url(), "http://node.local:18884/wallet/hot");

        elements.wallet = Some(String::new());
        assert_eq!(elements.rpc_url(), "http://node.local:18884");
    }

    #[test]
    fn test_credentials() {
        let mut elements = ElementsConfig::default();
        assert_eq!(elements.credentials(), None);

        elements.username = "user".to_string();
        elements.password = "pw".to_string();
        assert_eq!(
            elements.credentials(),
            Some(("user".to_string(), "pw".to_string()))
        );
    }
}
