//! Harness configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;
use crate::poll::{PollPolicy, DEFAULT_DEADLINE, DEFAULT_INTERVAL};

/// Harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Remote-control endpoint of the application under test
    pub remote: RemoteConfig,

    /// Defaults for condition waits
    pub poll: PollConfig,
}

/// Where and how to reach the application's test endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// `unix:/path/to/socket` or `tcp:host:port`
    pub endpoint: Endpoint,

    /// Per-call I/O timeout (none = wait for the reply indefinitely)
    pub io_timeout_ms: Option<u64>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Tcp("127.0.0.1:9229".to_string()),
            io_timeout_ms: None,
        }
    }
}

impl RemoteConfig {
    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout_ms.map(Duration::from_millis)
    }
}

/// Polling defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay between attempts
    pub interval_ms: u64,

    /// Attempt cap
    pub max_attempts: Option<u32>,

    /// Overall deadline; 0 polls until the probe is done
    pub deadline_ms: Option<u64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            max_attempts: None,
            deadline_ms: Some(DEFAULT_DEADLINE.as_millis() as u64),
        }
    }
}

impl PollConfig {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.interval_ms),
            max_attempts: self.max_attempts,
            deadline: self
                .deadline_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
        }
    }
}

/// Address of the remote-control endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Endpoint {
    Unix(PathBuf),
    Tcp(String),
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(Error::InvalidConfig("unix endpoint needs a socket path".to_string()));
            }
            Ok(Endpoint::Unix(PathBuf::from(path)))
        } else if let Some(addr) = s.strip_prefix("tcp:") {
            if !addr.contains(':') {
                return Err(Error::InvalidConfig(format!("tcp endpoint needs host:port, got '{}'", addr)));
            }
            Ok(Endpoint::Tcp(addr.to_string()))
        } else {
            Err(Error::InvalidConfig(format!(
                "endpoint '{}' must start with unix: or tcp:",
                s
            )))
        }
    }
}

impl TryFrom<String> for Endpoint {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp:{}", addr),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when it is missing
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parsing() {
        assert_eq!(
            "unix:/tmp/files.sock".parse::<Endpoint>().unwrap(),
            Endpoint::Unix(PathBuf::from("/tmp/files.sock"))
        );
        assert_eq!(
            "tcp:127.0.0.1:9229".parse::<Endpoint>().unwrap(),
            Endpoint::Tcp("127.0.0.1:9229".to_string())
        );
        assert!("127.0.0.1:9229".parse::<Endpoint>().is_err());
        assert!("tcp:localhost".parse::<Endpoint>().is_err());
        assert!("unix:".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let config: HarnessConfig = toml::from_str(
            r#"
[remote]
endpoint = "unix:/run/files/test.sock"
io_timeout_ms = 5000

[poll]
interval_ms = 50
max_attempts = 20
"#,
        )
        .unwrap();

        assert_eq!(config.remote.endpoint, Endpoint::Unix(PathBuf::from("/run/files/test.sock")));
        assert_eq!(config.remote.io_timeout(), Some(Duration::from_secs(5)));

        let policy = config.poll.policy();
        assert_eq!(policy.interval, Duration::from_millis(50));
        assert_eq!(policy.max_attempts, Some(20));
        assert_eq!(policy.deadline, Some(DEFAULT_DEADLINE));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.poll.policy(), PollPolicy::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("harness.toml");

        let mut config = HarnessConfig::default();
        config.remote.endpoint = Endpoint::Tcp("10.0.0.2:4000".to_string());
        config.poll.deadline_ms = Some(0);
        config.save(&path).unwrap();

        let loaded = HarnessConfig::load(&path).unwrap();
        assert_eq!(loaded.remote.endpoint, config.remote.endpoint);
        assert_eq!(loaded.poll.policy().deadline, None);
    }
}
