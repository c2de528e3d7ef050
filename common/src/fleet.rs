//! Fleet configuration file
//!
//! Describes the clusters logs are collected from. The file is TOML:
//!
//! ```toml
//! [default]
//! destination = "logs"   # absolute, or relative to the executable's directory
//! duration = "1h"
//! cluster = "prod"
//! share_prefix = "//"    # prepended to every server host
//!
//! [clusters.prod]
//! logshare = "SPSS_DIMENSIONS_LOGS"
//!
//! [clusters.prod.servers]
//! web01 = "10.0.0.11"
//! web02 = "10.0.0.12"
//! ```
//!
//! Each server's logs are read from `<share_prefix><host>/<logshare>`.

use std::collections::BTreeMap;

use crate::sync::ServerTarget;

/// Log share used by clusters that don't name one
pub const DEFAULT_LOGSHARE: &str = "SPSS_DIMENSIONS_LOGS";

/// Prefix turning a host into a network share path
pub const DEFAULT_SHARE_PREFIX: &str = "//";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot open config file {path:?}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file {path:?}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid duration {value:?} in config file")]
    Duration {
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("no destination configured, set `destination` in the [default] section")]
    MissingDestination,
    #[error("cluster {0:?} is not configured")]
    UnknownCluster(String),
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    pub destination: Option<std::path::PathBuf>,
    pub duration: Option<String>,
    pub cluster: Option<String>,
    #[serde(default = "default_share_prefix")]
    pub share_prefix: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            destination: None,
            duration: None,
            cluster: None,
            share_prefix: default_share_prefix(),
        }
    }
}

fn default_share_prefix() -> String {
    DEFAULT_SHARE_PREFIX.to_string()
}

fn default_logshare() -> String {
    DEFAULT_LOGSHARE.to_string()
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cluster {
    #[serde(default = "default_logshare")]
    pub logshare: String,
    /// Server name -> host
    #[serde(default)]
    pub servers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FleetConfig {
    #[serde(default)]
    pub default: Defaults,
    #[serde(default)]
    pub clusters: BTreeMap<String, Cluster>,
}

impl std::str::FromStr for FleetConfig {
    type Err = toml::de::Error;
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        toml::from_str(text)
    }
}

impl FleetConfig {
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        tracing::debug!("loading config from {:?}", path);
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        text.parse().map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Default window length / retention age, if configured
    pub fn duration(&self) -> Result<Option<std::time::Duration>, ConfigError> {
        self.default
            .duration
            .as_deref()
            .map(|value| {
                humantime::parse_duration(value).map_err(|source| ConfigError::Duration {
                    value: value.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Root all clusters are collected into, relative paths are resolved against `base_dir`
    pub fn destination_root(
        &self,
        base_dir: &std::path::Path,
    ) -> Result<std::path::PathBuf, ConfigError> {
        let destination = self
            .default
            .destination
            .as_ref()
            .ok_or(ConfigError::MissingDestination)?;
        if destination.is_absolute() {
            Ok(destination.clone())
        } else {
            Ok(base_dir.join(destination))
        }
    }

    /// Servers of `cluster` along with the share their logs are read from
    pub fn targets(&self, cluster: &str) -> Result<Vec<ServerTarget>, ConfigError> {
        let config = self
            .clusters
            .get(cluster)
            .ok_or_else(|| ConfigError::UnknownCluster(cluster.to_string()))?;
        Ok(config
            .servers
            .iter()
            .map(|(name, host)| ServerTarget {
                name: name.clone(),
                source: std::path::PathBuf::from(format!("{}{}", self.default.share_prefix, host))
                    .join(&config.logshare),
            })
            .collect())
    }
}

/// `<executable>.toml`, the config file used when none is given on the command line
pub fn default_path() -> std::io::Result<std::path::PathBuf> {
    let mut path = std::env::current_exe()?.into_os_string();
    path.push(".toml");
    Ok(path.into())
}

/// Directory of the running executable, relative destinations are resolved against it
pub fn executable_dir() -> std::io::Result<std::path::PathBuf> {
    let exe = std::env::current_exe()?;
    Ok(exe
        .parent()
        .map(std::path::Path::to_path_buf)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[default]
destination = "collected"
duration = "15m"
cluster = "prod"

[clusters.prod]
logshare = "LOGS"

[clusters.prod.servers]
web01 = "10.0.0.11"
web02 = "10.0.0.12"

[clusters.test.servers]
box = "testbox"
"#;

    #[test]
    fn parses_sample() {
        let config: FleetConfig = SAMPLE.parse().unwrap();
        assert_eq!(config.default.cluster.as_deref(), Some("prod"));
        assert_eq!(
            config.duration().unwrap(),
            Some(std::time::Duration::from_secs(15 * 60))
        );
        assert_eq!(config.clusters.len(), 2);
    }

    #[test]
    fn targets_are_built_from_share_prefix_host_and_logshare() {
        let config: FleetConfig = SAMPLE.parse().unwrap();
        let targets = config.targets("prod").unwrap();
        assert_eq!(
            targets,
            vec![
                ServerTarget {
                    name: "web01".to_string(),
                    source: "//10.0.0.11/LOGS".into(),
                },
                ServerTarget {
                    name: "web02".to_string(),
                    source: "//10.0.0.12/LOGS".into(),
                },
            ]
        );
    }

    #[test]
    fn logshare_defaults_when_missing() {
        let config: FleetConfig = SAMPLE.parse().unwrap();
        let targets = config.targets("test").unwrap();
        assert_eq!(
            targets[0].source,
            std::path::PathBuf::from(format!("//testbox/{DEFAULT_LOGSHARE}"))
        );
    }

    #[test]
    fn unknown_cluster_is_an_error() {
        let config: FleetConfig = SAMPLE.parse().unwrap();
        assert!(matches!(
            config.targets("staging"),
            Err(ConfigError::UnknownCluster(name)) if name == "staging"
        ));
    }

    #[test]
    fn relative_destination_is_resolved_against_base() {
        let config: FleetConfig = SAMPLE.parse().unwrap();
        let base = std::path::Path::new("/opt/rlogsync");
        assert_eq!(
            config.destination_root(base).unwrap(),
            std::path::PathBuf::from("/opt/rlogsync/collected")
        );
        let absolute: FleetConfig = "[default]\ndestination = \"/srv/logs\"".parse().unwrap();
        assert_eq!(
            absolute.destination_root(base).unwrap(),
            std::path::PathBuf::from("/srv/logs")
        );
    }

    #[test]
    fn missing_destination_is_an_error() {
        let config: FleetConfig = "".parse().unwrap();
        assert!(matches!(
            config.destination_root(std::path::Path::new("/")),
            Err(ConfigError::MissingDestination)
        ));
        assert_eq!(config.duration().unwrap(), None);
    }

    #[test]
    fn bad_duration_is_an_error() {
        let config: FleetConfig = "[default]\nduration = \"soon\"".parse().unwrap();
        assert!(matches!(config.duration(), Err(ConfigError::Duration { .. })));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!("[default]\ndestinaton = \"typo\"".parse::<FleetConfig>().is_err());
    }

    #[test]
    fn load_reports_path() {
        let path = std::path::Path::new("/nonexistent/rlogsync.toml");
        let error = FleetConfig::load(path).unwrap_err();
        assert!(error.to_string().contains("/nonexistent/rlogsync.toml"));
    }
}
