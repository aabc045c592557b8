//! Environment metadata written once before the test: host, target container, tool versions.
//!
//! Only used for the chart header and the local core count. Absent or unparsable → `None`.

use std::{collections::BTreeMap, fmt, fs, path::Path};

use log::{info, warn};
use serde::Deserialize;

/// A leaf value that producers emit either as a JSON number or as a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInfo {
    pub os: Option<Scalar>,
    pub arch: Option<Scalar>,
    #[serde(alias = "cpuCount", alias = "cpu")]
    pub cpus: Option<Scalar>,
    #[serde(alias = "mem", alias = "memoryTotal")]
    pub memory: Option<Scalar>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    pub name: Option<Scalar>,
    pub image: Option<Scalar>,
    #[serde(alias = "cpus")]
    pub cpu_limit: Option<Scalar>,
    #[serde(alias = "memory")]
    pub memory_limit: Option<Scalar>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentMetadata {
    #[serde(default)]
    pub host: HostInfo,
    #[serde(default)]
    pub container: ContainerInfo,
    #[serde(default)]
    pub versions: BTreeMap<String, Scalar>,
    pub test_date_local: Option<String>,
}

fn field(label: &str, value: &Option<Scalar>) -> Option<String> {
    value.as_ref().map(|v| format!("{} {}", label, v))
}

impl EnvironmentMetadata {
    /// Logical CPUs of the host the test ran on, if recorded.
    pub fn host_cpus(&self) -> Option<f64> {
        self.host.cpus.as_ref().and_then(Scalar::as_f64).filter(|n| *n > 0.0)
    }

    pub fn describe_host(&self) -> Option<String> {
        let h = &self.host;
        let parts: Vec<String> = [
            field("OS", &h.os),
            field("arch", &h.arch),
            field("CPUs", &h.cpus),
            field("RAM", &h.memory),
        ]
        .into_iter()
        .flatten()
        .collect();
        (!parts.is_empty()).then(|| format!("Host: {}", parts.join(" | ")))
    }

    pub fn describe_container(&self) -> Option<String> {
        let c = &self.container;
        let parts: Vec<String> = [
            field("name", &c.name),
            field("image", &c.image),
            field("CPU limit", &c.cpu_limit),
            field("memory limit", &c.memory_limit),
        ]
        .into_iter()
        .flatten()
        .collect();
        (!parts.is_empty()).then(|| format!("Container: {}", parts.join(" | ")))
    }

    pub fn describe_versions(&self) -> Option<String> {
        if self.versions.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .versions
            .iter()
            .map(|(tool, v)| format!("{} {}", tool, v))
            .collect();
        Some(format!("Versions: {}", parts.join(" | ")))
    }
}

pub fn parse_environment(text: &str) -> serde_json::Result<EnvironmentMetadata> {
    serde_json::from_str(text)
}

pub fn load_environment(path: &Path) -> Option<EnvironmentMetadata> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            warn!("Environment metadata {:?} unavailable ({})", path, e);
            return None;
        }
    };
    match parse_environment(&text) {
        Ok(env) => {
            info!("Loaded environment metadata from {:?}", path);
            Some(env)
        }
        Err(e) => {
            warn!("Ignoring unparsable environment metadata {:?}: {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "host": {"os": "Linux", "arch": "x86_64", "cpus": 8, "memory": "31.2 GiB"},
        "container": {"name": "api", "image": "shop/api:1.4", "cpuLimit": "2", "memoryLimit": "1g"},
        "versions": {"k6": "v0.49.0", "docker": "25.0.3"},
        "testDateLocal": "2024-05-01 10:00:00 CEST"
    }"#;

    #[test]
    fn parses_full_document() {
        let env = parse_environment(SAMPLE).unwrap();
        assert_eq!(env.host_cpus(), Some(8.0));
        assert_eq!(
            env.describe_host().unwrap(),
            "Host: OS Linux | arch x86_64 | CPUs 8 | RAM 31.2 GiB"
        );
        assert_eq!(
            env.describe_container().unwrap(),
            "Container: name api | image shop/api:1.4 | CPU limit 2 | memory limit 1g"
        );
        assert_eq!(env.describe_versions().unwrap(), "Versions: docker 25.0.3 | k6 v0.49.0");
        assert_eq!(env.test_date_local.as_deref(), Some("2024-05-01 10:00:00 CEST"));
    }

    #[test]
    fn partial_document_is_accepted() {
        let env = parse_environment(r#"{"host": {"cpus": "4"}}"#).unwrap();
        assert_eq!(env.host_cpus(), Some(4.0));
        assert_eq!(env.describe_container(), None);
        assert_eq!(env.describe_versions(), None);
    }

    #[test]
    fn missing_file_is_none() {
        assert_eq!(load_environment(Path::new("/nonexistent/loadtest/env.json")), None);
    }
}
