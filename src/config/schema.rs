//! Hosts file document types.
//!
//! The document is first checked against the JSON schema as a raw
//! `serde_json::Value`, then deserialized into these types. Mappings keep
//! their declaration order, which decides pattern precedence and the
//! fallback certificate.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer};

use crate::routing::router::port_from_number;
use crate::routing::{DefaultPolicy, LoopDetected, RoutingTable};
use crate::tls::CertSpec;

/// Root of the hosts file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigDocument {
    /// Hostname or pattern → destination port.
    #[serde(default, deserialize_with = "deserialize_ports")]
    pub hosts: IndexMap<String, u16>,

    /// Behaviour for hosts that match nothing.
    #[serde(default)]
    pub default: DefaultPolicy,

    /// Hostname or pattern → certificate files. Absent means plaintext.
    #[serde(default)]
    pub https: Option<IndexMap<String, CertPaths>>,
}

/// Certificate file locations for one `https` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CertPaths {
    pub key: PathBuf,
    pub cert: PathBuf,
    #[serde(default)]
    pub ca: Vec<PathBuf>,
}

fn deserialize_ports<'de, D>(deserializer: D) -> Result<IndexMap<String, u16>, D::Error>
where
    D: Deserializer<'de>,
{
    IndexMap::<String, serde_json::Number>::deserialize(deserializer)?
        .into_iter()
        .map(|(host, number)| match port_from_number(&number) {
            Some(port) => Ok((host, port)),
            None => Err(de::Error::custom(format!("host {}: {} is not a valid port", host, number))),
        })
        .collect()
}

impl ConfigDocument {
    /// Whether the document enables TLS.
    pub fn tls_enabled(&self) -> bool {
        self.https.is_some()
    }

    /// Build the routing table for this document.
    pub fn routing_table(&self, listen_port: u16) -> Result<RoutingTable, LoopDetected> {
        RoutingTable::new(
            self.hosts.iter().map(|(host, port)| (host.as_str(), *port)),
            self.default,
            listen_port,
        )
    }

    /// Certificates to load: one per `hosts` key that also appears verbatim
    /// as an `https` key.
    pub fn cert_specs(&self) -> Vec<CertSpec> {
        let Some(https) = &self.https else {
            return Vec::new();
        };
        self.hosts
            .keys()
            .filter_map(|host| https.get(host).map(|paths| CertSpec::new(host.clone(), paths)))
            .collect()
    }

    /// Certificate served when SNI resolution finds nothing: the first
    /// `https` entry.
    pub fn fallback_cert_spec(&self) -> Option<CertSpec> {
        self.https
            .as_ref()
            .and_then(|https| https.first())
            .map(|(host, paths)| CertSpec::new(host.clone(), paths))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: serde_json::Value) -> ConfigDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_hosts_keep_declaration_order() {
        let doc = document(json!({
            "hosts": { "z.example.com": 1, "*.example.com": 2, "a.example.com": 3 },
            "default": { "behaviour": "error" }
        }));
        let keys: Vec<&str> = doc.hosts.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z.example.com", "*.example.com", "a.example.com"]);
        assert!(!doc.tls_enabled());
        assert!(doc.cert_specs().is_empty());
        assert!(doc.fallback_cert_spec().is_none());
    }

    #[test]
    fn test_missing_default_is_error() {
        let doc = document(json!({ "hosts": {} }));
        assert_eq!(doc.default, DefaultPolicy::Error);
    }

    #[test]
    fn test_cert_specs_use_exact_keys_only() {
        let doc = document(json!({
            "hosts": { "a.example.com": 9001, "b.example.com": 9002 },
            "default": { "behaviour": "bounce", "port": 9000 },
            "https": {
                "*.example.com": { "key": "w.key", "cert": "w.pem" },
                "b.example.com": { "key": "b.key", "cert": "b.pem", "ca": ["ca.pem"] }
            }
        }));
        let specs = doc.cert_specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].hostname, "b.example.com");
        assert_eq!(specs[0].ca_paths, vec![PathBuf::from("ca.pem")]);

        let fallback = doc.fallback_cert_spec().unwrap();
        assert_eq!(fallback.hostname, "*.example.com");
        assert_eq!(fallback.key_path, PathBuf::from("w.key"));
    }

    #[test]
    fn test_routing_table_from_document() {
        let doc = document(json!({
            "hosts": { "a.example.com": 9001 },
            "default": { "behaviour": "error" }
        }));
        let table = doc.routing_table(8080).unwrap();
        assert_eq!(table.lookup("a.example.com"), Some(9001));
        assert!(doc.routing_table(9001).is_err());
    }

    #[test]
    fn test_whole_float_ports_accepted() {
        let doc = document(json!({ "hosts": { "a.example.com": 9001.0 } }));
        assert_eq!(doc.hosts["a.example.com"], 9001);

        let fractional = json!({ "hosts": { "a.example.com": 9001.5 } });
        assert!(serde_json::from_value::<ConfigDocument>(fractional).is_err());
    }
}
