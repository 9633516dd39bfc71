use crate::pattern::{Pattern, SubstitutionContext};
use crate::scope::Labels;
use crate::AclError;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// One authorization decision input: everything the ACL can match on.
/// Serializable so external authorizer backends can receive it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthzRequest {
    pub account: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub service: String,
    pub ip: Option<IpAddr>,
    pub labels: Labels,
    pub actions: Vec<String>,
}

/// Match conditions as written in the configuration. Absent fields are
/// wildcards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// One configured ACL record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default, rename = "match")]
    pub match_conditions: MatchConditions,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
enum IpMatcher {
    Exact(IpAddr),
    Net(IpNet),
}

impl IpMatcher {
    fn parse(raw: &str) -> Option<Self> {
        if raw.contains('/') {
            raw.parse::<IpNet>().ok().map(IpMatcher::Net)
        } else {
            raw.parse::<IpAddr>().ok().map(IpMatcher::Exact)
        }
    }

    fn matches(&self, ip: IpAddr) -> bool {
        match self {
            IpMatcher::Exact(expected) => *expected == ip,
            IpMatcher::Net(net) => net.contains(&ip),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledEntry {
    account: Option<Pattern>,
    kind: Option<Pattern>,
    name: Option<Pattern>,
    ip: Option<IpMatcher>,
    service: Option<Pattern>,
    labels: Vec<(String, Pattern)>,
    actions: Vec<String>,
}

impl CompiledEntry {
    fn matches(&self, req: &AuthzRequest) -> bool {
        if let Some(pattern) = &self.account {
            if !pattern.matches(&req.account) {
                return false;
            }
        }
        if let Some(pattern) = &self.kind {
            if !pattern.matches(&req.kind) {
                return false;
            }
        }
        if let Some(pattern) = &self.name {
            let ctx = SubstitutionContext {
                account: &req.account,
                labels: &req.labels,
            };
            if !pattern.matches_with(&req.name, &ctx) {
                return false;
            }
        }
        if let Some(matcher) = &self.ip {
            match req.ip {
                Some(ip) if matcher.matches(ip) => {}
                _ => return false,
            }
        }
        if let Some(pattern) = &self.service {
            if !pattern.matches(&req.service) {
                return false;
            }
        }
        for (key, pattern) in &self.labels {
            // Any value of the label may satisfy the pattern.
            let satisfied = req
                .labels
                .get(key)
                .is_some_and(|values| values.iter().any(|value| pattern.matches(value)));
            if !satisfied {
                return false;
            }
        }
        true
    }
}

/// A compiled, ordered ACL.
#[derive(Debug, Clone)]
pub struct Acl {
    entries: Vec<CompiledEntry>,
}

impl Acl {
    /// Compile the configured entries. All patterns are validated here so
    /// the request path never sees a parse error.
    pub fn compile(entries: &[Entry]) -> Result<Self, AclError> {
        let mut compiled = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            if entry.actions.is_empty() {
                return Err(AclError::EmptyActions { index });
            }
            let pattern = |raw: &Option<String>| -> Result<Option<Pattern>, AclError> {
                raw.as_deref()
                    .map(Pattern::compile)
                    .transpose()
                    .map_err(|source| AclError::BadPattern { index, source })
            };
            let ip = match &entry.match_conditions.ip {
                Some(raw) => Some(IpMatcher::parse(raw).ok_or_else(|| AclError::BadIp {
                    index,
                    ip: raw.clone(),
                })?),
                None => None,
            };
            let labels = entry
                .match_conditions
                .labels
                .iter()
                .flatten()
                .map(|(key, raw)| {
                    Pattern::compile(raw)
                        .map(|pattern| (key.clone(), pattern))
                        .map_err(|source| AclError::BadPattern { index, source })
                })
                .collect::<Result<Vec<_>, _>>()?;
            compiled.push(CompiledEntry {
                account: pattern(&entry.match_conditions.account)?,
                kind: pattern(&entry.match_conditions.kind)?,
                name: pattern(&entry.match_conditions.name)?,
                ip,
                service: pattern(&entry.match_conditions.service)?,
                labels,
                actions: entry.actions.clone(),
            });
        }
        Ok(Self { entries: compiled })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of the actions of every matching entry. The `*` sentinel
    /// expands to the full requested action set. The result is not yet
    /// intersected with the request; the pipeline driver does that.
    pub fn granted_actions(&self, req: &AuthzRequest) -> Vec<String> {
        let mut granted: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !entry.matches(req) {
                continue;
            }
            for action in &entry.actions {
                if action == "*" {
                    for requested in &req.actions {
                        if !granted.iter().any(|a| a == requested) {
                            granted.push(requested.clone());
                        }
                    }
                } else if !granted.iter().any(|a| a == action) {
                    granted.push(action.clone());
                }
            }
        }
        granted
    }

    /// True when at least one entry matches, regardless of actions.
    pub fn matches(&self, req: &AuthzRequest) -> bool {
        self.entries.iter().any(|entry| entry.matches(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(account: &str, kind: &str, name: &str, actions: &[&str]) -> AuthzRequest {
        AuthzRequest {
            account: account.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            service: "registry.test".to_string(),
            ip: None,
            labels: Labels::new(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn entry(conditions: MatchConditions, actions: &[&str]) -> Entry {
        Entry {
            match_conditions: conditions,
            actions: actions.iter().map(|a| a.to_string()).collect(),
            comment: None,
        }
    }

    #[test]
    fn empty_conditions_match_everything() {
        let acl = Acl::compile(&[entry(MatchConditions::default(), &["pull"])]).expect("acl");
        let req = request("", "repository", "alpine", &["pull", "push"]);
        assert_eq!(acl.granted_actions(&req), vec!["pull"]);
    }

    #[test]
    fn star_expands_to_requested_actions() {
        let acl = Acl::compile(&[entry(MatchConditions::default(), &["*"])]).expect("acl");
        let req = request("ci", "repository", "alpine", &["pull", "push"]);
        assert_eq!(acl.granted_actions(&req), vec!["pull", "push"]);
    }

    #[test]
    fn star_with_no_requested_actions_grants_nothing() {
        let acl = Acl::compile(&[entry(MatchConditions::default(), &["*"])]).expect("acl");
        let req = request("ci", "repository", "alpine", &[]);
        assert!(acl.granted_actions(&req).is_empty());
    }

    #[test]
    fn account_substitution_in_name() {
        let conditions = MatchConditions {
            account: Some("/.+/".to_string()),
            name: Some("${account}/*".to_string()),
            ..Default::default()
        };
        let acl = Acl::compile(&[entry(conditions, &["*"])]).expect("acl");

        let own = request("alice", "repository", "alice/web", &["pull", "push"]);
        assert_eq!(acl.granted_actions(&own), vec!["pull", "push"]);

        let other = request("alice", "repository", "bob/web", &["pull"]);
        assert!(acl.granted_actions(&other).is_empty());
    }

    #[test]
    fn label_condition_is_a_disjunction_over_values() {
        let mut label_conditions = HashMap::new();
        label_conditions.insert("team".to_string(), "eng".to_string());
        let conditions = MatchConditions {
            labels: Some(label_conditions),
            ..Default::default()
        };
        let acl = Acl::compile(&[entry(conditions, &["push"])]).expect("acl");

        let mut req = request("dev", "repository", "x", &["pull", "push"]);
        req.labels
            .insert("team".to_string(), vec!["eng".to_string(), "ops".to_string()]);
        assert_eq!(acl.granted_actions(&req), vec!["push"]);

        req.labels.insert("team".to_string(), vec!["ops".to_string()]);
        assert!(acl.granted_actions(&req).is_empty());
    }

    #[test]
    fn entries_union_in_order() {
        let push_for_eng = {
            let mut labels = HashMap::new();
            labels.insert("team".to_string(), "eng".to_string());
            entry(
                MatchConditions {
                    labels: Some(labels),
                    ..Default::default()
                },
                &["push"],
            )
        };
        let pull_everywhere = entry(MatchConditions::default(), &["pull"]);
        let acl = Acl::compile(&[push_for_eng, pull_everywhere]).expect("acl");

        let mut req = request("dev", "repository", "x", &["pull", "push"]);
        req.labels.insert("team".to_string(), vec!["eng".to_string()]);
        assert_eq!(acl.granted_actions(&req), vec!["push", "pull"]);
    }

    #[test]
    fn ip_condition_supports_cidr_and_exact() {
        let cidr = entry(
            MatchConditions {
                ip: Some("10.0.0.0/8".to_string()),
                ..Default::default()
            },
            &["pull"],
        );
        let acl = Acl::compile(&[cidr]).expect("acl");

        let mut req = request("", "repository", "x", &["pull"]);
        req.ip = Some("10.1.2.3".parse().unwrap());
        assert_eq!(acl.granted_actions(&req), vec!["pull"]);

        req.ip = Some("192.168.0.1".parse().unwrap());
        assert!(acl.granted_actions(&req).is_empty());

        // An entry with an ip condition never matches a request without
        // a resolved client address.
        req.ip = None;
        assert!(acl.granted_actions(&req).is_empty());
    }

    #[test]
    fn bad_cidr_fails_compilation() {
        let bad = entry(
            MatchConditions {
                ip: Some("10.0.0.0/40".to_string()),
                ..Default::default()
            },
            &["pull"],
        );
        assert!(Acl::compile(&[bad]).is_err());
    }

    #[test]
    fn entries_deserialize_from_yaml() {
        let yaml = r#"
- match: {account: "admin"}
  actions: ["*"]
  comment: "Admin has full access to everything."
- match: {account: "/.+/", name: "${account}/*"}
  actions: ["*"]
- match: {account: "", type: "registry", name: "catalog"}
  actions: ["*"]
"#;
        let entries: Vec<Entry> = serde_yaml::from_str(yaml).expect("yaml");
        assert_eq!(entries.len(), 3);
        let acl = Acl::compile(&entries).expect("acl");
        assert_eq!(acl.len(), 3);

        let req = request("admin", "repository", "anything", &["pull", "push"]);
        assert_eq!(acl.granted_actions(&req), vec!["pull", "push"]);
    }
}
