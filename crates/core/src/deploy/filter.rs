use regex_lite::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Excludes resources whose file name or id fully matches a pattern.
#[derive(Clone)]
pub struct ExcludePattern {
    source: String,
    regex: Regex,
}

impl ExcludePattern {
    pub fn new(pattern: &str) -> Result<Self, regex_lite::Error> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Roles reserved for the hosting provider in a provisioned environment:
    /// its role files, plus roles whose id is one of `managed`.
    pub fn provisioned_roles<S: AsRef<str>>(managed: &[S]) -> Result<Self, regex_lite::Error> {
        let mut pattern =
            String::from("(flow-developer-role|flow-operator-role|data-hub-admin-role).*");
        for name in managed {
            pattern.push('|');
            pattern.push_str(&regex_lite::escape(name.as_ref()));
        }
        Self::new(&pattern)
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// True when either the resource file name or its id matches.
    pub fn excludes(&self, file_name: &str, id: &str) -> bool {
        self.matches(file_name) || self.matches(id)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for ExcludePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExcludePattern").field(&self.source).finish()
    }
}

impl PartialEq for ExcludePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for ExcludePattern {}

impl Serialize for ExcludePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for ExcludePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::new(&source).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioned_roles_pattern() {
        let pattern = ExcludePattern::provisioned_roles::<&str>(&[]).unwrap();
        assert!(pattern.matches("flow-developer-role.json"));
        assert!(pattern.matches("data-hub-admin-role.json"));
        assert!(!pattern.matches("data-hub-operator.json"));
        assert!(!pattern.matches("my-flow-developer-role.json"));
    }

    #[test]
    fn test_provisioned_roles_include_managed_names() {
        let pattern = ExcludePattern::provisioned_roles(&["flowOperator", "ops.team"][..]).unwrap();
        assert!(pattern.excludes("ops.json", "flowOperator"));
        assert!(pattern.excludes("ops.json", "ops.team"));
        // names are literal, not patterns
        assert!(!pattern.matches("opsXteam"));
        assert!(!pattern.matches("flowOperator2"));
    }

    #[test]
    fn test_pattern_must_match_whole_candidate() {
        let pattern = ExcludePattern::new("admin").unwrap();
        assert!(pattern.matches("admin"));
        assert!(!pattern.matches("admin.json"));
        assert!(pattern.excludes("admin-role.json", "admin"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(ExcludePattern::new("(unclosed").is_err());
    }
}
