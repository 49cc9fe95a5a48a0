use serde::{Deserialize, Serialize};

/// A role/capability pair granted on deployed modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePermission {
    #[serde(rename = "role-name")]
    pub role: String,
    pub capability: String,
}

impl ModulePermission {
    /// Parses the flat `role,capability,role,capability` property format.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, String> {
        let parts: Vec<&str> = value
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() % 2 != 0 {
            return Err(format!(
                "module permissions must be role,capability pairs: '{}'",
                value
            ));
        }
        Ok(parts
            .chunks(2)
            .map(|pair| Self {
                role: pair[0].to_string(),
                capability: pair[1].to_string(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let perms = ModulePermission::parse_list("rest-reader,read, rest-writer,update").unwrap();
        assert_eq!(perms.len(), 2);
        assert_eq!(perms[1].role, "rest-writer");
        assert_eq!(perms[1].capability, "update");
    }

    #[test]
    fn test_parse_odd_count_fails() {
        assert!(ModulePermission::parse_list("rest-reader,read,orphan").is_err());
        assert!(ModulePermission::parse_list("").unwrap().is_empty());
    }
}
