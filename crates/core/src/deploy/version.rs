//! Target server software version and version-gated server fields.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid server version '{0}': expected e.g. 10.0-4 or 11.1.0")]
pub struct VersionError(String);

/// `major.minor-patch[.sub]` or `major.minor.patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Whether a server configuration field may be sent to this version.
    /// Fields without a known minimum are always allowed.
    pub fn supports_server_field(&self, field: &str) -> bool {
        SERVER_FIELD_MINIMUMS
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, minimum)| self >= minimum)
            .unwrap_or(true)
    }

    /// Removes the top-level fields this version would reject. Returns the
    /// names of the dropped fields.
    pub fn strip_unsupported_server_fields(&self, payload: &mut serde_json::Value) -> Vec<String> {
        let Some(object) = payload.as_object_mut() else {
            return Vec::new();
        };
        let dropped: Vec<String> = object
            .keys()
            .filter(|field| !self.supports_server_field(field))
            .cloned()
            .collect();
        for field in &dropped {
            object.remove(field);
        }
        dropped
    }
}

/// Server fields and the first version that accepts them.
const SERVER_FIELD_MINIMUMS: &[(&str, ServerVersion)] = &[
    ("ssl-min-allow-tls", ServerVersion::new(9, 0, 4)),
    ("ssl-disable-tlsv1-3", ServerVersion::new(10, 0, 7)),
    ("output-encoding-fallback", ServerVersion::new(10, 0, 2)),
    ("session-timeout", ServerVersion::new(10, 0, 4)),
    ("request-log-level", ServerVersion::new(11, 0, 0)),
];

impl FromStr for ServerVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError(s.to_string());
        let number = |part: &str| part.trim().parse::<u32>().map_err(|_| invalid());

        let (release, patch) = match s.split_once('-') {
            Some((release, patch)) => {
                let patch = patch.split('.').next().ok_or_else(invalid)?;
                (release, Some(number(patch)?))
            }
            None => (s, None),
        };

        let mut parts = release.split('.');
        let major = number(parts.next().ok_or_else(invalid)?)?;
        let minor = number(parts.next().ok_or_else(invalid)?)?;
        let patch = match (patch, parts.next()) {
            (Some(_), Some(_)) => return Err(invalid()),
            (Some(patch), None) => patch,
            (None, Some(part)) => number(part)?,
            (None, None) => 0,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self::new(major, minor, patch))
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}-{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for ServerVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ServerVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_formats() {
        assert_eq!("10.0-4".parse::<ServerVersion>(), Ok(ServerVersion::new(10, 0, 4)));
        assert_eq!("10.0-4.2".parse::<ServerVersion>(), Ok(ServerVersion::new(10, 0, 4)));
        assert_eq!("11.1.0".parse::<ServerVersion>(), Ok(ServerVersion::new(11, 1, 0)));
        assert_eq!("9.0".parse::<ServerVersion>(), Ok(ServerVersion::new(9, 0, 0)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("latest".parse::<ServerVersion>().is_err());
        assert!("10".parse::<ServerVersion>().is_err());
        assert!("10.0.1-2".parse::<ServerVersion>().is_err());
        assert!("1.2.3.4".parse::<ServerVersion>().is_err());
    }

    #[test]
    fn test_unsupported_fields_are_stripped() {
        let version: ServerVersion = "10.0-4".parse().unwrap();
        let mut payload = json!({
            "server-name": "data-hub-FINAL",
            "ssl-min-allow-tls": "1.2",
            "ssl-disable-tlsv1-3": true,
            "session-timeout": 3600,
        });

        let dropped = version.strip_unsupported_server_fields(&mut payload);
        assert_eq!(dropped, vec!["ssl-disable-tlsv1-3".to_string()]);
        assert_eq!(payload["ssl-min-allow-tls"], "1.2");
        assert_eq!(payload["session-timeout"], 3600);
        assert!(payload.get("ssl-disable-tlsv1-3").is_none());
    }

    #[test]
    fn test_display_round_trips() {
        let version = ServerVersion::new(10, 0, 7);
        assert_eq!(version.to_string(), "10.0-7");
        assert_eq!(version.to_string().parse::<ServerVersion>(), Ok(version));
    }
}
