//! Service volume entries
//!
//! Parses the short `[SOURCE:]TARGET[:MODE]` form and the long mapping form
//! far enough to know the mount point and what kind of source backs it.

use serde_yaml::Value;

/// Access modes accepted in the short syntax
const VALID_MODES: &[&str] = &[
    "ro",
    "rw",
    "z",
    "Z",
    "cached",
    "delegated",
    "consistent",
    "nocopy",
];

/// What a volume entry mounts from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeSource {
    /// No source: an anonymous volume
    Anonymous,
    /// Host path (absolute, relative or home-based)
    Path(String),
    /// Environment variable reference, resolved by the runtime
    Variable(String),
    /// Bare name: a named volume that must be declared at the top level
    Named(String),
}

/// A parsed volume entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub source: VolumeSource,
    pub target: String,
}

impl VolumeMount {
    /// Parse a service volume entry, returning a description of the problem on failure
    pub fn parse(entry: &Value) -> Result<Self, String> {
        match entry {
            Value::String(spec) => Self::parse_short(spec),
            Value::Mapping(long) => {
                let target = long
                    .get("target")
                    .and_then(Value::as_str)
                    .ok_or("long syntax requires a string 'target'")?;
                validate_target(target)?;

                let kind = long.get("type").and_then(Value::as_str);
                let source = match long.get("source").and_then(Value::as_str) {
                    None | Some("") => VolumeSource::Anonymous,
                    Some(source) if kind == Some("bind") => VolumeSource::Path(source.to_string()),
                    Some(source) => classify_source(source),
                };

                Ok(Self {
                    source,
                    target: target.to_string(),
                })
            }
            other => Err(format!("expected a string or mapping, got {other:?}")),
        }
    }

    fn parse_short(spec: &str) -> Result<Self, String> {
        let parts = split_segments(spec);
        if parts.iter().any(|p| p.is_empty()) {
            return Err("empty segment".to_string());
        }

        let (source, target) = match parts.as_slice() {
            [target] => (VolumeSource::Anonymous, *target),
            [source, target] => (classify_source(source), *target),
            [source, target, mode] => {
                validate_mode(mode)?;
                (classify_source(source), *target)
            }
            _ => return Err("expected [SOURCE:]TARGET[:MODE]".to_string()),
        };
        validate_target(target)?;

        Ok(Self {
            source,
            target: target.to_string(),
        })
    }

    /// Name of the volume to declare at the top level, if any
    pub fn named_volume(&self) -> Option<&str> {
        match &self.source {
            VolumeSource::Named(name) => Some(name),
            _ => None,
        }
    }
}

/// Split on `:` outside `${...}` so `${DIR:-./data}:/data` keeps its default
fn split_segments(spec: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut prev = None;

    for (i, c) in spec.char_indices() {
        match c {
            '{' if prev == Some('$') => depth += 1,
            '}' if depth > 0 => depth -= 1,
            ':' if depth == 0 => {
                parts.push(&spec[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        prev = Some(c);
    }
    parts.push(&spec[start..]);
    parts
}

fn classify_source(source: &str) -> VolumeSource {
    if source.starts_with('$') {
        VolumeSource::Variable(source.to_string())
    } else if source.starts_with(['/', '.', '~']) || source.contains(['/', '\\']) {
        VolumeSource::Path(source.to_string())
    } else {
        VolumeSource::Named(source.to_string())
    }
}

fn validate_target(target: &str) -> Result<(), String> {
    if target.starts_with('/') || target.starts_with('$') {
        Ok(())
    } else {
        Err(format!("mount point '{target}' must be an absolute path"))
    }
}

fn validate_mode(mode: &str) -> Result<(), String> {
    match mode.split(',').find(|m| !VALID_MODES.contains(m)) {
        Some(bad) => Err(format!("unknown access mode '{bad}'")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short(spec: &str) -> Result<VolumeMount, String> {
        VolumeMount::parse(&Value::String(spec.to_string()))
    }

    #[test]
    fn test_named_volume() {
        let mount = short("pgdata:/var/lib/postgresql/data").unwrap();
        assert_eq!(mount.source, VolumeSource::Named("pgdata".to_string()));
        assert_eq!(mount.target, "/var/lib/postgresql/data");
        assert_eq!(mount.named_volume(), Some("pgdata"));
    }

    #[test]
    fn test_bind_paths_are_not_named() {
        for spec in ["./conf:/etc/conf", "/srv/conf:/etc/conf:ro", "~/conf:/etc/conf", "conf/dir:/etc/conf"] {
            let mount = short(spec).unwrap();
            assert!(matches!(mount.source, VolumeSource::Path(_)), "{spec}");
            assert_eq!(mount.named_volume(), None);
        }
    }

    #[test]
    fn test_variable_source() {
        let mount = short("${CONF_DIR}:/etc/conf").unwrap();
        assert_eq!(mount.source, VolumeSource::Variable("${CONF_DIR}".to_string()));
    }

    #[test]
    fn test_variable_source_with_default() {
        let mount = short("${DATA_DIR:-./data}:/data").unwrap();
        assert_eq!(
            mount.source,
            VolumeSource::Variable("${DATA_DIR:-./data}".to_string())
        );
        assert_eq!(mount.target, "/data");

        let mount = short("${DATA_DIR:?set DATA_DIR}:/data:ro").unwrap();
        assert_eq!(mount.target, "/data");
        assert_eq!(mount.named_volume(), None);
    }

    #[test]
    fn test_nested_variable_default() {
        let mount = short("${A:-${B:-/srv}}:/srv").unwrap();
        assert_eq!(mount.source, VolumeSource::Variable("${A:-${B:-/srv}}".to_string()));
        assert_eq!(mount.target, "/srv");
    }

    #[test]
    fn test_anonymous_volume() {
        let mount = short("/cache").unwrap();
        assert_eq!(mount.source, VolumeSource::Anonymous);
        assert_eq!(mount.target, "/cache");
    }

    #[test]
    fn test_malformed_short_syntax() {
        assert!(short("a:b:c:d").is_err());
        assert!(short("data:relative/path").is_err());
        assert!(short("data::/x").is_err());
        assert!(short("data:/x:bogus").is_err());
    }

    #[test]
    fn test_combined_modes() {
        assert!(short("data:/x:ro,z").is_ok());
    }

    #[test]
    fn test_long_syntax() {
        let entry: Value =
            serde_yaml::from_str("{type: volume, source: cache, target: /cache}").unwrap();
        let mount = VolumeMount::parse(&entry).unwrap();
        assert_eq!(mount.named_volume(), Some("cache"));

        let entry: Value =
            serde_yaml::from_str("{type: bind, source: conf, target: /etc/conf}").unwrap();
        assert!(matches!(
            VolumeMount::parse(&entry).unwrap().source,
            VolumeSource::Path(_)
        ));

        let entry: Value = serde_yaml::from_str("{type: volume, source: cache}").unwrap();
        assert!(VolumeMount::parse(&entry).is_err());
    }
}
