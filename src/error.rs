//! Error types for the resolution engine
//!
//! Every variant names the component at fault. Configuration errors abort the
//! whole resolution; there is no partially valid output.

use thiserror::Error;

/// Boxed error returned by injected component sources
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the engine
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A component appears as its own transitive dependency
    #[error("dependency cycle detected at component '{component}': {}", path.join(" → "))]
    Cycle {
        component: String,
        path: Vec<String>,
    },

    /// A modification declared without naming the component it targets
    #[error("modification declared by '{origin}' has no target component name")]
    ModificationWithoutTarget { origin: String },

    /// Two volume entries of one service share a container mount point
    #[error(
        "component '{component}': service '{service}' mounts '{target}' more than once"
    )]
    DuplicateMount {
        component: String,
        service: String,
        target: String,
    },

    /// A volume entry that cannot be parsed
    #[error("component '{component}': service '{service}' has malformed volume '{spec}': {reason}")]
    InvalidVolume {
        component: String,
        service: String,
        spec: String,
        reason: String,
    },

    /// A fragment or patch whose structure cannot be navigated
    #[error("component '{component}': {reason}")]
    InvalidFragment { component: String, reason: String },

    /// A component whose source produced no fragment at all
    #[error("component '{component}' could not be resolved to a fragment")]
    MissingFragment { component: String },

    /// Two components would be staged to the same fragment file
    #[error("components '{other}' and '{component}' would both be staged as '{path}'")]
    StagingCollision {
        component: String,
        other: String,
        path: String,
    },

    /// The injected source failed while loading a component
    #[error("failed to load component '{component}'")]
    Source {
        component: String,
        #[source]
        source: SourceError,
    },
}

impl Error {
    pub(crate) fn invalid_fragment(component: &str, reason: impl Into<String>) -> Self {
        Error::InvalidFragment {
            component: component.to_string(),
            reason: reason.into(),
        }
    }

    /// Name of the component this error is about
    pub fn component(&self) -> &str {
        match self {
            Error::Cycle { component, .. }
            | Error::DuplicateMount { component, .. }
            | Error::InvalidVolume { component, .. }
            | Error::InvalidFragment { component, .. }
            | Error::MissingFragment { component }
            | Error::StagingCollision { component, .. }
            | Error::Source { component, .. } => component,
            Error::ModificationWithoutTarget { origin } => origin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_shows_path() {
        let err = Error::Cycle {
            component: "a".to_string(),
            path: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("a → b → a"));
        assert!(msg.contains("cycle"));
        assert_eq!(err.component(), "a");
    }

    #[test]
    fn test_duplicate_mount_names_mount_point() {
        let err = Error::DuplicateMount {
            component: "metrics".to_string(),
            service: "agent".to_string(),
            target: "/etc/conf".to_string(),
        };
        assert!(err.to_string().contains("/etc/conf"));
        assert!(err.to_string().contains("metrics"));
    }

    #[test]
    fn test_source_error_keeps_cause() {
        let cause: SourceError = "file vanished".into();
        let err = Error::Source {
            component: "db".to_string(),
            source: cause,
        };
        let chained = std::error::Error::source(&err).map(|e| e.to_string());
        assert_eq!(chained.as_deref(), Some("file vanished"));
    }
}
