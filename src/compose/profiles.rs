//! Profile activation and inclusion
//!
//! Active profiles come from repeatable CLI flags or, when none were given,
//! from one comma-separated environment variable. CLI flags replace the
//! environment value entirely.

/// Environment variable holding the comma-separated active profiles
pub const PROFILES_ENV: &str = "STITCH_PROFILES";

/// Compute the ordered, de-duplicated active profile set
pub fn active_profiles(cli_profiles: &[String], env_value: Option<&str>) -> Vec<String> {
    let mut active = Vec::new();

    if cli_profiles.is_empty() {
        if let Some(raw) = env_value {
            for profile in raw.split(',') {
                push_profile(&mut active, profile);
            }
        }
    } else {
        for profile in cli_profiles {
            push_profile(&mut active, profile);
        }
    }

    active
}

/// Whether a component with `component_profiles` takes part in a resolution.
///
/// Components without profiles are always included; otherwise at least one of
/// their profiles must be active.
pub fn is_included(component_profiles: &[String], active: &[String]) -> bool {
    component_profiles.is_empty() || component_profiles.iter().any(|p| active.contains(p))
}

/// Add profiles not yet present in `target`, preserving order
pub fn union_profiles(target: &mut Vec<String>, extra: &[String]) {
    for profile in extra {
        push_profile(target, profile);
    }
}

fn push_profile(target: &mut Vec<String>, profile: &str) {
    let profile = profile.trim();
    if !profile.is_empty() && !target.iter().any(|p| p == profile) {
        target.push(profile.to_string());
    }
}
