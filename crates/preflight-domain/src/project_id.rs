//! Certification project identifier normalization.
//!
//! Two shapes are accepted: the canonical single token (`5f6c...`) and the
//! legacy `ospid-<token>`. Anything with more than two hyphen-separated parts
//! cannot be used to query Pyxis.

use preflight_types::{ConfigKey, RawValue, LEGACY_PROJECT_ID_PREFIX};
use tracing::debug;

use crate::settings::Settings;
use crate::validate::ValidationError;

/// Return the canonical form of `id`.
pub fn normalize_project_id(id: &str) -> Result<&str, ValidationError> {
    let parts: Vec<&str> = id.split('-').collect();

    match parts.as_slice() {
        [prefix, rest] if *prefix == LEGACY_PROJECT_ID_PREFIX => Ok(*rest),
        [_] | [_, _] => Ok(id),
        _ => Err(ValidationError::MalformedProjectId { id: id.to_string() }),
    }
}

/// Normalize the configured project id in place so every later reader sees
/// the canonical form.
pub fn validate_certification_project_id(settings: &mut Settings) -> Result<(), ValidationError> {
    let configured = settings.get_text(ConfigKey::CertificationProjectId);
    let canonical = normalize_project_id(&configured)?;

    if canonical != configured {
        debug!(
            from = %configured,
            to = %canonical,
            "rewrote legacy certification project id"
        );
        settings.set(
            ConfigKey::CertificationProjectId,
            RawValue::Str(canonical.to_string()),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_id_collapses_to_second_part() {
        assert_eq!(normalize_project_id("ospid-12345").unwrap(), "12345");
    }

    #[test]
    fn canonical_id_is_unchanged() {
        assert_eq!(normalize_project_id("12345").unwrap(), "12345");
        assert_eq!(normalize_project_id("").unwrap(), "");
    }

    #[test]
    fn other_two_part_ids_are_unchanged() {
        assert_eq!(normalize_project_id("foo-12345").unwrap(), "foo-12345");
    }

    #[test]
    fn three_parts_is_malformed() {
        let err = normalize_project_id("a-b-c").unwrap_err();
        assert!(matches!(err, ValidationError::MalformedProjectId { ref id } if id == "a-b-c"));
        assert!(normalize_project_id("ospid-1-2").is_err());
    }

    #[test]
    fn settings_are_rewritten_for_legacy_ids() {
        let mut s = Settings::new();
        s.set_flag(
            ConfigKey::CertificationProjectId,
            RawValue::Str("ospid-777".to_string()),
        );
        validate_certification_project_id(&mut s).unwrap();
        assert_eq!(s.get_text(ConfigKey::CertificationProjectId), "777");
    }

    #[test]
    fn settings_untouched_for_canonical_ids() {
        let mut s = Settings::new();
        s.set_flag(
            ConfigKey::CertificationProjectId,
            RawValue::Str("777".to_string()),
        );
        validate_certification_project_id(&mut s).unwrap();
        assert_eq!(
            s.source(ConfigKey::CertificationProjectId),
            Some(crate::settings::Layer::Flag)
        );
    }
}
