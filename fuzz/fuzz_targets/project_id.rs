//! Fuzz target for certification project id normalization.
//!
//! Normalization must never panic, must reject ids with more than two
//! `-`-separated parts, and must be idempotent on what it accepts.

#![no_main]

use libfuzzer_sys::fuzz_target;

use preflight_domain::{Settings, normalize_project_id, validate_certification_project_id};
use preflight_types::{ConfigKey, RawValue};

fuzz_target!(|id: &str| {
    if id.len() > 4096 {
        return;
    }

    match normalize_project_id(id) {
        Ok(canonical) => {
            assert!(id.split('-').count() <= 2);
            assert!(id.ends_with(canonical));
            // A canonical id of one part stays put.
            if !canonical.contains('-') {
                assert_eq!(normalize_project_id(canonical).ok(), Some(canonical));
            }
        }
        Err(_) => assert!(id.split('-').count() > 2),
    }

    let mut settings = Settings::new();
    settings.set(ConfigKey::CertificationProjectId, RawValue::Str(id.to_string()));
    if validate_certification_project_id(&mut settings).is_ok() {
        let stored = settings.get_text(ConfigKey::CertificationProjectId);
        assert_eq!(normalize_project_id(id).ok(), Some(stored.as_str()));
    }
});
