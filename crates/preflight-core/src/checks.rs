//! Individual checks evaluated by the container check engine.

use crate::engine::EngineSettings;
use crate::reference::ImageReference;

/// Architectures images can be certified for.
pub const SUPPORTED_PLATFORMS: &[&str] = &["amd64", "arm64", "ppc64le", "s390x"];

/// What a check gets to look at.
#[derive(Debug)]
pub struct CheckTarget<'a> {
    pub reference: &'a ImageReference,
    pub settings: &'a EngineSettings,
}

/// Outcome of one check. An `Err` from [`Check::validate`] means the check
/// could not be evaluated at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(String),
}

pub trait Check: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn help(&self) -> &'static str {
        ""
    }
    fn validate(&self, target: &CheckTarget<'_>) -> Result<Verdict, String>;
}

pub struct HasTagOrDigest;

impl Check for HasTagOrDigest {
    fn name(&self) -> &'static str {
        "HasTagOrDigest"
    }

    fn description(&self) -> &'static str {
        "Image reference names an explicit tag or digest"
    }

    fn help(&self) -> &'static str {
        "Reference the image as registry/repository:tag or registry/repository@sha256:<digest>."
    }

    fn validate(&self, target: &CheckTarget<'_>) -> Result<Verdict, String> {
        if target.reference.is_pinned() {
            Ok(Verdict::Pass)
        } else {
            Ok(Verdict::Fail(format!(
                "{} has no tag or digest",
                target.reference
            )))
        }
    }
}

pub struct SupportedPlatform;

impl Check for SupportedPlatform {
    fn name(&self) -> &'static str {
        "SupportedPlatform"
    }

    fn description(&self) -> &'static str {
        "Target platform is one certification is offered for"
    }

    fn help(&self) -> &'static str {
        "Pass --platform with one of amd64, arm64, ppc64le or s390x."
    }

    fn validate(&self, target: &CheckTarget<'_>) -> Result<Verdict, String> {
        let platform = target.settings.platform.as_str();
        if platform.is_empty() {
            return Err("no platform configured".to_string());
        }
        if SUPPORTED_PLATFORMS.contains(&platform) {
            Ok(Verdict::Pass)
        } else {
            Ok(Verdict::Fail(format!("platform {platform} is not supported")))
        }
    }
}

/// The checks run when none are supplied explicitly.
pub fn default_checks() -> Vec<Box<dyn Check>> {
    vec![Box::new(HasTagOrDigest), Box::new(SupportedPlatform)]
}
