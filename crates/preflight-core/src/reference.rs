//! Container image references (`registry/repo/name:tag@sha256:...`).

use std::fmt;

use serde::Serialize;

pub const DEFAULT_REGISTRY: &str = "docker.io";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("image reference is empty")]
    Empty,
    #[error("invalid repository name {0:?}")]
    InvalidRepository(String),
    #[error("invalid tag {0:?}")]
    InvalidTag(String),
    #[error("invalid digest {0:?}")]
    InvalidDigest(String),
}

impl ImageReference {
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let (name_and_tag, digest) = match input.split_once('@') {
            Some((n, d)) => (n, Some(parse_digest(d)?)),
            None => (input, None),
        };

        // A ':' after the last '/' separates the tag; earlier ones belong to a registry port.
        let last_slash = name_and_tag.rfind('/').map_or(0, |i| i + 1);
        let (name, tag) = match name_and_tag[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                let tag = &name_and_tag[split + 1..];
                if !valid_tag(tag) {
                    return Err(ReferenceError::InvalidTag(tag.to_string()));
                }
                (&name_and_tag[..split], Some(tag.to_string()))
            }
            None => (name_and_tag, None),
        };

        let (registry, repository) = split_registry(name);
        if repository.is_empty() || !repository.split('/').all(valid_path_component) {
            return Err(ReferenceError::InvalidRepository(name.to_string()));
        }

        Ok(Self {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// Carries an explicit tag or a digest.
    pub fn is_pinned(&self) -> bool {
        self.digest.is_some() || self.tag.is_some()
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

fn split_registry(name: &str) -> (String, String) {
    match name.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (first.to_string(), rest.to_string())
        }
        Some(_) => (DEFAULT_REGISTRY.to_string(), name.to_string()),
        None => (DEFAULT_REGISTRY.to_string(), format!("library/{name}")),
    }
}

fn valid_path_component(c: &str) -> bool {
    !c.is_empty()
        && c
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || "._-".contains(ch))
        && c.starts_with(|ch: char| ch.is_ascii_alphanumeric())
}

fn valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag.len() <= 128
        && tag.starts_with(|ch: char| ch.is_ascii_alphanumeric() || ch == '_')
        && tag
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "_.-".contains(ch))
}

fn parse_digest(d: &str) -> Result<String, ReferenceError> {
    let ok = d.split_once(':').is_some_and(|(algo, hex)| {
        !algo.is_empty()
            && algo.chars().all(|c| c.is_ascii_alphanumeric())
            && hex.len() >= 32
            && hex.chars().all(|c| c.is_ascii_hexdigit())
    });
    if ok {
        Ok(d.to_string())
    } else {
        Err(ReferenceError::InvalidDigest(d.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_registry_repo_and_tag() {
        let r = ImageReference::parse("quay.io/repo-name/container-name:version").unwrap();
        assert_eq!(r.registry, "quay.io");
        assert_eq!(r.repository, "repo-name/container-name");
        assert_eq!(r.tag.as_deref(), Some("version"));
        assert!(r.digest.is_none());
    }

    #[test]
    fn registry_port_is_not_a_tag() {
        let r = ImageReference::parse("localhost:5000/app").unwrap();
        assert_eq!(r.registry, "localhost:5000");
        assert_eq!(r.repository, "app");
        assert!(r.tag.is_none());
        assert!(!r.is_pinned());
    }

    #[test]
    fn bare_names_default_to_docker_hub() {
        let r = ImageReference::parse("busybox").unwrap();
        assert_eq!(r.registry, "docker.io");
        assert_eq!(r.repository, "library/busybox");
        assert_eq!(r.to_string(), "docker.io/library/busybox");
    }

    #[test]
    fn digest_references() {
        let digest = format!("sha256:{}", "a".repeat(64));
        let r = ImageReference::parse(&format!("quay.io/a/b@{digest}")).unwrap();
        assert_eq!(r.digest.as_deref(), Some(digest.as_str()));
        assert!(r.is_pinned());
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(ImageReference::parse("  "), Err(ReferenceError::Empty));
        assert!(matches!(
            ImageReference::parse("quay.io/UPPER/case:1"),
            Err(ReferenceError::InvalidRepository(_))
        ));
        assert!(matches!(
            ImageReference::parse("quay.io/a/b:"),
            Err(ReferenceError::InvalidTag(_))
        ));
        assert!(matches!(
            ImageReference::parse("quay.io/a/b@sha256:xyz"),
            Err(ReferenceError::InvalidDigest(_))
        ));
    }
}
