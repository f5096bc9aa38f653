//! Symbolic image references and their component grammar

#[cfg(test)]
mod tests;

mod digest;
mod registry;
mod repository;
mod tag;

pub use digest::ContentDigest;
pub use registry::Registry;
pub use repository::Repository;
pub use tag::Tag;

use crate::errors::ImageError;
use regex::Regex;
use std::{fmt, str, str::FromStr};

/// Parsed Docker-style image reference
///
/// This is an owned struct representing a docker "reference" (like a URI)
/// which names an image, optionally at a specific version. It tries to be
/// format-compatible with Docker including its quirks.
///
/// A complete reference contains a [Registry], [Repository], [Tag], and
/// [ContentDigest] in that order. Only the [Repository] component is
/// mandatory.
///
/// The [Tag] always begins with a `:` and the [ContentDigest] with an `@`,
/// but delineating the optional [Registry] and the first section of the
/// [Repository] requires heuristics. If this first section includes any dot
/// (.) or colon (:) characters it is assumed to be a registry server, with
/// an additional special case for "localhost", which is always interpreted
/// as a registry name.
///
/// A bare image ID or short ID ("29f5d56d1268…" or a prefix of it) parses as
/// a name-only reference; whether it denotes a repository or a content ID is
/// decided later, by lookup against the local reference store.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    registry: Option<Registry>,
    repository: Repository,
    tag: Option<Tag>,
    digest: Option<ContentDigest>,
}

impl Reference {
    /// Parse a [prim@str] as a [Reference]
    pub fn parse(s: &str) -> Result<Self, ImageError> {
        lazy_static! {
            static ref HAS_REGISTRY: Regex = Regex::new(concat!(
                "^",
                "(?:", // alternatives group
                /* */ "(?:", // one option: a domain with at least one dot
                /* -- */ "(?:", // First domain component
                /* -- -- */ "[a-zA-Z0-9]|",
                /* -- -- */ "[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]",
                /* -- */ ")",
                /* -- */ "(?:", // Additional domain components
                /* -- -- */ "\\.",
                /* -- -- */ "(?:",
                /* -- -- -- */ "[a-zA-Z0-9]|",
                /* -- -- -- */ "[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]",
                /* -- -- */ ")",
                /* -- */ ")+",
                /* -- */ "(?::[0-9]+)?", // Optional port number
                /*  */ ")",
                /* */ "|(?:", // another option: no dots, but there's a port number
                /* -- */ "(?:", // Only domain component
                /* -- -- */ "[a-zA-Z0-9]|",
                /* -- -- */ "[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]",
                /* -- */ ")",
                /* -- */ "(?::[0-9]+)", // port number
                /*  */ ")",
                /* */ "|(?:", // special case for localhost
                /* -- */ "localhost",
                /* -- */ "(?::[0-9]+)?", // Optional port number
                /*  */ ")",
                ")", // end of alternatives
                "/", // done matching at the first slash, which is not optional here
            )).unwrap();
            static ref WITH_REGISTRY: Regex = Regex::new(&format!(
                "^{}/{}(:{})?(@{})?$",
                Registry::regex_str(),
                Repository::regex_str(),
                Tag::regex_str(),
                ContentDigest::regex_str()
            ))
            .unwrap();
            static ref NO_REGISTRY: Regex = Regex::new(&format!(
                "^{}(:{})?(@{})?$",
                Repository::regex_str(),
                Tag::regex_str(),
                ContentDigest::regex_str()
            ))
            .unwrap();
        }
        let pattern: &Regex = if HAS_REGISTRY.is_match(s) {
            &WITH_REGISTRY
        } else {
            &NO_REGISTRY
        };
        match pattern.captures(s) {
            None => Err(ImageError::InvalidReferenceFormat(s.to_owned())),
            Some(captures) => Ok(Reference {
                registry: captures
                    .name("reg")
                    .map(|m| Registry::parse(m.as_str()))
                    .transpose()?,
                repository: Repository::parse(
                    captures.name("repo").expect("repository is mandatory").as_str(),
                )?,
                tag: captures
                    .name("tag")
                    .map(|m| Tag::parse(m.as_str()))
                    .transpose()?,
                digest: captures
                    .name("dig")
                    .map(|m| ContentDigest::parse(m.as_str()))
                    .transpose()?,
            }),
        }
    }

    /// Assemble a [Reference] from its component pieces
    ///
    /// This may fail either because of a problem with one of the components,
    /// or because the resulting string would be parsed in a manner other than
    /// intended. For example, a registry-less repository path beginning with
    /// `localhost/` would be parsed as a registry name.
    pub fn from_parts(
        registry: Option<&str>,
        repository: &str,
        tag: Option<&str>,
        digest: Option<&str>,
    ) -> Result<Self, ImageError> {
        let mut buffer = String::new();
        if let Some(registry) = registry {
            buffer.push_str(registry);
            buffer.push('/');
        }
        buffer.push_str(repository);
        if let Some(tag) = tag {
            buffer.push(':');
            buffer.push_str(tag);
        }
        if let Some(digest) = digest {
            buffer.push('@');
            buffer.push_str(digest);
        }
        let parsed = Reference::parse(&buffer)?;
        if parsed.registry().map(Registry::as_str) == registry
            && parsed.repository().as_str() == repository
            && parsed.tag().map(Tag::as_str) == tag
            && parsed.digest().map(ContentDigest::as_str) == digest
        {
            Ok(parsed)
        } else {
            // Parsing ambiguity
            Err(ImageError::InvalidReferenceFormat(buffer))
        }
    }

    /// Returns the optional registry component
    pub fn registry(&self) -> Option<&Registry> {
        self.registry.as_ref()
    }

    /// Returns the repository component
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Returns the optional tag component
    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    /// Returns the optional content digest component
    pub fn digest(&self) -> Option<&ContentDigest> {
        self.digest.as_ref()
    }

    /// Is this a bare repository path, with neither tag nor digest?
    ///
    /// Bare image IDs and short IDs parse into this form too; the local
    /// reference store decides which one the user meant.
    pub fn is_name_only(&self) -> bool {
        self.tag.is_none() && self.digest.is_none()
    }

    /// Is this a mutable `repo:tag` style reference?
    pub fn is_tagged(&self) -> bool {
        self.tag.is_some() && self.digest.is_none()
    }

    /// Is this an immutable `repo@digest` style reference?
    pub fn is_canonical_digested(&self) -> bool {
        self.digest.is_some()
    }

    /// Could this reference be addressing an image by content ID?
    ///
    /// A bare hex ID or short ID parses as a name-only reference, and a
    /// full digest string like `sha256:29f5…` parses as a tagged one. The
    /// local reference store settles which one the user meant by
    /// digest-identity lookup.
    pub fn may_be_image_id(&self) -> bool {
        if self.registry.is_some() || self.digest.is_some() {
            return false;
        }
        self.tag.is_none() || ContentDigest::parse(&self.to_string()).is_ok()
    }

    /// The registry and repository portion of this reference
    ///
    /// References sharing a locator point into the same named repository,
    /// whatever their tag or digest.
    pub fn locator(&self) -> Locator {
        Locator {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
        }
    }

    /// Add the default `latest` tag to a reference with no version at all
    ///
    /// References already carrying a tag or a digest are returned unchanged.
    pub fn with_default_tag_if_missing(self) -> Self {
        if self.is_name_only() {
            Reference {
                tag: Some(Tag::latest()),
                ..self
            }
        } else {
            self
        }
    }

    /// Drop the tag when a digest binding is present
    ///
    /// A digest pins the exact content, so any tag riding along in the same
    /// reference is informational at best. The canonical form keeps only the
    /// digest.
    pub fn trim_tag_for_digest(self) -> Self {
        if self.digest.is_some() {
            Reference { tag: None, ..self }
        } else {
            self
        }
    }

    /// Build the canonical `locator@digest` form of this reference
    pub fn with_digest(&self, digest: &ContentDigest) -> Self {
        Reference {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            tag: None,
            digest: Some(digest.clone()),
        }
    }

    /// Qualify an unqualified reference with a default registry and namespace
    ///
    /// Returns `None` when the reference already names a registry, or when no
    /// default registry is configured; callers use that to tell whether a
    /// second resolution pass is worth attempting. The namespace is only
    /// injected ahead of single-component repository paths, matching the
    /// `busybox` → `registry/ns/busybox` convention.
    pub fn with_default_locator(
        &self,
        registry: Option<&Registry>,
        namespace: Option<&Repository>,
    ) -> Option<Self> {
        if self.registry.is_some() {
            return None;
        }
        let registry = registry?;
        let repository = match namespace {
            Some(namespace) if self.repository.is_single_component() => {
                namespace.join(&self.repository)
            }
            _ => self.repository.clone(),
        };
        Some(Reference {
            registry: Some(registry.clone()),
            repository,
            tag: self.tag.clone(),
            digest: self.digest.clone(),
        })
    }
}

impl FromStr for Reference {
    type Err = ImageError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Reference::parse(s)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(registry) = &self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}", self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// The registry and repository portion of a [Reference], excluding version
/// information
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator {
    registry: Option<Registry>,
    repository: Repository,
}

impl Locator {
    /// Returns the optional registry component
    pub fn registry(&self) -> Option<&Registry> {
        self.registry.as_ref()
    }

    /// Returns the repository component
    pub fn repository(&self) -> &Repository {
        &self.repository
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(registry) = &self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}", self.repository)
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
