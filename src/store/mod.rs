//! Local index of image references
//!
//! The store is the single source of truth for which symbolic names point at
//! which image content. It is a bidirectional in-memory index: every
//! reference string resolves to at most one content digest, and every digest
//! carries the ordered list of references that were ever used to reach it.


use crate::{
    errors::ImageError,
    reference::{ContentDigest, Reference},
};
use std::{collections::HashMap, sync::Mutex};

/// The role a reference plays for its image
///
/// A primary reference is the name an image was pulled or registered under.
/// Every tracked digest keeps at least one primary reference for as long as
/// it is tracked at all. Aliases are derived lookup names, like the
/// `repo@digest` form added automatically after a tag pull.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Primary,
    Alias,
}

#[derive(Clone)]
struct Record {
    reference: Reference,
    role: Role,
}

#[derive(Default)]
struct Index {
    // both maps are updated together inside every mutating operation
    by_name: HashMap<String, ContentDigest>,
    by_digest: HashMap<ContentDigest, Vec<Record>>,
}

/// In-memory bidirectional index between content digests and references
///
/// All access is serialized through one exclusive lock. Operations never
/// perform I/O and never suspend, so the lock is only ever held briefly.
pub struct ReferenceStore {
    index: Mutex<Index>,
}

impl ReferenceStore {
    /// Create an empty store
    pub fn new() -> Self {
        ReferenceStore {
            index: Mutex::new(Index::default()),
        }
    }

    /// Register a primary reference and a searchable reference for a digest
    ///
    /// The primary reference is recorded with [Role::Primary]; if it is
    /// already present for the same digest this is a no-op, and if it is
    /// bound to a different digest the call fails with a conflict. The
    /// searchable reference is then recorded as an [Role::Alias] lookup
    /// entry under the same rules; when it equals the primary reference
    /// there is no extra record.
    pub fn add_reference(
        &self,
        digest: &ContentDigest,
        primary: &Reference,
        searchable: &Reference,
    ) -> Result<(), ImageError> {
        let mut index = self.index.lock().unwrap();
        index.insert(digest, primary, Role::Primary)?;
        if searchable != primary {
            index.insert(digest, searchable, Role::Alias)?;
        }
        Ok(())
    }

    /// Look up a reference, returning the digest it resolves to
    ///
    /// The lookup is exact-match on the canonical string form. When that
    /// fails and the reference could be an image ID, it is retried by
    /// digest identity: a full digest string, bare hex, or an unambiguous
    /// hex prefix all match. The matched reference is returned alongside
    /// the digest so callers can tell which form won.
    pub fn search(&self, reference: &Reference) -> Result<(ContentDigest, Reference), ImageError> {
        let index = self.index.lock().unwrap();
        let name = reference.to_string();
        if let Some(digest) = index.by_name.get(&name) {
            return Ok((digest.clone(), reference.clone()));
        }
        if reference.may_be_image_id() {
            let mut candidates = index
                .by_digest
                .keys()
                .filter(|digest| digest.matches_id(&name));
            match (candidates.next(), candidates.next()) {
                (Some(digest), None) => return Ok((digest.clone(), reference.clone())),
                (Some(_), Some(_)) => return Err(ImageError::AmbiguousReference(name)),
                (None, _) => (),
            }
        }
        Err(ImageError::NotFound(name))
    }

    /// Given any matched reference, return a primary reference for the same
    /// image
    ///
    /// Fails with NotFound if the reference does not resolve, or if its
    /// digest has no primary record. The latter breaks a store invariant and
    /// is logged before being surfaced.
    pub fn get_primary_reference(&self, reference: &Reference) -> Result<Reference, ImageError> {
        let index = self.index.lock().unwrap();
        let name = reference.to_string();
        let digest = index
            .by_name
            .get(&name)
            .ok_or_else(|| ImageError::NotFound(name.clone()))?;
        index
            .by_digest
            .get(digest)
            .and_then(|records| records.iter().find(|r| r.role == Role::Primary))
            .map(|r| r.reference.clone())
            .ok_or_else(|| {
                log::error!("digest {} has references but no primary reference", digest);
                ImageError::NotFound(name)
            })
    }

    /// All primary references for a digest, in insertion order
    pub fn get_primary_references(&self, digest: &ContentDigest) -> Vec<Reference> {
        let index = self.index.lock().unwrap();
        index
            .by_digest
            .get(digest)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.role == Role::Primary)
                    .map(|r| r.reference.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All references for a digest, primary and alias, in insertion order
    pub fn get_references(&self, digest: &ContentDigest) -> Vec<Reference> {
        let index = self.index.lock().unwrap();
        index
            .by_digest
            .get(digest)
            .map(|records| records.iter().map(|r| r.reference.clone()).collect())
            .unwrap_or_default()
    }

    /// Delete one reference record for a digest
    ///
    /// A digest with any record must keep at least one primary record, so
    /// removing the last primary purges the digest from the store entirely,
    /// remaining aliases included. Removing a reference that is not present
    /// is a no-op, which keeps removal idempotent under concurrent callers.
    pub fn remove_reference(&self, digest: &ContentDigest, reference: &Reference) {
        let mut index = self.index.lock().unwrap();
        let name = reference.to_string();
        if index.by_name.get(&name) == Some(digest) {
            index.by_name.remove(&name);
        }
        let purge = match index.by_digest.get_mut(digest) {
            None => false,
            Some(records) => {
                records.retain(|r| r.reference != *reference);
                !records.iter().any(|r| r.role == Role::Primary)
            }
        };
        if purge {
            if let Some(records) = index.by_digest.remove(digest) {
                for record in records {
                    index.by_name.remove(&record.reference.to_string());
                }
            }
        }
    }
}

impl Default for ReferenceStore {
    fn default() -> Self {
        ReferenceStore::new()
    }
}

impl Index {
    fn insert(
        &mut self,
        digest: &ContentDigest,
        reference: &Reference,
        role: Role,
    ) -> Result<(), ImageError> {
        let name = reference.to_string();
        match self.by_name.get(&name) {
            Some(existing) if existing == digest => return Ok(()),
            Some(_) => return Err(ImageError::ReferenceConflict { reference: name }),
            None => (),
        }
        self.by_name.insert(name, digest.clone());
        self.by_digest
            .entry(digest.clone())
            .or_insert_with(Vec::new)
            .push(Record {
                reference: reference.clone(),
                role,
            });
        Ok(())
    }
}
