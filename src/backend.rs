//! Contracts for the external content backend
//!
//! The backend owns image bytes: transfer, layer storage, and unpacking all
//! happen on its side of this seam. This crate only consumes the narrow
//! contract below and never caches image content itself, just the reference
//! metadata surrounding it.

use crate::{errors::ImageError, progress::ProgressSink, reference::Reference};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Credentials for a pull against a registry that requires them
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub username: String,
    pub password: Option<String>,
    pub identity_token: Option<String>,
}

/// Content-addressed descriptor for an object held by the backend
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Descriptor {
    pub digest: crate::reference::ContentDigest,
    pub size: u64,
}

/// The OCI image configuration fields this crate projects into summaries
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct OciConfig {
    pub architecture: String,
    pub os: String,
    #[serde(default)]
    pub created: Option<String>,
    pub rootfs: RootFs,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RootFs {
    #[serde(rename = "type")]
    pub fs_type: String,
    pub diff_ids: Vec<String>,
}

/// One image held by the content backend
#[async_trait]
pub trait ImageHandle: Send + Sync {
    /// The canonical name this image was pulled or imported under
    fn name(&self) -> &str;

    /// Descriptor of the underlying manifest
    ///
    /// This digest is the one used to build the `repo@digest` alias after a
    /// tag pull.
    fn target(&self) -> Descriptor;

    /// Descriptor of the image configuration
    ///
    /// The config digest is the image's content identity: the ID users can
    /// address it by, and the key of the local reference store.
    async fn config(&self) -> Result<Descriptor, ImageError>;

    /// Total size of the image content
    async fn size(&self) -> Result<u64, ImageError>;

    /// The parsed OCI image configuration
    async fn oci_config(&self) -> Result<OciConfig, ImageError>;
}

/// Operations this crate requires of the content backend
///
/// The backend is an external, independently synchronized service; no
/// locking is imposed on it here. All errors come back as [ImageError] and
/// are surfaced to callers unwrapped, with no retry policy in between.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    /// Pull an image, reporting transfer progress through the sink
    ///
    /// The sink should be dropped once no more progress will be reported;
    /// the caller's progress stream drains to completion only once every
    /// sink clone is gone. Dropping the sink before returning is fine, the
    /// caller keeps waiting for the result for a bounded settle period
    /// after the stream drains.
    async fn pull_image(
        &self,
        reference: &Reference,
        auth: Option<&AuthConfig>,
        progress: ProgressSink,
    ) -> Result<Box<dyn ImageHandle>, ImageError>;

    /// Enumerate the images the backend currently holds
    async fn list_images(&self, filters: &[String])
        -> Result<Vec<Box<dyn ImageHandle>>, ImageError>;

    /// Release one name binding for an image, deleting content when the last
    /// binding goes away
    async fn remove_image(&self, reference: &Reference) -> Result<(), ImageError>;

    /// Fetch a single image by its canonical name
    async fn get_image(&self, reference: &Reference) -> Result<Box<dyn ImageHandle>, ImageError>;
}
