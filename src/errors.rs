//! Error types you might see while resolving or managing images

use thiserror::Error;

/// Errors from image reference resolution and image management
#[derive(Error, Debug)]
pub enum ImageError {
    /// invalid image reference format
    #[error("invalid image reference format: {0:?}")]
    InvalidReferenceFormat(String),

    /// reference or image ID does not resolve locally
    #[error("image not found: {0:?}")]
    NotFound(String),

    /// a short ID matched more than one image
    #[error("ambiguous image ID, multiple images match: {0:?}")]
    AmbiguousReference(String),

    /// a reference string is already bound to a different image
    #[error("reference {reference:?} is already in use by another image")]
    ReferenceConflict { reference: String },

    /// removal refused because the image is reachable under other repositories
    #[error("unable to remove the image {0:?} (must force) - image has several references")]
    MustForce(String),

    /// operation is delegated to a remote collaborator and not available here
    #[error("not implemented")]
    NotImplemented,

    /// loading the backend image list at startup exceeded its deadline
    #[error("deadline exceeded while loading images from the content backend")]
    BootstrapDeadline,

    /// the backend kept running past the settle grace after dropping its
    /// progress sinks
    #[error("pull did not settle after its progress stream drained")]
    PullAborted,

    /// backend storage io error
    #[error("storage io error: {0}")]
    Storage(#[from] std::io::Error),

    /// json error
    #[error("json error: {0}")]
    JSON(#[from] serde_json::Error),

    /// asynchronous task failed during an image operation
    #[error("asynchronous task failed during an image operation")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ImageError {
    /// Is this a not-found error?
    ///
    /// The two-pass resolver retries with the default registry only for this
    /// class of failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ImageError::NotFound(_))
    }
}
