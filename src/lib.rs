//! Image reference resolution and a local reference index
//!
//! This crate is the image-reference core of a container daemon. It resolves
//! user-supplied names or content IDs to a unique image, maintains an
//! in-memory index mapping each image's content digest to every symbolic
//! name ever used to reach it, and orchestrates pull, list, get, and remove
//! operations against an external content backend while keeping that index
//! consistent under concurrent access.
//!
//! Image byte transfer, layer storage, and registry protocols live behind
//! the [backend::ContentBackend] contract and are not implemented here.

#[macro_use] extern crate lazy_static;

pub mod backend;
pub mod errors;
pub mod manager;
pub mod progress;
pub mod reference;
pub mod store;

pub use crate::{
    backend::{AuthConfig, ContentBackend, Descriptor, ImageHandle},
    errors::ImageError,
    manager::{ImageInfo, ImageManager, ImageManagerBuilder},
    progress::{ProgressEvent, ProgressSink, ProgressStream},
    reference::{ContentDigest, Locator, Reference},
    store::ReferenceStore,
};
