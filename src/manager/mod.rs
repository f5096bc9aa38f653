//! Image orchestration: resolution, pull, list, remove
//!
//! [ImageManager] composes the reference grammar, the local reference store,
//! and the content backend into the public image operations of a daemon.
//! The store is owned exclusively by one manager instance and is never
//! handed out for external mutation.


use crate::{
    backend::{AuthConfig, ContentBackend, ImageHandle, RootFs},
    errors::ImageError,
    progress::ProgressStream,
    reference::{ContentDigest, Reference, Registry, Repository},
    store::ReferenceStore,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc, time::Duration};
use tokio::{io::AsyncWrite, sync::oneshot, time};

const DEFAULT_BOOTSTRAP_DEADLINE: Duration = Duration::from_secs(10);
const DEFAULT_PULL_SETTLE_GRACE: Duration = Duration::from_secs(30);

/// Public summary of one image, as reported by list and get operations
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ImageInfo {
    pub architecture: String,
    pub os: String,
    #[serde(default)]
    pub created: Option<String>,
    /// The config digest, which is the image's content identity
    pub id: String,
    pub repo_tags: Vec<String>,
    pub repo_digests: Vec<String>,
    pub root_fs: RootFs,
    pub size: u64,
}

/// Builder for configuring an [ImageManager]
///
/// Construction bootstraps the local reference store from the backend's
/// current image list, under a bounded deadline; any failure there is fatal
/// and surfaces from [ImageManagerBuilder::build].
pub struct ImageManagerBuilder {
    default_registry: Option<Registry>,
    default_namespace: Option<Repository>,
    bootstrap_deadline: Duration,
    pull_settle_grace: Duration,
}

impl ImageManagerBuilder {
    pub fn new() -> Self {
        ImageManagerBuilder {
            default_registry: None,
            default_namespace: None,
            bootstrap_deadline: DEFAULT_BOOTSTRAP_DEADLINE,
            pull_settle_grace: DEFAULT_PULL_SETTLE_GRACE,
        }
    }

    /// Registry injected into unqualified references
    pub fn default_registry(mut self, registry: Registry) -> Self {
        self.default_registry = Some(registry);
        self
    }

    /// Namespace injected ahead of single-component repository paths
    pub fn default_namespace(mut self, namespace: Repository) -> Self {
        self.default_namespace = Some(namespace);
        self
    }

    /// Upper bound on loading the backend's image list at construction
    pub fn bootstrap_deadline(mut self, deadline: Duration) -> Self {
        self.bootstrap_deadline = deadline;
        self
    }

    /// How long a pull may keep running after its progress stream drains
    pub fn pull_settle_grace(mut self, grace: Duration) -> Self {
        self.pull_settle_grace = grace;
        self
    }

    /// Construct the manager and bootstrap its local store
    pub async fn build(
        self,
        backend: Arc<dyn ContentBackend>,
    ) -> Result<ImageManager, ImageError> {
        let mgr = ImageManager {
            default_registry: self.default_registry,
            default_namespace: self.default_namespace,
            pull_settle_grace: self.pull_settle_grace,
            backend,
            store: ReferenceStore::new(),
        };
        mgr.update_local_store(self.bootstrap_deadline).await?;
        Ok(mgr)
    }
}

impl Default for ImageManagerBuilder {
    fn default() -> Self {
        ImageManagerBuilder::new()
    }
}

/// All operations against images: resolve, pull, list, get, remove
pub struct ImageManager {
    default_registry: Option<Registry>,
    default_namespace: Option<Repository>,
    pull_settle_grace: Duration,
    backend: Arc<dyn ContentBackend>,
    store: ReferenceStore,
}

impl ImageManager {
    /// Construct a manager with default options
    pub async fn new(backend: Arc<dyn ContentBackend>) -> Result<Self, ImageError> {
        ImageManager::builder().build(backend).await
    }

    /// Start configuring a manager
    pub fn builder() -> ImageManagerBuilder {
        ImageManagerBuilder::new()
    }

    /// Resolve a user-supplied name or ID to a unique image
    ///
    /// Returns the image's content digest, the reference that actually
    /// matched, and a primary reference for the image. The default registry
    /// is not injected up front: the input may be a bare ID, a short ID, or
    /// a full digest string, which must be searched verbatim first. Only
    /// when that search misses,
    /// and the input lacked a registry, is a second candidate built with the
    /// default registry and namespace and searched again.
    pub fn check_reference(
        &self,
        id_or_ref: &str,
    ) -> Result<(ContentDigest, Reference, Reference), ImageError> {
        let named = Reference::parse(id_or_ref)?;
        let (id, actual) = match self.store.search(&named) {
            Ok(hit) => hit,
            Err(err) if err.is_not_found() => {
                let candidate = named
                    .with_default_locator(
                        self.default_registry.as_ref(),
                        self.default_namespace.as_ref(),
                    )
                    .ok_or(err)?;
                self.store.search(&candidate)?
            }
            Err(err) => return Err(err),
        };

        // an ID matched by digest identity, so any of the image's primary
        // references will do; the first is stable within one process run
        let primary = if actual.may_be_image_id() {
            match self.store.get_primary_references(&id).into_iter().next() {
                Some(primary) => primary,
                None => {
                    log::error!(
                        "image {} has references but no primary reference",
                        id
                    );
                    return Err(ImageError::NotFound(id_or_ref.to_owned()));
                }
            }
        } else {
            self.store.get_primary_reference(&actual)?
        };
        Ok((id, actual, primary))
    }

    /// Pull an image from a registry, streaming progress into `out`
    ///
    /// The reference is normalized first: default registry and namespace are
    /// injected if missing, an untagged reference gets the `latest` tag, and
    /// a digest binding drops any tag riding along. Progress events drain
    /// into `out` as JSON lines; the drain task waits for every progress
    /// sink to be dropped and the output flushed, and is always joined
    /// before this returns. A backend that releases its sinks before
    /// returning keeps running until it reports a result or the settle
    /// grace elapses. The store is only updated after the backend reports
    /// success, so a failed pull leaves no partial record.
    pub async fn pull_image<W>(
        &self,
        reference: &str,
        auth: Option<&AuthConfig>,
        out: W,
    ) -> Result<(), ImageError>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let parsed = Reference::parse(reference)?;
        let named = parsed
            .with_default_locator(
                self.default_registry.as_ref(),
                self.default_namespace.as_ref(),
            )
            .unwrap_or(parsed)
            .with_default_tag_if_missing()
            .trim_tag_for_digest();

        let stream = ProgressStream::new(out);
        let sink = stream.sink();
        let (drained_tx, drained_rx) = oneshot::channel();
        let drain = tokio::spawn(async move {
            let result = stream.wait().await;
            let _ = drained_tx.send(());
            result
        });

        log::info!("pulling image {}", named);
        let pull = self.backend.pull_image(&named, auth, sink);
        tokio::pin!(pull);
        let pulled = tokio::select! {
            result = &mut pull => result,
            // the backend released its sinks before returning; its result
            // is still coming, so keep polling up to the settle grace
            _ = drained_rx => {
                match time::timeout(self.pull_settle_grace, &mut pull).await {
                    Ok(result) => result,
                    Err(_) => Err(ImageError::PullAborted),
                }
            }
        };

        // never return before the drain task is done, so no progress output
        // is lost or duplicated
        let drained = drain.await?;
        let image = pulled?;
        drained?;

        self.store_image_reference(image.as_ref()).await
    }

    /// List the backend's images, deduplicated by content digest
    ///
    /// A backend may expose several handles for the same content; one
    /// summary is produced per unique config digest, carrying all repo tags
    /// and digests the store knows for it.
    pub async fn list_images(&self, filters: &[String]) -> Result<Vec<ImageInfo>, ImageError> {
        let images = self.backend.list_images(filters).await?;
        let mut seen: HashSet<ContentDigest> = HashSet::new();
        let mut infos = Vec::new();
        for image in &images {
            let config = image.config().await?;
            if !seen.insert(config.digest.clone()) {
                continue;
            }
            infos.push(self.image_info(image.as_ref()).await?);
        }
        Ok(infos)
    }

    /// Search a remote registry for images
    ///
    /// Registry search is delegated entirely to a remote-search
    /// collaborator and is not available in this core.
    pub async fn search_images(
        &self,
        _name: &str,
        _registry: Option<&Registry>,
    ) -> Result<Vec<ImageInfo>, ImageError> {
        Err(ImageError::NotImplemented)
    }

    /// Look up one image and project it into a public summary
    pub async fn get_image(&self, id_or_ref: &str) -> Result<ImageInfo, ImageError> {
        let (_, _, primary) = self.check_reference(id_or_ref)?;
        let image = self.backend.get_image(&primary).await?;
        self.image_info(image.as_ref()).await
    }

    /// Remove an image reference, and the image content when warranted
    ///
    /// A bare ID or short ID names the image itself, so every primary
    /// reference is removed, each from the backend and then from the store.
    /// Without `force` this is refused when any reference points into a
    /// different named repository, since removal would silently drop a name
    /// visible under an unrelated repository. A concrete name only removes
    /// itself: the backend content goes away with a primary reference, while
    /// an alias is dropped from the store alone.
    ///
    /// A backend failure partway through the bare-ID loop leaves earlier
    /// iterations removed; they are not rolled back.
    pub async fn remove_image(&self, id_or_ref: &str, force: bool) -> Result<(), ImageError> {
        let (id, named, primary) = self.check_reference(id_or_ref)?;

        if named.is_name_only() {
            if !force && !unique_locator(&self.store.get_references(&id)) {
                return Err(ImageError::MustForce(id_or_ref.to_owned()));
            }
            for reference in self.store.get_primary_references(&id) {
                self.backend.remove_image(&reference).await?;
                self.store.remove_reference(&id, &reference);
            }
            return Ok(());
        }

        let named = named.trim_tag_for_digest();
        if primary == named {
            self.store.remove_reference(&id, &primary);
            return self.backend.remove_image(&primary).await;
        }
        self.store.remove_reference(&id, &named);
        Ok(())
    }

    /// Bootstrap the local store from the backend's current image list
    async fn update_local_store(&self, deadline: Duration) -> Result<(), ImageError> {
        time::timeout(deadline, async {
            let images = self.backend.list_images(&[]).await?;
            log::debug!("loading references for {} images at startup", images.len());
            for image in &images {
                self.store_image_reference(image.as_ref()).await?;
            }
            Ok(())
        })
        .await
        .map_err(|_| ImageError::BootstrapDeadline)?
    }

    /// Register a freshly pulled or discovered image into the store
    ///
    /// The canonical pull name becomes a primary reference. A tagged name
    /// also registers its `repo@digest` form as a searchable alias, unless
    /// that exact name already resolves; a previous pull of the same image
    /// established the same mapping, and repeated pulls stay idempotent.
    async fn store_image_reference(&self, image: &dyn ImageHandle) -> Result<(), ImageError> {
        let config = image.config().await?;
        let named = Reference::parse(image.name())?;

        self.store.add_reference(&config.digest, &named, &named)?;

        if named.is_tagged() {
            let digest_ref = named.with_digest(&image.target().digest);
            if let Err(err) = self.store.search(&digest_ref) {
                if err.is_not_found() {
                    return self.store.add_reference(&config.digest, &named, &digest_ref);
                }
            }
        }
        Ok(())
    }

    /// Project one backend image into its public summary
    async fn image_info(&self, image: &dyn ImageHandle) -> Result<ImageInfo, ImageError> {
        let config = image.config().await?;
        let size = image.size().await?;
        let oci = image.oci_config().await?;

        let mut repo_tags = Vec::new();
        let mut repo_digests = Vec::new();
        for reference in self.store.get_references(&config.digest) {
            if reference.is_tagged() {
                repo_tags.push(reference.to_string());
            } else if reference.is_canonical_digested() {
                repo_digests.push(reference.to_string());
            }
        }

        Ok(ImageInfo {
            architecture: oci.architecture,
            os: oci.os,
            created: oci.created,
            id: config.digest.to_string(),
            repo_tags,
            repo_digests,
            root_fs: oci.rootfs,
            size,
        })
    }
}

/// Do all of these references point into the same named repository?
fn unique_locator(references: &[Reference]) -> bool {
    let mut locators = references.iter().map(Reference::locator);
    match locators.next() {
        None => true,
        Some(first) => locators.all(|locator| locator == first),
    }
}
