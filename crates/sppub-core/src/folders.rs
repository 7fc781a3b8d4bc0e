//! Folder hierarchy creation
//!
//! Existence checks for every ancestor run concurrently. Missing folders
//! are then created one at a time, shallowest first, since the server
//! rejects a folder whose parent does not exist yet.

use crate::client::{PostRequest, RequestClient, ODATA_VERBOSE};
use crate::endpoints::SiteEndpoints;
use crate::error::{PublishError, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::json;
use tracing::{debug, info};

/// Cumulative prefixes of a slash-separated path, shallowest first.
///
/// Empty segments are dropped, so `"/a//b/"` behaves like `"a/b"`.
pub fn cumulative_prefixes(path: &str) -> Vec<String> {
    let mut prefixes: Vec<String> = Vec::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let next = match prefixes.last() {
            Some(parent) => format!("{}/{}", parent, segment),
            None => segment.to_string(),
        };
        prefixes.push(next);
    }
    prefixes
}

/// Makes sure a folder and all of its ancestors exist on the server
#[async_trait]
pub trait FolderEnsurer: Send + Sync {
    async fn ensure_hierarchy(
        &self,
        folder: &str,
        site_url: &str,
        client: &dyn RequestClient,
    ) -> Result<()>;
}

/// [`FolderEnsurer`] backed by the folder REST endpoints
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchyEnsurer;

impl HierarchyEnsurer {
    pub fn new() -> Self {
        Self
    }

    /// Prefixes of `folder` the server reports as missing, in depth order
    async fn missing_prefixes(
        &self,
        endpoints: &SiteEndpoints,
        folder: &str,
        client: &dyn RequestClient,
    ) -> Result<Vec<String>> {
        let checks = cumulative_prefixes(folder).into_iter().map(|prefix| {
            let url = endpoints.get_folder_url(&prefix);
            async move {
                debug!("Checking folder '{}'", prefix);
                match client.get(&url).await {
                    Ok(_) => Ok(None),
                    // This endpoint answers 500 for some missing folders
                    Err(e) if e.has_status(404) || e.has_status(500) => Ok(Some(prefix)),
                    Err(e) => Err(PublishError::Request(e)),
                }
            }
        });

        let results = try_join_all(checks).await?;
        Ok(results.into_iter().flatten().collect())
    }
}

#[async_trait]
impl FolderEnsurer for HierarchyEnsurer {
    async fn ensure_hierarchy(
        &self,
        folder: &str,
        site_url: &str,
        client: &dyn RequestClient,
    ) -> Result<()> {
        let endpoints = SiteEndpoints::new(site_url)?;
        let missing = self.missing_prefixes(&endpoints, folder, client).await?;

        if missing.is_empty() {
            debug!("Folder hierarchy '{}' already exists", folder);
            return Ok(());
        }

        info!("Creating folder or full folders hierarchy: '{}'", folder);
        let create_url = endpoints.create_folder_url();

        for prefix in missing {
            let digest = client
                .request_digest(site_url)
                .await
                .map_err(|source| PublishError::FolderCreation {
                    folder: prefix.clone(),
                    source,
                })?;

            let request = PostRequest::new()
                .digest(&digest)
                .header("Content-Type", ODATA_VERBOSE)
                .json(json!({
                    "__metadata": { "type": "SP.Folder" },
                    "ServerRelativeUrl": prefix,
                }));

            client
                .post(&create_url, request)
                .await
                .map_err(|source| PublishError::FolderCreation {
                    folder: prefix.clone(),
                    source,
                })?;

            info!("Folder '{}' created", prefix);
        }

        Ok(())
    }
}
