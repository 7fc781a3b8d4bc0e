//! Per-file publishing protocol
//!
//! One attempt runs checkout → upload → metadata → checkin, strictly in
//! that order. Save conflicts, a missing folder, and the first upload of a
//! file that still has to be checked in all restart the attempt from the
//! checkout step. At most [`MAX_ATTEMPTS`] attempts are made.

use crate::client::{PostRequest, RequestClient, Response, ODATA_VERBOSE};
use crate::endpoints::SiteEndpoints;
use crate::error::{PublishError, Result};
use crate::error_codes::{classify, ServerErrorCode};
use crate::folders::{FolderEnsurer, HierarchyEnsurer};
use crate::types::{CoreOptions, FileDescriptor, PublishOutcome};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Upper bound on attempts per file, counting the first one
pub const MAX_ATTEMPTS: u32 = 3;

/// Pause before re-uploading after a conflict
pub const RETRY_DELAY: Duration = Duration::from_millis(1500);

/// `CheckOutType` value meaning the file needs no checkout call
const CHECKOUT_TYPE_ONLINE: i64 = 0;

/// How one attempt ended
#[derive(Debug)]
enum Step {
    Done(PublishOutcome),
    Conflict(ServerErrorCode),
    FolderMissing,
    /// The upload created the file, so it has to be checked out on a new pass
    CheckinPass,
}

#[derive(Debug)]
enum Upload {
    Done(Value),
    Conflict(ServerErrorCode),
    FolderMissing,
}

/// Publishes single files through a [`RequestClient`]
pub struct Publisher {
    client: Arc<dyn RequestClient>,
    folders: Arc<dyn FolderEnsurer>,
}

impl Publisher {
    pub fn new(client: Arc<dyn RequestClient>) -> Self {
        Self {
            client,
            folders: Arc::new(HierarchyEnsurer::new()),
        }
    }

    /// Replace the folder ensurer used when the server reports a missing folder
    pub fn with_folder_ensurer(mut self, folders: Arc<dyn FolderEnsurer>) -> Self {
        self.folders = folders;
        self
    }

    pub fn client(&self) -> &dyn RequestClient {
        self.client.as_ref()
    }

    /// Publish one file.
    ///
    /// Files with empty content are skipped without touching the network.
    pub async fn publish(
        &self,
        file: &FileDescriptor,
        options: &CoreOptions,
    ) -> Result<PublishOutcome> {
        if file.is_empty() {
            info!("Skipping '{}': file content is empty", file.display_path());
            return Ok(PublishOutcome::SkippedEmpty);
        }

        let endpoints = SiteEndpoints::new(&options.site_url)?;
        let mut attempts = 1;

        loop {
            if attempts > MAX_ATTEMPTS {
                let err = PublishError::TooManyAttempts {
                    file_name: file.name.clone(),
                };
                error!("{}", err);
                return Err(err);
            }

            debug!(
                "Publishing '{}' (attempt {}/{})",
                file.display_path(),
                attempts,
                MAX_ATTEMPTS
            );

            match self.attempt(&endpoints, file, options).await? {
                Step::Done(outcome) => return Ok(outcome),
                Step::Conflict(code) => {
                    warn!(
                        "{} detected for file '{}'. Trying to re-upload...",
                        code, file.name
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Step::FolderMissing => {
                    warn!(
                        "Folder '{}' does not exist, creating it before re-uploading '{}'",
                        file.folder, file.name
                    );
                    self.folders
                        .ensure_hierarchy(&file.folder, &options.site_url, self.client())
                        .await?;
                }
                Step::CheckinPass => {
                    debug!(
                        "'{}' was created by this upload, uploading again to check it in",
                        file.name
                    );
                }
            }

            attempts += 1;
        }
    }

    async fn attempt(
        &self,
        endpoints: &SiteEndpoints,
        file: &FileDescriptor,
        options: &CoreOptions,
    ) -> Result<Step> {
        let file_existed = self.checkout(endpoints, file, options).await?;

        let uploaded = match self.upload(endpoints, file, options).await? {
            Upload::Done(body) => body,
            Upload::Conflict(code) => return Ok(Step::Conflict(code)),
            Upload::FolderMissing => return Ok(Step::FolderMissing),
        };

        self.update_metadata(endpoints, file, options).await?;

        if !options.checkin_enabled() {
            info!(
                "{} successfully uploaded to '{}/{}'",
                file.name, options.site_url, file.folder
            );
            return Ok(Step::Done(PublishOutcome::Uploaded(uploaded)));
        }

        if !file_existed {
            return Ok(Step::CheckinPass);
        }

        let checked_in = self.checkin(endpoints, file, options).await?;
        info!(
            "{} successfully uploaded to '{}/{}' and checked in. Checkin type: {}",
            file.name, options.site_url, file.folder, options.checkin_type
        );
        Ok(Step::Done(PublishOutcome::CheckedIn(checked_in)))
    }

    /// Make sure the file is checked out when checkin is requested.
    ///
    /// Returns whether the file existed before this attempt.
    async fn checkout(
        &self,
        endpoints: &SiteEndpoints,
        file: &FileDescriptor,
        options: &CoreOptions,
    ) -> Result<bool> {
        if !options.checkin_enabled() {
            return Ok(true);
        }

        let url = endpoints.get_file_url(&file.folder, &file.name);
        let response = match self.client.get(&url).await {
            Ok(response) => response,
            Err(e) if classify(&e) == Some(ServerErrorCode::FileNotFound) => {
                debug!("'{}' does not exist yet", file.display_path());
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let body = parse_json(&url, &response)?;
        let checkout_type = body
            .pointer("/d/CheckOutType")
            .or_else(|| body.get("CheckOutType"))
            .and_then(Value::as_i64)
            .ok_or_else(|| PublishError::UnexpectedResponse {
                url: url.clone(),
                message: "missing CheckOutType".to_string(),
            })?;

        if checkout_type == CHECKOUT_TYPE_ONLINE {
            debug!("'{}' needs no checkout", file.display_path());
            return Ok(true);
        }

        let digest = self.client.request_digest(&options.site_url).await?;
        self.client
            .post(
                &endpoints.checkout_url(&file.folder, &file.name),
                PostRequest::new().digest(&digest),
            )
            .await?;

        info!("File {} checked out.", file.name);
        Ok(true)
    }

    async fn upload(
        &self,
        endpoints: &SiteEndpoints,
        file: &FileDescriptor,
        options: &CoreOptions,
    ) -> Result<Upload> {
        let digest = self.client.request_digest(&options.site_url).await?;
        let url = endpoints.upload_url(&file.folder, &file.name);
        let request = PostRequest::new()
            .digest(&digest)
            .bytes(file.content.clone());

        match self.client.post(&url, request).await {
            Ok(response) => Ok(Upload::Done(parse_json(&url, &response)?)),
            Err(e) if e.has_status(500) || e.has_status(409) => match classify(&e) {
                Some(code) if code.is_conflict() => Ok(Upload::Conflict(code)),
                _ => {
                    error!("Upload of '{}' failed: {}", file.name, e.body);
                    Err(e.into())
                }
            },
            Err(e) if e.has_status(404) => match classify(&e) {
                Some(ServerErrorCode::DirectoryNotFound) => Ok(Upload::FolderMissing),
                _ => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn update_metadata(
        &self,
        endpoints: &SiteEndpoints,
        file: &FileDescriptor,
        options: &CoreOptions,
    ) -> Result<()> {
        let Some(metadata) = options.metadata.claim(&file.name) else {
            return Ok(());
        };

        if let Err(e) = self.send_metadata(endpoints, file, options, metadata).await {
            options.metadata.release(&file.name);
            return Err(e);
        }

        options.metadata.mark_applied(&file.name);
        info!("Metadata updated for '{}'", file.display_path());
        Ok(())
    }

    async fn send_metadata(
        &self,
        endpoints: &SiteEndpoints,
        file: &FileDescriptor,
        options: &CoreOptions,
        metadata: Value,
    ) -> Result<()> {
        let digest = self.client.request_digest(&options.site_url).await?;
        let request = PostRequest::new()
            .digest(&digest)
            .header("X-HTTP-Method", "MERGE")
            .header("IF-MATCH", "*")
            .header("Content-Type", ODATA_VERBOSE)
            .json(metadata);

        self.client
            .post(&endpoints.update_metadata_url(&file.folder, &file.name), request)
            .await?;
        Ok(())
    }

    async fn checkin(
        &self,
        endpoints: &SiteEndpoints,
        file: &FileDescriptor,
        options: &CoreOptions,
    ) -> Result<Value> {
        let digest = self.client.request_digest(&options.site_url).await?;
        let url = endpoints.checkin_url(
            &file.folder,
            &file.name,
            &options.checkin_message,
            options.checkin_type,
        );

        let response = self
            .client
            .post(&url, PostRequest::new().digest(&digest))
            .await?;

        Ok(response
            .json_or_null()
            .unwrap_or_else(|_| Value::String(response.text())))
    }
}

fn parse_json(url: &str, response: &Response) -> Result<Value> {
    response
        .json_or_null()
        .map_err(|e| PublishError::UnexpectedResponse {
            url: url.to_string(),
            message: format!("invalid JSON body: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ErrorBody, RequestError};
    use crate::error_codes::{
        CONTENT_ENGINE_CONFLICT, DIRECTORY_NOT_FOUND, FILE_NOT_FOUND_ONLINE,
        FILE_NOT_FOUND_ON_PREMISES, SAVE_CONFLICT,
    };
    use crate::testing::{fail_raw, fail_with_code, ok, ok_empty, Method, MockClient};
    use crate::types::{CheckinType, MetadataPatches};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    const SITE: &str = "http://sp.url";

    struct Urls {
        upload: String,
        get_file: String,
        checkout: String,
        checkin: String,
        metadata: String,
    }

    fn urls(options: &CoreOptions) -> Urls {
        let e = SiteEndpoints::new(SITE).unwrap();
        Urls {
            upload: e.upload_url("Assets", "file.txt"),
            get_file: e.get_file_url("Assets", "file.txt"),
            checkout: e.checkout_url("Assets", "file.txt"),
            checkin: e.checkin_url(
                "Assets",
                "file.txt",
                &options.checkin_message,
                options.checkin_type,
            ),
            metadata: e.update_metadata_url("Assets", "file.txt"),
        }
    }

    fn file() -> FileDescriptor {
        FileDescriptor::new("file.txt", "sppub", "Assets").unwrap()
    }

    fn checked_out(checkout_type: i64) -> crate::testing::Reply {
        ok(json!({ "d": { "CheckOutType": checkout_type } }))
    }

    #[derive(Default)]
    struct StubEnsurer {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl FolderEnsurer for StubEnsurer {
        async fn ensure_hierarchy(
            &self,
            folder: &str,
            _site_url: &str,
            _client: &dyn RequestClient,
        ) -> Result<()> {
            self.calls.lock().unwrap().push(folder.to_string());
            if self.fail {
                return Err(PublishError::FolderCreation {
                    folder: folder.to_string(),
                    source: RequestError::new(SITE, 403, ErrorBody::Raw("denied".to_string())),
                });
            }
            Ok(())
        }
    }

    fn publisher(client: &Arc<MockClient>) -> Publisher {
        Publisher::new(client.clone())
    }

    #[tokio::test]
    async fn test_empty_content_is_skipped_without_network() {
        let client = Arc::new(MockClient::new());
        let empty = FileDescriptor::new("empty.txt", "", "Assets").unwrap();
        let options = CoreOptions::new(SITE)
            .with_checkin(CheckinType::Major)
            .with_metadata(MetadataPatches::new().with("empty.txt", json!({ "Title": "x" })));

        let outcome = publisher(&client).publish(&empty, &options).await.unwrap();

        assert_eq!(outcome, PublishOutcome::SkippedEmpty);
        assert!(client.calls().is_empty());
        assert_eq!(client.digest_count(), 0);
        assert!(!options.metadata.is_applied("empty.txt"));
    }

    #[tokio::test]
    async fn test_plain_upload_returns_server_record() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE);
        let u = urls(&options);
        client.on_post(&u.upload, ok(json!({ "d": { "Name": "file.txt" } })));

        let outcome = publisher(&client).publish(&file(), &options).await.unwrap();

        assert_eq!(
            outcome,
            PublishOutcome::Uploaded(json!({ "d": { "Name": "file.txt" } }))
        );
        assert_eq!(client.trace(), vec![format!("POST {}", u.upload)]);
        let request = &client.posts_to(&u.upload)[0];
        assert_eq!(request.header_value("X-RequestDigest"), Some("digest-1"));
        match &request.body {
            crate::client::RequestBody::Bytes(bytes) => assert_eq!(&bytes[..], b"sppub"),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_conflict_retries_up_to_the_bound() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE);
        let u = urls(&options);
        client.always_post(&u.upload, fail_with_code(&u.upload, 409, SAVE_CONFLICT));

        let started = tokio::time::Instant::now();
        let err = tokio_test::assert_err!(publisher(&client).publish(&file(), &options).await);

        match err {
            PublishError::TooManyAttempts { file_name } => assert_eq!(file_name, "file.txt"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(client.count(Method::Post, &u.upload), MAX_ATTEMPTS as usize);
        assert!(started.elapsed() >= RETRY_DELAY * MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_engine_conflict_then_success() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE);
        let u = urls(&options);
        client
            .on_post(&u.upload, fail_with_code(&u.upload, 500, CONTENT_ENGINE_CONFLICT))
            .on_post(&u.upload, ok(json!({ "ok": true })));

        let outcome =
            tokio_test::assert_ok!(publisher(&client).publish(&file(), &options).await);

        assert_eq!(outcome, PublishOutcome::Uploaded(json!({ "ok": true })));
        assert_eq!(client.count(Method::Post, &u.upload), 2);
        // a fresh digest for each upload
        let digests: Vec<_> = client
            .posts_to(&u.upload)
            .iter()
            .map(|r| r.header_value("X-RequestDigest").unwrap().to_string())
            .collect();
        assert_eq!(digests, vec!["digest-1", "digest-2"]);
    }

    #[tokio::test]
    async fn test_unknown_code_on_conflict_status_is_not_retried() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE);
        let u = urls(&options);
        client.on_post(&u.upload, fail_with_code(&u.upload, 500, "-1"));

        let err = publisher(&client).publish(&file(), &options).await.unwrap_err();

        assert_eq!(err.request_error().unwrap().status, Some(500));
        assert_eq!(client.count(Method::Post, &u.upload), 1);
    }

    #[tokio::test]
    async fn test_unparseable_conflict_body_is_passed_through() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE);
        let u = urls(&options);
        client.on_post(&u.upload, fail_raw(&u.upload, 409, "<html>conflict</html>"));

        let err = publisher(&client).publish(&file(), &options).await.unwrap_err();

        let source = err.request_error().unwrap();
        assert_eq!(source.body, ErrorBody::Raw("<html>conflict</html>".to_string()));
        assert_eq!(client.count(Method::Post, &u.upload), 1);
    }

    #[tokio::test]
    async fn test_other_upload_failure_is_terminal() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE);
        let u = urls(&options);
        client.on_post(&u.upload, fail_with_code(&u.upload, 403, SAVE_CONFLICT));

        let err = publisher(&client).publish(&file(), &options).await.unwrap_err();

        assert_eq!(err.request_error().unwrap().status, Some(403));
        assert_eq!(client.count(Method::Post, &u.upload), 1);
    }

    #[tokio::test]
    async fn test_missing_folder_is_created_then_upload_retried() {
        let client = Arc::new(MockClient::new());
        let ensurer = Arc::new(StubEnsurer::default());
        let options = CoreOptions::new(SITE);
        let u = urls(&options);
        client
            .on_post(&u.upload, fail_with_code(&u.upload, 404, DIRECTORY_NOT_FOUND))
            .on_post(&u.upload, ok(json!({})));

        let outcome = Publisher::new(client.clone())
            .with_folder_ensurer(ensurer.clone())
            .publish(&file(), &options)
            .await
            .unwrap();

        assert_eq!(outcome, PublishOutcome::Uploaded(json!({})));
        assert_eq!(*ensurer.calls.lock().unwrap(), vec!["Assets".to_string()]);
        assert_eq!(client.count(Method::Post, &u.upload), 2);
    }

    #[tokio::test]
    async fn test_folder_creation_failure_is_surfaced() {
        let client = Arc::new(MockClient::new());
        let ensurer = Arc::new(StubEnsurer {
            fail: true,
            ..Default::default()
        });
        let options = CoreOptions::new(SITE);
        let u = urls(&options);
        client.on_post(&u.upload, fail_with_code(&u.upload, 404, DIRECTORY_NOT_FOUND));

        let err = Publisher::new(client.clone())
            .with_folder_ensurer(ensurer)
            .publish(&file(), &options)
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::FolderCreation { .. }));
        assert_eq!(client.count(Method::Post, &u.upload), 1);
    }

    #[tokio::test]
    async fn test_not_found_without_directory_code_is_terminal() {
        let client = Arc::new(MockClient::new());
        let ensurer = Arc::new(StubEnsurer::default());
        let options = CoreOptions::new(SITE);
        let u = urls(&options);
        client.on_post(&u.upload, fail_raw(&u.upload, 404, "gone"));

        let err = Publisher::new(client.clone())
            .with_folder_ensurer(ensurer.clone())
            .publish(&file(), &options)
            .await
            .unwrap_err();

        assert_eq!(err.request_error().unwrap().status, Some(404));
        assert!(ensurer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkin_without_explicit_checkout() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE).with_checkin(CheckinType::Minor);
        let u = urls(&options);
        client
            .on_get(&u.get_file, checked_out(CHECKOUT_TYPE_ONLINE))
            .on_post(&u.upload, ok(json!({})))
            .on_post(&u.checkin, ok(json!({ "d": { "CheckIn": null } })));

        let outcome = publisher(&client).publish(&file(), &options).await.unwrap();

        assert_eq!(
            outcome,
            PublishOutcome::CheckedIn(json!({ "d": { "CheckIn": null } }))
        );
        assert_eq!(
            client.trace(),
            vec![
                format!("GET {}", u.get_file),
                format!("POST {}", u.upload),
                format!("POST {}", u.checkin),
            ]
        );
        assert_eq!(client.count(Method::Post, &u.checkout), 0);
    }

    #[tokio::test]
    async fn test_checkout_before_upload_and_checkin() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE)
            .with_checkin(CheckinType::Major)
            .with_checkin_message("release build");
        let u = urls(&options);
        client
            .on_get(&u.get_file, checked_out(2))
            .on_post(&u.checkout, ok_empty())
            .on_post(&u.upload, ok(json!({})))
            .on_post(&u.checkin, ok_empty());

        let outcome = publisher(&client).publish(&file(), &options).await.unwrap();

        assert_eq!(outcome, PublishOutcome::CheckedIn(Value::Null));
        assert_eq!(
            client.trace(),
            vec![
                format!("GET {}", u.get_file),
                format!("POST {}", u.checkout),
                format!("POST {}", u.upload),
                format!("POST {}", u.checkin),
            ]
        );
        assert!(u.checkin.contains("@Comment='release%20build'&@Type='1'"));
        assert_eq!(client.digest_count(), 3);
    }

    #[tokio::test]
    async fn test_new_file_takes_extra_pass_before_checkin() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE).with_checkin(CheckinType::Minor);
        let u = urls(&options);
        client
            .on_get(&u.get_file, fail_with_code(&u.get_file, 500, FILE_NOT_FOUND_ON_PREMISES))
            .on_get(&u.get_file, checked_out(CHECKOUT_TYPE_ONLINE))
            .always_post(&u.upload, ok(json!({})))
            .on_post(&u.checkin, ok_empty());

        publisher(&client).publish(&file(), &options).await.unwrap();

        assert_eq!(client.count(Method::Post, &u.upload), 2);
        assert_eq!(client.count(Method::Post, &u.checkin), 1);
        assert_eq!(client.count(Method::Get, &u.get_file), 2);
    }

    #[tokio::test]
    async fn test_online_not_found_code_means_new_file() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE).with_checkin(CheckinType::Overwrite);
        let u = urls(&options);
        client
            .on_get(&u.get_file, fail_with_code(&u.get_file, 404, FILE_NOT_FOUND_ONLINE))
            .on_get(&u.get_file, checked_out(CHECKOUT_TYPE_ONLINE))
            .always_post(&u.upload, ok(json!({})))
            .on_post(&u.checkin, ok_empty());

        publisher(&client).publish(&file(), &options).await.unwrap();

        assert_eq!(client.count(Method::Post, &u.upload), 2);
        assert_eq!(client.count(Method::Post, &u.checkin), 1);
    }

    #[tokio::test]
    async fn test_new_file_extra_pass_counts_against_the_bound() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE).with_checkin(CheckinType::Minor);
        let u = urls(&options);
        client
            .always_get(&u.get_file, fail_with_code(&u.get_file, 404, FILE_NOT_FOUND_ONLINE))
            .always_post(&u.upload, ok(json!({})));

        let err = publisher(&client).publish(&file(), &options).await.unwrap_err();

        assert!(matches!(err, PublishError::TooManyAttempts { .. }));
        assert_eq!(client.count(Method::Post, &u.upload), MAX_ATTEMPTS as usize);
        assert_eq!(client.count(Method::Post, &u.checkin), 0);
    }

    #[tokio::test]
    async fn test_get_file_failure_aborts_before_upload() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE).with_checkin(CheckinType::Minor);
        let u = urls(&options);
        client.on_get(&u.get_file, fail_raw(&u.get_file, 401, "unauthorized"));

        let err = publisher(&client).publish(&file(), &options).await.unwrap_err();

        assert_eq!(err.request_error().unwrap().status, Some(401));
        assert_eq!(client.count(Method::Post, &u.upload), 0);
    }

    #[tokio::test]
    async fn test_checkout_failure_aborts() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE).with_checkin(CheckinType::Minor);
        let u = urls(&options);
        client
            .on_get(&u.get_file, checked_out(2))
            .on_post(&u.checkout, fail_raw(&u.checkout, 423, "locked"));

        let err = publisher(&client).publish(&file(), &options).await.unwrap_err();

        assert_eq!(err.request_error().unwrap().status, Some(423));
        assert_eq!(client.count(Method::Post, &u.upload), 0);
    }

    #[tokio::test]
    async fn test_checkin_failure_is_terminal() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE).with_checkin(CheckinType::Minor);
        let u = urls(&options);
        client
            .on_get(&u.get_file, checked_out(CHECKOUT_TYPE_ONLINE))
            .on_post(&u.upload, ok(json!({})))
            .on_post(&u.checkin, fail_with_code(&u.checkin, 500, SAVE_CONFLICT));

        let err = publisher(&client).publish(&file(), &options).await.unwrap_err();

        assert_eq!(err.request_error().unwrap().status, Some(500));
        assert_eq!(client.count(Method::Post, &u.upload), 1);
        assert_eq!(client.count(Method::Post, &u.checkin), 1);
    }

    #[tokio::test]
    async fn test_checkin_type_none_skips_lock_steps() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE).with_checkin(CheckinType::None);
        let u = urls(&options);
        client.on_post(&u.upload, ok(json!({})));

        let outcome = publisher(&client).publish(&file(), &options).await.unwrap();

        assert_eq!(outcome, PublishOutcome::Uploaded(json!({})));
        assert_eq!(client.trace(), vec![format!("POST {}", u.upload)]);
    }

    #[tokio::test]
    async fn test_metadata_patch_is_applied_once() {
        let client = Arc::new(MockClient::new());
        let metadata = json!({ "__metadata": { "type": "SP.Data.SiteAssetsItem" }, "Title": "updated" });
        let options = CoreOptions::new(SITE)
            .with_metadata(MetadataPatches::new().with("file.txt", metadata.clone()));
        let u = urls(&options);
        client
            .always_post(&u.upload, ok(json!({})))
            .on_post(&u.metadata, ok_empty());

        let publisher = publisher(&client);
        publisher.publish(&file(), &options).await.unwrap();
        assert!(options.metadata.is_applied("file.txt"));
        publisher.publish(&file(), &options).await.unwrap();

        let patches = client.posts_to(&u.metadata);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].header_value("X-HTTP-Method"), Some("MERGE"));
        assert_eq!(patches[0].header_value("IF-MATCH"), Some("*"));
        match &patches[0].body {
            crate::client::RequestBody::Json(body) => assert_eq!(body, &metadata),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_metadata_patch_survives_new_file_pass() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE)
            .with_checkin(CheckinType::Minor)
            .with_metadata(MetadataPatches::new().with("file.txt", json!({ "Title": "t" })));
        let u = urls(&options);
        client
            .on_get(&u.get_file, fail_with_code(&u.get_file, 500, FILE_NOT_FOUND_ON_PREMISES))
            .on_get(&u.get_file, checked_out(CHECKOUT_TYPE_ONLINE))
            .always_post(&u.upload, ok(json!({})))
            .on_post(&u.metadata, ok_empty())
            .on_post(&u.checkin, ok_empty());

        publisher(&client).publish(&file(), &options).await.unwrap();

        assert_eq!(client.count(Method::Post, &u.upload), 2);
        assert_eq!(client.count(Method::Post, &u.metadata), 1);
        assert_eq!(client.count(Method::Post, &u.checkin), 1);
    }

    #[tokio::test]
    async fn test_metadata_failure_aborts_and_stays_pending() {
        let client = Arc::new(MockClient::new());
        let options = CoreOptions::new(SITE)
            .with_checkin(CheckinType::Minor)
            .with_metadata(MetadataPatches::new().with("file.txt", json!({ "Title": "t" })));
        let u = urls(&options);
        client
            .on_get(&u.get_file, checked_out(CHECKOUT_TYPE_ONLINE))
            .on_post(&u.upload, ok(json!({})))
            .on_post(&u.metadata, fail_raw(&u.metadata, 400, "bad field"));

        let err = publisher(&client).publish(&file(), &options).await.unwrap_err();

        assert_eq!(err.request_error().unwrap().status, Some(400));
        assert!(!options.metadata.is_applied("file.txt"));
        assert!(options.metadata.pending("file.txt").is_some());
        assert_eq!(client.count(Method::Post, &u.checkin), 0);
    }

    #[tokio::test]
    async fn test_digest_failure_is_surfaced() {
        let client = Arc::new(MockClient::new());
        client.fail_digest(RequestError::new(
            "http://sp.url/_api/contextinfo",
            401,
            ErrorBody::Raw("expired".to_string()),
        ));
        let options = CoreOptions::new(SITE);

        let err = publisher(&client).publish(&file(), &options).await.unwrap_err();

        assert_eq!(err.request_error().unwrap().status, Some(401));
        assert!(client.calls().is_empty());
    }
}
