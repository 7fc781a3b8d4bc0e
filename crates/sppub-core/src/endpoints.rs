//! REST endpoint construction
//!
//! Pure functions of (site, folder, file name). Folder paths and file names
//! are passed to the server as OData parameter aliases, each value
//! percent-encoded on its own so it decodes back to the exact input.

use crate::error::{PublishError, Result};
use crate::types::{normalize_folder, CheckinType};

/// Percent-encode one path or query component (RFC 3986 unreserved set kept)
pub fn encode_component(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Endpoint builder bound to one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteEndpoints {
    site_url: String,
    /// Server-relative path of the site, e.g. `/sites/dev`; empty for a root site
    site_path: String,
}

impl SiteEndpoints {
    pub fn new(site_url: &str) -> Result<Self> {
        let site_url = site_url.trim_end_matches('/');
        let parsed = url::Url::parse(site_url).map_err(|e| PublishError::InvalidSiteUrl {
            url: site_url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PublishError::InvalidSiteUrl {
                url: site_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        // Url::path() is percent-encoded; aliases are encoded again when built
        let site_path = urlencoding::decode(parsed.path())
            .map_err(|e| PublishError::InvalidSiteUrl {
                url: site_url.to_string(),
                reason: e.to_string(),
            })?
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            site_url: site_url.to_string(),
            site_path,
        })
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn site_path(&self) -> &str {
        &self.site_path
    }

    /// `{site path}/{folder}/{name}`, the address the file APIs expect
    pub fn server_relative_path(&self, folder: &str, name: &str) -> String {
        let folder = normalize_folder(folder);
        if folder.is_empty() {
            format!("{}/{}", self.site_path, name)
        } else {
            format!("{}/{}/{}", self.site_path, folder, name)
        }
    }

    /// Create-or-overwrite the file in `folder`
    pub fn upload_url(&self, folder: &str, name: &str) -> String {
        format!(
            "{}/_api/web/GetFolderByServerRelativeUrl(@FolderName)/Files/add(url=@FileName,overwrite=true)?@FolderName='{}'&@FileName='{}'",
            self.site_url,
            encode_component(&normalize_folder(folder)),
            encode_component(name)
        )
    }

    pub fn get_file_url(&self, folder: &str, name: &str) -> String {
        self.file_action_url(folder, name, "")
    }

    pub fn checkout_url(&self, folder: &str, name: &str) -> String {
        self.file_action_url(folder, name, "/CheckOut()")
    }

    pub fn checkin_url(
        &self,
        folder: &str,
        name: &str,
        comment: &str,
        checkin_type: CheckinType,
    ) -> String {
        format!(
            "{}&@Comment='{}'&@Type='{}'",
            self.file_action_url(folder, name, "/CheckIn(comment=@Comment,checkintype=@Type)"),
            encode_component(comment),
            checkin_type.code()
        )
    }

    /// The list item behind the file, target of metadata updates
    pub fn update_metadata_url(&self, folder: &str, name: &str) -> String {
        self.file_action_url(folder, name, "/ListItemAllFields")
    }

    pub fn get_folder_url(&self, folder: &str) -> String {
        format!(
            "{}/_api/web/GetFolderByServerRelativeUrl(@FolderName)?@FolderName='{}'",
            self.site_url,
            encode_component(&normalize_folder(folder))
        )
    }

    pub fn create_folder_url(&self) -> String {
        format!("{}/_api/web/folders", self.site_url)
    }

    pub fn context_info_url(&self) -> String {
        format!("{}/_api/contextinfo", self.site_url)
    }

    /// Every per-file endpoint, labelled, for diagnostics
    pub fn describe(
        &self,
        folder: &str,
        name: &str,
        comment: &str,
        checkin_type: CheckinType,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("upload", self.upload_url(folder, name)),
            ("get-file", self.get_file_url(folder, name)),
            ("checkout", self.checkout_url(folder, name)),
            ("checkin", self.checkin_url(folder, name, comment, checkin_type)),
            ("update-metadata", self.update_metadata_url(folder, name)),
            ("get-folder", self.get_folder_url(folder)),
            ("create-folder", self.create_folder_url()),
        ]
    }

    fn file_action_url(&self, folder: &str, name: &str, action: &str) -> String {
        format!(
            "{}/_api/web/GetFileByServerRelativeUrl(@FileUrl){}?@FileUrl='{}'",
            self.site_url,
            action,
            encode_component(&self.server_relative_path(folder, name))
        )
    }
}
