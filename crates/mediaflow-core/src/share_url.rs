//! Share-link normalization.
//!
//! Cloud-drive "share" links point at an HTML preview page, not at the image
//! bytes. `normalize` rewrites the known providers to their direct-download
//! form. None of the rewritten forms match any matcher, so applying
//! `normalize` twice gives the same result as applying it once.

use regex::Regex;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareProvider {
    GoogleDrive,
    Dropbox,
    GitHub,
    OneDrive,
}

impl Display for ShareProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            ShareProvider::GoogleDrive => "google-drive",
            ShareProvider::Dropbox => "dropbox",
            ShareProvider::GitHub => "github",
            ShareProvider::OneDrive => "onedrive",
        };
        f.write_str(name)
    }
}

static DRIVE_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://drive\.google\.com/file/d/([A-Za-z0-9_-]+)")
        .expect("valid drive file pattern")
});

static DRIVE_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://drive\.google\.com/open\?(?:[^#]*&)?id=([A-Za-z0-9_-]+)")
        .expect("valid drive open pattern")
});

static DROPBOX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:www\.)?dropbox\.com/(s|scl/fi)/([^?#]+)(?:\?([^#]*))?")
        .expect("valid dropbox pattern")
});

static GITHUB_BLOB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:www\.)?github\.com/([^/]+)/([^/]+)/blob/(.+)$")
        .expect("valid github pattern")
});

static ONEDRIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://onedrive\.live\.com/(?:redir|embed)(\?.*)?$")
        .expect("valid onedrive pattern")
});

/// Which provider rewrite applies to `url`, if any.
pub fn share_provider(url: &str) -> Option<ShareProvider> {
    let url = url.trim();
    if DRIVE_FILE.is_match(url) || DRIVE_OPEN.is_match(url) {
        Some(ShareProvider::GoogleDrive)
    } else if DROPBOX.is_match(url) {
        Some(ShareProvider::Dropbox)
    } else if GITHUB_BLOB.is_match(url) {
        Some(ShareProvider::GitHub)
    } else if ONEDRIVE.is_match(url) {
        Some(ShareProvider::OneDrive)
    } else {
        None
    }
}

/// Rewrite a share link to its direct-download form.
///
/// Unknown URLs are returned trimmed but otherwise unchanged.
pub fn normalize(url: &str) -> String {
    let url = url.trim();

    if let Some(id) = DRIVE_FILE
        .captures(url)
        .or_else(|| DRIVE_OPEN.captures(url))
        .and_then(|caps| caps.get(1))
    {
        return format!("https://drive.google.com/uc?export=view&id={}", id.as_str());
    }

    if let Some(caps) = DROPBOX.captures(url) {
        let kind = &caps[1];
        let path = &caps[2];
        let query = caps
            .get(3)
            .map(|q| strip_query_param(q.as_str(), "dl"))
            .unwrap_or_default();
        let mut direct = format!("https://dl.dropboxusercontent.com/{}/{}", kind, path);
        if !query.is_empty() {
            direct.push('?');
            direct.push_str(&query);
        }
        return direct;
    }

    if let Some(caps) = GITHUB_BLOB.captures(url) {
        return format!(
            "https://raw.githubusercontent.com/{}/{}/{}",
            &caps[1], &caps[2], &caps[3]
        );
    }

    if let Some(caps) = ONEDRIVE.captures(url) {
        let query = caps.get(1).map(|q| q.as_str()).unwrap_or("");
        return format!("https://onedrive.live.com/download{}", query);
    }

    url.to_string()
}

fn strip_query_param(query: &str, name: &str) -> String {
    query
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or("");
            !pair.is_empty() && !key.eq_ignore_ascii_case(name)
        })
        .collect::<Vec<_>>()
        .join("&")
}
