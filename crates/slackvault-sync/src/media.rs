use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use slackvault_slack::SlackApi;
use slackvault_types::models::{EmojiDef, EmojiSource, FileAttachment, User};

use crate::error::SyncError;

pub const AVATARS_DIR: &str = "avatars";
pub const FILES_DIR: &str = "files";
pub const EMOJIS_DIR: &str = "emojis";

/// Downloads media into the data dir. Paths handed back are relative to the
/// data dir so the web UI can serve them under `/media/`.
///
/// Downloads are best effort: a failure is logged and the row simply keeps
/// no local path. Anything already on disk is not fetched again.
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: &Path) -> Result<Self, SyncError> {
        for dir in [AVATARS_DIR, FILES_DIR, EMOJIS_DIR] {
            let path = root.join(dir);
            fs::create_dir_all(&path).map_err(|source| SyncError::Io { path, source })?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn fetch_avatar<A: SlackApi + ?Sized>(&self, api: &A, user: &mut User) {
        if user.avatar_url.is_empty() {
            return;
        }
        let filename = format!("{}.jpg", sanitize(&user.id));
        user.avatar_local = self.ensure(api, AVATARS_DIR, &filename, &user.avatar_url, false);
    }

    pub fn fetch_emoji<A: SlackApi + ?Sized>(&self, api: &A, emoji: &mut EmojiDef) {
        let EmojiSource::Image { url, local_path } = &mut emoji.source else {
            return;
        };
        let path_part = url.split('?').next().unwrap_or_default();
        let ext = extension(path_part).unwrap_or_else(|| ".png".to_string());
        let filename = format!("{}{}", sanitize(&emoji.name), ext);
        *local_path = self.ensure(api, EMOJIS_DIR, &filename, url, false);
    }

    /// Private file URLs need the bearer token.
    pub fn fetch_files<A: SlackApi + ?Sized>(&self, api: &A, files: &mut [FileAttachment]) {
        for file in files {
            if file.url.is_empty() {
                continue;
            }
            let ext = extension(&file.name).unwrap_or_default();
            let filename = format!("{}{}", sanitize(&file.id), ext);
            file.local_path = self.ensure(api, FILES_DIR, &filename, &file.url, true);
        }
    }

    fn ensure<A: SlackApi + ?Sized>(
        &self,
        api: &A,
        dir: &str,
        filename: &str,
        url: &str,
        authenticated: bool,
    ) -> Option<String> {
        let relative = format!("{}/{}", dir, filename);
        let target = self.root.join(dir).join(filename);
        if target.exists() {
            return Some(relative);
        }

        let bytes = match api.download(url, authenticated) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to download {}: {}", url, e);
                return None;
            }
        };
        if let Err(e) = fs::write(&target, &bytes) {
            warn!("Failed to write {}: {}", target.display(), e);
            return None;
        }

        debug!("Saved {} ({} bytes)", relative, bytes.len());
        Some(relative)
    }
}

/// Extension including the dot, e.g. `.png`.
fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", sanitize(e)))
}

/// Keeps remote identifiers from escaping the media directory.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '+' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSlack;

    fn attachment(id: &str, name: &str, url: &str) -> FileAttachment {
        FileAttachment {
            id: id.into(),
            name: name.into(),
            mimetype: "image/png".into(),
            url: url.into(),
            local_path: None,
        }
    }

    #[test]
    fn downloads_private_files_with_auth() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path()).unwrap();
        let mut fake = FakeSlack::new();
        fake.blobs.insert("https://files/F1".into(), b"png-bytes".to_vec());

        let mut files = vec![attachment("F1", "shot.png", "https://files/F1")];
        store.fetch_files(&fake, &mut files);

        assert_eq!(files[0].local_path.as_deref(), Some("files/F1.png"));
        assert_eq!(fs::read(dir.path().join("files/F1.png")).unwrap(), b"png-bytes");
        assert_eq!(fake.downloads.borrow()[0], ("https://files/F1".to_string(), true));
    }

    #[test]
    fn existing_file_is_not_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("avatars/U1.jpg"), b"old").unwrap();
        let fake = FakeSlack::new();

        let mut user = User {
            id: "U1".into(),
            name: "jdoe".into(),
            display_name: "Jo".into(),
            avatar_url: "https://avatars/U1".into(),
            avatar_local: None,
        };
        store.fetch_avatar(&fake, &mut user);

        assert_eq!(user.avatar_local.as_deref(), Some("avatars/U1.jpg"));
        assert!(fake.downloads.borrow().is_empty());
    }

    #[test]
    fn failed_download_leaves_no_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path()).unwrap();
        let fake = FakeSlack::new();

        let mut files = vec![attachment("F2", "doc.pdf", "https://files/missing")];
        store.fetch_files(&fake, &mut files);
        assert_eq!(files[0].local_path, None);
    }

    #[test]
    fn emoji_extension_ignores_query_and_aliases_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path()).unwrap();
        let mut fake = FakeSlack::new();
        fake.blobs.insert("https://emoji/party.gif?v=2".into(), b"gif".to_vec());

        let mut image = EmojiDef::parse("party", "https://emoji/party.gif?v=2");
        store.fetch_emoji(&fake, &mut image);
        assert_eq!(image.local_path(), Some("emojis/party.gif"));

        let mut alias = EmojiDef::parse("pp", "alias:party");
        store.fetch_emoji(&fake, &mut alias);
        assert_eq!(fake.downloads.borrow().len(), 1);
    }

    #[test]
    fn sanitize_blocks_traversal() {
        assert_eq!(sanitize("../../etc/passwd"), "______etc_passwd");
    }
}
