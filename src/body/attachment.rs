//! Uploaded file handles and their cleanup.
//!
//! # Responsibilities
//! - Describe one uploaded file (field, filename, content type, size)
//! - Own the transient file holding its bytes
//! - Release that file exactly once
//!
//! # Design Decisions
//! - `release` consumes the handle, so a second release does not type-check
//! - Handles that are dropped without `release` (client disconnect, panic)
//!   still delete their file through `tempfile::TempPath`
//! - `Attachments` is the per-request ownership record; the pipeline calls
//!   `release` once at the end of the exchange

use std::collections::hash_map::{self, HashMap};
use std::path::Path;

use tempfile::TempPath;

/// One uploaded file spooled to transient storage.
#[derive(Debug)]
pub struct Attachment {
    field_name: String,
    filename: String,
    content_type: Option<String>,
    len: u64,
    path: TempPath,
}

impl Attachment {
    pub(crate) fn new(
        field_name: String,
        filename: String,
        content_type: Option<String>,
        len: u64,
        path: TempPath,
    ) -> Self {
        Self {
            field_name,
            filename,
            content_type,
            len,
            path,
        }
    }

    /// Form field the file was uploaded under.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Filename as sent by the client.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Declared content type of the part, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Size of the uploaded content in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Location of the spooled bytes. Valid until the handle is released.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the uploaded bytes back from transient storage.
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.path()).await
    }

    /// Delete the spooled file.
    pub fn release(self) -> std::io::Result<()> {
        tracing::trace!(
            field = %self.field_name,
            path = %self.path.display(),
            "Releasing attachment"
        );
        self.path.close()
    }
}

/// Attachments of one request, keyed by form field name.
#[derive(Debug, Default)]
pub struct Attachments {
    files: HashMap<String, Attachment>,
}

impl Attachments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `attachment` under its field name, returning the handle it replaces.
    pub fn insert(&mut self, attachment: Attachment) -> Option<Attachment> {
        self.files.insert(attachment.field_name.clone(), attachment)
    }

    pub fn get(&self, field: &str) -> Option<&Attachment> {
        self.files.get(field)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, Attachment> {
        self.files.iter()
    }

    /// Release every file. All files are attempted; the first error is returned.
    pub fn release(self) -> std::io::Result<()> {
        let mut first_error = None;
        for (_, attachment) in self.files {
            if let Err(e) = attachment.release() {
                tracing::warn!(error = %e, "Failed to remove spooled upload");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<'a> IntoIterator for &'a Attachments {
    type Item = (&'a String, &'a Attachment);
    type IntoIter = hash_map::Iter<'a, String, Attachment>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn spooled(dir: &Path, field: &str, filename: &str, content: &[u8]) -> Attachment {
        let mut file = tempfile::NamedTempFile::new_in(dir).unwrap();
        file.write_all(content).unwrap();
        Attachment::new(
            field.to_string(),
            filename.to_string(),
            Some("application/octet-stream".to_string()),
            content.len() as u64,
            file.into_temp_path(),
        )
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn read_returns_spooled_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let attachment = spooled(dir.path(), "avatar", "x.png", b"\x89PNG");
        assert_eq!(attachment.read().await.unwrap(), b"\x89PNG");
        assert_eq!(attachment.len(), 4);
        assert_eq!(attachment.filename(), "x.png");
    }

    #[test]
    fn release_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let attachment = spooled(dir.path(), "avatar", "x.png", b"data");
        let path = attachment.path().to_path_buf();
        assert!(path.exists());
        attachment.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let attachment = spooled(dir.path(), "avatar", "x.png", b"data");
        assert_eq!(file_count(dir.path()), 1);
        drop(attachment);
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn insert_replaces_and_release_all() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = Attachments::new();
        assert!(files.insert(spooled(dir.path(), "doc", "a.txt", b"a")).is_none());
        let replaced = files.insert(spooled(dir.path(), "doc", "b.txt", b"bb")).unwrap();
        assert_eq!(replaced.filename(), "a.txt");
        replaced.release().unwrap();

        files.insert(spooled(dir.path(), "other", "c.txt", b"ccc"));
        assert_eq!(files.len(), 2);
        assert_eq!(files.get("doc").unwrap().filename(), "b.txt");
        assert_eq!(file_count(dir.path()), 2);

        files.release().unwrap();
        assert_eq!(file_count(dir.path()), 0);
    }
}
