//! `multipart/form-data` decoding.
//!
//! # Responsibilities
//! - Split a buffered body into attribute parts and file parts
//! - Spool file parts to transient storage
//! - Release everything spooled so far when decoding fails
//!
//! # Design Decisions
//! - Framing (boundaries, part headers, truncation) is handled by `multer`
//! - Attributes keep the first value per name; files keep the last one
//! - Results reach the caller only on success, so a failed decode leaves no
//!   attachment reachable from the request

use std::collections::HashMap;
use std::convert::Infallible;
use std::path::Path;

use bytes::Bytes;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::body::attachment::{Attachment, Attachments};
use crate::body::content_type::content_type_param;
use crate::body::DecodeError;

const DEFAULT_CHARSET: &str = "utf-8";

/// Fields and files decoded from one multipart body.
///
/// Either side stays `None` until a part of that kind is seen.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: Option<HashMap<String, String>>,
    pub files: Option<Attachments>,
}

impl MultipartForm {
    /// Delete every spooled file still owned by this form.
    pub fn release(self) {
        if let Some(files) = self.files {
            if let Err(e) = files.release() {
                tracing::warn!(error = %e, "Failed to release multipart uploads");
            }
        }
    }
}

/// Decode `buffer` using the boundary and charset declared in `content_type`.
///
/// File parts are written to `upload_dir`, or the system temp directory when
/// unset. An empty buffer decodes to an empty form.
pub async fn decode(
    buffer: Bytes,
    content_type: &str,
    upload_dir: Option<&Path>,
) -> Result<MultipartForm, DecodeError> {
    if buffer.is_empty() {
        return Ok(MultipartForm::default());
    }

    let boundary = multer::parse_boundary(content_type)?;
    let charset = content_type_param(content_type, "charset").unwrap_or(DEFAULT_CHARSET);
    let source = futures_util::stream::once(async move { Ok::<Bytes, Infallible>(buffer) });
    let mut multipart = multer::Multipart::new(source, boundary);

    let mut form = MultipartForm::default();
    match read_parts(&mut multipart, charset, upload_dir, &mut form).await {
        Ok(()) => Ok(form),
        Err(e) => {
            form.release();
            Err(e)
        }
    }
}

async fn read_parts(
    multipart: &mut multer::Multipart<'_>,
    charset: &str,
    upload_dir: Option<&Path>,
    form: &mut MultipartForm,
) -> Result<(), DecodeError> {
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            tracing::debug!(index = field.index(), "Skipping multipart part without a field name");
            continue;
        };

        match field.file_name().map(str::to_owned) {
            Some(filename) => {
                let attachment = spool(field, name, filename, upload_dir).await?;
                let files = form.files.get_or_insert_with(Attachments::new);
                if let Some(replaced) = files.insert(attachment) {
                    tracing::debug!(
                        field = %replaced.field_name(),
                        filename = %replaced.filename(),
                        "Replacing earlier upload for repeated field"
                    );
                    if let Err(e) = replaced.release() {
                        tracing::warn!(error = %e, "Failed to remove replaced upload");
                    }
                }
            }
            None => {
                let value = field.text_with_charset(charset).await?;
                form.fields
                    .get_or_insert_with(HashMap::new)
                    .entry(name)
                    .or_insert(value);
            }
        }
    }
    Ok(())
}

async fn spool(
    mut field: multer::Field<'_>,
    name: String,
    filename: String,
    upload_dir: Option<&Path>,
) -> Result<Attachment, DecodeError> {
    let content_type = field.content_type().map(ToString::to_string);

    let temp = match upload_dir {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new(),
    }
    .map_err(|source| spool_error(&name, source))?;
    let (file, path) = temp.into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut len = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk)
            .await
            .map_err(|source| spool_error(&name, source))?;
        len += chunk.len() as u64;
    }
    file.flush().await.map_err(|source| spool_error(&name, source))?;

    tracing::debug!(
        field = %name,
        filename = %filename,
        bytes = len,
        "Spooled upload"
    );
    Ok(Attachment::new(name, filename, content_type, len, path))
}

fn spool_error(field: &str, source: std::io::Error) -> DecodeError {
    DecodeError::Spool {
        field: field.to_string(),
        source,
    }
}
