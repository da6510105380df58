// Multipart form processing
//
// This module extracts the two-part upload form (document + audio),
// streaming each part straight to disk through an UploadSink so a large
// payload is hashed and size-checked incrementally, never buffered whole.

use actix_multipart::{Field, Multipart};
use futures::{StreamExt, TryStreamExt};
use log::debug;

use crate::config::AppConfig;
use crate::error::HandlerError;
use crate::storage::{StreamedUpload, UploadSink};

/// One fully streamed upload part plus its declared filename
pub struct UploadedPart {
    pub upload: StreamedUpload,
    pub filename: String,
}

/// The two parts of an accepted upload form
pub struct UploadForm {
    pub document: UploadedPart,
    pub audio: UploadedPart,
}

/// Extract the `document` and `audio` parts of the upload form
///
/// Unknown fields are drained and ignored. Both parts are required; either
/// missing is a 400. Size ceilings are enforced per part kind while
/// streaming, and partial temp files are cleaned up on every failure path.
pub async fn extract_upload(
    mut form: Multipart,
    config: &AppConfig,
) -> Result<UploadForm, HandlerError> {
    let mut document: Option<UploadedPart> = None;
    let mut audio: Option<UploadedPart> = None;

    while let Ok(Some(mut field)) = form.try_next().await {
        let content_disposition = field.content_disposition();
        let field_name = content_disposition
            .and_then(|cd| cd.get_name().map(|name| name.to_string()))
            .unwrap_or_default();
        let filename = content_disposition
            .and_then(|cd| cd.get_filename().map(|name| name.to_string()));

        match field_name.as_str() {
            "document" => {
                let filename = filename.unwrap_or_else(|| "document.pdf".to_string());
                let part =
                    stream_part(&mut field, config, filename, config.max_document_bytes).await?;
                document = Some(part);
            }
            "audio" => {
                let filename = filename.unwrap_or_else(|| "audio.mp3".to_string());
                let part =
                    stream_part(&mut field, config, filename, config.max_audio_bytes).await?;
                audio = Some(part);
            }
            _ => {
                debug!("Skipping unknown form field: {}", field_name);
                while field.next().await.is_some() {}
            }
        }
    }

    let document = document.ok_or(HandlerError::MissingPart("document"))?;
    let audio = audio.ok_or(HandlerError::MissingPart("audio"))?;
    Ok(UploadForm { document, audio })
}

async fn stream_part(
    field: &mut Field,
    config: &AppConfig,
    filename: String,
    limit: u64,
) -> Result<UploadedPart, HandlerError> {
    let mut sink = UploadSink::create(&config.storage_dir, &filename, limit)?;

    while let Some(chunk) = field.next().await {
        let data = chunk.map_err(|e| {
            HandlerError::form_error(format!("Error reading {} upload: {}", filename, e))
        })?;
        sink.write_chunk(&data)?;
    }

    let upload = sink.finish()?;
    Ok(UploadedPart { upload, filename })
}
