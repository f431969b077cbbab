//! File stream parameters, common header and frame saving.

use std::collections::BTreeMap;
use tracing::debug;

use super::FrelonTranslator;
use crate::core::{FileFormat, FileStreamParams, OverwritePolicy};
use crate::error::CcdResult;

/// Stream used by the single-stream file commands.
pub const DEFAULT_STREAM: usize = 0;

/// File parameters as sent by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileParamsUpdate {
    /// Stream index
    pub stream: usize,
    /// Whether the stream saves
    pub active: bool,
    /// Target directory
    pub directory: String,
    /// File name prefix
    pub prefix: String,
    /// File name suffix, extension included
    pub suffix: String,
    /// Index of the next file written
    pub next_number: i64,
    /// printf-style index format
    pub index_format: String,
    /// `"y"`/`"yes"` to overwrite existing files
    pub overwrite: String,
}

impl FileParamsUpdate {
    /// Engine stream parameters, with format and policy derived from the
    /// suffix and the overwrite token.
    pub fn stream_params(&self) -> FileStreamParams {
        FileStreamParams {
            directory: self.directory.clone(),
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
            next_number: self.next_number,
            index_format: self.index_format.clone(),
            file_format: FileFormat::from_suffix(&self.suffix),
            overwrite_policy: OverwritePolicy::from_token(&self.overwrite),
        }
    }
}

/// File parameters as reported to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileParamsReport {
    /// Stream index
    pub stream: usize,
    /// Whether the stream saves
    pub active: bool,
    /// Target directory
    pub directory: String,
    /// File name prefix
    pub prefix: String,
    /// File name suffix, extension included
    pub suffix: String,
    /// Index of the next file written
    pub next_number: i64,
    /// Format derived from the suffix
    pub file_format: FileFormat,
    /// Behaviour on existing files
    pub overwrite: OverwritePolicy,
}

/// Parse a `key = value;` block, one pair per line.
///
/// The value is everything after the first `=`, trimmed, with one trailing
/// `;` removed. Lines without a key are skipped; a line without `=` gets an
/// empty value.
pub fn parse_header(text: &str) -> BTreeMap<String, String> {
    let mut header = BTreeMap::new();
    for line in text.split('\n') {
        let (key, value) = line.split_once('=').unwrap_or((line, ""));
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let mut value = value.trim();
        if let Some(stripped) = value.strip_suffix(';') {
            value = stripped.trim();
        }
        header.insert(key.to_string(), value.to_string());
    }
    header
}

impl FrelonTranslator {
    /// Set the parameters of one file stream and its activation.
    pub async fn set_file_params_ext(&self, update: FileParamsUpdate) -> CcdResult<()> {
        let _session = self.begin().await;
        debug!("Setting file params: {:?}", update);
        let params = update.stream_params();
        self.engine
            .set_file_stream_active(update.stream, update.active)
            .await?;
        self.engine
            .set_file_stream_params(update.stream, params)
            .await?;
        Ok(())
    }

    /// Parameters and activation of stream `stream`.
    pub async fn get_file_params_ext(&self, stream: usize) -> CcdResult<FileParamsReport> {
        let _session = self.begin().await;
        let active = self.engine.file_stream_active(stream).await?;
        let params = self.engine.file_stream_params(stream).await?;
        let report = FileParamsReport {
            stream,
            active,
            directory: params.directory,
            prefix: params.prefix,
            suffix: params.suffix,
            next_number: params.next_number,
            file_format: params.file_format,
            overwrite: params.overwrite_policy,
        };
        debug!("Getting file params: {:?}", report);
        Ok(report)
    }

    /// Single-stream form: always the first stream, always active.
    pub async fn set_file_params(&self, mut update: FileParamsUpdate) -> CcdResult<()> {
        update.stream = DEFAULT_STREAM;
        update.active = true;
        self.set_file_params_ext(update).await
    }

    /// Parameters of the default stream.
    pub async fn get_file_params(&self) -> CcdResult<FileParamsReport> {
        self.get_file_params_ext(DEFAULT_STREAM).await
    }

    /// Replace the common file header from its text form.
    pub async fn set_file_header(&self, text: &str) -> CcdResult<()> {
        let _session = self.begin().await;
        let header = parse_header(text);
        debug!("Setting header: {:?}", header);
        self.engine.set_common_file_header(header).await?;
        Ok(())
    }

    /// Save frame `frame_nb`.
    pub async fn write_single_frame(&self, frame_nb: i64) -> CcdResult<()> {
        let _session = self.begin().await;
        debug!("Writing frame: {}", frame_nb);
        self.engine.write_file(frame_nb, 1).await?;
        Ok(())
    }

    /// Save the configured number of concatenated frames from frame 0.
    pub async fn write_concat_frames(&self) -> CcdResult<()> {
        let _session = self.begin().await;
        let nb_concat = self.engine.nb_concat_frames().await?;
        debug!("Writing {} concatenated frames", nb_concat);
        self.engine.write_file(0, nb_concat).await?;
        Ok(())
    }
}
