use anyhow::{Context, Result};
use futures::StreamExt;
use seine_config::OutputDirectories;
use seine_types::ArtifactKind;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Writes crawl artifacts under per-kind directories with deterministic
/// `sha256(url)` filenames.
///
/// Every write lands in a `.tmp` sibling first and is renamed into place,
/// so a file either exists complete or not at all; the document row only
/// ever references committed files. Stray `.tmp` files from an
/// interrupted run are harmless because nothing references them.
pub struct ArtifactWriter {
    dirs: BTreeMap<ArtifactKind, PathBuf>,
}

impl ArtifactWriter {
    /// Creates the writer and all configured output directories
    /// (idempotent).
    pub fn new(output: &OutputDirectories) -> Result<Self> {
        let dirs = BTreeMap::from([
            (ArtifactKind::Html, output.html.clone()),
            (ArtifactKind::Md, output.md.clone()),
            (ArtifactKind::Pdf, output.pdf.clone()),
            (ArtifactKind::PdfText, output.pdf_text.clone()),
            (ArtifactKind::Video, output.video.clone()),
        ]);
        for dir in dirs.values().chain([&output.transcripts, &output.json]) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        }
        Ok(Self { dirs })
    }

    /// Deterministic filename: hex SHA-256 of the URL plus the extension.
    pub fn filename(url: &str, extension: &str) -> String {
        let digest = hex::encode(Sha256::digest(url.as_bytes()));
        if extension.is_empty() {
            digest
        } else if let Some(stripped) = extension.strip_prefix('.') {
            format!("{digest}.{stripped}")
        } else {
            format!("{digest}.{extension}")
        }
    }

    /// Where an artifact of this kind for this URL lives on disk.
    pub fn path_for(&self, kind: ArtifactKind, url: &str, extension: &str) -> PathBuf {
        self.dirs[&kind].join(Self::filename(url, extension))
    }

    /// Writes text content, returning the recorded artifact path.
    pub async fn write_text(
        &self,
        kind: ArtifactKind,
        url: &str,
        extension: &str,
        content: &str,
    ) -> Result<String> {
        self.write_bytes(kind, url, extension, content.as_bytes()).await
    }

    /// Writes a byte buffer, returning the recorded artifact path.
    pub async fn write_bytes(
        &self,
        kind: ArtifactKind,
        url: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let path = self.path_for(kind, url, extension);
        let tmp = tmp_path(&path);
        fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("failed to write artifact {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("failed to commit artifact {}", path.display()))?;
        Ok(path.to_string_lossy().into_owned())
    }

    /// Streams a response body to disk chunk by chunk, so PDF and media
    /// payloads never have to fit in memory.
    pub async fn write_stream(
        &self,
        kind: ArtifactKind,
        url: &str,
        extension: &str,
        response: reqwest::Response,
    ) -> Result<String> {
        let path = self.path_for(kind, url, extension);
        let tmp = tmp_path(&path);
        let mut file = fs::File::create(&tmp)
            .await
            .with_context(|| format!("failed to create artifact {}", tmp.display()))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("failed reading body of {url}"))?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("failed to write artifact {}", tmp.display()))?;
        }
        file.flush().await?;
        drop(file);
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("failed to commit artifact {}", path.display()))?;
        Ok(path.to_string_lossy().into_owned())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}
