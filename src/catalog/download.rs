// src/catalog/download.rs

//! Streaming source-archive downloads and digest helpers

use crate::error::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use sha2::{Digest, Sha384};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Timeout for establishing the connection and for each read
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Buffer size for streaming downloads and digests (1 MiB)
const STREAM_BUFFER_SIZE: usize = 1024 * 1024;

/// Download a URL to a file, streaming in chunks
///
/// The response body is never buffered whole in memory; toolchain source
/// archives run to hundreds of megabytes.
pub fn download(url: &str, dest: &Path) -> Result<()> {
    info!("Downloading: {}", url);

    let client = Client::builder()
        .connect_timeout(HTTP_TIMEOUT)
        .timeout(None)
        .build()
        .map_err(|e| Error::Download(format!("cannot create HTTP client: {e}")))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| Error::Download(format!("request for {url} failed: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::Download(format!(
            "request for {} failed with status {}",
            url,
            response.status()
        )));
    }

    let total = response.content_length().unwrap_or(0);
    let progress = if total > 0 {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::with_template("{bar:40} {bytes}/{total_bytes} {msg}")
                .expect("progress template is valid"),
        );
        pb.set_message(
            url.rsplit('/')
                .next()
                .unwrap_or("download")
                .to_string(),
        );
        Some(pb)
    } else {
        None
    };

    let mut file = File::create(dest)?;
    let mut buffer = vec![0u8; STREAM_BUFFER_SIZE];
    let mut downloaded: u64 = 0;

    loop {
        let read = response
            .read(&mut buffer)
            .map_err(|e| Error::Download(format!("read from {url} failed: {e}")))?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])?;
        downloaded += read as u64;
        if let Some(pb) = &progress {
            pb.set_position(downloaded);
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    info!("Downloaded {} bytes from {}", downloaded, url);
    Ok(())
}

/// Compute the SHA-384 digest of a file, streaming in chunks
pub fn file_sha384(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha384::new();
    let mut buffer = vec![0u8; STREAM_BUFFER_SIZE];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_sha384_matches_known_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data");
        std::fs::write(&path, b"abc").unwrap();
        // SHA-384("abc"), FIPS 180-2 test vector
        assert_eq!(
            file_sha384(&path).unwrap(),
            "cb00753f45a35e8bb5a03d699ac65007272c32ab0eded1631a8b605a43ff5bed\
             8086072ba1e7cc2358baeca134c825a7"
        );
    }

    #[test]
    fn test_download_unreachable_host() {
        let dir = TempDir::new().unwrap();
        let err = download("http://127.0.0.1:1/pkg.tar.gz", &dir.path().join("pkg")).unwrap_err();
        assert!(matches!(err, Error::Download(_)));
    }
}
