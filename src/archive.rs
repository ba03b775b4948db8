// src/archive.rs

//! Source archive extraction
//!
//! GNU toolchain releases ship as gzip- or xz-compressed tarballs; those
//! plus uncompressed tar are the formats accepted here. The format is
//! chosen by file extension.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;
use xz2::read::XzDecoder;

/// Archive formats we can extract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    TarGz,
    TarXz,
    Tar,
}

fn detect_format(path: &Path) -> Result<ArchiveFormat> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Ok(ArchiveFormat::TarGz)
    } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        Ok(ArchiveFormat::TarXz)
    } else if name.ends_with(".tar") {
        Ok(ArchiveFormat::Tar)
    } else {
        Err(Error::UnsupportedArchive(name.to_string()))
    }
}

/// Extract an archive into a destination directory
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let format = detect_format(archive)?;
    debug!(
        "Extracting {} to {} ({:?})",
        archive.display(),
        dest.display(),
        format
    );

    let file = File::open(archive)?;
    let reader: Box<dyn Read> = match format {
        ArchiveFormat::TarGz => Box::new(GzDecoder::new(file)),
        ArchiveFormat::TarXz => Box::new(XzDecoder::new(file)),
        ArchiveFormat::Tar => Box::new(file),
    };

    let mut tar = tar::Archive::new(reader);
    tar.unpack(dest)?;
    Ok(())
}
