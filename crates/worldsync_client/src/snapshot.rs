//! Snapshot archiving.
//!
//! A snapshot is a zip archive of the tracked file set at the moment of a
//! commit, stored as an opaque blob keyed by the commit id.

use crate::error::{SyncError, SyncResult};
use crate::worktree::FileMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Packs a file map into a zip archive.
pub fn pack(files: &FileMap) -> SyncResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (path, bytes) in files {
        zip.start_file(path.as_str(), options).map_err(archive_err)?;
        zip.write_all(bytes)?;
    }
    zip.finish().map_err(archive_err)?;

    Ok(buffer.into_inner())
}

/// Unpacks a zip archive into a file map.
pub fn unpack(bytes: &[u8]) -> SyncResult<FileMap> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(archive_err)?;
    let mut files = FileMap::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(archive_err)?;
        if entry.is_dir() {
            continue;
        }
        let mut contents = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut contents)?;
        files.insert(entry.name().to_string(), contents);
    }

    Ok(files)
}

fn archive_err(err: zip::result::ZipError) -> SyncError {
    SyncError::Snapshot(err.to_string())
}
