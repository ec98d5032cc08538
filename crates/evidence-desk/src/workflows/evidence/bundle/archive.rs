use std::io::{self, Read};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder, EntryType, Header};

/// Writes a gzip-compressed tar held entirely in memory.
pub struct BundleArchive {
    builder: Builder<GzEncoder<Vec<u8>>>,
    mtime: u64,
}

impl BundleArchive {
    /// `mtime` is stamped on every entry (seconds since the Unix epoch).
    pub fn new(mtime: u64) -> Self {
        Self {
            builder: Builder::new(GzEncoder::new(Vec::new(), Compression::default())),
            mtime,
        }
    }

    pub fn append(&mut self, path: &str, bytes: &[u8]) -> io::Result<()> {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(self.mtime);
        self.builder.append_data(&mut header, path, bytes)
    }

    pub fn finish(self) -> io::Result<Vec<u8>> {
        self.builder.into_inner()?.finish()
    }
}

/// Reads every regular file out of a bundle as `(path, bytes)`, in archive order.
pub fn read_bundle(bytes: &[u8]) -> io::Result<Vec<(String, Vec<u8>)>> {
    let mut archive = Archive::new(GzDecoder::new(bytes));
    let mut files = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.header().entry_type() != EntryType::Regular {
            continue;
        }
        let path = entry.path()?.to_string_lossy().into_owned();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;
        files.push((path, contents));
    }

    Ok(files)
}
