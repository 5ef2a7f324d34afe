//! Scratch files for handing bytes to external decoders and tools.
//!
//! A [`ScratchFile`] is a uniquely named temporary file that is deleted when
//! it goes out of scope, on success, early return, or panic alike. Unique
//! names come from `tempfile`, so concurrent conversions never collide.

use std::io::Write;
use std::path::Path;

use tempfile::{Builder as TempFileBuilder, NamedTempFile};

/// A temporary file removed on drop.
#[derive(Debug)]
pub struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    /// Create an empty scratch file whose name ends in `.{extension}`.
    pub fn create(extension: &str) -> std::io::Result<Self> {
        let file = TempFileBuilder::new()
            .prefix("clipgif_")
            .suffix(&format!(".{extension}"))
            .tempfile()?;
        Ok(Self { file })
    }

    /// Create a scratch file holding `bytes`, flushed and ready to be read
    /// by another process or library.
    pub fn with_bytes(bytes: &[u8], extension: &str) -> std::io::Result<Self> {
        let mut scratch = Self::create(extension)?;
        scratch.file.write_all(bytes)?;
        scratch.file.flush()?;
        Ok(scratch)
    }

    /// Location of the file on disk.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the file's current contents.
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.path())
    }
}
