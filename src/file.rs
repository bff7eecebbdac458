use std::fs;
use std::io::{Read, Seek, Write};

/// Options for opening a file. The default mode is read-only.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// True if the file should be created if not present.
    pub create: bool,
    /// True if the file should be able to be read.
    pub read: bool,
    /// True if the file should be truncated.
    pub truncate: bool,
    /// True if the file should be written to.
    pub write: bool,
}

impl From<&OpenOptions> for fs::OpenOptions {
    fn from(value: &OpenOptions) -> Self {
        Self::new()
            .create(value.create)
            .truncate(value.truncate)
            .read(value.read)
            .write(value.write)
            .clone()
    }
}

impl OpenOptions {
    /// # Arguments
    /// `create`: If true, the file should be created if it does not exist. Note that setting this
    /// to true will implicitly enable writing.
    pub fn create(mut self, create: bool) -> Self {
        if create {
            self.write = true;
        }
        self.create = create;
        self
    }

    /// # Arguments
    /// `read`: If true, the file should be able to be read in entirety.
    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    /// # Arguments
    /// `truncate`: If true, the file should be opened with the cursor set to the beginning of the
    /// file, overwriting all contents. Note that setting this to true will implicitly enable
    /// writing.
    pub fn truncate(mut self, truncate: bool) -> Self {
        if truncate {
            self.write = true;
        }
        self.truncate = truncate;
        self
    }

    /// # Arguments
    /// `write`: If true, the file should be able to be written.
    pub fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            create: false,
            read: true,
            truncate: false,
            write: false,
        }
    }
}

/// An open file handle.
pub trait File: Read + Write + Seek + Send {
    /// Closes the file, surfacing any deferred failure. Handles backed by an
    /// atomic write publish their contents here.
    fn close(self: Box<Self>) -> crate::Result<()> {
        Ok(())
    }

    /// Reads the remaining file contents into a vector.
    fn read_into_vec(&mut self) -> crate::Result<Vec<u8>> {
        let mut vec = Vec::new();
        self.read_to_end(&mut vec)?;
        Ok(vec)
    }

    /// Reads the remaining file contents into a string.
    fn read_into_string(&mut self) -> crate::Result<String> {
        let mut str = String::new();
        self.read_to_string(&mut str)?;
        Ok(str)
    }
}

impl File for fs::File {}
