//! A byte vector mirrored to a file as a flat array
//!
//! FileVec keeps a `Vec<u8>` whose content is also stored in a file, so that
//! the accumulated values survive a crash or restart. The file is rewritten in
//! full on every mutating call, which keeps it valid at all times at the cost
//! of O(n) writes.
//!
//! The on-disk format is the raw bytes themselves, nothing else, so the file
//! can be consumed directly by other tools (e.g. `numpy.fromfile`).
//!
//! # Example
//! ```rust
//! use flatvec::FileVec;
//!
//! let mut f = FileVec::create("__doc_example").unwrap();
//! f.push(123).unwrap();
//! f.push(45).unwrap();
//! drop(f);
//!
//! let f = FileVec::open("__doc_example").unwrap();
//! assert_eq!(f.as_ref(), &[123, 45]);
//! # std::fs::remove_file("__doc_example").unwrap();
//! ```

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

pub struct FileVec {
    vec: Vec<u8>,
    file: std::fs::File,
}

impl FileVec {
    /// Opens a FileVec backed by the given file, loading any existing content.
    /// Creates the file if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let mut file =
            std::fs::OpenOptions::new().read(true).write(true).create(true).open(path)?;

        let mut vec = Vec::new();
        file.read_to_end(&mut vec)?;

        Ok(FileVec { vec, file })
    }

    /// Like `open`, but discards any existing content of the file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let mut f = Self::open(path)?;
        if !f.vec.is_empty() {
            f.vec.clear();
            f.write_to_file()?;
        }
        Ok(f)
    }

    fn write_to_file(&mut self) -> Result<(), std::io::Error> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&self.vec)?;
        self.file.flush()?;

        Ok(())
    }

    /// Appends a value and then syncs with the underlying file
    pub fn push(&mut self, value: u8) -> Result<(), std::io::Error> {
        self.vec.push(value);
        self.write_to_file()?;
        Ok(())
    }

    /// Appends all given values and then syncs with the underlying file
    pub fn extend_from_slice(&mut self, values: &[u8]) -> Result<(), std::io::Error> {
        self.vec.extend_from_slice(values);
        self.write_to_file()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }
}

impl AsRef<[u8]> for FileVec {
    fn as_ref(&self) -> &[u8] {
        &self.vec
    }
}

impl std::ops::Index<usize> for FileVec {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.vec[index]
    }
}

#[cfg(test)]
mod test {
    use super::FileVec;
    use std::io::Read;

    #[test]
    fn empty_vec() {
        let f = FileVec::open("__empty_vec").unwrap();

        assert_eq!(f.len(), 0);
        assert!(std::path::Path::new("__empty_vec").exists());

        let _ = std::fs::remove_file("__empty_vec");
    }

    #[test]
    fn prefilled() {
        const DATA: [u8; 5] = [1u8, 2, 3, 4, 5];
        std::fs::write("__prefilled", DATA).unwrap();

        let f = FileVec::open("__prefilled").unwrap();
        assert_eq!(&DATA, f.as_ref());

        let _ = std::fs::remove_file("__prefilled");
    }

    #[test]
    fn push_single() {
        let mut f = FileVec::create("__push_single").unwrap();
        f.push(123).unwrap();
        assert_eq!(f[0], 123);

        drop(f);
        let f = FileVec::open("__push_single").unwrap();
        assert_eq!(f[0], 123);

        let _ = std::fs::remove_file("__push_single");
    }

    #[test]
    fn file_is_rewritten_on_every_push() {
        let mut f = FileVec::create("__rewrite").unwrap();

        for (i, value) in [9u8, 8, 7].iter().enumerate() {
            f.push(*value).unwrap();

            let mut buffer = Vec::new();
            std::fs::File::open("__rewrite").unwrap().read_to_end(&mut buffer).unwrap();
            assert_eq!(buffer, [9u8, 8, 7][..=i]);
        }

        let _ = std::fs::remove_file("__rewrite");
    }

    #[test]
    fn create_truncates_existing() {
        std::fs::write("__truncate", [1u8, 2, 3]).unwrap();

        let f = FileVec::create("__truncate").unwrap();
        assert!(f.is_empty());
        assert_eq!(std::fs::read("__truncate").unwrap(), Vec::<u8>::new());

        let _ = std::fs::remove_file("__truncate");
    }

    #[test]
    fn extend() {
        let mut f = FileVec::create("__extend").unwrap();
        f.extend_from_slice(&[0, 1, 2, 3]).unwrap();

        assert_eq!(std::fs::read("__extend").unwrap(), vec![0, 1, 2, 3]);

        let _ = std::fs::remove_file("__extend");
    }
}
