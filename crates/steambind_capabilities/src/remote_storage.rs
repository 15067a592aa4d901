use std::ffi::CString;
use std::sync::Arc;

use tracing::debug;

use crate::interface::{acquire, length_arg};
use steambind_sys::symbols;
use steambind_sys::{NativeCall, Result, c_string};

/// Steam Cloud file storage for the current user and app.
pub struct SteamRemoteStorage {
    native: Arc<dyn NativeCall>,
    this: usize,
}

impl SteamRemoteStorage {
    pub fn new(native: Arc<dyn NativeCall>) -> Result<Self> {
        let this = acquire(&*native, symbols::STEAM_REMOTE_STORAGE)?;
        Ok(Self { native, this })
    }

    pub fn file_write(&self, file: &str, data: &[u8]) -> Result<bool> {
        let name = c_string(file)?;
        let len = length_arg("file contents", data.len())?;
        let written = self
            .native
            .call(
                symbols::REMOTE_STORAGE_FILE_WRITE,
                &[self.this, name.as_ptr() as usize, data.as_ptr() as usize, len],
            )?
            .as_bool();
        debug!(file, len, written, "remote storage write");
        Ok(written)
    }

    /// Read up to `buffer.len()` bytes of `file`; returns the count read.
    pub fn file_read(&self, file: &str, buffer: &mut [u8]) -> Result<usize> {
        let name = c_string(file)?;
        self.read_into(&name, buffer)
    }

    /// Read the whole of `file`. Missing files read as empty.
    pub fn read_to_vec(&self, file: &str) -> Result<Vec<u8>> {
        let name = c_string(file)?;
        let mut data = vec![0u8; self.size_of(&name)?];
        if data.is_empty() {
            return Ok(data);
        }
        let read = self.read_into(&name, &mut data)?;
        data.truncate(read);
        Ok(data)
    }

    pub fn file_delete(&self, file: &str) -> Result<bool> {
        let name = c_string(file)?;
        Ok(self
            .native
            .call(symbols::REMOTE_STORAGE_FILE_DELETE, &[self.this, name.as_ptr() as usize])?
            .as_bool())
    }

    /// Size of `file` in bytes; 0 when it does not exist.
    pub fn file_size(&self, file: &str) -> Result<usize> {
        let name = c_string(file)?;
        self.size_of(&name)
    }

    fn size_of(&self, name: &CString) -> Result<usize> {
        let size = self
            .native
            .call(symbols::REMOTE_STORAGE_GET_FILE_SIZE, &[self.this, name.as_ptr() as usize])?
            .as_i32();
        Ok(usize::try_from(size).unwrap_or(0))
    }

    fn read_into(&self, name: &CString, buffer: &mut [u8]) -> Result<usize> {
        let len = length_arg("read buffer", buffer.len())?;
        let read = self
            .native
            .call(
                symbols::REMOTE_STORAGE_FILE_READ,
                &[self.this, name.as_ptr() as usize, buffer.as_mut_ptr() as usize, len],
            )?
            .as_i32();
        Ok(usize::try_from(read).unwrap_or(0).min(buffer.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::testing::native_with;
    use std::ffi::{CStr, c_char};
    use steambind_sys::Error;

    fn arg_str(word: usize) -> String {
        // SAFETY: the wrapper passes a live CString.
        unsafe { CStr::from_ptr(word as *const c_char) }
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_write_passes_name_and_bytes() {
        let mock = native_with(symbols::STEAM_REMOTE_STORAGE);
        mock.respond(symbols::REMOTE_STORAGE_FILE_WRITE, |args| {
            assert_eq!(arg_str(args[1]), "save.dat");
            // SAFETY: args[2] points at args[3] bytes of file contents.
            let data = unsafe { std::slice::from_raw_parts(args[2] as *const u8, args[3]) };
            usize::from(data == b"progress")
        });

        let storage = SteamRemoteStorage::new(mock).unwrap();
        assert!(storage.file_write("save.dat", b"progress").unwrap());
        assert!(!storage.file_write("save.dat", b"other").unwrap());
    }

    #[test]
    fn test_read_to_vec_uses_reported_size() {
        let mock = native_with(symbols::STEAM_REMOTE_STORAGE);
        mock.respond(symbols::REMOTE_STORAGE_GET_FILE_SIZE, |_| 5);
        mock.respond(symbols::REMOTE_STORAGE_FILE_READ, |args| {
            assert_eq!(args[3], 5);
            // SAFETY: args[2] is a buffer of args[3] bytes.
            unsafe { std::ptr::copy_nonoverlapping(b"hello".as_ptr(), args[2] as *mut u8, 5) };
            5
        });

        let storage = SteamRemoteStorage::new(mock.clone()).unwrap();
        assert_eq!(storage.read_to_vec("greeting.txt").unwrap(), b"hello");
        assert_eq!(storage.file_size("greeting.txt").unwrap(), 5);
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let mock = native_with(symbols::STEAM_REMOTE_STORAGE);
        let storage = SteamRemoteStorage::new(mock.clone()).unwrap();
        assert!(storage.read_to_vec("absent").unwrap().is_empty());
        assert_eq!(mock.count(symbols::REMOTE_STORAGE_FILE_READ), 0);
        assert!(!storage.file_delete("absent").unwrap());
    }

    #[test]
    fn test_interior_nul_is_rejected() {
        let mock = native_with(symbols::STEAM_REMOTE_STORAGE);
        let storage = SteamRemoteStorage::new(mock.clone()).unwrap();
        assert!(matches!(storage.file_delete("bad\0name"), Err(Error::InteriorNul(_))));
        assert_eq!(mock.count(symbols::REMOTE_STORAGE_FILE_DELETE), 0);
    }
}
