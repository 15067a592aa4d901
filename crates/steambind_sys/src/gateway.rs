use std::ffi::{CString, c_void};
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use libloading::Library;
use parking_lot::{ReentrantMutex, RwLock};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::word::NativeWord;
use steambind_config::LibraryConfig;

/// Outbound calls into the native library by exported name.
///
/// Every argument is one native word (integers, pointers, `bool` as 0/1) and
/// so is the return value. Structured results are written by the callee into
/// buffers whose addresses are passed as arguments; those buffers must stay
/// alive until `call` returns.
pub trait NativeCall: Send + Sync {
    fn call(&self, name: &str, args: &[usize]) -> Result<NativeWord>;
}

/// Most arguments accepted by [`DynamicGateway`] for a single call.
pub const MAX_ARITY: usize = 6;

/// `NativeCall` backed by shared libraries opened with `libloading`.
///
/// Symbols are resolved on first use and cached by name. Every call holds a
/// re-entrant lock so native entry is serialized across threads, while a
/// handler invoked synchronously from inside a native call may still call
/// back out on the same thread.
pub struct DynamicGateway {
    libraries: Vec<(PathBuf, Library)>,
    symbols: RwLock<AHashMap<String, usize>>,
    entry: ReentrantMutex<()>,
}

impl DynamicGateway {
    /// Open the Steam API library and, when configured, the callback shim.
    pub fn open(config: &LibraryConfig) -> Result<Self> {
        let mut libraries = vec![open_library(&config.resolved_path())?];
        if let Some(shim) = &config.shim_path {
            libraries.push(open_library(shim)?);
        }
        Ok(Self {
            libraries,
            symbols: RwLock::new(AHashMap::new()),
            entry: ReentrantMutex::new(()),
        })
    }

    /// Resolve `name` to an entry point address, consulting the cache first.
    fn resolve(&self, name: &str) -> Result<usize> {
        if let Some(address) = self.symbols.read().get(name).copied() {
            return Ok(address);
        }

        let mut symbol = Vec::with_capacity(name.len() + 1);
        symbol.extend_from_slice(name.as_bytes());
        symbol.push(0);

        let mut reason = String::from("no libraries loaded");
        for (path, library) in &self.libraries {
            match unsafe { library.get::<*const c_void>(&symbol) } {
                Ok(found) => {
                    let address = *found as usize;
                    if address == 0 {
                        reason = format!("{} exports a null address", path.display());
                        continue;
                    }
                    debug!(symbol = name, library = %path.display(), "resolved native symbol");
                    self.symbols.write().insert(name.to_string(), address);
                    return Ok(address);
                }
                Err(err) => reason = err.to_string(),
            }
        }

        Err(Error::MissingSymbol {
            name: name.to_string(),
            reason,
        })
    }

    pub fn libraries(&self) -> impl Iterator<Item = &Path> {
        self.libraries.iter().map(|(path, _)| path.as_path())
    }
}

impl NativeCall for DynamicGateway {
    fn call(&self, name: &str, args: &[usize]) -> Result<NativeWord> {
        if args.len() > MAX_ARITY {
            return Err(Error::UnsupportedArity {
                name: name.to_string(),
                arity: args.len(),
            });
        }
        let address = self.resolve(name)?;

        let _entry = self.entry.lock();
        trace!(symbol = name, ?args, "native call");
        // SAFETY: `address` was exported under `name`; the flat API takes and
        // returns native words only, which is the contract of `NativeCall`.
        let value = unsafe { invoke(address, args) };
        Ok(NativeWord(value))
    }
}

fn open_library(path: &Path) -> Result<(PathBuf, Library)> {
    let library = unsafe { Library::new(path) }.map_err(|source| Error::LibraryLoad {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(library = %path.display(), "loaded native library");
    Ok((path.to_path_buf(), library))
}

type Fn0 = unsafe extern "C" fn() -> usize;
type Fn1 = unsafe extern "C" fn(usize) -> usize;
type Fn2 = unsafe extern "C" fn(usize, usize) -> usize;
type Fn3 = unsafe extern "C" fn(usize, usize, usize) -> usize;
type Fn4 = unsafe extern "C" fn(usize, usize, usize, usize) -> usize;
type Fn5 = unsafe extern "C" fn(usize, usize, usize, usize, usize) -> usize;
type Fn6 = unsafe extern "C" fn(usize, usize, usize, usize, usize, usize) -> usize;

/// # Safety
/// `address` must be a C function taking `args.len()` word-sized arguments.
/// Callers check `args.len() <= MAX_ARITY`.
unsafe fn invoke(address: usize, args: &[usize]) -> usize {
    unsafe {
        match *args {
            [] => std::mem::transmute::<usize, Fn0>(address)(),
            [a] => std::mem::transmute::<usize, Fn1>(address)(a),
            [a, b] => std::mem::transmute::<usize, Fn2>(address)(a, b),
            [a, b, c] => std::mem::transmute::<usize, Fn3>(address)(a, b, c),
            [a, b, c, d] => std::mem::transmute::<usize, Fn4>(address)(a, b, c, d),
            [a, b, c, d, e] => std::mem::transmute::<usize, Fn5>(address)(a, b, c, d, e),
            [a, b, c, d, e, f] => std::mem::transmute::<usize, Fn6>(address)(a, b, c, d, e, f),
            _ => unreachable!("arity checked by caller"),
        }
    }
}

/// NUL-terminated copy of `value` for passing by address. Keep the returned
/// `CString` bound for as long as the native call that uses it.
pub fn c_string(value: &str) -> Result<CString> {
    Ok(CString::new(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_is_a_load_error() {
        let config = LibraryConfig {
            path: Some(PathBuf::from("/nonexistent/libsteam_api_missing.so")),
            shim_path: None,
        };
        let err = DynamicGateway::open(&config).err().unwrap();
        assert!(matches!(err, Error::LibraryLoad { .. }));
    }

    #[test]
    fn test_c_string_rejects_interior_nul() {
        assert!(c_string("save.dat").is_ok());
        assert!(matches!(c_string("bad\0name"), Err(Error::InteriorNul(_))));
    }

    extern "C" fn add3(a: usize, b: usize, c: usize) -> usize {
        a + b + c
    }

    #[test]
    fn test_invoke_by_arity() {
        let address = add3 as extern "C" fn(usize, usize, usize) -> usize as usize;
        assert_eq!(unsafe { invoke(address, &[1, 2, 3]) }, 6);
    }
}
