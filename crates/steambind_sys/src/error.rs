use std::path::PathBuf;

/// Binding faults. None of these are transient: they mean the loaded library
/// does not match what this binding was written against.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load native library {}", path.display())]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("native symbol `{name}` not found: {reason}")]
    MissingSymbol { name: String, reason: String },

    #[error("native call `{name}` with {arity} arguments is not supported")]
    UnsupportedArity { name: String, arity: usize },

    #[error("argument contains an interior NUL byte")]
    InteriorNul(#[from] std::ffi::NulError),

    #[error("{what} of {value} does not fit the native argument type")]
    ArgumentRange { what: &'static str, value: usize },

    #[error("result buffer holds {actual} bytes, {expected} required")]
    ResultSize { expected: usize, actual: usize },

    #[error("expected callback {expected}, result carries {actual}")]
    CallbackMismatch { expected: i32, actual: i32 },

    #[error("interface accessor `{0}` returned null")]
    NullInterface(&'static str),

    #[error("`{0}` returned false")]
    InitFailed(&'static str),

    #[error("{0} is not supported on this platform")]
    Platform(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
