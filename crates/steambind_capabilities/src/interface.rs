use tracing::debug;

use steambind_sys::{Error, NativeCall, Result};

/// Fetch the interface pointer returned by `accessor`.
pub(crate) fn acquire(native: &dyn NativeCall, accessor: &'static str) -> Result<usize> {
    let this = native.call(accessor, &[])?;
    if this.is_null() {
        return Err(Error::NullInterface(accessor));
    }
    debug!(accessor, "acquired interface");
    Ok(this.raw())
}

/// 64-bit arguments and return values travel in a single native word.
pub(crate) fn require_wide_words(operation: &'static str) -> Result<()> {
    if usize::BITS < u64::BITS {
        return Err(Error::Platform(operation));
    }
    Ok(())
}

pub(crate) fn length_arg(what: &'static str, value: usize) -> Result<usize> {
    i32::try_from(value)
        .map(|_| value)
        .map_err(|_| Error::ArgumentRange { what, value })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use steambind_sys::mock::MockNative;

    pub const INTERFACE: usize = 0x5000;

    /// Mock whose interface accessors all return [`INTERFACE`].
    pub fn native_with(accessor: &str) -> Arc<MockNative> {
        let mock = Arc::new(MockNative::new());
        mock.respond(accessor, |_| INTERFACE);
        mock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steambind_sys::mock::MockNative;
    use steambind_sys::symbols;

    #[test]
    fn test_null_interface_is_an_error() {
        let mock = MockNative::new();
        assert!(matches!(
            acquire(&mock, symbols::STEAM_APPS),
            Err(Error::NullInterface(symbols::STEAM_APPS))
        ));
    }

    #[test]
    fn test_length_arg_limits() {
        assert_eq!(length_arg("buffer", 64).unwrap(), 64);
        assert!(matches!(
            length_arg("buffer", usize::MAX),
            Err(Error::ArgumentRange { what: "buffer", .. })
        ));
    }
}
