use std::fmt;
use std::sync::Arc;

use crate::interface::{acquire, require_wide_words};
use steambind_sys::symbols;
use steambind_sys::types::STEAM_INPUT_MAX_COUNT;
use steambind_sys::{InputHandle, NativeCall, Result};

/// `ESteamInputType`
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InputType(pub i32);

impl InputType {
    pub const UNKNOWN: Self = Self(0);
    pub const STEAM_CONTROLLER: Self = Self(1);
    pub const XBOX_360: Self = Self(2);
    pub const XBOX_ONE: Self = Self(3);
    pub const GENERIC_GAMEPAD: Self = Self(4);
    pub const PS4: Self = Self(5);
    pub const APPLE_MFI: Self = Self(6);
    pub const ANDROID: Self = Self(7);
    pub const SWITCH_JOYCON_PAIR: Self = Self(8);
    pub const SWITCH_JOYCON_SINGLE: Self = Self(9);
    pub const SWITCH_PRO: Self = Self(10);
    pub const MOBILE_TOUCH: Self = Self(11);
    pub const PS3: Self = Self(12);
    pub const PS5: Self = Self(13);
    pub const STEAM_DECK: Self = Self(14);

    pub const fn name(self) -> &'static str {
        match self.0 {
            1 => "SteamController",
            2 => "XBox360Controller",
            3 => "XBoxOneController",
            4 => "GenericGamepad",
            5 => "PS4Controller",
            6 => "AppleMFiController",
            7 => "AndroidController",
            8 => "SwitchJoyConPair",
            9 => "SwitchJoyConSingle",
            10 => "SwitchProController",
            11 => "MobileTouch",
            12 => "PS3Controller",
            13 => "PS5Controller",
            14 => "SteamDeckController",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct SteamInput {
    native: Arc<dyn NativeCall>,
    this: usize,
}

impl SteamInput {
    pub fn new(native: Arc<dyn NativeCall>) -> Result<Self> {
        let this = acquire(&*native, symbols::STEAM_INPUT)?;
        Ok(Self { native, this })
    }

    /// Start the input subsystem. With `explicitly_call_run_frame` the caller
    /// drives [`run_frame`](Self::run_frame) itself.
    pub fn init(&self, explicitly_call_run_frame: bool) -> Result<bool> {
        Ok(self
            .native
            .call(
                symbols::INPUT_INIT,
                &[self.this, usize::from(explicitly_call_run_frame)],
            )?
            .as_bool())
    }

    pub fn run_frame(&self) -> Result<()> {
        // Second argument is `bReservedValue`.
        self.native.call(symbols::INPUT_RUN_FRAME, &[self.this, 0])?;
        Ok(())
    }

    pub fn connected_controllers(&self) -> Result<Vec<InputHandle>> {
        let mut handles = [InputHandle::default(); STEAM_INPUT_MAX_COUNT];
        let count = self
            .native
            .call(
                symbols::INPUT_GET_CONNECTED_CONTROLLERS,
                &[self.this, handles.as_mut_ptr() as usize],
            )?
            .as_i32();
        let count = usize::try_from(count).unwrap_or(0).min(STEAM_INPUT_MAX_COUNT);
        Ok(handles[..count].to_vec())
    }

    pub fn input_type_for_handle(&self, handle: InputHandle) -> Result<InputType> {
        require_wide_words(symbols::INPUT_GET_INPUT_TYPE_FOR_HANDLE)?;
        let kind = self.native.call(
            symbols::INPUT_GET_INPUT_TYPE_FOR_HANDLE,
            &[self.this, handle.0 as usize],
        )?;
        Ok(InputType(kind.as_i32()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::testing::native_with;

    #[test]
    fn test_connected_controllers_trims_to_count() {
        let mock = native_with(symbols::STEAM_INPUT);
        mock.respond(symbols::INPUT_GET_CONNECTED_CONTROLLERS, |args| {
            let out = args[1] as *mut InputHandle;
            // SAFETY: args[1] is an array of STEAM_INPUT_MAX_COUNT handles.
            unsafe {
                out.write(InputHandle(11));
                out.add(1).write(InputHandle(12));
            }
            2
        });

        let input = SteamInput::new(mock).unwrap();
        assert_eq!(
            input.connected_controllers().unwrap(),
            vec![InputHandle(11), InputHandle(12)]
        );
    }

    #[test]
    fn test_input_type_and_init_flags() {
        let mock = native_with(symbols::STEAM_INPUT);
        mock.respond(symbols::INPUT_GET_INPUT_TYPE_FOR_HANDLE, |_| 13);
        mock.respond(symbols::INPUT_INIT, |args| args[1]);

        let input = SteamInput::new(mock.clone()).unwrap();
        let kind = input.input_type_for_handle(InputHandle(11)).unwrap();
        assert_eq!(kind, InputType::PS5);
        assert_eq!(kind.to_string(), "PS5Controller");

        assert!(input.init(true).unwrap());
        assert!(!input.init(false).unwrap());
        input.run_frame().unwrap();
        assert_eq!(mock.count(symbols::INPUT_RUN_FRAME), 1);
    }
}
