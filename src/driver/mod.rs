pub mod harmony;

use crate::error::DriverError;
use crate::models::{AppEntry, RawUiTree, UiState};

// Cross-platform key codes accepted by `press_key`; drivers translate them
// to their platform's equivalents and pass unmapped codes through.
pub const KEYCODE_HOME: u32 = 3;
pub const KEYCODE_BACK: u32 = 4;
pub const KEYCODE_ENTER: u32 = 66;

/// One capability interface per target platform. Implementations declare
/// their supported operation set explicitly rather than relying on partial
/// overrides of a common base.
pub trait DeviceDriver {
    /// Operation names this driver actually implements.
    fn supported_operations(&self) -> &'static [&'static str];

    fn connect(&mut self) -> Result<(), DriverError>;
    fn is_connected(&self) -> bool;
    fn serial(&self) -> Option<&str>;

    fn tap(&mut self, x: i32, y: i32) -> Result<(), DriverError>;
    fn swipe(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        duration_ms: u64,
    ) -> Result<(), DriverError>;
    fn drag(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        duration_ms: u64,
    ) -> Result<(), DriverError>;
    /// Best-effort text entry; soft failures surface as `false`.
    fn input_text(&mut self, text: &str, clear: bool) -> bool;
    fn press_key(&mut self, keycode: u32) -> Result<(), DriverError>;

    /// Launch failure is reported in the returned message, never raised.
    fn start_app(&mut self, package: &str, ability: Option<&str>) -> String;
    fn install_app(&mut self, path: &str, reinstall: bool) -> String;
    fn get_apps(&mut self, include_system: bool) -> Result<Vec<AppEntry>, DriverError>;
    fn list_packages(&mut self, include_system: bool) -> Result<Vec<String>, DriverError>;

    fn screenshot(&mut self) -> Result<Vec<u8>, DriverError>;
    fn get_ui_tree(&mut self) -> Result<RawUiTree, DriverError>;
    fn get_ui_state(&mut self) -> Result<UiState, DriverError>;
    fn get_date(&mut self) -> Result<String, DriverError>;
}
