pub mod capture;
pub mod config;
pub mod driver;
pub mod error;
pub mod hdc;
pub mod logging;
pub mod models;
pub mod ui;

pub use config::{load_config, DriverConfig, GestureSettings, HdcSettings, ScreenSettings};
pub use driver::harmony::HarmonyDriver;
pub use driver::DeviceDriver;
pub use error::DriverError;
pub use models::{AppEntry, Bounds, HdcInfo, RawUiTree, UiElement, UiState};
