use std::path::Path;
use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::capture::ensure_png;
use crate::config::{DriverConfig, GestureSettings};
use crate::driver::{DeviceDriver, KEYCODE_BACK, KEYCODE_ENTER, KEYCODE_HOME};
use crate::error::DriverError;
use crate::hdc::locator::{check_hdc, resolve_hdc_program};
use crate::hdc::parse::{
    is_system_bundle, looks_like_start_success, parse_app_entries, parse_bundle_names,
    parse_hdc_targets, parse_launch_ability, parse_layout_payload,
};
use crate::hdc::runner::{quote_arg, run_checked, run_command_with_timeout};
use crate::models::{AppEntry, RawUiTree, UiState};
use crate::ui::state::build_ui_state;
use crate::ui::tree::scan_layout_extent;

const SUPPORTED_OPERATIONS: &[&str] = &[
    "tap",
    "swipe",
    "drag",
    "input_text",
    "press_key",
    "start_app",
    "install_app",
    "get_apps",
    "list_packages",
    "screenshot",
    "get_ui_tree",
    "get_ui_state",
    "get_date",
];

/// Raw HarmonyOS device I/O via `hdc` + `uitest`. One driver instance owns
/// one device session; callers must not overlap device-mutating calls.
pub struct HarmonyDriver {
    serial: Option<String>,
    connected: bool,
    config: DriverConfig,
    program: String,
}

fn new_trace_id() -> String {
    Uuid::new_v4().to_string()
}

// Distance over duration, clamped to the device-accepted range. uitest
// takes a velocity, not a duration, so requested durations are approximated.
fn gesture_velocity(
    gestures: &GestureSettings,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    duration_ms: u64,
) -> i64 {
    if duration_ms == 0 {
        return gestures.fallback_velocity;
    }
    let distance = f64::from(x2 - x1).hypot(f64::from(y2 - y1)).max(1.0);
    let velocity = (distance / (duration_ms as f64 / 1000.0)) as i64;
    velocity.clamp(gestures.min_velocity, gestures.max_velocity)
}

fn harmony_key(keycode: u32) -> String {
    match keycode {
        KEYCODE_HOME => "Home".to_string(),
        KEYCODE_BACK => "Back".to_string(),
        KEYCODE_ENTER => "2054".to_string(),
        other => other.to_string(),
    }
}

fn non_empty_or(output: &str, fallback: String) -> String {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed.to_string()
    }
}

impl HarmonyDriver {
    pub fn new(serial: Option<String>, config: DriverConfig) -> Self {
        let program = resolve_hdc_program(&config.hdc.command_path);
        Self {
            serial,
            connected: false,
            config,
            program,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    fn hdc_args(&self, args: &[&str], with_target: bool) -> Vec<String> {
        let mut full = Vec::new();
        if with_target {
            if let Some(serial) = &self.serial {
                full.push("-t".to_string());
                full.push(serial.clone());
            }
        }
        full.extend(args.iter().map(|arg| arg.to_string()));
        full
    }

    fn shell(&self, command: &str, trace_id: &str) -> Result<String, DriverError> {
        self.shell_with_timeout(command, self.config.hdc.shell_timeout_secs, trace_id)
    }

    fn shell_with_timeout(
        &self,
        command: &str,
        timeout_secs: u64,
        trace_id: &str,
    ) -> Result<String, DriverError> {
        let args = self.hdc_args(&["shell", command], true);
        run_checked(
            &self.program,
            &args,
            Duration::from_secs(timeout_secs),
            trace_id,
        )
    }

    // Cleanup-path shell; failures are logged and swallowed so they never
    // shadow the primary result or error.
    fn safe_shell(&self, command: &str, trace_id: &str) {
        if let Err(err) = self.shell_with_timeout(
            command,
            self.config.hdc.cleanup_timeout_secs,
            trace_id,
        ) {
            warn!(trace_id = %trace_id, error = %err, "best-effort device command failed");
        }
    }

    fn list_targets(&self, trace_id: &str) -> Result<Vec<String>, DriverError> {
        let args = self.hdc_args(&["list", "targets"], false);
        let output = run_command_with_timeout(
            &self.program,
            &args,
            Duration::from_secs(self.config.hdc.shell_timeout_secs),
            trace_id,
        )?;
        if output.exit_code.unwrap_or(-1) != 0 {
            let detail = if output.stderr.trim().is_empty() {
                output.stdout.trim().to_string()
            } else {
                output.stderr.trim().to_string()
            };
            return Err(DriverError::connection(
                format!("hdc list targets failed: {detail}"),
                trace_id,
            ));
        }
        Ok(parse_hdc_targets(&output.stdout))
    }

    fn ensure_connected(&mut self, trace_id: &str) -> Result<(), DriverError> {
        if self.connected {
            return Ok(());
        }
        self.connect_impl(trace_id)
    }

    fn connect_impl(&mut self, trace_id: &str) -> Result<(), DriverError> {
        let info = check_hdc(&self.program, trace_id);
        if !info.available {
            return Err(DriverError::connection(
                format!(
                    "hdc not available at '{}': {}",
                    self.program,
                    info.error.unwrap_or_default()
                ),
                trace_id,
            ));
        }

        if self.serial.is_none() {
            let targets = self.list_targets(trace_id)?;
            let Some(first) = targets.into_iter().next() else {
                return Err(DriverError::connection(
                    "No connected HarmonyOS devices found via hdc",
                    trace_id,
                ));
            };
            info!(trace_id = %trace_id, serial = %first, "resolved device target");
            self.serial = Some(first);
        }

        self.shell("echo hdc_ok", trace_id)?;
        // The uitest daemon speeds up the first gesture; not fatal if the
        // firmware rejects the command.
        self.safe_shell("uitest start-daemon", trace_id);
        self.connected = true;
        Ok(())
    }

    fn resolve_launch_ability(
        &self,
        package: &str,
        trace_id: &str,
    ) -> (Option<String>, Option<String>) {
        match self.shell(&format!("bm dump -n {}", quote_arg(package)), trace_id) {
            Ok(dump) => parse_launch_ability(&dump),
            Err(err) => {
                warn!(
                    trace_id = %trace_id,
                    package = %package,
                    error = %err,
                    "bundle dump failed during launch resolution"
                );
                (None, None)
            }
        }
    }

    fn start_app_impl(
        &mut self,
        package: &str,
        ability: Option<&str>,
        trace_id: &str,
    ) -> Result<String, DriverError> {
        self.ensure_connected(trace_id)?;

        if let Some(ability) = ability {
            let output = self.shell(
                &format!("aa start -a {} -b {}", quote_arg(ability), quote_arg(package)),
                trace_id,
            )?;
            return Ok(non_empty_or(&output, format!("App started: {package}/{ability}")));
        }

        // Implicit launch by bundle name first.
        let output = self.shell(&format!("aa start -b {}", quote_arg(package)), trace_id)?;
        if looks_like_start_success(&output) {
            return Ok(non_empty_or(&output, format!("App started: {package}")));
        }

        // Resolve an explicit ability from bundle metadata and retry.
        let (module_name, ability_name) = self.resolve_launch_ability(package, trace_id);
        if let Some(ability_name) = ability_name {
            let mut command = format!(
                "aa start -a {} -b {}",
                quote_arg(&ability_name),
                quote_arg(package)
            );
            if let Some(module_name) = &module_name {
                command.push_str(&format!(" -m {}", quote_arg(module_name)));
            }
            let retry = self.shell(&command, trace_id)?;
            if looks_like_start_success(&retry) {
                return Ok(non_empty_or(
                    &retry,
                    format!("App started: {package}/{ability_name}"),
                ));
            }
        }

        Ok(non_empty_or(&output, format!("Failed to start app {package}")))
    }

    fn input_text_impl(&mut self, text: &str, clear: bool, trace_id: &str) -> Result<(), DriverError> {
        self.ensure_connected(trace_id)?;
        if clear {
            // Select-all, then delete.
            self.shell("uitest uiInput keyEvent 2072 2017", trace_id)?;
            self.shell("uitest uiInput keyEvent 2055", trace_id)?;
        }
        self.shell(&format!("uitest uiInput text {}", quote_arg(text)), trace_id)?;
        Ok(())
    }

    fn install_impl(
        &self,
        path: &str,
        remote: &str,
        reinstall: bool,
        trace_id: &str,
    ) -> Result<String, DriverError> {
        let args = self.hdc_args(&["file", "send", path, remote], true);
        run_checked(
            &self.program,
            &args,
            Duration::from_secs(self.config.hdc.install_timeout_secs),
            trace_id,
        )?;
        let mut command = format!("bm install -p {}", quote_arg(remote));
        if reinstall {
            command.push_str(" -r");
        }
        let output =
            self.shell_with_timeout(&command, self.config.hdc.install_timeout_secs, trace_id)?;
        Ok(output.trim().to_string())
    }

    fn fetch_screenshot(&self, remote: &str, trace_id: &str) -> Result<Vec<u8>, DriverError> {
        self.shell(&format!("uitest screenCap -p {}", quote_arg(remote)), trace_id)?;

        let local = tempfile::Builder::new()
            .prefix("hdc_bridge_")
            .suffix(".png")
            .tempfile()
            .map_err(|err| {
                DriverError::system(format!("Failed to create local temp file: {err}"), trace_id)
            })?;
        let local_path = local.path().to_string_lossy().to_string();
        let args = self.hdc_args(&["file", "recv", remote, &local_path], true);
        run_checked(
            &self.program,
            &args,
            Duration::from_secs(self.config.hdc.transfer_timeout_secs),
            trace_id,
        )?;

        let bytes = std::fs::read(local.path()).map_err(|err| {
            DriverError::system(format!("Failed to read screenshot: {err}"), trace_id)
        })?;
        ensure_png(&bytes).map_err(|message| DriverError::system(message, trace_id))?;
        Ok(bytes)
    }

    fn fetch_ui_tree(&self, remote: &str, trace_id: &str) -> Result<RawUiTree, DriverError> {
        self.shell(&format!("uitest dumpLayout -p {}", quote_arg(remote)), trace_id)?;

        let local = tempfile::Builder::new()
            .prefix("hdc_bridge_layout_")
            .suffix(".json")
            .tempfile()
            .map_err(|err| {
                DriverError::system(format!("Failed to create local temp file: {err}"), trace_id)
            })?;
        let local_path = local.path().to_string_lossy().to_string();
        let args = self.hdc_args(&["file", "recv", remote, &local_path], true);
        run_checked(
            &self.program,
            &args,
            Duration::from_secs(self.config.hdc.transfer_timeout_secs),
            trace_id,
        )?;

        let raw_bytes = std::fs::read(local.path()).map_err(|err| {
            DriverError::system(format!("Failed to read layout dump: {err}"), trace_id)
        })?;
        let payload = String::from_utf8_lossy(&raw_bytes);
        let layout = parse_layout_payload(&payload);

        let (max_right, max_bottom) = scan_layout_extent(&layout);
        let screen_width = if max_right > 0 {
            max_right
        } else {
            self.config.screen.fallback_width
        };
        let screen_height = if max_bottom > 0 {
            max_bottom
        } else {
            self.config.screen.fallback_height
        };

        Ok(RawUiTree {
            layout,
            phone_state: json!({
                "currentApp": "Unknown",
                "packageName": "Unknown",
                "isEditable": false,
            }),
            screen_width,
            screen_height,
        })
    }

    fn list_packages_impl(
        &mut self,
        include_system: bool,
        trace_id: &str,
    ) -> Result<Vec<String>, DriverError> {
        self.ensure_connected(trace_id)?;
        let output = self.shell("bm dump -a", trace_id)?;
        let mut packages = parse_bundle_names(&output);
        if !include_system {
            packages.retain(|package| !is_system_bundle(package));
        }
        Ok(packages)
    }
}

impl DeviceDriver for HarmonyDriver {
    fn supported_operations(&self) -> &'static [&'static str] {
        SUPPORTED_OPERATIONS
    }

    fn connect(&mut self) -> Result<(), DriverError> {
        let trace_id = new_trace_id();
        self.ensure_connected(&trace_id)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    fn tap(&mut self, x: i32, y: i32) -> Result<(), DriverError> {
        let trace_id = new_trace_id();
        self.ensure_connected(&trace_id)?;
        self.shell(&format!("uitest uiInput click {x} {y}"), &trace_id)?;
        Ok(())
    }

    fn swipe(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        duration_ms: u64,
    ) -> Result<(), DriverError> {
        let trace_id = new_trace_id();
        self.ensure_connected(&trace_id)?;

        if x1 == x2 && y1 == y2 {
            // Zero-length swipes are rejected by uitest; treat as long press.
            self.shell(&format!("uitest uiInput longClick {x1} {y1}"), &trace_id)?;
            std::thread::sleep(Duration::from_millis(
                duration_ms.max(self.config.gestures.long_press_ms),
            ));
            return Ok(());
        }

        let velocity = gesture_velocity(&self.config.gestures, x1, y1, x2, y2, duration_ms);
        self.shell(
            &format!("uitest uiInput swipe {x1} {y1} {x2} {y2} {velocity}"),
            &trace_id,
        )?;
        std::thread::sleep(Duration::from_millis(
            duration_ms.max(self.config.gestures.swipe_settle_ms),
        ));
        Ok(())
    }

    fn drag(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        duration_ms: u64,
    ) -> Result<(), DriverError> {
        let trace_id = new_trace_id();
        self.ensure_connected(&trace_id)?;
        let velocity = gesture_velocity(&self.config.gestures, x1, y1, x2, y2, duration_ms);
        self.shell(
            &format!("uitest uiInput drag {x1} {y1} {x2} {y2} {velocity}"),
            &trace_id,
        )?;
        std::thread::sleep(Duration::from_millis(
            duration_ms.max(self.config.gestures.drag_settle_ms),
        ));
        Ok(())
    }

    fn input_text(&mut self, text: &str, clear: bool) -> bool {
        let trace_id = new_trace_id();
        match self.input_text_impl(text, clear, &trace_id) {
            Ok(()) => true,
            Err(err) => {
                warn!(trace_id = %trace_id, error = %err, "text input failed");
                false
            }
        }
    }

    fn press_key(&mut self, keycode: u32) -> Result<(), DriverError> {
        let trace_id = new_trace_id();
        self.ensure_connected(&trace_id)?;
        self.shell(
            &format!("uitest uiInput keyEvent {}", harmony_key(keycode)),
            &trace_id,
        )?;
        Ok(())
    }

    fn start_app(&mut self, package: &str, ability: Option<&str>) -> String {
        let trace_id = new_trace_id();
        match self.start_app_impl(package, ability, &trace_id) {
            Ok(message) => message,
            Err(err) => {
                warn!(trace_id = %trace_id, package = %package, error = %err, "app start failed");
                format!("Failed to start app {package}: {err}")
            }
        }
    }

    fn install_app(&mut self, path: &str, reinstall: bool) -> String {
        let trace_id = new_trace_id();
        if let Err(err) = self.ensure_connected(&trace_id) {
            return format!("Failed to install app {path}: {err}");
        }
        if !Path::new(path).exists() {
            return format!("Failed to install app: file not found at {path}");
        }

        let base_name = Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "bundle.hap".to_string());
        let remote = format!("/data/local/tmp/{}_{}", Uuid::new_v4().simple(), base_name);

        let result = self.install_impl(path, &remote, reinstall, &trace_id);
        // Remote cleanup runs whether the install succeeded or not.
        self.safe_shell(&format!("rm -f {}", quote_arg(&remote)), &trace_id);

        match result {
            Ok(message) => message,
            Err(err) => {
                warn!(trace_id = %trace_id, path = %path, error = %err, "app install failed");
                format!("Failed to install app {path}: {err}")
            }
        }
    }

    fn get_apps(&mut self, include_system: bool) -> Result<Vec<AppEntry>, DriverError> {
        let trace_id = new_trace_id();
        self.ensure_connected(&trace_id)?;
        let output = self.shell("bm dump -a -l", &trace_id)?;
        let mut apps = parse_app_entries(&output);
        if apps.is_empty() {
            // Older firmwares ignore -l; fall back to bare bundle names.
            apps = self
                .list_packages_impl(true, &trace_id)?
                .into_iter()
                .map(|package| AppEntry {
                    label: package.clone(),
                    package,
                })
                .collect();
        }
        if !include_system {
            apps.retain(|app| !is_system_bundle(&app.package));
        }
        Ok(apps)
    }

    fn list_packages(&mut self, include_system: bool) -> Result<Vec<String>, DriverError> {
        let trace_id = new_trace_id();
        self.list_packages_impl(include_system, &trace_id)
    }

    fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        let trace_id = new_trace_id();
        self.ensure_connected(&trace_id)?;
        let remote = format!("/data/local/tmp/hdc_bridge_{}.png", Uuid::new_v4().simple());
        let result = self.fetch_screenshot(&remote, &trace_id);
        // Remote cleanup runs whether the fetch succeeded or not.
        self.safe_shell(&format!("rm -f {}", quote_arg(&remote)), &trace_id);
        result
    }

    fn get_ui_tree(&mut self) -> Result<RawUiTree, DriverError> {
        let trace_id = new_trace_id();
        self.ensure_connected(&trace_id)?;
        let remote = format!(
            "/data/local/tmp/hdc_bridge_layout_{}.json",
            Uuid::new_v4().simple()
        );
        let result = self.fetch_ui_tree(&remote, &trace_id);
        self.safe_shell(&format!("rm -f {}", quote_arg(&remote)), &trace_id);
        result
    }

    fn get_ui_state(&mut self) -> Result<UiState, DriverError> {
        let raw = self.get_ui_tree()?;
        Ok(build_ui_state(raw, &self.config.screen))
    }

    fn get_date(&mut self) -> Result<String, DriverError> {
        let trace_id = new_trace_id();
        self.ensure_connected(&trace_id)?;
        Ok(self.shell("date", &trace_id)?.trim().to_string())
    }
}
