use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use hdc_bridge::capture::png_bytes_to_data_url;
use hdc_bridge::config::load_config;
use hdc_bridge::hdc::locator::{check_hdc, resolve_hdc_program};
use hdc_bridge::logging::init_logging;
use hdc_bridge::{DeviceDriver, HarmonyDriver};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Args {
    serial: Option<String>,
    out_dir: Option<PathBuf>,
    json: bool,
    with_screenshot: bool,
    with_apps: bool,
}

#[derive(Serialize)]
struct SmokeSummary {
    tool: &'static str,
    status: &'static str,
    trace_id: String,
    serial: Option<String>,
    hdc_program: String,
    out_dir: String,
    artifacts: HashMap<String, String>,
    checks: Vec<SmokeCheck>,
}

#[derive(Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: &'static str, // pass|fail|skip
    duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut serial = std::env::var("HDC_SERIAL")
        .ok()
        .filter(|value| !value.trim().is_empty());
    let mut out_dir: Option<PathBuf> = None;
    let mut json = false;
    let mut with_screenshot = false;
    let mut with_apps = false;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--serial" => {
                serial = it
                    .next()
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty());
                if serial.is_none() {
                    return Err("--serial requires a value".to_string());
                }
            }
            "--out" => {
                let value = it
                    .next()
                    .ok_or_else(|| "--out requires a value".to_string())?;
                out_dir = Some(PathBuf::from(value));
            }
            "--json" => {
                json = true;
            }
            "--with-screenshot" => {
                with_screenshot = true;
            }
            "--with-apps" => {
                with_apps = true;
            }
            "-h" | "--help" => {
                return Err(
                    "Usage: cargo run --bin smoke -- [--serial SERIAL] [--out DIR] [--json] [--with-screenshot] [--with-apps]\n"
                        .to_string(),
                );
            }
            other => return Err(format!("Unknown arg: {other}")),
        }
    }

    Ok(Args {
        serial,
        out_dir,
        json,
        with_screenshot,
        with_apps,
    })
}

fn ensure_dir(path: &Path) -> Result<(), String> {
    fs::create_dir_all(path)
        .map_err(|err| format!("Failed to create dir {}: {err}", path.display()))
}

fn run_check<F>(checks: &mut Vec<SmokeCheck>, name: &'static str, f: F) -> bool
where
    F: FnOnce() -> Result<(), String>,
{
    let start = Instant::now();
    match f() {
        Ok(()) => {
            checks.push(SmokeCheck {
                name,
                status: "pass",
                duration_ms: start.elapsed().as_millis(),
                error: None,
            });
            true
        }
        Err(err) => {
            checks.push(SmokeCheck {
                name,
                status: "fail",
                duration_ms: start.elapsed().as_millis(),
                error: Some(err),
            });
            false
        }
    }
}

fn skip_check(checks: &mut Vec<SmokeCheck>, name: &'static str) {
    checks.push(SmokeCheck {
        name,
        status: "skip",
        duration_ms: 0,
        error: None,
    });
}

fn main() {
    init_logging();

    let args = match parse_args() {
        Ok(value) => value,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let trace_id = Uuid::new_v4().to_string();
    let out_dir = args.out_dir.clone().unwrap_or_else(|| {
        let mut path = std::env::temp_dir();
        path.push(format!("hdc_bridge_smoke_{trace_id}"));
        path
    });
    if let Err(err) = ensure_dir(&out_dir) {
        eprintln!("{err}");
        std::process::exit(1);
    }

    let config = match load_config(&trace_id) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load config: {err}");
            std::process::exit(1);
        }
    };
    let hdc_program = resolve_hdc_program(&config.hdc.command_path);

    let mut artifacts: HashMap<String, String> = HashMap::new();
    let mut checks: Vec<SmokeCheck> = Vec::new();
    let mut status = "pass";

    if !run_check(&mut checks, "check_hdc", || {
        let info = check_hdc(&hdc_program, &trace_id);
        let path = out_dir.join("check_hdc.txt");
        fs::write(&path, &info.version_output)
            .map_err(|err| format!("Failed to write check_hdc output: {err}"))?;
        artifacts.insert("check_hdc".to_string(), path.to_string_lossy().to_string());
        if info.available {
            Ok(())
        } else {
            Err(info.error.unwrap_or_else(|| "hdc not available".to_string()))
        }
    }) {
        status = "fail";
    }

    let mut driver = HarmonyDriver::new(args.serial.clone(), config);

    if !run_check(&mut checks, "connect", || {
        driver.connect().map_err(|err| err.to_string())
    }) {
        status = "fail";
    }

    if !run_check(&mut checks, "ui_state", || {
        let state = driver.get_ui_state().map_err(|err| err.to_string())?;
        let text_path = out_dir.join("ui_state.txt");
        fs::write(&text_path, &state.formatted_text)
            .map_err(|err| format!("Failed to write ui state text: {err}"))?;
        let json_path = out_dir.join("ui_state.json");
        let body = serde_json::to_string_pretty(&state)
            .map_err(|err| format!("Failed to serialize ui state: {err}"))?;
        fs::write(&json_path, body)
            .map_err(|err| format!("Failed to write ui state json: {err}"))?;
        artifacts.insert("ui_state".to_string(), json_path.to_string_lossy().to_string());
        if state.elements.is_empty() {
            Err("UI state contains no elements".to_string())
        } else {
            Ok(())
        }
    }) {
        status = "fail";
    }

    if args.with_screenshot {
        if !run_check(&mut checks, "screenshot", || {
            let bytes = driver.screenshot().map_err(|err| err.to_string())?;
            let png_path = out_dir.join("screenshot.png");
            fs::write(&png_path, &bytes)
                .map_err(|err| format!("Failed to write screenshot: {err}"))?;
            let url_path = out_dir.join("screenshot.dataurl.txt");
            fs::write(&url_path, png_bytes_to_data_url(&bytes)?)
                .map_err(|err| format!("Failed to write data url: {err}"))?;
            artifacts.insert("screenshot".to_string(), png_path.to_string_lossy().to_string());
            Ok(())
        }) {
            status = "fail";
        }
    } else {
        skip_check(&mut checks, "screenshot");
    }

    if args.with_apps {
        if !run_check(&mut checks, "list_apps", || {
            let apps = driver.get_apps(false).map_err(|err| err.to_string())?;
            let path = out_dir.join("apps.json");
            let body = serde_json::to_string_pretty(&apps)
                .map_err(|err| format!("Failed to serialize app list: {err}"))?;
            fs::write(&path, body).map_err(|err| format!("Failed to write app list: {err}"))?;
            artifacts.insert("apps".to_string(), path.to_string_lossy().to_string());
            Ok(())
        }) {
            status = "fail";
        }
    } else {
        skip_check(&mut checks, "list_apps");
    }

    if !run_check(&mut checks, "device_date", || {
        let date = driver.get_date().map_err(|err| err.to_string())?;
        if date.is_empty() {
            Err("device returned an empty date".to_string())
        } else {
            Ok(())
        }
    }) {
        status = "fail";
    }

    let summary = SmokeSummary {
        tool: "hdc_bridge_smoke",
        status,
        trace_id,
        serial: driver.serial().map(|serial| serial.to_string()),
        hdc_program,
        out_dir: out_dir.to_string_lossy().to_string(),
        artifacts,
        checks,
    };

    let output = if args.json {
        serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "{}".to_string())
    } else {
        format!(
            "status: {}\ntrace_id: {}\nout: {}\n",
            summary.status, summary.trace_id, summary.out_dir
        )
    };
    println!("{output}");
    if summary.status != "pass" {
        std::process::exit(1);
    }
}
