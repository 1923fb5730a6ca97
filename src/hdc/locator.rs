use std::path::Path;
use std::time::Duration;

use crate::hdc::runner::run_command_with_timeout;
use crate::models::HdcInfo;

pub fn normalize_command_path(value: &str) -> String {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|candidate| candidate.strip_suffix(quote))
        {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}

pub fn resolve_hdc_program(config_command_path: &str) -> String {
    let normalized = normalize_command_path(config_command_path);
    if normalized.is_empty() {
        "hdc".to_string()
    } else {
        normalized
    }
}

pub fn validate_hdc_program(program: &str) -> Result<(), String> {
    if program.trim().is_empty() {
        return Err("hdc command is empty".to_string());
    }
    if program == "hdc" {
        return Ok(());
    }
    let path = Path::new(program);
    if path.is_dir() {
        return Err("hdc path must point to an executable file".to_string());
    }
    if !path.exists() {
        return Err("hdc executable not found at the configured path".to_string());
    }
    Ok(())
}

// Probes the tool itself; a driver connect is only attempted once this
// reports available.
pub fn check_hdc(program: &str, trace_id: &str) -> HdcInfo {
    if let Err(message) = validate_hdc_program(program) {
        return HdcInfo {
            available: false,
            version_output: String::new(),
            command_path: program.to_string(),
            error: Some(message),
        };
    }
    let args = vec!["-v".to_string()];
    match run_command_with_timeout(program, &args, Duration::from_secs(10), trace_id) {
        Ok(output) if output.exit_code.unwrap_or(-1) == 0 => HdcInfo {
            available: true,
            version_output: output.stdout.trim().to_string(),
            command_path: program.to_string(),
            error: None,
        },
        Ok(output) => HdcInfo {
            available: false,
            version_output: output.stdout.trim().to_string(),
            command_path: program.to_string(),
            error: Some(output.stderr.trim().to_string()),
        },
        Err(err) => HdcInfo {
            available: false,
            version_output: String::new(),
            command_path: program.to_string(),
            error: Some(err.error),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_wrapping_quotes() {
        assert_eq!(
            normalize_command_path("  \"/opt/harmony/toolchains/hdc\"  "),
            "/opt/harmony/toolchains/hdc"
        );
        assert_eq!(
            normalize_command_path("  '/opt/harmony/toolchains/hdc'  "),
            "/opt/harmony/toolchains/hdc"
        );
    }

    #[test]
    fn resolves_empty_to_default_hdc() {
        assert_eq!(resolve_hdc_program(""), "hdc");
        assert_eq!(resolve_hdc_program("   "), "hdc");
        assert_eq!(resolve_hdc_program("/usr/local/bin/hdc"), "/usr/local/bin/hdc");
    }

    #[test]
    fn validates_nonexistent_path() {
        let err = validate_hdc_program("/this/path/should/not/exist/hdc").unwrap_err();
        assert!(err.to_lowercase().contains("not found"));
    }

    #[test]
    fn check_reports_missing_tool() {
        let info = check_hdc("/this/path/should/not/exist/hdc", "trace-test");
        assert!(!info.available);
        assert!(info.error.is_some());
    }
}
