use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

// uitest screenCap always produces PNG; anything else means the capture or
// the transfer was truncated.
pub fn ensure_png(bytes: &[u8]) -> Result<(), String> {
    if bytes.len() < PNG_SIGNATURE.len() {
        return Err("Screenshot data is empty".to_string());
    }
    if !bytes.starts_with(PNG_SIGNATURE) {
        return Err("Screenshot data is not a PNG".to_string());
    }
    Ok(())
}

pub fn png_bytes_to_data_url(bytes: &[u8]) -> Result<String, String> {
    ensure_png(bytes)?;
    let encoded = STANDARD.encode(bytes);
    Ok(format!("data:image/png;base64,{encoded}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_payload() {
        let err = png_bytes_to_data_url(&[]).expect_err("should reject empty input");
        assert!(err.contains("empty"));
    }

    #[test]
    fn rejects_non_png_payload() {
        let err = ensure_png(b"garbage bytes here").expect_err("should reject non-png");
        assert!(err.contains("PNG"));
    }

    #[test]
    fn encodes_png_prefix() {
        let bytes = b"\x89PNG\r\n\x1a\nfake";
        let url = png_bytes_to_data_url(bytes).expect("should encode png");
        assert!(url.starts_with("data:image/png;base64,"));
    }
}
