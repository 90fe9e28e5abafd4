//! Human-readable labels and output naming.

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Format a byte count as `<value> <unit>` using base-1024 units.
///
/// The value is rounded half away from zero to two decimals and printed
/// without trailing zeros, so `1536` becomes `"1.5 KB"`. Zero is the
/// special label `"0 Byte"`. Counts past the terabyte range stay in TB.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Byte".to_string();
    }

    let mut unit = 0;
    let mut divisor = 1u64;
    while unit + 1 < SIZE_UNITS.len() && bytes >= divisor * 1024 {
        divisor *= 1024;
        unit += 1;
    }

    let value = bytes as f64 / divisor as f64;
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}

/// Output file name for a generated video: `ai_video_<unix_ms>.<ext>`.
pub fn output_file_name(unix_ms: i64, extension: &str) -> String {
    format!("ai_video_{unix_ms}.{extension}")
}

/// Truncate `text` to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_label_reference_points() {
        assert_eq!(format_size(0), "0 Byte");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1_048_576), "1 MB");
    }

    #[test]
    fn test_size_label_small_counts_stay_in_bytes() {
        assert_eq!(format_size(1), "1 Bytes");
        assert_eq!(format_size(1023), "1023 Bytes");
    }

    #[test]
    fn test_size_label_two_decimal_rounding() {
        assert_eq!(format_size(1536), "1.5 KB");
        // 1234567 / 1048576 = 1.17737...
        assert_eq!(format_size(1_234_567), "1.18 MB");
        // 1029 B is 1.0049 KB.
        assert_eq!(format_size(1029), "1 KB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn test_size_label_caps_at_terabytes() {
        let five_pb = 5u64 * 1024 * 1024 * 1024 * 1024 * 1024;
        assert_eq!(format_size(five_pb), "5120 TB");
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(
            output_file_name(1_700_000_000_000, "webm"),
            "ai_video_1700000000000.webm"
        );
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 80), "hello");
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        let long = "x".repeat(100);
        assert_eq!(truncate_chars(&long, 80).len(), 80);
    }
}
