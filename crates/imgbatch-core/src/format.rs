//! Human-readable sizes and filesystem-safe names

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Format a byte count in base 1024 with one decimal (`750.0 KB`).
/// Plain bytes are printed without decimals.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Format a signed byte delta, keeping the sign of growth
pub fn format_signed_bytes(delta: i64) -> String {
    if delta < 0 {
        format!("-{}", format_bytes(delta.unsigned_abs()))
    } else {
        format_bytes(delta as u64)
    }
}

/// Replace every run of whitespace with a single underscore
pub fn safe_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
