//! Human-readable byte quantities.
//!
//! Binary multipliers throughout: `1KB = 1024`, `1MB = 1024^2`, ...
//! Formatting is lossy display; parsing accepts what formatting produces.

use crate::errors::SizeError;

const UNIT: u64 = 1024;

/// Suffixes recognised by [`parse_size`], longest first so `"KB"` wins over `"B"`.
const SUFFIXES: [(&str, u64); 5] = [
    ("TB", UNIT * UNIT * UNIT * UNIT),
    ("GB", UNIT * UNIT * UNIT),
    ("MB", UNIT * UNIT),
    ("KB", UNIT),
    ("B", 1),
];

/// Unit letters for [`format_size`] above the byte range.
const PREFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

/// Parse `"1.5GB"`, `"500 mb"`, `"4096"` into bytes.
///
/// # Errors
///
/// [`SizeError::InvalidFormat`] when the numeric part does not parse, is not
/// finite, or the result does not fit in `u64`; [`SizeError::NegativeSize`]
/// when it is below zero.
pub fn parse_size(text: &str) -> Result<u64, SizeError> {
    let normalized = text.trim().to_ascii_uppercase();

    let (number, multiplier) = SUFFIXES
        .iter()
        .find_map(|(suffix, multiplier)| {
            normalized
                .strip_suffix(suffix)
                .map(|number| (number, *multiplier))
        })
        .unwrap_or((normalized.as_str(), 1));

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| SizeError::InvalidFormat(text.to_string()))?;

    if !value.is_finite() {
        return Err(SizeError::InvalidFormat(text.to_string()));
    }
    if value < 0.0 {
        return Err(SizeError::NegativeSize(text.to_string()));
    }

    #[allow(clippy::cast_precision_loss)]
    let bytes = value * multiplier as f64;
    #[allow(clippy::cast_precision_loss)]
    if bytes >= u64::MAX as f64 {
        return Err(SizeError::InvalidFormat(text.to_string()));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(bytes as u64)
}

/// Parse a size string and round it up to whole kilobytes.
///
/// Quota limits are stored in KB and `0` means "unlimited", so any non-zero
/// byte count must map to at least 1 KB.
///
/// # Errors
///
/// Same as [`parse_size`].
pub fn parse_size_kb(text: &str) -> Result<u64, SizeError> {
    parse_size(text).map(|bytes| bytes.div_ceil(UNIT))
}

/// Render bytes with the largest binary unit not exceeding the value.
///
/// `512` -> `"512 B"`, `1536` -> `"1.5 KB"`, `1 << 30` -> `"1.0 GB"`.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    if bytes < UNIT {
        return format!("{bytes} B");
    }

    let mut div = UNIT;
    let mut exp = 0usize;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    #[allow(clippy::cast_precision_loss)]
    let scaled = bytes as f64 / div as f64;
    format!("{scaled:.1} {}B", PREFIXES[exp])
}
