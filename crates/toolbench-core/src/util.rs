//! Utility functions shared across the crate.

use std::path::PathBuf;

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Direction for moving an item one slot within an ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Swap the item at `index` with its neighbour in `direction`.
///
/// Returns `false` (and leaves the slice alone) at the boundaries.
pub fn move_adjacent<T>(items: &mut [T], index: usize, direction: Direction) -> bool {
    let target = match direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => index.checked_add(1).filter(|&t| t < items.len()),
    };

    match target {
        Some(target) if index < items.len() => {
            items.swap(index, target);
            true
        }
        _ => false,
    }
}

/// Strip a trailing `.pdf` (any case) and surrounding whitespace.
///
/// Falls back to `document` when nothing is left.
pub fn base_file_name(file_name: &str) -> String {
    let trimmed = file_name.trim();
    let stem = if trimmed.to_ascii_lowercase().ends_with(".pdf") {
        &trimmed[..trimmed.len() - 4]
    } else {
        trimmed
    };

    let stem = stem.trim();
    if stem.is_empty() {
        "document".to_string()
    } else {
        stem.to_string()
    }
}

/// Make sure an output name ends in `.pdf`, using `fallback` for blank input.
pub fn ensure_pdf_extension(name: &str, fallback: &str) -> String {
    let trimmed = name.trim();
    let trimmed = if trimmed.is_empty() { fallback } else { trimmed };

    if trimmed.to_ascii_lowercase().ends_with(".pdf") {
        trimmed.to_string()
    } else {
        format!("{trimmed}.pdf")
    }
}

/// File name for one split segment: `<base>-pages-<start>-<end>.pdf`.
pub fn format_segment_name(base_name: &str, start: u32, end: u32) -> String {
    format!("{base_name}-pages-{start}-{end}.pdf")
}

/// Human-readable byte count (binary units, one decimal above bytes).
#[allow(clippy::cast_precision_loss)]
pub fn bytes_to_readable(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }

    format!("{value:.1} {unit}")
}
