//! User-visible status lines

use imgbatch_core::format::format_signed_bytes;
use imgbatch_core::{format_bytes, EngineMode, Item, SizeSummary};

pub const NO_IMAGES: &str = "No images yet";
pub const RESET_DONE: &str = "Reset done";

/// Item count and total size of the loaded images
pub fn idle_summary(summary: &SizeSummary) -> String {
    if summary.item_count == 0 {
        return NO_IMAGES.to_string();
    }
    format!(
        "{} images — Total {}",
        summary.item_count,
        format_bytes(summary.total_original)
    )
}

/// Before/after sizes once a batch completed.
///
/// Unprocessed items count as 0 bytes after, see [`SizeSummary`].
pub fn reduction_summary(summary: &SizeSummary) -> String {
    if summary.total_original == 0 {
        return NO_IMAGES.to_string();
    }
    format!(
        "Reduced {} → {} (Saved {})",
        format_bytes(summary.total_original),
        format_bytes(summary.total_processed),
        format_signed_bytes(summary.saved())
    )
}

pub fn item_processed(name: &str, size: u64, mode: EngineMode) -> String {
    match mode {
        EngineMode::Local => format!("Processed {} — {}", name, format_bytes(size)),
        EngineMode::Remote => format!("Processed {} (server) — {}", name, format_bytes(size)),
    }
}

/// `<original> → <processed>` line of an item card
pub fn item_card_line(item: &Item) -> String {
    let processed = item
        .processed_size()
        .map(format_bytes)
        .unwrap_or_else(|| "—".to_string());
    format!("{} → {}", format_bytes(item.original_size()), processed)
}
