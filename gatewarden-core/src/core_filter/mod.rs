//! Admission Filter
//!
//! A deliberately coarse script-range heuristic over display names, not a
//! language detector.

use std::ops::RangeInclusive;

/// Arabic block
const ARABIC: RangeInclusive<u32> = 0x0600..=0x06FF;

/// CJK Unified Ideographs block
const CJK_UNIFIED: RangeInclusive<u32> = 0x4E00..=0x9FFF;

/// Returns true if any code point of `text` falls in the Arabic block
/// (U+0600–U+06FF) or the CJK Unified Ideographs block (U+4E00–U+9FFF).
pub fn matches_restricted_script(text: &str) -> bool {
    text.chars().any(|c| {
        let cp = c as u32;
        ARABIC.contains(&cp) || CJK_UNIFIED.contains(&cp)
    })
}
