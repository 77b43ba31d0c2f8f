//! Label normalisation for backend replies in English or Turkish.

use fanpulse_core::Label;

/// Map any backend label spelling onto the three-value label set.
///
/// Accepts English and Turkish variants in any casing. Anything unrecognised
/// is treated as neutral.
#[must_use]
pub fn normalize_label(raw: &str) -> Label {
    let upper: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            'i' | 'ı' | 'İ' => 'I',
            'ö' | 'Ö' => 'O',
            other => other.to_ascii_uppercase(),
        })
        .collect();

    match upper.as_str() {
        "POSITIVE" | "POZITIF" | "POS" => Label::Positive,
        "NEGATIVE" | "NEGATIF" | "NEG" => Label::Negative,
        // NEUTRAL, NÖTR, NEU and everything else
        _ => Label::Neutral,
    }
}
