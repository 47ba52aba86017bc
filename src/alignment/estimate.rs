use crate::alignment::model::{Alignment, WordStamp};

/// Assumed speaking rate for estimated alignments.
pub const ESTIMATED_WORDS_PER_SEC: f64 = 2.5;
/// Confidence attached to every estimated word.
pub const ESTIMATED_CONFIDENCE: f64 = 0.5;
/// Sample rate reported by the alignment collaborator (16 kHz speech models).
pub const ALIGNMENT_SAMPLE_RATE: u32 = 16_000;

const TRAILING_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Evenly spaced alignment derived from word count alone.
///
/// Used when forced alignment is unavailable. Every whitespace-separated token gets one stamp
/// and loses one trailing punctuation mark. A token made of a single mark (a lone `.`) keeps it,
/// so dashes and ellipses still take their share of the narration time.
pub fn estimate_alignment(script: &str) -> Alignment {
    let word_ms = 1000.0 / ESTIMATED_WORDS_PER_SEC;
    let words = script
        .split_whitespace()
        .map(strip_trailing_punctuation)
        .enumerate()
        .map(|(i, word)| {
            let i = i as f64;
            WordStamp {
                word: word.to_string(),
                start_ms: (i * word_ms).round(),
                end_ms: ((i + 1.0) * word_ms).round(),
                confidence: Some(ESTIMATED_CONFIDENCE),
            }
        })
        .collect();
    Alignment {
        words,
        sample_rate: ALIGNMENT_SAMPLE_RATE,
    }
}

fn strip_trailing_punctuation(token: &str) -> &str {
    match token.strip_suffix(TRAILING_PUNCTUATION) {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => token,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/alignment/estimate.rs"]
mod tests;
