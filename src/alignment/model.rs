use std::path::Path;

use crate::foundation::core::MsWindow;
use crate::foundation::error::{StoryreelError, StoryreelResult};

/// One spoken word and the narration time range it occupies.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordStamp {
    pub word: String,
    pub start_ms: f64,
    pub end_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl WordStamp {
    pub fn new(word: impl Into<String>, start_ms: f64, end_ms: f64) -> Self {
        Self {
            word: word.into(),
            start_ms,
            end_ms,
            confidence: None,
        }
    }
}

/// Word-level timing of one narration track. Immutable once produced.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alignment {
    pub words: Vec<WordStamp>,
    pub sample_rate: u32,
}

impl Alignment {
    pub fn validate(&self) -> StoryreelResult<()> {
        if self.sample_rate == 0 {
            return Err(StoryreelError::validation("alignment sampleRate must be > 0"));
        }
        let mut prev_start = f64::NEG_INFINITY;
        for (i, w) in self.words.iter().enumerate() {
            if !w.start_ms.is_finite() || !w.end_ms.is_finite() {
                return Err(StoryreelError::validation(format!(
                    "word {i} ('{}') has non-finite timestamps",
                    w.word
                )));
            }
            if w.start_ms < 0.0 {
                return Err(StoryreelError::validation(format!(
                    "word {i} ('{}') starts before 0ms",
                    w.word
                )));
            }
            if w.start_ms >= w.end_ms {
                return Err(StoryreelError::validation(format!(
                    "word {i} ('{}') must satisfy startMs < endMs ({} >= {})",
                    w.word, w.start_ms, w.end_ms
                )));
            }
            if w.start_ms < prev_start {
                return Err(StoryreelError::validation(format!(
                    "word {i} ('{}') starts before the previous word",
                    w.word
                )));
            }
            if let Some(c) = w.confidence
                && !(0.0..=1.0).contains(&c)
            {
                return Err(StoryreelError::validation(format!(
                    "word {i} ('{}') confidence {c} is outside [0, 1]",
                    w.word
                )));
            }
            prev_start = w.start_ms;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// End of the last spoken word, 0 for an empty alignment.
    pub fn last_end_ms(&self) -> f64 {
        self.words.iter().map(|w| w.end_ms).fold(0.0, f64::max)
    }

    /// Caption activation window of every word, in narration time.
    ///
    /// A word is active over `[start_ms, end_ms]`, end included. The one exception is a word
    /// ending exactly where the next one starts, which hands over at that instant. A word then
    /// stays visible for up to `linger_ms` past its end, cut short by the next word's start.
    pub fn activation_windows(&self, linger_ms: f64) -> Vec<MsWindow> {
        let linger = if linger_ms.is_finite() {
            linger_ms.max(0.0)
        } else {
            0.0
        };
        self.words
            .iter()
            .enumerate()
            .map(|(i, w)| {
                // Smallest half-open end that still contains `end_ms`.
                let through_end = w.end_ms.next_up();
                let mut end = (w.end_ms + linger).max(through_end);
                if let Some(next) = self.words.get(i + 1) {
                    let cap = if next.start_ms == w.end_ms {
                        w.end_ms
                    } else {
                        next.start_ms.max(through_end)
                    };
                    end = end.min(cap);
                }
                MsWindow {
                    start_ms: w.start_ms,
                    end_ms: end,
                }
            })
            .collect()
    }

    /// Index of the word shown at `t_ms` (narration time); first match wins.
    pub fn active_word_index(&self, t_ms: f64, linger_ms: f64) -> Option<usize> {
        active_word_index(&self.activation_windows(linger_ms), t_ms)
    }

    /// Shift every word by `offset_ms` (used to place a story track after an opening segment).
    pub fn offset_by(&self, offset_ms: f64) -> Self {
        Self {
            words: self
                .words
                .iter()
                .map(|w| WordStamp {
                    start_ms: w.start_ms + offset_ms,
                    end_ms: w.end_ms + offset_ms,
                    ..w.clone()
                })
                .collect(),
            sample_rate: self.sample_rate,
        }
    }

    pub fn from_json_str(s: &str) -> StoryreelResult<Self> {
        let a: Self = serde_json::from_str(s)?;
        a.validate()?;
        Ok(a)
    }

    pub fn load_json(path: &Path) -> StoryreelResult<Self> {
        use anyhow::Context as _;
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read alignment '{}'", path.display()))?;
        Self::from_json_str(&s)
    }
}

/// First window containing `t_ms`, in document order.
pub fn active_word_index(windows: &[MsWindow], t_ms: f64) -> Option<usize> {
    windows.iter().position(|w| w.contains(t_ms))
}

#[cfg(test)]
#[path = "../../tests/unit/alignment/model.rs"]
mod tests;
