use std::path::{Path, PathBuf};

use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::layout::measure::{ParleyMeasurer, register_family};

/// Font files tried in order; the first one parley can register wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FontFallback {
    pub candidates: Vec<PathBuf>,
}

/// A font that loaded and registered cleanly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedFont {
    pub path: PathBuf,
    pub family: String,
    /// Hex sha256 of the file, for logs and job fingerprints.
    pub sha256: String,
    pub bytes: Vec<u8>,
}

impl ResolvedFont {
    pub fn measurer(&self) -> StoryreelResult<ParleyMeasurer> {
        ParleyMeasurer::from_font_bytes(&self.bytes)
    }
}

impl FontFallback {
    pub fn new(candidates: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve the first usable candidate. Unusable candidates are logged and skipped.
    #[tracing::instrument(skip(self), fields(candidates = self.candidates.len()))]
    pub fn resolve(&self) -> StoryreelResult<ResolvedFont> {
        for path in &self.candidates {
            match load_font(path) {
                Ok(font) => {
                    tracing::info!(
                        path = %font.path.display(),
                        family = %font.family,
                        sha256 = %font.sha256,
                        "font resolved"
                    );
                    return Ok(font);
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "font candidate skipped"),
            }
        }
        Err(StoryreelError::asset(format!(
            "no usable font among {} candidate(s)",
            self.candidates.len()
        )))
    }
}

fn load_font(path: &Path) -> StoryreelResult<ResolvedFont> {
    use anyhow::Context as _;

    let bytes = std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
    let mut font_ctx = parley::FontContext::default();
    let family = register_family(&mut font_ctx, &bytes)?;
    Ok(ResolvedFont {
        path: path.to_path_buf(),
        family,
        sha256: sha256_hex(&bytes),
        bytes,
    })
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::Digest as _;

    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fonts.rs"]
mod tests;
