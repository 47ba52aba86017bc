use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::encode::ffmpeg::DurationProbe;
use crate::foundation::error::{StoryreelError, StoryreelResult};
use crate::schedule::background::{ClipOrigin, ClipPool, ClipSource};

pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "webm", "mkv"];
/// Length of a generated stand-in clip.
pub const PLACEHOLDER_CLIP_SEC: f64 = 30.0;
pub const PLACEHOLDER_COLOR: &str = "0x101018";

/// Which clips a job draws its background from.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipSelection {
    /// Every category except the high-motion ones.
    #[default]
    Mixed,
    Category(String),
}

/// All known background clips, grouped by category.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipLibrary {
    clips: Vec<ClipSource>,
}

impl ClipLibrary {
    pub fn new(clips: Vec<ClipSource>) -> StoryreelResult<Self> {
        let lib = Self { clips };
        lib.validate()?;
        Ok(lib)
    }

    fn validate(&self) -> StoryreelResult<()> {
        let mut ids: Vec<&str> = self.clips.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        if let Some(dup) = ids.windows(2).find(|p| p[0] == p[1]) {
            return Err(StoryreelError::validation(format!(
                "duplicate clip id '{}'",
                dup[0]
            )));
        }
        if let Some(c) = self
            .clips
            .iter()
            .find(|c| !c.duration_sec.is_finite() || c.duration_sec <= 0.0)
        {
            return Err(StoryreelError::validation(format!(
                "clip '{}' has invalid duration {}",
                c.id, c.duration_sec
            )));
        }
        Ok(())
    }

    /// Scan `root/<category>/<clip>.<ext>`.
    ///
    /// A clip whose duration cannot be read is replaced by `default_clip` when that probes
    /// cleanly, otherwise by a generated placeholder. Neither case is fatal.
    #[tracing::instrument(skip(probe, default_clip), fields(root = %root.display()))]
    pub fn scan(
        root: &Path,
        probe: &dyn DurationProbe,
        default_clip: Option<&Path>,
    ) -> StoryreelResult<Self> {
        let mut fallback: Option<ClipOrigin> = None;
        let mut fallback_sec = PLACEHOLDER_CLIP_SEC;
        let mut fallback_resolved = false;

        let mut clips = Vec::new();
        for category_dir in sorted_entries(root)? {
            if !category_dir.is_dir() {
                continue;
            }
            let Some(category) = file_name(&category_dir) else {
                continue;
            };
            for path in sorted_entries(&category_dir)? {
                if !is_video(&path) {
                    continue;
                }
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let id = format!("{category}/{stem}");
                match probe.duration_sec(&path) {
                    Ok(duration_sec) => clips.push(ClipSource {
                        id,
                        category: category.clone(),
                        origin: ClipOrigin::File { path },
                        duration_sec,
                    }),
                    Err(e) => {
                        if !fallback_resolved {
                            fallback_resolved = true;
                            if let Some(default) = default_clip {
                                match probe.duration_sec(default) {
                                    Ok(d) => {
                                        fallback = Some(ClipOrigin::File {
                                            path: default.to_path_buf(),
                                        });
                                        fallback_sec = d;
                                    }
                                    Err(de) => tracing::warn!(
                                        default = %default.display(),
                                        error = %de,
                                        "default clip is unreadable too"
                                    ),
                                }
                            }
                        }
                        let origin = fallback.clone().unwrap_or(ClipOrigin::Placeholder {
                            color: PLACEHOLDER_COLOR.to_string(),
                        });
                        tracing::warn!(
                            clip = %path.display(),
                            error = %e,
                            substitute = ?origin,
                            "unreadable background clip replaced"
                        );
                        clips.push(ClipSource {
                            id,
                            category: category.clone(),
                            origin,
                            duration_sec: fallback_sec,
                        });
                    }
                }
            }
        }
        tracing::info!(clips = clips.len(), "clip library scanned");
        Self::new(clips)
    }

    pub fn from_manifest_str(json: &str) -> StoryreelResult<Self> {
        let lib: Self = serde_json::from_str(json)?;
        lib.validate()?;
        Ok(lib)
    }

    pub fn from_manifest(path: &Path) -> StoryreelResult<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read clip manifest '{}'", path.display()))?;
        Self::from_manifest_str(&json)
    }

    pub fn clips(&self) -> &[ClipSource] {
        &self.clips
    }

    /// Distinct categories in scan order.
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for c in &self.clips {
            if !out.contains(&c.category.as_str()) {
                out.push(&c.category);
            }
        }
        out
    }

    /// Build the pool a job schedules from. An empty selection is fatal.
    pub fn pool(&self, selection: &ClipSelection, high_motion: &[String]) -> StoryreelResult<ClipPool> {
        let picked: Vec<ClipSource> = self
            .clips
            .iter()
            .filter(|c| match selection {
                ClipSelection::Category(name) => c.category.eq_ignore_ascii_case(name),
                ClipSelection::Mixed => !high_motion
                    .iter()
                    .any(|h| c.category.eq_ignore_ascii_case(h)),
            })
            .cloned()
            .collect();
        if picked.is_empty() {
            return Err(StoryreelError::asset(format!(
                "no background clips match {selection:?}"
            )));
        }
        ClipPool::new(picked)
    }
}

fn sorted_entries(dir: &Path) -> StoryreelResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read dir '{}'", dir.display()))? {
        let entry = entry.with_context(|| format!("read entry in '{}'", dir.display()))?;
        out.push(entry.path());
    }
    out.sort();
    Ok(out)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|s| s.to_string_lossy().into_owned())
}

fn is_video(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(e)))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/clips.rs"]
mod tests;
