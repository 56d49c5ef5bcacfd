//! In-place batch background stripping for a directory of badge images.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::background::BackgroundRemover;
use crate::error::{Error, Result};

/// Directory processed when no other is configured.
pub const DEFAULT_BADGE_DIR: &str = "assets/images/badges";
/// Only files with this suffix are candidates.
pub const DEFAULT_EXTENSION: &str = ".png";

/// Store categories whose five visit badges were cleaned with remove.bg.
const PROCESSED_CATEGORIES: [&str; 10] = [
    "asian_ethnic",
    "cafe_sweets",
    "italian_meat",
    "izakaya_bar",
    "nabe_yakiniku",
    "ramen_chinese",
    "shokudo_other",
    "washoku",
    "western_french",
    "yakitori_age",
];

/// Filenames already processed, excluded from a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipSet(BTreeSet<String>);

impl SkipSet {
    /// An empty skip-set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The badges known to be processed already: every category visit badge
    /// (levels 1 to 5) plus `comment_posted_1.png`.
    #[must_use]
    pub fn builtin() -> Self {
        let mut names: BTreeSet<String> = PROCESSED_CATEGORIES
            .iter()
            .flat_map(|cat| (1..=5).map(move |n| format!("category_{cat}_visit_{n}.png")))
            .collect();
        names.insert("comment_posted_1.png".to_string());
        Self(names)
    }

    /// Parse a newline-separated list. Blank lines and `#` comments are ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        text.lines()
            .map(|line| line.split('#').next().unwrap_or_default().trim())
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// Read a skip list file in the format accepted by [`SkipSet::parse`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Whether `name` is marked processed.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Mark `name` processed.
    pub fn insert(&mut self, name: impl Into<String>) {
        self.0.insert(name.into());
    }

    /// Number of names in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SkipSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for SkipSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

/// Where to look and what to leave alone.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory whose files are rewritten in place.
    pub badge_dir: PathBuf,
    /// Filenames to exclude.
    pub skip: SkipSet,
    /// Filename suffix a candidate must have, e.g. `.png`.
    pub extension: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            badge_dir: PathBuf::from(DEFAULT_BADGE_DIR),
            skip: SkipSet::builtin(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl BatchConfig {
    /// Process `badge_dir` with the built-in skip-set.
    pub fn new(badge_dir: impl Into<PathBuf>) -> Self {
        Self {
            badge_dir: badge_dir.into(),
            ..Self::default()
        }
    }

    /// Replace the skip-set.
    #[must_use]
    pub fn with_skip(mut self, skip: SkipSet) -> Self {
        self.skip = skip;
        self
    }
}

/// Counts from one batch run. `success + failed == total` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files rewritten successfully.
    pub success: usize,
    /// Files that hit an error and were left as they were.
    pub failed: usize,
    /// Candidates attempted.
    pub total: usize,
    /// `(filename, error)` for each failure, in processing order.
    pub failures: Vec<(String, String)>,
}

/// List candidate filenames: regular files ending in the configured
/// extension, sorted, with skip-set members removed.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory cannot be read.
pub fn discover_candidates(config: &BatchConfig) -> Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(&config.badge_dir)?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter_map(|e| {
            e.file_name()
                .into_string()
                .map_err(|raw| log::warn!("Skipping non-UTF-8 filename {}", raw.to_string_lossy()))
                .ok()
        })
        .filter(|name| name.ends_with(&config.extension))
        .filter(|name| !config.skip.contains(name))
        .collect();
    names.sort();
    Ok(names)
}

fn process_one<R: BackgroundRemover + ?Sized>(path: &Path, remover: &R) -> Result<()> {
    let input = fs::read(path)?;
    let output = remover.remove_background(&input)?;
    fs::write(path, output)?;
    Ok(())
}

/// Strip the background of every candidate in place, one file at a time.
///
/// Progress and the final summary are written to `out`. A failure on one
/// file is recorded and the batch moves on.
///
/// # Errors
///
/// Fails only if the directory cannot be listed or `out` cannot be written.
pub fn strip_badges<R, W>(config: &BatchConfig, remover: &R, out: &mut W) -> Result<BatchSummary>
where
    R: BackgroundRemover + ?Sized,
    W: Write,
{
    if config.extension.is_empty() {
        return Err(Error::InvalidConfig("extension must not be empty".into()));
    }
    let files = discover_candidates(config)?;
    let total = files.len();
    log::info!(
        "Processing {total} file(s) in {} ({} skipped by name)",
        config.badge_dir.display(),
        config.skip.len()
    );

    writeln!(out, "=== Badge background removal ===")?;
    writeln!(out, "Targets: {total}")?;
    writeln!(out)?;

    let mut summary = BatchSummary {
        total,
        ..BatchSummary::default()
    };

    for (i, name) in files.iter().enumerate() {
        write!(out, "[{}/{total}] {name} ... ", i + 1)?;
        out.flush()?;

        match process_one(&config.badge_dir.join(name), remover) {
            Ok(()) => {
                writeln!(out, "OK")?;
                summary.success += 1;
            }
            Err(e) => {
                writeln!(out, "FAIL ({e})")?;
                log::debug!("{name}: {e:?}");
                summary.failed += 1;
                summary.failures.push((name.clone(), e.to_string()));
            }
        }
    }

    writeln!(out)?;
    writeln!(out, "=== Done ===")?;
    writeln!(out, "Succeeded: {}", summary.success)?;
    writeln!(out, "Failed: {}", summary.failed)?;
    writeln!(out, "Total: {}", summary.total)?;

    Ok(summary)
}
