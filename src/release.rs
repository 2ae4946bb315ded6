//! Release tag ordering and window construction.
//!
//! Only tags of the form `<major>.<minor>` are releases. They are ordered
//! numerically, so `1.10` follows `1.9`, and consecutive releases form the
//! windows the report is aggregated over.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of earliest releases left out of the report.
pub const DEFAULT_CUTOFF: usize = 4;

/// Revision closing the newest window.
pub const DEFAULT_TIP: &str = "main";

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static RELEASE_TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)$").unwrap());

/// Release sequencing errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReleaseError {
    /// The tag name is not a two-component numeric version.
    #[error("Not a release tag: {0:?}")]
    NotARelease(String),

    /// Too few release tags to build a single window past the cutoff.
    #[error("Found {found} release tags but at least {required} are needed (cutoff {cutoff})")]
    InsufficientReleases {
        /// Qualifying tags found.
        found: usize,
        /// Minimum number of qualifying tags.
        required: usize,
        /// Number of earliest releases skipped.
        cutoff: usize,
    },
}

/// A `major.minor` release identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseTag {
    /// Major version component.
    pub major: u32,
    /// Minor version component.
    pub minor: u32,
}

impl ReleaseTag {
    /// Creates a release tag from its components.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl FromStr for ReleaseTag {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let not_a_release = || ReleaseError::NotARelease(s.to_string());
        let captures = RELEASE_TAG_PATTERN.captures(s).ok_or_else(not_a_release)?;

        // Components too large for u32 are treated like any other non-release tag
        let major = captures[1].parse().map_err(|_| not_a_release())?;
        let minor = captures[2].parse().map_err(|_| not_a_release())?;

        Ok(Self { major, minor })
    }
}

impl TryFrom<String> for ReleaseTag {
    type Error = ReleaseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReleaseTag> for String {
    fn from(tag: ReleaseTag) -> Self {
        tag.to_string()
    }
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A release tag as named in the repository.
///
/// Ordering and reporting use the numeric [`ReleaseTag`]; revision ranges use
/// `name`, so a tag spelled `1.02` still resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRef {
    /// Parsed version.
    pub tag: ReleaseTag,
    /// Tag name as it appears in the repository.
    pub name: String,
}

impl FromStr for ReleaseRef {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            tag: s.parse()?,
            name: s.to_string(),
        })
    }
}

impl From<ReleaseTag> for ReleaseRef {
    fn from(tag: ReleaseTag) -> Self {
        Self {
            tag,
            name: tag.to_string(),
        }
    }
}

impl fmt::Display for ReleaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Upper bound of a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEnd {
    /// The next release.
    Release(ReleaseRef),
    /// The current development tip (a branch or any revision).
    Tip(String),
}

impl fmt::Display for WindowEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release(release) => write!(f, "{release}"),
            Self::Tip(revision) => write!(f, "{revision}"),
        }
    }
}

/// Commits reachable from `end` but not from `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Release the window is reported under.
    pub start: ReleaseRef,
    /// Exclusive upper bound.
    pub end: WindowEnd,
}

impl Window {
    /// Returns the release the window's statistics are attributed to.
    pub fn release(&self) -> ReleaseTag {
        self.start.tag
    }

    /// Returns the window as a git revision range (`start..end`).
    pub fn revision_range(&self) -> String {
        format!("{}..{}", self.start, self.end)
    }
}

/// Parses the release tags out of a raw tag list, sorted oldest first.
///
/// Non-release tags are dropped silently. Names of the same version collapse
/// to one, preferring the spelling without leading zeros.
pub fn release_tags<S: AsRef<str>>(tag_names: &[S]) -> Vec<ReleaseRef> {
    let mut releases: Vec<ReleaseRef> = tag_names
        .iter()
        .filter_map(|name| name.as_ref().parse().ok())
        .collect();
    releases.sort_by(|a, b| {
        a.tag
            .cmp(&b.tag)
            .then_with(|| a.name.len().cmp(&b.name.len()))
            .then_with(|| a.name.cmp(&b.name))
    });
    releases.dedup_by_key(|release| release.tag);
    releases
}

/// Builds the report windows from a raw tag list.
///
/// The first `cutoff` releases are skipped. Each remaining release opens a
/// window closed by the next release; the newest one is closed by `tip`.
pub fn sequence_windows<S: AsRef<str>>(
    tag_names: &[S],
    cutoff: usize,
    tip: &str,
) -> Result<Vec<Window>, ReleaseError> {
    let releases = release_tags(tag_names);
    let required = cutoff.saturating_add(1);
    if releases.len() < required {
        return Err(ReleaseError::InsufficientReleases {
            found: releases.len(),
            required,
            cutoff,
        });
    }

    let windows = releases
        .iter()
        .enumerate()
        .skip(cutoff)
        .map(|(index, start)| Window {
            start: start.clone(),
            end: releases.get(index + 1).map_or_else(
                || WindowEnd::Tip(tip.to_string()),
                |next| WindowEnd::Release(next.clone()),
            ),
        })
        .collect();

    Ok(windows)
}
