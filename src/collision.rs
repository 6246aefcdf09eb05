//! Collision resolution for a batch of proposed names
//!
//! Photos that map to the same destination are ordered by capture instant.
//! The earliest keeps the clean name; the others are told apart according
//! to the batch's `CollisionPolicy`. Every candidate is checked against all
//! names already handed out, so the result never contains a duplicate.

use crate::config::CollisionPolicy;
use crate::metadata::CaptureInstant;
use crate::naming::with_counter;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One file's proposed destinations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// Current path of the photo
    pub source: PathBuf,
    /// Capture instant used for ordering
    pub instant: CaptureInstant,
    /// Destination at minute precision
    pub destination: PathBuf,
    /// Destination at seconds precision
    pub seconds_destination: PathBuf,
}

/// A planned or executed rename
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenameEntry {
    #[serde(rename = "OldName")]
    pub old_path: PathBuf,
    #[serde(rename = "NewName")]
    pub new_path: PathBuf,
}

impl RenameEntry {
    pub fn new(old_path: impl Into<PathBuf>, new_path: impl Into<PathBuf>) -> Self {
        Self {
            old_path: old_path.into(),
            new_path: new_path.into(),
        }
    }

    /// Already at its canonical name
    pub fn is_noop(&self) -> bool {
        self.old_path == self.new_path
    }
}

/// Assign every proposal a unique destination
///
/// Output keeps the input order. Never fails, even when every proposal
/// collides.
pub fn resolve(proposals: Vec<Proposal>, policy: CollisionPolicy) -> Vec<RenameEntry> {
    // Group by destination, groups in order of first appearance
    let mut group_of: HashMap<PathBuf, usize> = HashMap::new();
    let mut groups: Vec<Vec<(usize, Proposal)>> = Vec::new();
    for (index, proposal) in proposals.into_iter().enumerate() {
        let slot = *group_of
            .entry(proposal.destination.clone())
            .or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
        groups[slot].push((index, proposal));
    }

    for group in &mut groups {
        group.sort_by(|(_, a), (_, b)| {
            a.instant
                .cmp(&b.instant)
                .then_with(|| held_rank(a).cmp(&held_rank(b)))
                .then_with(|| a.source.cmp(&b.source))
        });
    }

    // Leaders first, so no suffixed name can take a clean one
    let mut taken: HashSet<PathBuf> = groups
        .iter()
        .filter_map(|group| group.first())
        .map(|(_, p)| p.destination.clone())
        .collect();

    let mut resolved: Vec<(usize, RenameEntry)> = Vec::new();
    let mut counters: HashMap<PathBuf, usize> = HashMap::new();

    for group in groups {
        let mut members = group.into_iter();
        let Some((index, leader)) = members.next() else {
            continue;
        };
        resolved.push((index, RenameEntry::new(leader.source, leader.destination)));

        for (index, follower) in members {
            let destination = match policy {
                CollisionPolicy::Counter => {
                    next_free(&follower.destination, &mut taken, &mut counters)
                }
                CollisionPolicy::Seconds => {
                    if taken.insert(follower.seconds_destination.clone()) {
                        follower.seconds_destination.clone()
                    } else {
                        next_free(&follower.seconds_destination, &mut taken, &mut counters)
                    }
                }
            };
            debug!(
                source = ?follower.source,
                proposed = ?follower.destination,
                resolved = ?destination,
                "Resolved name collision"
            );
            resolved.push((index, RenameEntry::new(follower.source, destination)));
        }
    }

    resolved.sort_by_key(|(index, _)| *index);
    resolved.into_iter().map(|(_, entry)| entry).collect()
}

/// Slot a file already occupies in its group's name sequence
///
/// Files with the same capture instant are ordered by it before falling back
/// to the path, so a rerun leaves exactly tied files where they are.
fn held_rank(proposal: &Proposal) -> usize {
    if proposal.source == proposal.destination {
        return 0;
    }
    if proposal.source == proposal.seconds_destination {
        return 1;
    }
    if proposal.source.parent() != proposal.destination.parent() {
        return usize::MAX;
    }
    let Some(name) = proposal.source.file_name().and_then(|n| n.to_str()) else {
        return usize::MAX;
    };

    [(&proposal.destination, 0), (&proposal.seconds_destination, 1)]
        .into_iter()
        .find_map(|(base, offset)| counter_of(name, base).map(|n| n + offset))
        .unwrap_or(usize::MAX)
}

/// `N` if `name` is the `-N` variant of `base`
fn counter_of(name: &str, base: &Path) -> Option<usize> {
    let stem = base.file_stem()?.to_str()?;
    let rest = name.strip_prefix(stem)?.strip_prefix('-')?;
    let digits = match base.extension().and_then(|e| e.to_str()) {
        Some(ext) => rest.strip_suffix(ext)?.strip_suffix('.')?,
        None => rest,
    };
    digits.parse().ok()
}

/// Next `-N` variant of `base` that nobody holds yet; marks it taken
fn next_free(
    base: &Path,
    taken: &mut HashSet<PathBuf>,
    counters: &mut HashMap<PathBuf, usize>,
) -> PathBuf {
    let file_name = base
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or_default()
        .to_string();
    let parent = base.parent().map(Path::to_path_buf).unwrap_or_default();
    let counter = counters.entry(base.to_path_buf()).or_insert(0);

    loop {
        *counter += 1;
        let candidate = parent.join(with_counter(&file_name, *counter));
        if taken.insert(candidate.clone()) {
            return candidate;
        }
    }
}
