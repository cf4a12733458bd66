//! Archive engine: bundles of `(group, entry, version)` configs exported
//! to or imported from a single file, with an atomic-replace-or-discard
//! write and an explicit per-entry resolution step on import (§4.15).

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::atomic::AtomicFile;
use crate::context::Context;
use crate::error::{DisirError, DisirResult};
use crate::serialize::{Serializer, TomlAdapter, Unserializer};
use crate::version::Version;

#[derive(Debug, Clone)]
struct ArchiveEntry {
    group: String,
    name: String,
    version: Version,
    body: String,
}

/// Accumulates entries for a single archive bundle.
pub struct ArchiveExport {
    entries: Vec<ArchiveEntry>,
    groups: HashSet<String>,
}

impl ArchiveExport {
    pub fn begin() -> Self {
        ArchiveExport {
            entries: Vec::new(),
            groups: HashSet::new(),
        }
    }

    /// Adds every config in `configs` (keyed by entry name) under `group`.
    /// Rejected with `exists` if `group` is already in this archive.
    pub fn append_group(&mut self, group: &str, configs: &HashMap<String, Context>) -> DisirResult<()> {
        if group.is_empty() {
            return Err(DisirError::InvalidArgument("group name must not be empty".to_string()));
        }
        if !self.groups.insert(group.to_string()) {
            return Err(DisirError::Exists(format!("group '{group}' is already in this archive")));
        }
        for (name, config) in configs {
            self.append_entry(group, name, config)?;
        }
        Ok(())
    }

    /// Serializes `config` and appends it under `group`/`name`. Rejected
    /// with `exists` if `(group, name)` is already in this archive.
    pub fn append_entry(&mut self, group: &str, name: &str, config: &Context) -> DisirResult<()> {
        if self.entries.iter().any(|e| e.group == group && e.name == name) {
            return Err(DisirError::Exists(format!("{group}/{name} is already in this archive")));
        }
        let version = config.config_version()?;
        let body = TomlAdapter.serialize(config)?;
        self.entries.push(ArchiveEntry {
            group: group.to_string(),
            name: name.to_string(),
            version,
            body,
        });
        Ok(())
    }

    /// Writes the bundle to `path`. Atomic: either the whole bundle
    /// lands, or the destination is untouched (see [`AtomicFile`]).
    pub fn finalize(self, path: &Path) -> DisirResult<()> {
        let document = encode(&self.entries);
        AtomicFile::new(path).write(&document)?;
        tracing::info!(path = %path.display(), entries = self.entries.len(), "archive exported");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Installable unchanged.
    Ok,
    /// The entry's version differs from the installed mold; installable
    /// with `update`.
    ConflictingSemver,
    /// An installed config by the same id already exists.
    Conflict,
    /// Cannot be resolved (e.g. no mold registered for the group).
    NoCanDo,
    /// Parse-level failure against the mold.
    ConfigInvalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Do,
    Update,
    UpdateWithDiscard,
    Force,
    Discard,
}

/// Resolutions a given status accepts, per the §4.15 validity matrix.
/// Anything else is rejected by `resolve_entry` as `invalid_argument`
/// rather than silently coerced.
fn valid_resolutions(status: EntryStatus) -> &'static [Resolution] {
    match status {
        EntryStatus::Ok => &[Resolution::Do, Resolution::Force, Resolution::Discard],
        EntryStatus::ConflictingSemver | EntryStatus::Conflict => &[
            Resolution::Update,
            Resolution::UpdateWithDiscard,
            Resolution::Force,
            Resolution::Discard,
        ],
        EntryStatus::NoCanDo | EntryStatus::ConfigInvalid => &[Resolution::Discard],
    }
}

/// A snapshot of one archived entry's classification, returned by
/// [`Import::entry_status`].
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub entry_id: String,
    pub group_id: String,
    pub version: Version,
    pub status: EntryStatus,
    pub info: Option<String>,
}

struct PendingEntry {
    archived: ArchiveEntry,
    status: EntryStatus,
    info: Option<String>,
    resolution: Option<Resolution>,
}

/// An in-progress import, one entry per bundled `(group, name)`, in the
/// fixed order the archive stored them so `entry_status(i)` is stable.
pub struct Import {
    pending: Vec<PendingEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportAction {
    Do,
    Discard,
}

pub struct ImportReport {
    pub imported: Vec<(String, String)>,
    pub skipped: Vec<(String, String)>,
}

impl Import {
    /// Reads the bundle at `path` and classifies each entry against
    /// `existing` (already-installed configs keyed by `(group, name)`)
    /// and `molds` (the registered mold per group). Returns the `Import`
    /// plus the count of entries requiring resolution before `finalize`
    /// can proceed.
    pub fn begin(
        path: &Path,
        existing: &HashMap<(String, String), Context>,
        molds: &HashMap<String, Context>,
    ) -> DisirResult<(Import, usize)> {
        let document = AtomicFile::new(path).read()?;
        let entries = decode(&document)?;

        let pending: Vec<PendingEntry> = entries
            .into_iter()
            .map(|archived| classify(archived, existing, molds))
            .collect();

        let needing_resolution = pending.iter().filter(|p| p.status != EntryStatus::Ok).count();

        Ok((Import { pending }, needing_resolution))
    }

    /// The classification of the entry at `index`, in the archive's
    /// fixed enumeration order.
    pub fn entry_status(&self, index: usize) -> Option<EntryInfo> {
        let pending = self.pending.get(index)?;
        Some(EntryInfo {
            entry_id: pending.archived.name.clone(),
            group_id: pending.archived.group.clone(),
            version: pending.archived.version,
            status: pending.status,
            info: pending.info.clone(),
        })
    }

    /// Applies `resolution` to the entry at `index`. Rejected with
    /// `invalid_argument` if `resolution` is not valid for that entry's
    /// status (the per-status validity matrix).
    pub fn resolve_entry(&mut self, index: usize, resolution: Resolution) -> DisirResult<()> {
        let entry = self
            .pending
            .get_mut(index)
            .ok_or_else(|| DisirError::NotExist(format!("no entry at index {index}")))?;

        if !valid_resolutions(entry.status).contains(&resolution) {
            return Err(DisirError::InvalidArgument(format!(
                "{resolution:?} is not valid for a {:?} entry",
                entry.status
            )));
        }
        entry.resolution = Some(resolution);
        Ok(())
    }

    /// Finalizes the import. `ImportAction::Discard` drops every
    /// resolution and returns an empty report without touching any
    /// config. `ImportAction::Do` commits: an `Ok` entry with no explicit
    /// resolution defaults to `Do`; every other entry must already carry
    /// a resolution or this fails with `conflict`.
    pub fn finalize(self, action: ImportAction, molds: &HashMap<String, Context>) -> DisirResult<ImportReport> {
        if action == ImportAction::Discard {
            return Ok(ImportReport {
                imported: Vec::new(),
                skipped: self
                    .pending
                    .into_iter()
                    .map(|p| (p.archived.group, p.archived.name))
                    .collect(),
            });
        }

        for entry in &self.pending {
            if entry.status != EntryStatus::Ok && entry.resolution.is_none() {
                return Err(DisirError::Conflict(format!(
                    "{}/{} has no resolution",
                    entry.archived.group, entry.archived.name
                )));
            }
        }

        let mut imported = Vec::new();
        let mut skipped = Vec::new();
        for entry in &self.pending {
            let resolution = entry.resolution.unwrap_or(Resolution::Do);
            if resolution == Resolution::Discard {
                skipped.push((entry.archived.group.clone(), entry.archived.name.clone()));
                continue;
            }

            let mold = molds
                .get(&entry.archived.group)
                .ok_or_else(|| DisirError::GroupMissing(entry.archived.group.clone()))?;
            TomlAdapter.unserialize(mold, &entry.archived.body)?;
            imported.push((entry.archived.group.clone(), entry.archived.name.clone()));
        }

        Ok(ImportReport { imported, skipped })
    }
}

/// Classifies one archived entry against the installed molds and configs,
/// in status precedence order: a body that fails to parse against its
/// mold is `config_invalid`; a missing mold is `no_can_do`; an existing
/// installed config under the same id is `conflict`; an archived version
/// that differs from the installed mold's version is `conflicting_semver`;
/// otherwise the entry is `ok`.
fn classify(
    archived: ArchiveEntry,
    existing: &HashMap<(String, String), Context>,
    molds: &HashMap<String, Context>,
) -> PendingEntry {
    let Some(mold) = molds.get(&archived.group) else {
        return PendingEntry {
            status: EntryStatus::NoCanDo,
            info: Some("no mold registered for this group".to_string()),
            archived,
            resolution: None,
        };
    };

    if let Err(err) = TomlAdapter.unserialize(mold, &archived.body) {
        return PendingEntry {
            status: EntryStatus::ConfigInvalid,
            info: Some(err.to_string()),
            archived,
            resolution: None,
        };
    }

    let key = (archived.group.clone(), archived.name.clone());
    if existing.contains_key(&key) {
        return PendingEntry {
            status: EntryStatus::Conflict,
            info: Some("an installed config already exists under this id".to_string()),
            archived,
            resolution: None,
        };
    }

    match mold.mold_version() {
        Ok(mold_version) if mold_version != archived.version => PendingEntry {
            info: Some(format!(
                "archived version {} differs from the installed mold version {mold_version}",
                archived.version
            )),
            status: EntryStatus::ConflictingSemver,
            archived,
            resolution: None,
        },
        Ok(_) => PendingEntry {
            archived,
            status: EntryStatus::Ok,
            info: None,
            resolution: None,
        },
        Err(err) => PendingEntry {
            info: Some(err.to_string()),
            archived,
            status: EntryStatus::NoCanDo,
            resolution: None,
        },
    }
}

/// Delimited plain-text bundle format: one `[[group/name@version]]`
/// header per entry, followed by its serialized body up to the next
/// header. Kept intentionally simple; the archive format is an external
/// interface, not something core semantics depend on.
fn encode(entries: &[ArchiveEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "[[{}/{}@{}]]\n",
            entry.group, entry.name, entry.version
        ));
        out.push_str(&entry.body);
        if !entry.body.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

fn decode(document: &str) -> DisirResult<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    let mut current: Option<(String, String, Version, String)> = None;

    for line in document.lines() {
        if let Some(header) = line.strip_prefix("[[").and_then(|s| s.strip_suffix("]]")) {
            if let Some((group, name, version, body)) = current.take() {
                entries.push(ArchiveEntry { group, name, version, body });
            }
            let (path, version_str) = header.rsplit_once('@').ok_or_else(|| {
                DisirError::ConfigInvalid(format!("malformed archive header: {header}"))
            })?;
            let (group, name) = path.split_once('/').ok_or_else(|| {
                DisirError::ConfigInvalid(format!("malformed archive header: {header}"))
            })?;
            let version = Version::parse(version_str)?;
            current = Some((group.to_string(), name.to_string(), version, String::new()));
        } else if let Some((_, _, _, body)) = current.as_mut() {
            body.push_str(line);
            body.push('\n');
        }
    }
    if let Some((group, name, version, body)) = current {
        entries.push(ArchiveEntry { group, name, version, body });
    }
    Ok(entries)
}
