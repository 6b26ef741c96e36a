//! Admin mesh assignment sessions
//!
//! An operator edits one part at a time. Mesh picks are staged in a pending
//! set and only reach `meshMap` on [`AssignmentSession::commit`], which also
//! strips the committed meshes from every other part.

use std::collections::BTreeSet;
use thiserror::Error;

use crate::config::ConfigData;
use crate::part::{MeshId, PartKey};
use crate::parts::PartError;

/// Refusal to stage a mesh another part already owns
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Mesh `{mesh}` is already assigned to `{owner}`")]
pub struct AssignmentConflict {
    pub mesh: MeshId,
    pub owner: PartKey,
}

/// Result of a successful [`AssignmentSession::toggle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedChange {
    Staged,
    Unstaged,
}

/// How a mesh relates to the part being edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshStatus {
    /// Saved in `meshMap` for this part and still pending
    Assigned,
    /// Staged but not saved yet
    Pending,
    Unassigned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentSession {
    part: PartKey,
    saved: BTreeSet<MeshId>,
    pending: BTreeSet<MeshId>,
}

impl AssignmentSession {
    /// Start editing a part, with pending initialized from its saved meshes
    pub fn begin(part: PartKey, config: &ConfigData) -> Result<Self, PartError> {
        if config.detail(part.as_str()).is_none() {
            return Err(PartError::UnknownPart(part));
        }
        let saved: BTreeSet<MeshId> = config.meshes_of(part.as_str()).cloned().collect();
        Ok(Self {
            part,
            pending: saved.clone(),
            saved,
        })
    }

    pub fn part(&self) -> &PartKey {
        &self.part
    }

    pub fn pending(&self) -> &BTreeSet<MeshId> {
        &self.pending
    }

    pub fn is_dirty(&self) -> bool {
        self.pending != self.saved
    }

    /// Stage or unstage a mesh.
    ///
    /// A mesh owned by another part in the saved configuration is refused and
    /// the pending set is left as it was.
    pub fn toggle(
        &mut self,
        mesh: &MeshId,
        config: &ConfigData,
    ) -> Result<StagedChange, AssignmentConflict> {
        if self.pending.remove(mesh) {
            return Ok(StagedChange::Unstaged);
        }
        if let Some(owner) = config.owner_of(mesh.as_str()) {
            if *owner != self.part {
                tracing::warn!("Refusing to stage {} for {}: owned by {}", mesh, self.part, owner);
                return Err(AssignmentConflict {
                    mesh: mesh.clone(),
                    owner: owner.clone(),
                });
            }
        }
        self.pending.insert(mesh.clone());
        Ok(StagedChange::Staged)
    }

    /// Meshes the operator may pick for this part: everything not owned by
    /// another part, plus whatever this part already holds or has staged.
    pub fn available_meshes<'a>(
        &self,
        all: impl IntoIterator<Item = &'a MeshId>,
        config: &ConfigData,
    ) -> BTreeSet<MeshId> {
        let mut available: BTreeSet<MeshId> = all
            .into_iter()
            .filter(|mesh| {
                config
                    .owner_of(mesh.as_str())
                    .is_none_or(|owner| *owner == self.part)
            })
            .cloned()
            .collect();
        available.extend(self.saved.iter().cloned());
        available.extend(self.pending.iter().cloned());
        available
    }

    pub fn status(&self, mesh: &MeshId) -> MeshStatus {
        match (self.pending.contains(mesh), self.saved.contains(mesh)) {
            (true, true) => MeshStatus::Assigned,
            (true, false) => MeshStatus::Pending,
            (false, _) => MeshStatus::Unassigned,
        }
    }

    /// Drop staged changes
    pub fn discard(&mut self) {
        self.pending = self.saved.clone();
    }

    /// `meshMap[part]` no longer matches what the session started from
    pub fn is_stale(&self, config: &ConfigData) -> bool {
        !config.meshes_of(self.part.as_str()).eq(self.saved.iter())
    }

    /// Restart from a configuration that changed underneath the session
    /// (another tab saved). Staged changes are dropped.
    pub fn rebase(&mut self, config: &ConfigData) -> Result<(), PartError> {
        *self = Self::begin(self.part.clone(), config)?;
        Ok(())
    }

    /// Write the pending set into `meshMap[part]` and remove those meshes
    /// from every other part.
    pub fn commit(&mut self, config: &mut ConfigData) -> Result<(), PartError> {
        if config.detail(self.part.as_str()).is_none() {
            return Err(PartError::UnknownPart(self.part.clone()));
        }
        for (key, meshes) in config.mesh_map.iter_mut() {
            if *key != self.part {
                meshes.retain(|mesh| !self.pending.contains(mesh));
            }
        }
        config
            .mesh_map
            .insert(self.part.clone(), self.pending.clone());
        self.saved = self.pending.clone();
        tracing::info!(
            "Committed {} meshes for part {}",
            self.pending.len(),
            self.part
        );
        Ok(())
    }
}
