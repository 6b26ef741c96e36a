//! Mesh visibility resolution
//!
//! The resolver maps (selected parts, configuration) to the set of mesh names
//! that must be visible. It only knows meshes by name; applying the result to
//! an actual scene goes through [`MeshVisibilitySink`].

use std::collections::BTreeSet;

use crate::config::ConfigData;
use crate::part::{MeshId, PartKey};

/// Compute the visible mesh set from scratch.
///
/// The result is the union of the meshes of every selected part and the
/// meshes of every non-configurable part. Selected keys without a `meshMap`
/// entry contribute nothing.
pub fn visible_meshes<'a>(
    selected: impl IntoIterator<Item = &'a PartKey>,
    config: &ConfigData,
) -> BTreeSet<MeshId> {
    let mut visible = BTreeSet::new();
    for key in selected {
        visible.extend(config.meshes_of(key.as_str()).cloned());
    }
    for key in config.fixed_parts() {
        visible.extend(config.meshes_of(key.as_str()).cloned());
    }
    visible
}

/// Something that can show or hide a mesh by name
pub trait MeshVisibilitySink {
    fn set_mesh_visible(&mut self, mesh: &MeshId, visible: bool);
}

/// Counts from one [`apply_visibility`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityReport {
    pub shown: usize,
    pub hidden: usize,
}

/// Push a full visibility assignment to a sink.
///
/// Every known mesh is written, including the ones that end up hidden, so a
/// pass never depends on what a previous pass left behind.
pub fn apply_visibility<'a, S>(
    known: impl IntoIterator<Item = &'a MeshId>,
    visible: &BTreeSet<MeshId>,
    sink: &mut S,
) -> VisibilityReport
where
    S: MeshVisibilitySink + ?Sized,
{
    let mut report = VisibilityReport::default();
    for mesh in known {
        let show = visible.contains(mesh);
        sink.set_mesh_visible(mesh, show);
        if show {
            report.shown += 1;
        } else {
            report.hidden += 1;
        }
    }
    report
}
