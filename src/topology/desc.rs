//! Serde descriptions of mount forests.
//!
//! A [`ForestDesc`] names its mounts and wires them up by name, so fixtures
//! and tooling can describe a propagation layout as JSON (or any serde format)
//! instead of replaying builder calls:
//!
//! ```json
//! {
//!   "mounts": [
//!     { "name": "root", "root": 1 },
//!     { "name": "a", "parent": "root", "mountpoint": 10, "root": 100 },
//!     { "name": "b", "parent": "root", "mountpoint": 11, "root": 100 },
//!     { "name": "top", "parent": "a", "overmount": true, "root": 5, "locked": true }
//!   ],
//!   "peers": [["a", "b"]],
//!   "slaves": [{ "master": "a", "slave": "c" }]
//! }
//! ```
//!
//! Mounts are created in order, so a parent must be listed before its
//! children. Peer groups are applied before master/slave edges.

use crate::mount_error::MountError;
use crate::topology::forest::Forest;
use crate::topology::mount_id::{Dentry, MountId};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// One mount of a [`ForestDesc`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountDesc {
    pub name: String,
    /// Parent name; absent for absolute roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Dentry of the parent to attach at. Ignored for roots and overmounts.
    #[serde(default)]
    pub mountpoint: u64,
    /// Dentry this mount exposes.
    #[serde(default)]
    pub root: u64,
    /// Attach at the parent's root dentry instead of `mountpoint`.
    #[serde(default)]
    pub overmount: bool,
    #[serde(default)]
    pub locked: bool,
}

/// `slave`'s peer group receives propagation from `master`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaveDesc {
    pub master: String,
    pub slave: String,
}

/// Named description of a whole forest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestDesc {
    pub mounts: Vec<MountDesc>,
    /// Each inner list becomes one peer group.
    #[serde(default)]
    pub peers: Vec<Vec<String>>,
    #[serde(default)]
    pub slaves: Vec<SlaveDesc>,
}

/// A built forest together with its name table.
#[derive(Debug, Clone)]
pub struct NamedForest {
    pub forest: Forest,
    names: HashMap<String, MountId>,
    ids: Vec<String>,
}

impl NamedForest {
    /// Id of the mount called `name`.
    pub fn id(&self, name: &str) -> Result<MountId, MountError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| MountError::UnknownName(name.to_owned()))
    }

    /// Ids for several names, in order.
    pub fn ids<'a, I>(&self, names: I) -> Result<Vec<MountId>, MountError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().map(|n| self.id(n)).collect()
    }

    /// Name of mount `m`, if it came from the description.
    pub fn name(&self, m: MountId) -> Option<&str> {
        self.ids.get(m.index()).map(String::as_str)
    }

    /// Names for several ids; unknown ids are skipped.
    pub fn names<I>(&self, mounts: I) -> Vec<&str>
    where
        I: IntoIterator<Item = MountId>,
    {
        mounts.into_iter().filter_map(|m| self.name(m)).collect()
    }
}

impl ForestDesc {
    /// Build the described forest.
    ///
    /// # Errors
    /// Duplicate or unknown names, plus anything the [`Forest`] builder
    /// rejects (busy mountpoints, propagation cycles, ...).
    pub fn build(&self) -> Result<NamedForest, MountError> {
        let mut forest = Forest::new();
        let mut names: HashMap<String, MountId> = HashMap::with_capacity(self.mounts.len());
        let mut ids = Vec::with_capacity(self.mounts.len());

        for desc in &self.mounts {
            if names.contains_key(&desc.name) {
                return Err(MountError::DuplicateName(desc.name.clone()));
            }
            let id = match &desc.parent {
                None => forest.add_root(desc.root)?,
                Some(parent) => {
                    let parent = lookup(&names, parent)?;
                    let at = if desc.overmount {
                        forest.root(parent)
                    } else {
                        Dentry(desc.mountpoint)
                    };
                    forest.attach(parent, at, desc.root)?
                }
            };
            forest.set_locked(id, desc.locked)?;
            names.insert(desc.name.clone(), id);
            ids.push(desc.name.clone());
        }

        for group in &self.peers {
            let Some((first, rest)) = group.split_first() else {
                continue;
            };
            let first = lookup(&names, first)?;
            forest.make_shared(first)?;
            for peer in rest {
                forest.add_peer(first, lookup(&names, peer)?)?;
            }
        }

        for edge in &self.slaves {
            let master = lookup(&names, &edge.master)?;
            let slave = lookup(&names, &edge.slave)?;
            forest.make_slave(master, slave)?;
        }

        log::debug!(
            "built forest: {} mount(s), {} peer group(s), {} slave edge(s)",
            forest.len(),
            self.peers.len(),
            self.slaves.len()
        );
        Ok(NamedForest { forest, names, ids })
    }
}

fn lookup(names: &HashMap<String, MountId>, name: &str) -> Result<MountId, MountError> {
    names
        .get(name)
        .copied()
        .ok_or_else(|| MountError::UnknownName(name.to_owned()))
}
