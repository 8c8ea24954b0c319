//! `Owner` and `Object`: the two entities that outlive a single record and
//! are retained for the lifetime of the process. Both carry `&'static str`
//! uuids interned in a worker's arena; everything else is a small `Copy`
//! payload, which is what lets merging move them between containers by
//! value instead of needing to keep raw pointers alive.

use crate::config::MAX_NAMESPACES;

pub type Counters = [u64; MAX_NAMESPACES];

#[derive(Clone, Copy, Debug)]
pub struct Object {
    pub uuid: &'static str,
    pub nsid: usize,
    pub size_bytes: u64,
}

#[derive(Clone, Debug)]
pub struct Owner {
    pub uuid: &'static str,
    pub objects: std::collections::BTreeMap<&'static str, Object>,
    pub dirs: Counters,
    pub objs: Counters,
    pub keys: Counters,
    pub bytes: Counters,
}

impl Owner {
    pub fn new(uuid: &'static str) -> Self {
        Self {
            uuid,
            objects: std::collections::BTreeMap::new(),
            dirs: [0; MAX_NAMESPACES],
            objs: [0; MAX_NAMESPACES],
            keys: [0; MAX_NAMESPACES],
            bytes: [0; MAX_NAMESPACES],
        }
    }
}

/// A finalized, uuid-sorted owner (`keys[n] >= objs[n]` for every namespace
/// `n`) together with its uuid-sorted flat object list, as produced by
/// `WorkerState::finalize` and consumed by the tournament merger.
#[derive(Clone, Debug)]
pub struct FinalOwner {
    pub uuid: &'static str,
    pub objects: Vec<Object>,
    pub dirs: Counters,
    pub objs: Counters,
    pub keys: Counters,
    pub bytes: Counters,
}

impl From<Owner> for FinalOwner {
    fn from(owner: Owner) -> Self {
        FinalOwner {
            uuid: owner.uuid,
            objects: owner.objects.into_values().collect(),
            dirs: owner.dirs,
            objs: owner.objs,
            keys: owner.keys,
            bytes: owner.bytes,
        }
    }
}
