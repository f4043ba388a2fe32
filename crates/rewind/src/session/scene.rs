use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use crate::model::ObjectId;

/// Host-owned object storage. Sessions keep only ids and resolve them each
/// tick; an id that no longer resolves is skipped for that tick.
pub trait SceneHost<H> {
    fn resolve(&mut self, object: ObjectId) -> Option<&mut H>;
}

impl<H, S: BuildHasher> SceneHost<H> for HashMap<ObjectId, H, S> {
    fn resolve(&mut self, object: ObjectId) -> Option<&mut H> {
        self.get_mut(&object)
    }
}

impl<H> SceneHost<H> for BTreeMap<ObjectId, H> {
    fn resolve(&mut self, object: ObjectId) -> Option<&mut H> {
        self.get_mut(&object)
    }
}
