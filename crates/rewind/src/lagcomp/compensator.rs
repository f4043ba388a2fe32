use std::collections::BTreeMap;

use glam::Vec3;
use rapier3d::parry::query::RayCast;
use rapier3d::prelude::*;

use super::history::{ColliderPose, HistoryError, PoseHistory, PoseLookup};
use super::mask::HitMask;
use crate::model::ObjectId;

pub const DEFAULT_HISTORY_DEPTH: usize = 64;

struct HitTarget {
    shape: SharedShape,
    mask: HitMask,
    history: PoseHistory,
    current: ColliderPose,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub object: ObjectId,
    /// Distance along the normalized ray.
    pub distance: f32,
    pub point: Vec3,
    /// Historical frame the hit was computed against; `None` for queries
    /// against current poses.
    pub lookup: Option<PoseLookup>,
}

impl Hit {
    pub fn frame(&self) -> Option<u32> {
        self.lookup.map(PoseLookup::frame)
    }
}

/// Per-object collider pose histories plus ray queries against them.
pub struct LagCompensator {
    targets: BTreeMap<ObjectId, HitTarget>,
    depth: usize,
}

impl Default for LagCompensator {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl LagCompensator {
    pub fn new(depth: usize) -> Self {
        Self {
            targets: BTreeMap::new(),
            depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn register(
        &mut self,
        object: ObjectId,
        shape: SharedShape,
        mask: HitMask,
        pose: ColliderPose,
    ) {
        self.targets.insert(
            object,
            HitTarget {
                shape,
                mask,
                history: PoseHistory::new(self.depth),
                current: pose,
            },
        );
    }

    pub fn remove(&mut self, object: ObjectId) -> bool {
        self.targets.remove(&object).is_some()
    }

    pub fn contains(&self, object: ObjectId) -> bool {
        self.targets.contains_key(&object)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn history(&self, object: ObjectId) -> Option<&PoseHistory> {
        self.targets.get(&object).map(|target| &target.history)
    }

    pub fn set_current(&mut self, object: ObjectId, pose: ColliderPose) {
        if let Some(target) = self.targets.get_mut(&object) {
            target.current = pose;
        }
    }

    /// Records the pose `object` had at `frame` and makes it current.
    /// Unregistered objects are ignored.
    pub fn archive(
        &mut self,
        object: ObjectId,
        frame: u32,
        pose: ColliderPose,
    ) -> Result<(), HistoryError> {
        let Some(target) = self.targets.get_mut(&object) else {
            return Ok(());
        };
        target.history.push(frame, pose)?;
        target.current = pose;
        Ok(())
    }

    /// Ray test against every target as it stood at `at_frame`.
    pub fn server_query(
        &self,
        at_frame: u32,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: HitMask,
    ) -> Vec<Hit> {
        let Some(dir) = query_direction(direction, max_distance) else {
            return Vec::new();
        };

        let mut hits = Vec::new();
        for (&object, target) in &self.targets {
            if !mask.selects(target.mask) {
                continue;
            }

            let Some((lookup, pose)) = target.history.lookup(at_frame) else {
                continue;
            };
            if let PoseLookup::Underrun(used) = lookup {
                log::warn!(
                    "hit-test for {object} at frame {at_frame} predates history; using oldest frame {used}"
                );
            }

            if let Some((distance, point)) = cast(&target.shape, pose, origin, dir, max_distance) {
                hits.push(Hit {
                    object,
                    distance,
                    point,
                    lookup: Some(lookup),
                });
            }
        }

        sort_hits(&mut hits);
        hits
    }

    /// Ray test against current poses. For local feedback only.
    pub fn client_query(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: HitMask,
    ) -> Vec<Hit> {
        let Some(dir) = query_direction(direction, max_distance) else {
            return Vec::new();
        };

        let mut hits: Vec<Hit> = self
            .targets
            .iter()
            .filter(|(_, target)| mask.selects(target.mask))
            .filter_map(|(&object, target)| {
                cast(&target.shape, target.current, origin, dir, max_distance).map(
                    |(distance, point)| Hit {
                        object,
                        distance,
                        point,
                        lookup: None,
                    },
                )
            })
            .collect();

        sort_hits(&mut hits);
        hits
    }
}

fn query_direction(direction: Vec3, max_distance: f32) -> Option<Vec3> {
    if max_distance.is_nan() || max_distance <= 0.0 {
        return None;
    }
    let dir = direction.normalize_or_zero();
    if dir == Vec3::ZERO {
        log::debug!("ignoring hit-test with zero direction");
        return None;
    }
    Some(dir)
}

fn cast(
    shape: &SharedShape,
    pose: ColliderPose,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
) -> Option<(f32, Vec3)> {
    let p = pose.position;
    let r = pose.rotation;
    let rot = Rotation::from_xyzw(r.x, r.y, r.z, r.w).normalize();
    let shape_pose = Pose::from_parts(Vector::new(p.x, p.y, p.z), rot);
    let ray = Ray::new(
        Vector::new(origin.x, origin.y, origin.z),
        Vector::new(direction.x, direction.y, direction.z),
    );

    shape
        .cast_ray(&shape_pose, &ray, max_distance, true)
        .map(|toi| (toi, origin + direction * toi))
}

/// Nearest first, ties broken by object id.
fn sort_hits(hits: &mut [Hit]) {
    hits.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.object.cmp(&b.object))
    });
}
