use glam::{Quat, Vec3};

/// Payload of tracked quantities for one object at one instant.
///
/// Carries no timing information. `Default` is the value of a snapshot that
/// has not been populated yet.
pub trait Snapshot: Clone + Default {
    /// Blends `prev` towards `next`. Each field picks its own policy through
    /// [`Amount::resolve`].
    fn interpolate(prev: &Self, next: &Self, amount: Amount) -> Self;
}

/// How a field treats a blend fraction outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BlendPolicy {
    #[default]
    Clamped,
    /// Allows the fraction to run past either end by at most `limit`.
    Overshoot { limit: f32 },
}

/// Blend fraction handed to [`Snapshot::interpolate`].
///
/// `clamped` is what the interpolator reports; `raw` is the fraction before
/// clamping, measured against the last two buffered states when the render
/// time runs past the newest one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amount {
    clamped: f32,
    raw: f32,
}

impl Amount {
    pub fn new(raw: f32) -> Self {
        let raw = if raw.is_finite() { raw } else { 1.0 };
        Self {
            clamped: raw.clamp(0.0, 1.0),
            raw,
        }
    }

    pub fn exact(amount: f32) -> Self {
        Self::new(amount.clamp(0.0, 1.0))
    }

    pub(crate) fn with_raw(clamped: f32, raw: f32) -> Self {
        Self {
            clamped,
            raw: if raw.is_finite() { raw } else { clamped },
        }
    }

    pub fn clamped(self) -> f32 {
        self.clamped
    }

    pub fn raw(self) -> f32 {
        self.raw
    }

    pub fn resolve(self, policy: BlendPolicy) -> f32 {
        match policy {
            BlendPolicy::Clamped => self.clamped,
            BlendPolicy::Overshoot { limit } => {
                let limit = limit.max(0.0);
                self.raw.clamp(-limit, 1.0 + limit)
            }
        }
    }
}

pub fn lerp_clamped(from: Vec3, to: Vec3, t: f32) -> Vec3 {
    from.lerp(to, t.clamp(0.0, 1.0))
}

/// Unclamped on purpose; only for fields that opted into overshoot.
pub fn lerp_unclamped(from: Vec3, to: Vec3, t: f32) -> Vec3 {
    from + (to - from) * t
}

/// Spherical blend along the shorter of the two arcs.
pub fn slerp_shortest(from: Quat, to: Quat, t: f32) -> Quat {
    let t = t.clamp(0.0, 1.0);
    if from.dot(to) < 0.0 {
        from.slerp(-to, t)
    } else {
        from.slerp(to, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_policies() {
        let amount = Amount::new(1.4);
        assert_eq!(amount.clamped(), 1.0);
        assert_eq!(amount.resolve(BlendPolicy::Clamped), 1.0);
        assert!((amount.resolve(BlendPolicy::Overshoot { limit: 0.25 }) - 1.25).abs() < 1e-6);
        assert!((amount.resolve(BlendPolicy::Overshoot { limit: 1.0 }) - 1.4).abs() < 1e-6);

        let behind = Amount::new(-0.5);
        assert_eq!(behind.clamped(), 0.0);
        assert!((behind.resolve(BlendPolicy::Overshoot { limit: 0.1 }) + 0.1).abs() < 1e-6);
    }

    #[test]
    fn non_finite_amount_snaps_to_next() {
        assert_eq!(Amount::new(f32::NAN).clamped(), 1.0);
        assert_eq!(Amount::new(f32::INFINITY).clamped(), 1.0);
    }

    #[test]
    fn shortest_arc_slerp() {
        let from = Quat::from_rotation_y(0.1);
        let to = -Quat::from_rotation_y(0.3);
        let mid = slerp_shortest(from, to, 0.5);
        let expected = Quat::from_rotation_y(0.2);
        assert!(mid.dot(expected).abs() > 1.0 - 1e-5);
    }

    #[test]
    fn lerp_variants() {
        let a = Vec3::ZERO;
        let b = Vec3::X;
        assert_eq!(lerp_clamped(a, b, 2.0), Vec3::X);
        assert_eq!(lerp_unclamped(a, b, 2.0), Vec3::new(2.0, 0.0, 0.0));
    }
}
