use bitflags::bitflags;

bitflags! {
    /// Layers a hit target lives on and a query selects.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HitMask: u32 {
        const WORLD = 1 << 0;
        const PLAYER = 1 << 1;
        const PROJECTILE = 1 << 2;
        const PROP = 1 << 3;
        const TRIGGER = 1 << 4;
    }
}

impl Default for HitMask {
    fn default() -> Self {
        Self::all()
    }
}

impl HitMask {
    pub fn selects(self, target: HitMask) -> bool {
        self.intersects(target)
    }
}
