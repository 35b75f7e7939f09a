//! Arena geometry and bounding-box collision

/// Side length of every entity's bounding box (players and the collectible)
pub const ENTITY_SIZE: i32 = 30;

/// Default canvas dimensions
pub const DEFAULT_ARENA_WIDTH: i32 = 640;
pub const DEFAULT_ARENA_HEIGHT: i32 = 480;

/// Axis-aligned box anchored at its top-left corner, always `ENTITY_SIZE` wide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
}

impl BoundingBox {
    pub fn at(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// True iff the two fixed-size boxes overlap. Touching edges do not count.
pub fn overlaps(a: BoundingBox, b: BoundingBox) -> bool {
    a.x < b.x + ENTITY_SIZE
        && a.x + ENTITY_SIZE > b.x
        && a.y < b.y + ENTITY_SIZE
        && a.y + ENTITY_SIZE > b.y
}

/// The playable canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arena {
    pub width: i32,
    pub height: i32,
}

impl Arena {
    /// Smallest side length: one entity plus an inset on each side, with at
    /// least two spawn columns and rows so a replacement can always move
    pub const MIN_SIDE: i32 = ENTITY_SIZE * 3 + 1;

    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width: width.max(Self::MIN_SIDE),
            height: height.max(Self::MIN_SIDE),
        }
    }

    /// Largest x a box may be anchored at while staying on the canvas
    pub fn max_x(&self) -> i32 {
        self.width - ENTITY_SIZE
    }

    /// Largest y a box may be anchored at while staying on the canvas
    pub fn max_y(&self) -> i32 {
        self.height - ENTITY_SIZE
    }

    /// Clamp an anchor position into `[0, max_x] x [0, max_y]`
    pub fn clamp(&self, x: i64, y: i64) -> (i32, i32) {
        (
            x.clamp(0, self.max_x() as i64) as i32,
            y.clamp(0, self.max_y() as i64) as i32,
        )
    }

    /// Inclusive x range for spawns, inset by one entity from each edge
    pub fn spawn_x_range(&self) -> std::ops::RangeInclusive<i32> {
        ENTITY_SIZE..=self.max_x() - ENTITY_SIZE
    }

    /// Inclusive y range for spawns, inset by one entity from each edge
    pub fn spawn_y_range(&self) -> std::ops::RangeInclusive<i32> {
        ENTITY_SIZE..=self.max_y() - ENTITY_SIZE
    }

    /// Upper bound for a single movement step
    pub fn max_step(&self) -> i32 {
        self.width.max(self.height)
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(DEFAULT_ARENA_WIDTH, DEFAULT_ARENA_HEIGHT)
    }
}
