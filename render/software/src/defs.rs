/// Open vertical window of a screen column, rows `[from, upto)`. Portals
/// narrow it as the BSP walk descends; a zero-height range means the column
/// is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRange {
    pub from: i32,
    pub upto: i32,
}

/// One entry of a column's depth stack: the window that was still open at
/// the moment a wall or portal at `dist` was drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DepthSpan {
    pub dist: f32,
    pub from: i32,
    pub upto: i32,
}

/// Per-frame traversal counters for benchmarks and tests. `nodes` counts
/// BSP nodes and rendered subsectors alike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderCounts {
    pub nodes: usize,
    pub segments: usize,
    pub things: usize,
}

impl RenderCounts {
    pub fn accumulate(&mut self, other: RenderCounts) {
        self.nodes += other.nodes;
        self.segments += other.segments;
        self.things += other.things;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Ignore light levels and distance attenuation.
    pub fullbright: bool,
    /// Draw flat interiors row by row instead of batching them into
    /// deferred blocks.
    pub no_batch: bool,
}
