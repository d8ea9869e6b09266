//! Rectangle compositor for batched flat interiors. Blocks collected over
//! a frame are flushed as one row-band sweep: every band of rows between
//! two block edges shares a set of merged column spans, and bands with an
//! identical span extend it upward into a single rectangle. The emitted
//! rectangles tile the union of the input blocks exactly, even when inputs
//! overlap or contain each other.

use scene::{Player, Scene};

use crate::Viewport;

#[derive(Debug, Clone, Copy, Default)]
struct Block {
    top: i32,
    bottom: i32,
    left: i32,
    right: i32,
}

/// One pending batch of rectangles sharing a flat texture, view-relative
/// height and light level. Pooled across frames by the renderer.
#[derive(Default)]
pub(crate) struct BlockJob {
    blocks: Vec<Block>,
    pic: usize,
    height: f32,
    colormap_idx: i32,
}

impl BlockJob {
    pub(crate) fn init(&mut self, pic: usize, height: f32, colormap_idx: i32) {
        self.blocks.clear();
        self.pic = pic;
        self.height = height;
        self.colormap_idx = colormap_idx;
    }

    pub(crate) fn matches(&self, pic: usize, height: f32, colormap_idx: i32) -> bool {
        self.pic == pic && self.height == height && self.colormap_idx == colormap_idx
    }

    pub(crate) fn add_block(&mut self, top: i32, bottom: i32, left: i32, right: i32) {
        self.blocks.push(Block {
            top,
            bottom,
            left,
            right,
        });
    }

    pub(crate) fn render_all(&mut self, view: &mut Viewport, scene: &Scene, player: &Player) {
        let flat = &scene.flats[self.pic];
        let colormap_idx = self.colormap_idx;
        let height = self.height;
        let mut emit = |top: i32, bottom: i32, left: i32, right: i32| {
            for row in top..bottom {
                view.draw_flat_row(scene, player, row, left, right, flat, colormap_idx, height);
            }
        };
        self.flush_rects(&mut emit);
    }

    /// Drain the collected blocks as rectangles that cover their union
    /// exactly once. Sweeps the block edges top to bottom; within a band
    /// the spans are the column-sorted union of the covering blocks, and a
    /// span that repeats across bands stays open as one growing rectangle.
    pub(crate) fn flush_rects(&mut self, emit: &mut impl FnMut(i32, i32, i32, i32)) {
        self.blocks.sort_unstable_by_key(|b| b.left);
        let mut edges: Vec<i32> = self
            .blocks
            .iter()
            .flat_map(|b| [b.top, b.bottom])
            .collect();
        edges.sort_unstable();
        edges.dedup();
        // Rectangles still growing downward: their top row plus span.
        let mut open: Vec<(i32, i32, i32)> = Vec::new();
        let mut spans: Vec<(i32, i32)> = Vec::new();
        for &row in &edges {
            spans.clear();
            for b in &self.blocks {
                if b.top <= row && row < b.bottom {
                    match spans.last_mut() {
                        Some(last) if b.left <= last.1 => last.1 = last.1.max(b.right),
                        _ => spans.push((b.left, b.right)),
                    }
                }
            }
            open.retain(|&(top, left, right)| {
                if spans.contains(&(left, right)) {
                    true
                } else {
                    emit(top, row, left, right);
                    false
                }
            });
            for &(left, right) in &spans {
                if !open.iter().any(|&(_, l, r)| l == left && r == right) {
                    open.push((row, left, right));
                }
            }
        }
        // The last edge is the deepest bottom, so nothing stays open.
        debug_assert!(open.is_empty());
        self.blocks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> BlockJob {
        let mut job = BlockJob::default();
        job.init(0, 0.0, 0);
        job
    }

    fn rects(job: &mut BlockJob) -> Vec<(i32, i32, i32, i32)> {
        let mut out = Vec::new();
        job.flush_rects(&mut |top, bottom, left, right| {
            if top < bottom && left < right {
                out.push((top, bottom, left, right));
            }
        });
        out
    }

    fn paint(grid: &mut [Vec<u8>], rect: (i32, i32, i32, i32)) {
        for row in rect.0..rect.1 {
            for col in rect.2..rect.3 {
                grid[row as usize][col as usize] += 1;
            }
        }
    }

    #[test]
    fn aligned_neighbours_merge_into_one_rect() {
        let mut job = job();
        job.add_block(10, 20, 0, 5);
        job.add_block(10, 20, 5, 9);
        assert_eq!(rects(&mut job), vec![(10, 20, 0, 9)]);
    }

    #[test]
    fn offset_neighbours_split_at_the_shared_rows() {
        let mut job = job();
        job.add_block(0, 10, 0, 5);
        job.add_block(5, 15, 5, 10);
        let out = rects(&mut job);
        // The shared rows 5..10 run the full width in one piece.
        assert!(out.contains(&(5, 10, 0, 10)));
        let mut grid = vec![vec![0u8; 16]; 16];
        for rect in out {
            paint(&mut grid, rect);
        }
        for row in 0..16 {
            for col in 0..16 {
                let covered = (row < 10 && col < 5) || ((5..15).contains(&row) && (5..10).contains(&col));
                assert_eq!(grid[row][col] == 1, covered, "row {row} col {col}");
                assert!(grid[row][col] <= 1);
            }
        }
    }

    #[test]
    fn disjoint_columns_do_not_bleed() {
        let mut job = job();
        job.add_block(0, 10, 0, 4);
        job.add_block(0, 10, 6, 10);
        let out = rects(&mut job);
        assert_eq!(out.len(), 2);
        assert!(out.contains(&(0, 10, 0, 4)));
        assert!(out.contains(&(0, 10, 6, 10)));
    }

    #[test]
    fn contained_rects_collapse_into_the_outer() {
        let mut job = job();
        job.add_block(0, 20, 0, 20);
        job.add_block(5, 15, 5, 15);
        // The inner block adds nothing; the union is the outer block.
        assert_eq!(rects(&mut job), vec![(0, 20, 0, 20)]);
    }

    #[test]
    fn partial_overlaps_cover_the_union_once() {
        let mut job = job();
        job.add_block(0, 10, 0, 10);
        job.add_block(5, 15, 5, 15);
        let out = rects(&mut job);
        let mut grid = vec![vec![0u8; 16]; 16];
        for rect in out {
            paint(&mut grid, rect);
        }
        for row in 0..16 {
            for col in 0..16 {
                let covered =
                    (row < 10 && col < 10) || ((5..15).contains(&row) && (5..15).contains(&col));
                assert_eq!(grid[row][col] == 1, covered, "row {row} col {col}");
            }
        }
    }

    #[test]
    fn random_rects_fill_their_union_exactly_once() {
        // Simple deterministic generator, good enough for tiling cases.
        struct Lcg(u64);
        impl Lcg {
            fn next(&mut self, bound: i32) -> i32 {
                self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((self.0 >> 33) % bound as u64) as i32
            }
        }
        let mut rng = Lcg(0x5eed);
        for case in 0..50 {
            let mut grid = vec![vec![0u8; 64]; 64];
            let mut wanted = vec![vec![false; 64]; 64];
            let mut job = job();
            // Arbitrary rectangles: overlaps, containment, shared edges.
            for _ in 0..25 {
                let top = rng.next(56);
                let bottom = top + 1 + rng.next(8);
                let left = rng.next(56);
                let right = left + 1 + rng.next(8);
                for row in top..bottom {
                    for col in left..right {
                        wanted[row as usize][col as usize] = true;
                    }
                }
                job.add_block(top, bottom, left, right);
            }
            let out = rects(&mut job);
            for rect in out {
                paint(&mut grid, rect);
            }
            for row in 0..64 {
                for col in 0..64 {
                    assert_eq!(
                        grid[row][col],
                        u8::from(wanted[row][col]),
                        "case {case} row {row} col {col}"
                    );
                }
            }
        }
    }
}
