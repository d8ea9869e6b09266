//! Per-column occlusion state shared by the whole frame: a bitmask of
//! finished columns, the open clip window of every column, and a bounded
//! per-column stack of portal depth spans used later to clip sprites and
//! translucent middle textures.

use crate::defs::{ClipRange, DepthSpan};

/// Depth stack slots per column, including the permanent full-window base
/// entry at distance zero.
const DEPTH_SLOTS: usize = 32;

pub(crate) struct Occlusion {
    canvas_height: i32,
    mask: Vec<u64>,
    clip: Vec<ClipRange>,
    depth: Vec<DepthSpan>,
    depth_len: Vec<u8>,
}

impl Occlusion {
    pub(crate) fn new(viewport_width: i32, canvas_height: i32) -> Self {
        let width = viewport_width as usize;
        let mut depth = vec![DepthSpan::default(); width * DEPTH_SLOTS];
        for column in 0..width {
            depth[column << 5] = DepthSpan {
                dist: 0.0,
                from: 0,
                upto: canvas_height,
            };
        }
        Self {
            canvas_height,
            mask: vec![0; width.div_ceil(64)],
            clip: vec![
                ClipRange {
                    from: 0,
                    upto: canvas_height
                };
                width
            ],
            depth,
            depth_len: vec![1; width],
        }
    }

    pub(crate) fn clear(&mut self) {
        self.mask.fill(0);
        self.clip.fill(ClipRange {
            from: 0,
            upto: self.canvas_height,
        });
        self.depth_len.fill(1);
    }

    pub(crate) fn open_range(&self, column: i32) -> ClipRange {
        self.clip[column as usize]
    }

    pub(crate) fn set_open_range(&mut self, column: i32, range: ClipRange) {
        self.clip[column as usize] = range;
    }

    pub(crate) fn mark_column(&mut self, column: i32) {
        self.mask[(column >> 6) as usize] |= 1u64 << (column & 0x3f);
    }

    pub(crate) fn is_column_full(&self, column: i32) -> bool {
        self.mask[(column >> 6) as usize] & 1u64 << (column & 0x3f) != 0
    }

    /// True when every column of `[from, upto)` is marked. The range must
    /// not be empty.
    pub(crate) fn columns_full(&self, from: i32, mut upto: i32) -> bool {
        debug_assert!(from < upto);
        upto -= 1;
        let word_from = (from >> 6) as usize;
        let word_upto = (upto >> 6) as usize;
        let lo = from & 0x3f;
        let hi = 63 - (upto & 0x3f);
        if word_from == word_upto {
            return !self.mask[word_from] >> lo << lo << hi == 0;
        }
        if !self.mask[word_from] >> lo != 0 {
            return false;
        }
        if !self.mask[word_upto] << hi != 0 {
            return false;
        }
        self.mask[word_from + 1..word_upto]
            .iter()
            .all(|&word| word == u64::MAX)
    }

    pub(crate) fn mark_columns(&mut self, from: i32, mut upto: i32) {
        debug_assert!(from < upto);
        upto -= 1;
        let word_from = (from >> 6) as usize;
        let word_upto = (upto >> 6) as usize;
        let lo = from & 0x3f;
        let hi = 63 - (upto & 0x3f);
        if word_from == word_upto {
            self.mask[word_from] |= u64::MAX >> lo << lo << hi >> hi;
        } else {
            self.mask[word_from] |= u64::MAX >> lo << lo;
            self.mask[word_upto] |= u64::MAX << hi >> hi;
            for word in &mut self.mask[word_from + 1..word_upto] {
                *word = u64::MAX;
            }
        }
    }

    /// Record the window left open after drawing something at `dist` in
    /// this column. The entry is skipped when it would not clip anything
    /// the previous entry does not already clip. One slot is kept in
    /// reserve: the 31st push degenerates to a closed window and further
    /// pushes are dropped.
    pub(crate) fn push_depth(
        &mut self,
        column: i32,
        from: i32,
        mut upto: i32,
        dist: f32,
        upper_clip: bool,
        lower_clip: bool,
    ) {
        let col = column as usize;
        let len = self.depth_len[col] as usize;
        if len >= DEPTH_SLOTS - 1 {
            if len == DEPTH_SLOTS {
                return;
            }
            upto = from;
        }
        let offset = (col << 5) + len;
        let prev = self.depth[offset - 1];
        if (!upper_clip || prev.from == from) && (!lower_clip || prev.upto == upto) {
            return;
        }
        self.depth[offset] = DepthSpan { dist, from, upto };
        self.depth_len[col] = (len + 1) as u8;
    }

    /// Discard entries at or beyond `distance` and return the window of the
    /// nearest one still in front of it. The base entry at distance zero
    /// terminates the walk.
    pub(crate) fn pop_depth(&mut self, column: i32, distance: f32) -> ClipRange {
        let col = column as usize;
        let mut len = self.depth_len[col] as usize;
        loop {
            let span = self.depth[(col << 5) + len - 1];
            if span.dist < distance {
                self.depth_len[col] = len as u8;
                return ClipRange {
                    from: span.from,
                    upto: span.upto,
                };
            }
            len -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    // Small multiplicative congruential generator, good enough to drive
    // randomized coverage without pulling in a crate.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: i32) -> i32 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((self.0 >> 33) % bound as u64) as i32
        }
    }

    #[test]
    fn mark_and_query_single_columns() {
        let mut occ = Occlusion::new(200, 100);
        assert!(!occ.is_column_full(0));
        occ.mark_column(70);
        assert!(occ.is_column_full(70));
        assert!(!occ.is_column_full(69));
        assert!(!occ.is_column_full(71));
        occ.clear();
        assert!(!occ.is_column_full(70));
    }

    #[test]
    fn ranges_match_a_set_reference() {
        let mut rng = Lcg(0x1234_5678);
        let width = 321;
        let mut occ = Occlusion::new(width, 100);
        let mut reference = BTreeSet::new();
        for _ in 0..500 {
            let a = rng.next(width);
            let b = rng.next(width);
            let (from, upto) = (a.min(b), a.max(b) + 1);
            if rng.next(2) == 0 {
                occ.mark_columns(from, upto);
                reference.extend(from..upto);
            } else {
                let expected = (from..upto).all(|c| reference.contains(&c));
                assert_eq!(occ.columns_full(from, upto), expected, "{from}..{upto}");
            }
        }
        for col in 0..width {
            assert_eq!(occ.is_column_full(col), reference.contains(&col));
        }
    }

    #[test]
    fn ranges_spanning_word_boundaries() {
        let mut occ = Occlusion::new(256, 100);
        occ.mark_columns(60, 200);
        assert!(occ.columns_full(60, 200));
        assert!(occ.columns_full(63, 65));
        assert!(occ.columns_full(64, 128));
        assert!(!occ.columns_full(59, 61));
        assert!(!occ.columns_full(199, 201));
        assert!(occ.is_column_full(199));
        assert!(!occ.is_column_full(200));
    }

    #[test]
    fn depth_stack_pops_to_the_nearest_window() {
        let mut occ = Occlusion::new(4, 200);
        occ.push_depth(1, 10, 150, 100.0, true, true);
        occ.push_depth(1, 20, 120, 300.0, true, true);
        // A sprite behind both windows sees the base range.
        let far = occ.pop_depth(1, 500.0);
        assert_eq!(far, ClipRange { from: 20, upto: 120 });
        // Between the two windows.
        assert_eq!(occ.pop_depth(1, 200.0), ClipRange { from: 10, upto: 150 });
        // In front of everything: only the base entry survives.
        assert_eq!(occ.pop_depth(1, 50.0), ClipRange { from: 0, upto: 200 });
        assert_eq!(occ.pop_depth(1, 50.0), ClipRange { from: 0, upto: 200 });
    }

    #[test]
    fn depth_push_skips_redundant_windows() {
        let mut occ = Occlusion::new(2, 200);
        // Same window as the base in the clipped directions: dropped.
        occ.push_depth(0, 0, 200, 80.0, true, true);
        assert_eq!(occ.pop_depth(0, 120.0), ClipRange { from: 0, upto: 200 });
        // Clips only the bottom; the top matching the base is fine.
        occ.push_depth(0, 0, 90, 80.0, false, true);
        assert_eq!(occ.pop_depth(0, 120.0), ClipRange { from: 0, upto: 90 });
    }

    #[test]
    fn depth_stack_saturates_at_the_cap() {
        let mut occ = Occlusion::new(2, 200);
        for i in 0..40 {
            let dist = (i + 1) as f32;
            occ.push_depth(0, i, 200 - i, dist, true, true);
        }
        // Slot 31 became a degenerate closed window and later pushes were
        // dropped, so a faraway sprite is fully clipped.
        let range = occ.pop_depth(0, 1000.0);
        assert_eq!(range.from, range.upto);
        // Popping below the cap still restores real windows.
        assert_eq!(occ.pop_depth(0, 10.5), ClipRange { from: 9, upto: 191 });
    }
}
