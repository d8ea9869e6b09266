use glam::Vec2;

/// Tagged reference to a BSP child: an inner node when `is_node`, otherwise
/// a subsector leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Child {
    pub is_node: bool,
    pub idx: u32,
}

/// Axis-aligned bounds of one BSP child subtree.
#[derive(Debug, Clone, Copy, Default)]
pub struct BBox {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl BBox {
    pub fn contains(&self, v: Vec2) -> bool {
        v.x >= self.left && v.x <= self.right && v.y >= self.bottom && v.y <= self.top
    }
}

/// BSP splitter. The partition line runs through `xy` along the unit vector
/// `delta`; child 0 is the right side, child 1 the left.
#[derive(Debug, Clone, Copy)]
pub struct Node {
    pub xy: Vec2,
    pub delta: Vec2,
    pub bboxes: [BBox; 2],
    pub children: [Child; 2],
    /// Head of the list of things straddling the partition line.
    pub first_thing: Option<u32>,
}

impl Node {
    /// 0 when `v` lies on the right side of the partition line.
    pub fn point_on_side(&self, v: Vec2) -> usize {
        let d = v - self.xy;
        if d.x * self.delta.y - d.y * self.delta.x >= 0.0 {
            0
        } else {
            1
        }
    }
}

/// Convex leaf of the BSP: a run of segments plus the things inside it.
#[derive(Debug, Clone, Copy)]
pub struct SubSector {
    pub start_seg: u32,
    pub seg_count: u32,
    pub first_thing: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct LineDef {
    pub v1: usize,
    pub v2: usize,
    /// Wall texture rows anchor to the floor instead of the ceiling.
    pub lower_unpegged: bool,
    /// Upper portal texture rows anchor to the front ceiling.
    pub upper_unpegged: bool,
    pub special: i16,
    pub front_sidedef: usize,
    pub back_sidedef: Option<usize>,
}

/// Texture fields index `Scene::walls`, except `middle` on a two-sided
/// line which indexes `Scene::floaters`.
#[derive(Debug, Clone, Copy)]
pub struct SideDef {
    pub x_offset: f32,
    pub y_offset: f32,
    pub upper: Option<usize>,
    pub lower: Option<usize>,
    pub middle: Option<usize>,
    pub sector: usize,
}

/// One rendered fragment of a linedef, owned by a subsector. `delta` is the
/// unit direction from `v1` to `v2` and `offset` is the distance from the
/// owning linedef's start vertex, both precomputed by the loader.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub v1: usize,
    pub v2: usize,
    pub delta: Vec2,
    pub inv_length: f32,
    pub offset: f32,
    pub linedef: usize,
    pub front_sidedef: usize,
    pub back_sidedef: Option<usize>,
    pub front_sector: usize,
    pub back_sector: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct Sector {
    pub floorheight: f32,
    pub ceilingheight: f32,
    pub floorpic: usize,
    pub ceilingpic: usize,
    pub lightlevel: i32,
    /// Base colormap derived from `lightlevel` at load time.
    pub colormap: i32,
    pub special: i16,
    pub tag: i16,
    /// Adjacent-sector run in the loader's adjacency table, maintained for
    /// the world updater's light propagation. Not read while rendering.
    pub adj_from: usize,
    pub adj_upto: usize,
}

/// A sprite-bearing map object. `next_thing` chains things attached to the
/// same subsector or node.
#[derive(Debug, Clone, Copy)]
pub struct Thing {
    pub xy: Vec2,
    /// Facing in degrees, used for multi-angle sprite selection.
    pub angle: i32,
    pub kind: usize,
    pub sector: usize,
    pub next_thing: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct SpriteFrame {
    pub pic: usize,
    pub mirror: bool,
}

/// Shared appearance data for a class of things.
#[derive(Debug, Clone)]
pub struct ThingKind {
    /// Animation frames, each one sprite per 45-degree viewing bucket.
    /// Kinds without rotations repeat the same sprite eight times.
    pub frames: Vec<[SpriteFrame; 8]>,
    pub multiangle: bool,
    /// Drawn with the ghost colormap blend instead of its own pixels.
    pub transparent: bool,
    /// Anchored to the ceiling instead of the floor.
    pub hanging: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_on_side_matches_winding() {
        let node = Node {
            xy: Vec2::new(256.0, 0.0),
            delta: Vec2::new(0.0, 1.0),
            bboxes: [BBox::default(); 2],
            children: [
                Child { is_node: false, idx: 0 },
                Child { is_node: false, idx: 1 },
            ],
            first_thing: None,
        };
        assert_eq!(node.point_on_side(Vec2::new(400.0, 50.0)), 0);
        assert_eq!(node.point_on_side(Vec2::new(-128.0, 50.0)), 1);
        // On the line counts as the right side.
        assert_eq!(node.point_on_side(Vec2::new(256.0, -300.0)), 0);
    }
}
