//! The in-memory level model a map loader produces, plus the player camera.
//!
//! Everything here is plain data in flat arrays. During a frame the renderer
//! treats the whole `Scene` as read-only; a world updater owns it between
//! frames and may rewrite sector heights, sidedef offsets, thing positions
//! and the frame counter before the next render call.

mod map_defs;
mod pic;
mod player;
mod synth;

pub use glam;
pub use log;

pub use map_defs::{
    BBox, Child, LineDef, Node, Sector, Segment, SideDef, SpriteFrame, SubSector, Thing, ThingKind,
};
pub use pic::{Colormaps, FlatPic, PicPost, Picture, WallPic};
pub use player::Player;
pub use synth::{SceneBuilder, cross_scene, pix};

use glam::Vec2;

/// A fully loaded level. Geometry indices are array offsets into the
/// sibling arrays, the way the on-disk lumps store them.
pub struct Scene {
    pub vertexes: Vec<Vec2>,
    pub linedefs: Vec<LineDef>,
    pub sidedefs: Vec<SideDef>,
    pub sectors: Vec<Sector>,
    pub segments: Vec<Segment>,
    pub subsectors: Vec<SubSector>,
    /// BSP nodes, root last.
    pub nodes: Vec<Node>,
    pub things: Vec<Thing>,
    pub thing_kinds: Vec<ThingKind>,

    /// Column-major wall textures, indexed by `SideDef` texture fields.
    pub walls: Vec<WallPic>,
    /// 64x64 floor/ceiling tiles, indexed by `Sector` pic fields.
    pub flats: Vec<FlatPic>,
    /// Post-compressed middle textures for two-sided lines.
    pub floaters: Vec<Picture>,
    /// Post-compressed sprite frames for things.
    pub sprites: Vec<Picture>,
    pub sky: WallPic,
    /// Sentinel flat index: a sector pic equal to this renders as sky.
    pub sky_pic: usize,
    pub colormaps: Colormaps,

    /// Incremented by the world updater once per tick. Drives sprite frame
    /// selection and the ghost shimmer.
    pub frame_count: u32,
}

impl Scene {
    pub fn root_node(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Descend the BSP to the subsector containing `xy` and report its sector.
    pub fn find_sector(&self, xy: Vec2) -> usize {
        let mut child = Child {
            is_node: true,
            idx: self.root_node() as u32,
        };
        while child.is_node {
            let node = &self.nodes[child.idx as usize];
            child = node.children[node.point_on_side(xy)];
        }
        let sub = &self.subsectors[child.idx as usize];
        self.segments[sub.start_seg as usize].front_sector
    }
}
