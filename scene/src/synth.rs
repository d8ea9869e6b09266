//! Programmatic scene construction. Stands in for the on-disk loader when
//! benchmarking or exercising the renderer against known geometry.

use crate::{
    BBox, Child, Colormaps, FlatPic, LineDef, Node, Picture, Scene, Sector, Segment, SideDef,
    SpriteFrame, SubSector, Thing, ThingKind, WallPic,
};
use glam::Vec2;

/// Palette bytes used by [`cross_scene`] textures, one distinct value per
/// surface so output pixels identify what was drawn.
pub mod pix {
    pub const WALL: u8 = 50;
    pub const UPPER: u8 = 55;
    pub const LOWER: u8 = 60;
    pub const FLOOR: u8 = 80;
    pub const CEIL: u8 = 85;
    pub const ARM_FLOOR: u8 = 90;
    pub const ARM_CEIL: u8 = 95;
    pub const FLOATER: u8 = 120;
    pub const SPRITE: u8 = 200;
    pub const SKY: u8 = 30;
}

pub struct SceneBuilder {
    vertexes: Vec<Vec2>,
    linedefs: Vec<LineDef>,
    sidedefs: Vec<SideDef>,
    sectors: Vec<Sector>,
    segments: Vec<Segment>,
    subsectors: Vec<SubSector>,
    nodes: Vec<Node>,
    things: Vec<Thing>,
    thing_kinds: Vec<ThingKind>,
    walls: Vec<WallPic>,
    flats: Vec<FlatPic>,
    floaters: Vec<Picture>,
    sprites: Vec<Picture>,
    sky: WallPic,
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            vertexes: Vec::new(),
            linedefs: Vec::new(),
            sidedefs: Vec::new(),
            sectors: Vec::new(),
            segments: Vec::new(),
            subsectors: Vec::new(),
            nodes: Vec::new(),
            things: Vec::new(),
            thing_kinds: Vec::new(),
            walls: Vec::new(),
            flats: Vec::new(),
            floaters: Vec::new(),
            sprites: Vec::new(),
            sky: WallPic {
                width: 256,
                height: 128,
                data: vec![pix::SKY; 256 * 128],
            },
        };
        // Flat 0 is reserved as the sky sentinel.
        builder.flat_pic(|_, _| 0);
        builder
    }

    pub fn wall_pic(&mut self, width: i32, height: i32, f: impl Fn(i32, i32) -> u8) -> usize {
        let mut data = vec![0u8; (width * height) as usize];
        for col in 0..width {
            for row in 0..height {
                data[(height * col + row) as usize] = f(col, row);
            }
        }
        self.walls.push(WallPic {
            width,
            height,
            data,
        });
        self.walls.len() - 1
    }

    pub fn flat_pic(&mut self, f: impl Fn(i32, i32) -> u8) -> usize {
        let mut data = vec![0u8; (FlatPic::WIDTH * FlatPic::HEIGHT) as usize];
        for y in 0..FlatPic::HEIGHT {
            for x in 0..FlatPic::WIDTH {
                data[(y * FlatPic::WIDTH + x) as usize] = f(x, y);
            }
        }
        self.flats.push(FlatPic { data });
        self.flats.len() - 1
    }

    /// Build a post-compressed picture from a pixel function; `None` pixels
    /// become transparent gaps between posts.
    fn compress(
        width: i32,
        height: i32,
        left_offset: i32,
        top_offset: i32,
        f: impl Fn(i32, i32) -> Option<u8>,
    ) -> Picture {
        let mut picture = Picture::new(width, height, left_offset, top_offset);
        for col in 0..width {
            let mut row = 0;
            while row < height {
                if f(col, row).is_none() {
                    row += 1;
                    continue;
                }
                let from = row;
                let mut pixels = Vec::new();
                while row < height {
                    match f(col, row) {
                        Some(p) => pixels.push(p),
                        None => break,
                    }
                    row += 1;
                }
                picture.push_post(col, from, pixels);
            }
        }
        picture
    }

    pub fn sprite_pic(
        &mut self,
        width: i32,
        height: i32,
        left_offset: i32,
        f: impl Fn(i32, i32) -> Option<u8>,
    ) -> usize {
        self.sprites.push(Self::compress(width, height, left_offset, 0, f));
        self.sprites.len() - 1
    }

    pub fn floater_pic(
        &mut self,
        width: i32,
        height: i32,
        f: impl Fn(i32, i32) -> Option<u8>,
    ) -> usize {
        self.floaters.push(Self::compress(width, height, 0, 0, f));
        self.floaters.len() - 1
    }

    /// A kind with a single frame and no rotations.
    pub fn simple_kind(&mut self, sprite: usize, transparent: bool, hanging: bool) -> usize {
        let frame = SpriteFrame {
            pic: sprite,
            mirror: false,
        };
        self.thing_kinds.push(ThingKind {
            frames: vec![[frame; 8]],
            multiangle: false,
            transparent,
            hanging,
        });
        self.thing_kinds.len() - 1
    }

    pub fn vertex(&mut self, x: f32, y: f32) -> usize {
        self.vertexes.push(Vec2::new(x, y));
        self.vertexes.len() - 1
    }

    pub fn sector(
        &mut self,
        floorheight: f32,
        ceilingheight: f32,
        floorpic: usize,
        ceilingpic: usize,
        lightlevel: i32,
    ) -> usize {
        self.sectors.push(Sector {
            floorheight,
            ceilingheight,
            floorpic,
            ceilingpic,
            lightlevel,
            colormap: !(lightlevel >> 3) & 0x1f,
            special: 0,
            tag: 0,
            adj_from: 0,
            adj_upto: 0,
        });
        self.sectors.len() - 1
    }

    pub fn sidedef(
        &mut self,
        sector: usize,
        upper: Option<usize>,
        lower: Option<usize>,
        middle: Option<usize>,
    ) -> usize {
        self.sidedefs.push(SideDef {
            x_offset: 0.0,
            y_offset: 0.0,
            upper,
            lower,
            middle,
            sector,
        });
        self.sidedefs.len() - 1
    }

    pub fn linedef(&mut self, v1: usize, v2: usize, front: usize, back: Option<usize>) -> usize {
        self.linedefs.push(LineDef {
            v1,
            v2,
            lower_unpegged: false,
            upper_unpegged: false,
            special: 0,
            front_sidedef: front,
            back_sidedef: back,
        });
        self.linedefs.len() - 1
    }

    /// A self-contained one-sided wall: sidedef, linedef and one seg
    /// spanning the whole line.
    pub fn solid_wall(&mut self, v1: usize, v2: usize, sector: usize, texture: usize) -> usize {
        let sd = self.sidedef(sector, None, None, Some(texture));
        let ld = self.linedef(v1, v2, sd, None);
        self.seg(ld, false)
    }

    pub fn seg(&mut self, linedef: usize, backside: bool) -> usize {
        let ld = self.linedefs[linedef];
        let (v1, v2) = if backside { (ld.v2, ld.v1) } else { (ld.v1, ld.v2) };
        let a = self.vertexes[v1];
        let b = self.vertexes[v2];
        let length = (b - a).length();
        let line_start = self.vertexes[if backside { ld.v2 } else { ld.v1 }];
        let front_sidedef = if backside {
            ld.back_sidedef.expect("backside seg on a one-sided line")
        } else {
            ld.front_sidedef
        };
        let back_sidedef = if backside {
            Some(ld.front_sidedef)
        } else {
            ld.back_sidedef
        };
        self.segments.push(Segment {
            v1,
            v2,
            delta: (b - a) / length,
            inv_length: 1.0 / length,
            offset: (a - line_start).length(),
            linedef,
            front_sidedef,
            back_sidedef,
            front_sector: self.sidedefs[front_sidedef].sector,
            back_sector: back_sidedef.map(|sd| self.sidedefs[sd].sector),
        });
        self.segments.len() - 1
    }

    pub fn subsector(&mut self, start_seg: usize, seg_count: usize) -> Child {
        self.subsectors.push(SubSector {
            start_seg: start_seg as u32,
            seg_count: seg_count as u32,
            first_thing: None,
        });
        Child {
            is_node: false,
            idx: (self.subsectors.len() - 1) as u32,
        }
    }

    pub fn node(
        &mut self,
        xy: Vec2,
        delta: Vec2,
        right: (Child, BBox),
        left: (Child, BBox),
    ) -> Child {
        self.nodes.push(Node {
            xy,
            delta,
            bboxes: [right.1, left.1],
            children: [right.0, left.0],
            first_thing: None,
        });
        Child {
            is_node: true,
            idx: (self.nodes.len() - 1) as u32,
        }
    }

    pub fn thing(&mut self, x: f32, y: f32, angle: i32, kind: usize) -> usize {
        self.things.push(Thing {
            xy: Vec2::new(x, y),
            angle,
            kind,
            sector: 0,
            next_thing: None,
        });
        self.things.len() - 1
    }

    /// Finish the scene: resolve thing sectors and hang each thing off the
    /// deepest BSP child whose partition lines all clear its radius.
    pub fn build(self) -> Scene {
        let mut scene = Scene {
            vertexes: self.vertexes,
            linedefs: self.linedefs,
            sidedefs: self.sidedefs,
            sectors: self.sectors,
            segments: self.segments,
            subsectors: self.subsectors,
            nodes: self.nodes,
            things: self.things,
            thing_kinds: self.thing_kinds,
            walls: self.walls,
            flats: self.flats,
            floaters: self.floaters,
            sprites: self.sprites,
            sky: self.sky,
            sky_pic: 0,
            colormaps: Colormaps::synthetic(),
            frame_count: 0,
        };
        for idx in 0..scene.things.len() {
            place_thing(&mut scene, idx);
        }
        scene
    }
}

fn place_thing(scene: &mut Scene, idx: usize) {
    let xy = scene.things[idx].xy;
    scene.things[idx].sector = scene.find_sector(xy);
    let kind = &scene.thing_kinds[scene.things[idx].kind];
    let mut radius = 0.0f32;
    for frame in &kind.frames {
        for sf in frame {
            radius = radius.max(scene.sprites[sf.pic].width as f32 * 0.5);
        }
    }
    let mut child = Child {
        is_node: true,
        idx: scene.root_node() as u32,
    };
    loop {
        if !child.is_node {
            let sub = child.idx as usize;
            scene.things[idx].next_thing = scene.subsectors[sub].first_thing;
            scene.subsectors[sub].first_thing = Some(idx as u32);
            return;
        }
        let node_idx = child.idx as usize;
        let node = scene.nodes[node_idx];
        let d = xy - node.xy;
        if (d.x * node.delta.y - d.y * node.delta.x).abs() < radius {
            scene.things[idx].next_thing = scene.nodes[node_idx].first_thing;
            scene.nodes[node_idx].first_thing = Some(idx as u32);
            return;
        }
        child = node.children[node.point_on_side(xy)];
    }
}

/// Four rooms around one hub: a 512-unit square joined to an east arm
/// through the map's single portal, with sealed north and west arms. The
/// portal carries a fully opaque middle texture and the hub holds one
/// static thing at (64, 0).
pub fn cross_scene() -> Scene {
    let mut b = SceneBuilder::new();

    let wall = b.wall_pic(128, 128, |_, _| pix::WALL);
    let upper = b.wall_pic(128, 128, |_, _| pix::UPPER);
    let lower = b.wall_pic(128, 128, |_, _| pix::LOWER);
    let floor = b.flat_pic(|_, _| pix::FLOOR);
    let ceil = b.flat_pic(|_, _| pix::CEIL);
    let arm_floor = b.flat_pic(|_, _| pix::ARM_FLOOR);
    let arm_ceil = b.flat_pic(|_, _| pix::ARM_CEIL);
    let fence = b.floater_pic(128, 128, |_, _| Some(pix::FLOATER));
    let sprite = b.sprite_pic(32, 64, 16, |_, _| Some(pix::SPRITE));
    let kind = b.simple_kind(sprite, false, false);

    let hub = b.sector(0.0, 128.0, floor, ceil, 255);
    let east = b.sector(16.0, 112.0, arm_floor, arm_ceil, 255);
    let north = b.sector(0.0, 128.0, floor, ceil, 255);
    let west = b.sector(0.0, 128.0, floor, ceil, 255);

    let a = b.vertex(-256.0, -256.0);
    let bb = b.vertex(256.0, -256.0);
    let c = b.vertex(256.0, 256.0);
    let d = b.vertex(-256.0, 256.0);
    let e = b.vertex(256.0, -128.0);
    let f = b.vertex(256.0, 128.0);
    let g = b.vertex(768.0, -128.0);
    let h = b.vertex(768.0, 128.0);
    let i = b.vertex(-128.0, 256.0);
    let j = b.vertex(128.0, 256.0);
    let m = b.vertex(128.0, 768.0);
    let n = b.vertex(-128.0, 768.0);
    let o = b.vertex(-256.0, -128.0);
    let p = b.vertex(-256.0, 128.0);
    let q = b.vertex(-768.0, 128.0);
    let r = b.vertex(-768.0, -128.0);

    // Hub interior, wound clockwise. Its east wall splits around the portal.
    b.solid_wall(d, c, hub, wall);
    b.solid_wall(c, f, hub, wall);
    let portal_front = b.sidedef(hub, Some(upper), Some(lower), Some(fence));
    let portal_back = b.sidedef(east, Some(upper), Some(lower), None);
    let portal = b.linedef(f, e, portal_front, Some(portal_back));
    b.seg(portal, false);
    b.solid_wall(e, bb, hub, wall);
    b.solid_wall(bb, a, hub, wall);
    b.solid_wall(a, d, hub, wall);
    let hub_leaf = b.subsector(0, 6);

    b.seg(portal, true);
    b.solid_wall(f, h, east, wall);
    b.solid_wall(h, g, east, wall);
    b.solid_wall(g, e, east, wall);
    let east_leaf = b.subsector(6, 4);

    b.solid_wall(i, n, north, wall);
    b.solid_wall(n, m, north, wall);
    b.solid_wall(m, j, north, wall);
    b.solid_wall(j, i, north, wall);
    let north_leaf = b.subsector(10, 4);

    b.solid_wall(r, q, west, wall);
    b.solid_wall(q, p, west, wall);
    b.solid_wall(p, o, west, wall);
    b.solid_wall(o, r, west, wall);
    let west_leaf = b.subsector(14, 4);

    let hub_box = BBox {
        top: 256.0,
        bottom: -256.0,
        left: -256.0,
        right: 256.0,
    };
    let west_box = BBox {
        top: 128.0,
        bottom: -128.0,
        left: -768.0,
        right: -256.0,
    };
    let split_west = b.node(
        Vec2::new(-256.0, 0.0),
        Vec2::new(0.0, 1.0),
        (hub_leaf, hub_box),
        (west_leaf, west_box),
    );

    let south_box = BBox {
        top: 256.0,
        bottom: -256.0,
        left: -768.0,
        right: 256.0,
    };
    let north_box = BBox {
        top: 768.0,
        bottom: 256.0,
        left: -128.0,
        right: 128.0,
    };
    let split_north = b.node(
        Vec2::new(0.0, 256.0),
        Vec2::new(1.0, 0.0),
        (split_west, south_box),
        (north_leaf, north_box),
    );

    let east_box = BBox {
        top: 128.0,
        bottom: -128.0,
        left: 256.0,
        right: 768.0,
    };
    let rest_box = BBox {
        top: 768.0,
        bottom: -256.0,
        left: -768.0,
        right: 256.0,
    };
    b.node(
        Vec2::new(256.0, 0.0),
        Vec2::new(0.0, 1.0),
        (east_leaf, east_box),
        (split_north, rest_box),
    );

    b.thing(64.0, 0.0, 0, kind);
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_scene_topology() {
        let scene = cross_scene();
        assert_eq!(scene.sectors.len(), 4);
        assert_eq!(scene.subsectors.len(), 4);
        assert_eq!(scene.nodes.len(), 3);
        assert_eq!(scene.segments.len(), 18);
        // The hub owns the one static thing.
        assert_eq!(scene.subsectors[0].first_thing, Some(0));
        assert_eq!(scene.things[0].sector, 0);
        // Both sides of the portal agree on their sectors.
        let front = &scene.segments[2];
        let back = &scene.segments[6];
        assert_eq!(front.front_sector, 0);
        assert_eq!(front.back_sector, Some(1));
        assert_eq!(back.front_sector, 1);
        assert_eq!(back.back_sector, Some(0));
    }

    #[test]
    fn find_sector_descends_to_the_right_leaf() {
        let scene = cross_scene();
        assert_eq!(scene.find_sector(Vec2::new(-128.0, 0.0)), 0);
        assert_eq!(scene.find_sector(Vec2::new(500.0, 0.0)), 1);
        assert_eq!(scene.find_sector(Vec2::new(0.0, 500.0)), 2);
        assert_eq!(scene.find_sector(Vec2::new(-500.0, 0.0)), 3);
    }

    #[test]
    fn seg_precomputes_direction_and_offset() {
        let scene = cross_scene();
        let portal = &scene.segments[2];
        // f(256,128) -> e(256,-128): due south, length 256.
        assert!((portal.delta - Vec2::new(0.0, -1.0)).length() < 1e-6);
        assert!((portal.inv_length - 1.0 / 256.0).abs() < 1e-9);
        assert_eq!(portal.offset, 0.0);
    }
}
