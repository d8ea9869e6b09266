//! Front-to-back BSP traversal with bounding-box rejection against both
//! the view frustum and the columns already finished on screen.

use glam::Vec2;
use scene::{BBox, Child, Player, Scene};

use crate::Viewport;
use crate::blocks::BlockJob;
use crate::defs::{RenderCounts, RenderOptions};
use crate::floaters::FloaterRenderer;
use crate::occlusion::Occlusion;
use crate::planes::FlatRenderer;
use crate::things::SpriteCache;

/// Renderer for one vertical slice of the canvas. All mutable state lives
/// here, so separate instances can run on separate threads over the same
/// scene.
pub struct SoftwareRenderer {
    pub(crate) view: Viewport,
    pub(crate) occlusion: Occlusion,
    pub(crate) floor: FlatRenderer,
    pub(crate) ceiling: FlatRenderer,
    pub(crate) block_pool: Vec<BlockJob>,
    pub(crate) floater_jobs: Vec<FloaterRenderer>,
    pub(crate) floater_pool: Vec<FloaterRenderer>,
    /// `(distance, index into floater_jobs)`, sorted ascending before the
    /// masked pass.
    pub(crate) floaters_to_render: Vec<(i32, usize)>,
    /// `(distance, thing index)`, sorted ascending before the masked pass.
    pub(crate) things_to_render: Vec<(i32, usize)>,
    pub(crate) sprite_cache: Vec<SpriteCache>,
    pub counts: RenderCounts,
}

impl SoftwareRenderer {
    pub fn new(
        canvas_width: i32,
        canvas_height: i32,
        viewport_offset: i32,
        viewport_width: i32,
    ) -> Self {
        Self {
            view: Viewport::new(canvas_width, canvas_height, viewport_offset, viewport_width),
            occlusion: Occlusion::new(viewport_width, canvas_height),
            floor: FlatRenderer::new(canvas_height, false),
            ceiling: FlatRenderer::new(canvas_height, true),
            block_pool: Vec::new(),
            floater_jobs: Vec::new(),
            floater_pool: Vec::new(),
            floaters_to_render: Vec::new(),
            things_to_render: Vec::new(),
            sprite_cache: Vec::new(),
            counts: RenderCounts::default(),
        }
    }

    pub fn viewport_offset(&self) -> i32 {
        self.view.viewport_offset
    }

    pub fn viewport_width(&self) -> i32 {
        self.view.viewport_width
    }

    pub fn pixels(&self) -> &[u8] {
        &self.view.pixels
    }

    pub fn set_options(&mut self, options: RenderOptions) {
        self.view.options = options;
    }

    pub fn options(&self) -> RenderOptions {
        self.view.options
    }

    /// Render one frame of `scene` into the slice framebuffer.
    pub fn render_scene(&mut self, scene: &Scene, player: &Player) {
        self.counts = RenderCounts::default();
        self.view.setup_frame(scene, player);
        self.occlusion.clear();
        self.things_to_render.clear();
        self.floaters_to_render.clear();
        self.prepare_sprite_cache(scene);
        self.render_node(scene, player, scene.root_node());
        self.floor
            .flush(&mut self.view, scene, player, &mut self.block_pool);
        self.ceiling
            .flush(&mut self.view, scene, player, &mut self.block_pool);
        self.draw_masked(scene, player);
    }

    fn render_node(&mut self, scene: &Scene, player: &Player, node_idx: usize) {
        self.counts.nodes += 1;
        let node = scene.nodes[node_idx];
        self.append_things(scene, player, node.first_thing);
        let side = node.point_on_side(player.xy);
        self.render_child_if_visible(scene, player, node.children[side], &node.bboxes[side]);
        let far = side ^ 1;
        self.render_child_if_visible(scene, player, node.children[far], &node.bboxes[far]);
    }

    fn render_child_if_visible(
        &mut self,
        scene: &Scene,
        player: &Player,
        child: Child,
        bbox: &BBox,
    ) {
        if !self.is_child_visible(player, bbox) {
            return;
        }
        if child.is_node {
            self.render_node(scene, player, child.idx as usize);
            return;
        }
        self.counts.nodes += 1;
        let sub = scene.subsectors[child.idx as usize];
        self.append_things(scene, player, sub.first_thing);
        for i in 0..sub.seg_count {
            let seg_idx = (sub.start_seg + i) as usize;
            let seg = &scene.segments[seg_idx];
            let start = scene.vertexes[seg.v1];
            let end = scene.vertexes[seg.v2];
            let proj = self.view.project_edges(player, start, end);
            if proj.col1 >= proj.col2 || self.occlusion.columns_full(proj.col1, proj.col2) {
                continue;
            }
            if seg.back_sector.is_none() {
                self.render_wall(scene, player, seg_idx, proj);
            } else {
                if scene.sidedefs[seg.front_sidedef].middle.is_some() {
                    self.spawn_floater(scene, player, seg_idx, proj);
                }
                self.render_portal(scene, player, seg_idx, proj);
            }
        }
    }

    /// Project the silhouette edge of a child bounding box and test it
    /// against the frustum and the columns-full mask. Eight corner pairs
    /// for the camera position in the box's 3x3 neighbourhood; inside the
    /// box is trivially visible.
    pub(crate) fn is_child_visible(&self, player: &Player, bbox: &BBox) -> bool {
        let edge_left: Vec2;
        let edge_right: Vec2;
        if player.xy.x > bbox.right {
            if player.xy.y > bbox.top {
                edge_left = Vec2::new(bbox.right, bbox.bottom);
                edge_right = Vec2::new(bbox.left, bbox.top);
            } else if player.xy.y < bbox.bottom {
                edge_left = Vec2::new(bbox.left, bbox.bottom);
                edge_right = Vec2::new(bbox.right, bbox.top);
            } else {
                edge_left = Vec2::new(bbox.right, bbox.bottom);
                edge_right = Vec2::new(bbox.right, bbox.top);
            }
        } else if player.xy.x < bbox.left {
            if player.xy.y > bbox.top {
                edge_left = Vec2::new(bbox.right, bbox.top);
                edge_right = Vec2::new(bbox.left, bbox.bottom);
            } else if player.xy.y < bbox.bottom {
                edge_left = Vec2::new(bbox.left, bbox.top);
                edge_right = Vec2::new(bbox.right, bbox.bottom);
            } else {
                edge_left = Vec2::new(bbox.left, bbox.top);
                edge_right = Vec2::new(bbox.left, bbox.bottom);
            }
        } else if player.xy.y > bbox.top {
            edge_left = Vec2::new(bbox.right, bbox.top);
            edge_right = Vec2::new(bbox.left, bbox.top);
        } else if player.xy.y < bbox.bottom {
            edge_left = Vec2::new(bbox.left, bbox.bottom);
            edge_right = Vec2::new(bbox.right, bbox.bottom);
        } else {
            return true;
        }
        let proj = self.view.project_edges(player, edge_left, edge_right);
        proj.col1 != proj.col2 && !self.occlusion.columns_full(proj.col1, proj.col2)
    }
}
