//! Semi-transparent middle textures on two-sided lines. They cannot be
//! drawn during the BSP walk because closer sprites may overlap them, so
//! each one becomes a pooled job that the masked pass resumes column by
//! column, interleaved with sprites by depth.

use glam::Vec2;
use scene::{Player, Scene, Segment, log};

use crate::Viewport;
use crate::bsp::SoftwareRenderer;
use crate::occlusion::Occlusion;
use crate::segs::EdgeProj;

/// Resumable rasterizer for one projected two-sided middle texture. Walks
/// its columns from the far end toward the near end so [`render_until`]
/// can stop at a sprite's depth and pick up again later.
///
/// [`render_until`]: FloaterRenderer::render_until
#[derive(Default)]
pub(crate) struct FloaterRenderer {
    pic: usize,
    left_dist: f32,
    right_dist: f32,
    segment_delta: Vec2,
    segment_offset: f32,
    segment_inv_length: f32,
    vertex: Vec2,
    player_xy: Vec2,
    player_height: f32,
    colormap_idx: i32,
    wall_base_height: f32,
    floor_height: f32,
    ceiling_height: f32,
    intersec_dist: f32,
    intersec_offset: f32,
    column: i32,
    column_upto: i32,
    column_step: i32,
    player_dist: f32,
    player_proj: f32,
    /// Depth of the near end; rendering never needs to resume below it.
    pub(crate) min_dist: i32,
}

impl FloaterRenderer {
    /// Point this job at a projected segment. False when the sidedef names
    /// a texture the scene does not carry.
    pub(crate) fn init(
        &mut self,
        scene: &Scene,
        player: &Player,
        seg: &Segment,
        proj: EdgeProj,
    ) -> bool {
        let sidedef = &scene.sidedefs[seg.front_sidedef];
        let Some(pic_idx) = sidedef.middle else {
            return false;
        };
        if scene.floaters.get(pic_idx).is_none() {
            log::warn!("two-sided middle texture {pic_idx} missing, skipping");
            return false;
        }
        self.pic = pic_idx;
        self.left_dist = proj.dist1;
        self.right_dist = proj.dist2;
        if self.left_dist > self.right_dist {
            self.min_dist = (self.right_dist - 1e-5).max(1.0) as i32;
            self.column = proj.col1 - 1;
            self.column_upto = proj.col2 - 1;
            self.column_step = 1;
        } else {
            self.min_dist = (self.left_dist - 1e-5).max(1.0) as i32;
            self.column = proj.col2;
            self.column_upto = proj.col1;
            self.column_step = -1;
        }
        self.segment_delta = seg.delta;
        self.segment_inv_length = seg.inv_length;
        self.segment_offset = seg.offset + sidedef.x_offset;
        self.vertex = scene.vertexes[seg.v1];
        self.player_xy = player.xy;
        self.player_height = player.height;

        let front = &scene.sectors[seg.front_sector];
        let back = &scene.sectors[seg.back_sector.unwrap_or(seg.front_sector)];
        self.colormap_idx = front.colormap;
        self.floor_height = front.floorheight.max(back.floorheight);
        self.ceiling_height = front.ceilingheight.min(back.ceilingheight);
        let pic = &scene.floaters[pic_idx];
        self.wall_base_height = if scene.linedefs[seg.linedef].lower_unpegged {
            self.floor_height
        } else {
            self.ceiling_height - pic.height as f32 + sidedef.y_offset
        };
        let pd = player.xy - self.vertex;
        self.player_dist = pd.x * seg.delta.y - pd.y * seg.delta.x;
        self.player_proj = pd.x * seg.delta.x + pd.y * seg.delta.y;
        self.intersec_dist = 0.0;
        self.intersec_offset = 0.0;
        true
    }

    /// Step one column and return the depth the view ray crosses the
    /// segment at, or 0 once the projected range is exhausted.
    pub(crate) fn advance(&mut self, view: &Viewport) -> f32 {
        if self.column == self.column_upto {
            self.intersec_dist = 0.0;
            return 0.0;
        }
        self.column += self.column_step;
        let cv = view.column_vectors[self.column as usize];
        let d = self.player_xy + cv - self.vertex;
        let col_dist = d.x * self.segment_delta.y - d.y * self.segment_delta.x;
        let col_proj = d.x * self.segment_delta.x + d.y * self.segment_delta.y;
        let ratio = (col_proj - self.player_proj) / (col_dist - self.player_dist);
        self.intersec_offset = col_proj - col_dist * ratio;
        self.intersec_dist = self.left_dist
            + (self.right_dist - self.left_dist) * self.intersec_offset * self.segment_inv_length;
        self.intersec_dist
    }

    /// Rasterize columns while they are at least `target` deep, clipping
    /// each against its depth window and the joined floor and ceiling.
    /// Returns the depth of the first unrendered column, 0 when done.
    pub(crate) fn render_until(
        &mut self,
        target: f32,
        view: &mut Viewport,
        occlusion: &mut Occlusion,
        scene: &Scene,
    ) -> f32 {
        let pic = &scene.floaters[self.pic];
        while self.intersec_dist >= target {
            let scale = view.proj_dist / self.intersec_dist;
            let canvas_bottom =
                view.horizon + (self.player_height - self.wall_base_height) * scale;
            let canvas_top = canvas_bottom - pic.height as f32 * scale;
            let mut floater_x = (self.segment_offset + self.intersec_offset) as i32 % pic.width;
            if floater_x < 0 {
                floater_x += pic.width;
            }
            let colormap = view.colormap(scene, self.colormap_idx, self.intersec_dist);
            let range = occlusion.pop_depth(self.column, self.intersec_dist);
            let range_beg = view.horizon + (self.player_height - self.ceiling_height) * scale;
            let range_end = view.horizon + (self.player_height - self.floor_height) * scale;
            let range_from =
                range_beg.ceil().clamp(range.from as f32, range.upto as f32) as i32;
            let range_upto =
                range_end.ceil().clamp(range_from as f32, range.upto as f32) as i32;
            let floater_to_canvas = (canvas_bottom - canvas_top) / pic.height as f32;
            let canvas_to_floater = 1.0 / floater_to_canvas;
            for post in pic.posts(floater_x) {
                let post_beg = post.from as f32 * floater_to_canvas + canvas_top;
                let post_end = post.upto as f32 * floater_to_canvas + canvas_top;
                let post_from =
                    post_beg.ceil().clamp(range_from as f32, range_upto as f32) as i32;
                let post_upto =
                    post_end.ceil().clamp(range_from as f32, range_upto as f32) as i32;
                if post_from >= post_upto {
                    continue;
                }
                let mut post_idx =
                    (post_from as f32 - canvas_top) * canvas_to_floater - post.from as f32;
                let mut idx = (post_from * view.viewport_width + self.column) as usize;
                let idx_upto = (post_upto * view.viewport_width) as usize;
                while idx < idx_upto {
                    let sample = (post_idx.max(0.0) as usize).min(post.pixels.len() - 1);
                    view.pixels[idx] = colormap[post.pixels[sample] as usize];
                    post_idx += canvas_to_floater;
                    idx += view.viewport_width as usize;
                }
            }
            self.advance(view);
        }
        self.intersec_dist
    }
}

impl SoftwareRenderer {
    /// Queue the middle texture of a projected two-sided segment for the
    /// masked pass. Advances to its first column immediately so the job
    /// enters the list with a real depth key.
    pub(crate) fn spawn_floater(
        &mut self,
        scene: &Scene,
        player: &Player,
        seg_idx: usize,
        proj: EdgeProj,
    ) {
        let mut job = self.floater_pool.pop().unwrap_or_default();
        if !job.init(scene, player, &scene.segments[seg_idx], proj) {
            self.floater_pool.push(job);
            return;
        }
        let dist = job.advance(&self.view);
        if dist <= 0.0 {
            self.floater_pool.push(job);
            return;
        }
        self.floaters_to_render.push((dist as i32, self.floater_jobs.len()));
        self.floater_jobs.push(job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene::cross_scene;

    fn fixture() -> (Scene, Player, Viewport, Occlusion) {
        let scene = cross_scene();
        let player = Player::new(Vec2::new(-128.0, 0.0), 0.0);
        let mut view = Viewport::new(320, 200, 0, 320);
        view.setup_frame(&scene, &player);
        let mut occlusion = Occlusion::new(320, 200);
        occlusion.clear();
        (scene, player, view, occlusion)
    }

    #[test]
    fn init_walks_from_the_far_end() {
        let (scene, player, view, _) = fixture();
        let seg = scene.segments[2];
        let proj = view.project_edges(&player, scene.vertexes[seg.v1], scene.vertexes[seg.v2]);
        let mut job = FloaterRenderer::default();
        assert!(job.init(&scene, &player, &seg, proj));
        // Head-on, both ends sit at the same depth; the walk starts at the
        // right edge and steps leftward.
        assert_eq!(job.column_step, -1);
        assert_eq!(job.column, proj.col2);
        assert_eq!(job.column_upto, proj.col1);
        assert_eq!(job.min_dist, (proj.dist1 - 1e-5) as i32);
    }

    #[test]
    fn advance_reports_depth_then_exhaustion() {
        let (scene, player, view, _) = fixture();
        let seg = scene.segments[2];
        let proj = view.project_edges(&player, scene.vertexes[seg.v1], scene.vertexes[seg.v2]);
        let mut job = FloaterRenderer::default();
        assert!(job.init(&scene, &player, &seg, proj));
        let mut columns = 0;
        while job.advance(&view) > 0.0 {
            // The portal is square to the view, so depth stays constant.
            assert!((job.intersec_dist - proj.dist1).abs() < 0.5);
            columns += 1;
        }
        assert_eq!(columns, proj.col2 - proj.col1);
    }

    #[test]
    fn render_until_fills_open_columns_and_stops_at_target() {
        let (scene, player, mut view, mut occlusion) = fixture();
        let seg = scene.segments[2];
        let proj = view.project_edges(&player, scene.vertexes[seg.v1], scene.vertexes[seg.v2]);
        let mut job = FloaterRenderer::default();
        assert!(job.init(&scene, &player, &seg, proj));
        assert!(job.advance(&view) > 0.0);
        // All columns lie deeper than 1, so one call drains the job.
        let rest = job.render_until(1.0, &mut view, &mut occlusion, &scene);
        assert_eq!(rest, 0.0);
        // The fence texture spans the whole portal opening.
        let row = 100;
        for column in proj.col1..proj.col2 {
            assert_eq!(
                view.pixels[(row * 320 + column) as usize],
                scene::pix::FLOATER,
                "column {column}"
            );
        }
        assert_eq!(view.pixels[(row * 320 + proj.col1 - 1) as usize], 0);
        assert_eq!(view.pixels[(row * 320 + proj.col2) as usize], 0);
    }
}
