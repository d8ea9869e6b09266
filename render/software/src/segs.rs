//! Segment projection and per-column wall rasterization. Distances are
//! measured along the line of sight, so a column's intersection with a
//! segment comes out of one hyperbolic interpolation instead of a ray cast.

use glam::Vec2;
use scene::{Player, Scene, Segment, WallPic};

use crate::Viewport;
use crate::bsp::SoftwareRenderer;
use crate::occlusion::Occlusion;

/// Projected endpoints of a line segment: clamped slice columns plus the
/// view-space distance of each vertex. An endpoint behind the camera keeps
/// a real distance but projects to an infinite column, which the clamp
/// folds onto the slice edge.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct EdgeProj {
    pub col1: i32,
    pub col2: i32,
    pub dist1: f32,
    pub dist2: f32,
}

impl Viewport {
    pub(crate) fn project_edges(&self, player: &Player, v1: Vec2, v2: Vec2) -> EdgeProj {
        let d1 = v1 - player.xy;
        let d2 = v2 - player.xy;
        let dist1 = d1.dot(player.los);
        let dist2 = d2.dot(player.los);
        if dist1 <= 0.0 && dist2 <= 0.0 {
            return EdgeProj::default();
        }
        let proj1 = if dist1 <= 0.0 {
            let side = (player.xy.x - v1.x) * (v2.y - v1.y) - (player.xy.y - v1.y) * (v2.x - v1.x);
            if side == 0.0 {
                return EdgeProj::default();
            }
            if side > 0.0 { f32::NEG_INFINITY } else { f32::INFINITY }
        } else {
            (d1.x * player.los.y - d1.y * player.los.x) * self.proj_dist / dist1
        };
        let proj2 = if dist2 <= 0.0 {
            let side = (player.xy.x - v2.x) * (v1.y - v2.y) - (player.xy.y - v2.y) * (v1.x - v2.x);
            if side == 0.0 {
                return EdgeProj::default();
            }
            if side > 0.0 { f32::NEG_INFINITY } else { f32::INFINITY }
        } else {
            (d2.x * player.los.y - d2.y * player.los.x) * self.proj_dist / dist2
        };
        let limit = self.viewport_width as f32;
        let offset = self.viewport_offset as f32;
        EdgeProj {
            col1: (proj1 - offset + self.midline).ceil().clamp(0.0, limit) as i32,
            col2: (proj2 - offset + self.midline).ceil().clamp(0.0, limit) as i32,
            dist1,
            dist2,
        }
    }

    /// Draw one wall column. `tex_world_top` is the world height the top
    /// texture row hangs from; rows wrap at 128.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn draw_wall_column(
        &mut self,
        column: i32,
        from: i32,
        upto: i32,
        tex: &WallPic,
        colormap: &[u8; 256],
        dist: f32,
        tex_world_top: f32,
        tex_x: f32,
        player_height: f32,
    ) {
        let mut tex_col = (tex_x as i32) % tex.width;
        if tex_col < 0 {
            tex_col += tex.width;
        }
        let tex_world_step = dist * self.inv_dist;
        let mut tex_world_row = (self.horizon - from as f32) * tex_world_step + player_height;
        let col_start = (tex.height * tex_col) as usize;
        let stride = self.viewport_width as usize;
        let mut idx = (from * self.viewport_width + column) as usize;
        let idx_upto = (upto * self.viewport_width) as usize;
        while idx < idx_upto {
            let tex_row = ((tex_world_top - tex_world_row) as i32) & 0x7f;
            tex_world_row -= tex_world_step;
            self.pixels[idx] = colormap[tex.data[col_start + tex_row as usize] as usize];
            idx += stride;
        }
    }

    /// Sky columns anchor horizontally to the yaw and vertically to a
    /// fixed band above the horizon; rows past the band bottom wrap.
    pub(crate) fn draw_sky_column(
        &mut self,
        scene: &Scene,
        player: &Player,
        column: i32,
        from: i32,
        upto: i32,
    ) {
        let sky = &scene.sky;
        let mut offset = -player.angle * (1.0 / 90.0)
            + 0.5
            + ((column + self.viewport_offset) as f32 - self.midline) * self.inv_dist * 0.5;
        offset *= self.inv_sky_width;
        let sky_column = ((offset - offset.floor()) * sky.width as f32) as i32;
        let col_start = (sky_column * sky.height) as usize;
        let sky_from = (self.horizon - self.canvas_height as f32 / player.fov).ceil() as i32;
        let sky_from_clamped = sky_from.clamp(from, upto);
        let stride = self.viewport_width as usize;
        let mut idx = (from * self.viewport_width + column) as usize;
        for _row in from..sky_from_clamped {
            self.pixels[idx] = sky.data[col_start];
            idx += stride;
        }
        let sky_step = 100.0 / self.canvas_height as f32 * player.fov;
        for row in sky_from_clamped..upto {
            let sky_idx = (((row - sky_from) as f32 * sky_step) as i32 & 0x7f) as usize;
            self.pixels[idx] = sky.data[col_start + sky_idx];
            idx += stride;
        }
    }
}

/// Walks the open columns of a projected segment, yielding for each the
/// offset along the segment where that column's view ray intersects it.
pub(crate) struct SegProjection {
    start: Vec2,
    delta: Vec2,
    player_xy: Vec2,
    col: i32,
    upto: i32,
    player_dist: f32,
    player_proj: f32,
}

impl SegProjection {
    pub(crate) fn new(seg: &Segment, start: Vec2, player: &Player, from: i32, upto: i32) -> Self {
        let pd = player.xy - start;
        Self {
            start,
            delta: seg.delta,
            player_xy: player.xy,
            col: from - 1,
            upto,
            player_dist: pd.x * seg.delta.y - pd.y * seg.delta.x,
            player_proj: pd.x * seg.delta.x + pd.y * seg.delta.y,
        }
    }

    /// Advance to the next column that is still open, or `None` when the
    /// projected range is exhausted.
    pub(crate) fn next(&mut self, occlusion: &Occlusion, column_vectors: &[Vec2]) -> Option<(i32, f32)> {
        loop {
            self.col += 1;
            if self.col >= self.upto {
                return None;
            }
            if !occlusion.is_column_full(self.col) {
                break;
            }
        }
        let cv = column_vectors[self.col as usize];
        let d = self.player_xy - self.start + cv;
        let col_dist = d.x * self.delta.y - d.y * self.delta.x;
        let col_proj = d.x * self.delta.x + d.y * self.delta.y;
        let ratio = (col_proj - self.player_proj) / (col_dist - self.player_dist);
        Some((self.col, col_proj - col_dist * ratio))
    }
}

impl SoftwareRenderer {
    /// One-sided wall: ceiling remainder, wall body, floor remainder, then
    /// the whole column range is closed for good.
    pub(crate) fn render_wall(
        &mut self,
        scene: &Scene,
        player: &Player,
        seg_idx: usize,
        proj: EdgeProj,
    ) {
        self.counts.segments += 1;
        let seg = scene.segments[seg_idx];
        let sidedef = scene.sidedefs[seg.front_sidedef];
        let sector = scene.sectors[seg.front_sector];
        let wall_tex = sidedef.middle.and_then(|idx| scene.walls.get(idx));
        let tex_world_top = match wall_tex {
            Some(tex) if scene.linedefs[seg.linedef].lower_unpegged => {
                sector.floorheight + tex.height as f32 + sidedef.y_offset
            }
            Some(_) => sector.ceilingheight + sidedef.y_offset,
            None => 0.0,
        };
        self.floor
            .init(&mut self.view, scene, player, &mut self.block_pool, &sector);
        self.ceiling
            .init(&mut self.view, scene, player, &mut self.block_pool, &sector);
        let start = scene.vertexes[seg.v1];
        let mut sp = SegProjection::new(&seg, start, player, proj.col1, proj.col2);
        while let Some((column, inter)) = sp.next(&self.occlusion, &self.view.column_vectors) {
            let dist = proj.dist1 + (proj.dist2 - proj.dist1) * inter * seg.inv_length;
            let scale = self.view.proj_dist / dist;
            let range = self.occlusion.open_range(column);
            let wall_beg = self.view.horizon - scale * (sector.ceilingheight - player.height);
            let wall_end = self.view.horizon - scale * (sector.floorheight - player.height);
            let wall_from = wall_beg.ceil().clamp(range.from as f32, range.upto as f32) as i32;
            let wall_upto = wall_end.ceil().clamp(range.from as f32, range.upto as f32) as i32;
            if range.from < wall_from {
                if sector.ceilingpic == scene.sky_pic {
                    self.view
                        .draw_sky_column(scene, player, column, range.from, wall_upto);
                } else {
                    self.ceiling.add_column(
                        &mut self.view,
                        scene,
                        player,
                        &mut self.block_pool,
                        column,
                        range.from,
                        wall_from,
                    );
                }
            }
            if wall_upto < range.upto {
                if sector.floorpic == scene.sky_pic {
                    self.view
                        .draw_sky_column(scene, player, column, wall_upto, range.upto);
                } else {
                    self.floor.add_column(
                        &mut self.view,
                        scene,
                        player,
                        &mut self.block_pool,
                        column,
                        wall_upto,
                        range.upto,
                    );
                }
            }
            if wall_from < wall_upto {
                if let Some(tex) = wall_tex {
                    let colormap = self.view.colormap(scene, sector.colormap, dist);
                    let tex_x = seg.offset + inter + sidedef.x_offset;
                    self.view.draw_wall_column(
                        column,
                        wall_from,
                        wall_upto,
                        tex,
                        colormap,
                        dist,
                        tex_world_top,
                        tex_x,
                        player.height,
                    );
                }
            }
            self.occlusion
                .push_depth(column, 0, 0, dist, true, true);
        }
        self.occlusion.mark_columns(proj.col1, proj.col2);
    }

    /// Two-sided line: up to four vertical regions per column, narrowing
    /// the open window as they go. The window that survives becomes a
    /// depth-stack entry so later sprites clip against this portal.
    pub(crate) fn render_portal(
        &mut self,
        scene: &Scene,
        player: &Player,
        seg_idx: usize,
        proj: EdgeProj,
    ) {
        let seg = scene.segments[seg_idx];
        let Some(back_idx) = seg.back_sector else {
            return;
        };
        let sidedef = scene.sidedefs[seg.front_sidedef];
        let linedef = scene.linedefs[seg.linedef];
        let front = scene.sectors[seg.front_sector];
        let back = scene.sectors[back_idx];

        let back_closed = back.ceilingheight == back.floorheight;
        let diff_ceilings = front.ceilingheight != back.ceilingheight
            || front.colormap != back.colormap
            || front.ceilingpic != back.ceilingpic
            || back_closed;
        let diff_floors = front.floorheight != back.floorheight
            || front.colormap != back.colormap
            || front.floorpic != back.floorpic
            || back_closed;
        // A sky ceiling meeting a sky ceiling has no visible upper edge.
        let upper_wall_real =
            front.ceilingpic != scene.sky_pic || back.ceilingpic != scene.sky_pic;
        let ceiling_visible =
            front.ceilingheight > player.height && diff_ceilings && upper_wall_real;
        let mut upper_visible = front.ceilingheight > back.ceilingheight && upper_wall_real;
        let mut lower_visible = front.floorheight < back.floorheight;
        let floor_visible = front.floorheight < player.height && diff_floors;
        if !(upper_visible || ceiling_visible || lower_visible || floor_visible) {
            return;
        }
        self.counts.segments += 1;

        let mut upper_tex = None;
        let mut upper_top = 0.0;
        if upper_visible {
            upper_tex = sidedef.upper.and_then(|idx| scene.walls.get(idx));
            upper_visible = upper_tex.is_some();
            if let Some(tex) = upper_tex {
                upper_top = if linedef.upper_unpegged {
                    front.ceilingheight + sidedef.y_offset
                } else {
                    back.ceilingheight + tex.height as f32 + sidedef.y_offset
                };
            }
        }
        let mut lower_tex = None;
        let mut lower_top = 0.0;
        if lower_visible {
            lower_tex = sidedef.lower.and_then(|idx| scene.walls.get(idx));
            lower_visible = lower_tex.is_some();
            if lower_tex.is_some() {
                lower_top = if linedef.lower_unpegged {
                    front.ceilingheight + sidedef.y_offset
                } else {
                    back.floorheight + sidedef.y_offset
                };
            }
        }
        if ceiling_visible && front.ceilingpic != scene.sky_pic {
            self.ceiling
                .init(&mut self.view, scene, player, &mut self.block_pool, &front);
        }
        if floor_visible && front.floorpic != scene.sky_pic {
            self.floor
                .init(&mut self.view, scene, player, &mut self.block_pool, &front);
        }
        let upper_clip = upper_wall_real
            && (back.ceilingheight < player.height || back.ceilingheight > front.ceilingheight);
        let lower_clip =
            back.floorheight > player.height || back.floorheight < front.floorheight;
        let add_window = upper_clip || lower_clip;

        let start = scene.vertexes[seg.v1];
        let mut sp = SegProjection::new(&seg, start, player, proj.col1, proj.col2);
        while let Some((column, inter)) = sp.next(&self.occlusion, &self.view.column_vectors) {
            let dist = proj.dist1 + (proj.dist2 - proj.dist1) * inter * seg.inv_length;
            let scale = self.view.proj_dist / dist;
            let colormap = self.view.colormap(scene, front.colormap, dist);
            let mut range = self.occlusion.open_range(column);
            if ceiling_visible {
                let ceiling_end =
                    self.view.horizon - scale * (front.ceilingheight - player.height);
                let ceiling_upto =
                    ceiling_end.ceil().clamp(range.from as f32, range.upto as f32) as i32;
                if range.from < ceiling_upto {
                    if front.ceilingpic == scene.sky_pic {
                        self.view
                            .draw_sky_column(scene, player, column, range.from, ceiling_upto);
                    } else {
                        self.ceiling.add_column(
                            &mut self.view,
                            scene,
                            player,
                            &mut self.block_pool,
                            column,
                            range.from,
                            ceiling_upto,
                        );
                    }
                    range.from = ceiling_upto;
                }
            }
            if floor_visible {
                let floor_beg = self.view.horizon - scale * (front.floorheight - player.height);
                let floor_from =
                    floor_beg.ceil().clamp(range.from as f32, range.upto as f32) as i32;
                if floor_from < range.upto {
                    if front.floorpic == scene.sky_pic {
                        self.view
                            .draw_sky_column(scene, player, column, floor_from, range.upto);
                    } else {
                        self.floor.add_column(
                            &mut self.view,
                            scene,
                            player,
                            &mut self.block_pool,
                            column,
                            floor_from,
                            range.upto,
                        );
                    }
                    range.upto = floor_from;
                }
            }
            if upper_visible {
                if let Some(tex) = upper_tex {
                    let wall_end =
                        self.view.horizon - scale * (back.ceilingheight - player.height);
                    let wall_upto =
                        wall_end.ceil().clamp(range.from as f32, range.upto as f32) as i32;
                    if range.from < wall_upto {
                        let tex_x = seg.offset + inter + sidedef.x_offset;
                        self.view.draw_wall_column(
                            column,
                            range.from,
                            wall_upto,
                            tex,
                            colormap,
                            dist,
                            upper_top,
                            tex_x,
                            player.height,
                        );
                        range.from = wall_upto;
                    }
                }
            }
            if lower_visible {
                if let Some(tex) = lower_tex {
                    let wall_beg = self.view.horizon - scale * (back.floorheight - player.height);
                    let wall_from =
                        wall_beg.ceil().clamp(range.from as f32, range.upto as f32) as i32;
                    if wall_from < range.upto {
                        let tex_x = seg.offset + inter + sidedef.x_offset;
                        self.view.draw_wall_column(
                            column,
                            wall_from,
                            range.upto,
                            tex,
                            colormap,
                            dist,
                            lower_top,
                            tex_x,
                            player.height,
                        );
                        range.upto = wall_from;
                    }
                }
            }
            if range.from == range.upto {
                self.occlusion.mark_column(column);
            } else {
                self.occlusion.set_open_range(column, range);
            }
            if add_window {
                self.occlusion
                    .push_depth(column, range.from, range.upto, dist, upper_clip, lower_clip);
            }
        }
    }
}
