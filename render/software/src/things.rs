//! Sprite projection and the masked pass. Things collected during the BSP
//! walk and the queued floater jobs are merged far-to-near at the end of
//! the frame, clipping every column against the depth windows the wall
//! pass recorded.

use scene::{Player, Scene};

use crate::bsp::SoftwareRenderer;

/// Projection of one thing, kept per renderer for reuse within a frame;
/// recomputed when `stamp` falls behind the scene frame counter.
#[derive(Clone, Copy)]
pub(crate) struct SpriteCache {
    pub stamp: u32,
    pub mirror: bool,
    pub transparent: bool,
    pub hanging: bool,
    pub dist: f32,
    pub pic: usize,
    pub canvas_left: f32,
    pub canvas_right: f32,
    pub scale: f32,
}

impl Default for SpriteCache {
    fn default() -> Self {
        Self {
            stamp: u32::MAX,
            mirror: false,
            transparent: false,
            hanging: false,
            dist: 0.0,
            pic: 0,
            canvas_left: 0.0,
            canvas_right: 0.0,
            scale: 0.0,
        }
    }
}

impl SoftwareRenderer {
    pub(crate) fn prepare_sprite_cache(&mut self, scene: &Scene) {
        if self.sprite_cache.len() != scene.things.len() {
            self.sprite_cache = vec![SpriteCache::default(); scene.things.len()];
        }
    }

    /// Project every thing on a BSP chain and queue the ones whose sprite
    /// touches this slice.
    pub(crate) fn append_things(
        &mut self,
        scene: &Scene,
        player: &Player,
        first: Option<u32>,
    ) {
        let mut next = first;
        while let Some(thing_idx) = next {
            let thing_idx = thing_idx as usize;
            let thing = &scene.things[thing_idx];
            next = thing.next_thing;
            let cache = if self.sprite_cache[thing_idx].stamp == scene.frame_count {
                self.sprite_cache[thing_idx]
            } else {
                let d = thing.xy - player.xy;
                let dist = d.dot(player.los);
                if dist < 1.0 {
                    continue;
                }
                let proj = d.x * player.los.y - d.y * player.los.x;
                let scale = self.view.proj_dist / dist;
                let kind = &scene.thing_kinds[thing.kind];
                let mut sprite_angle = 0usize;
                if kind.multiangle {
                    let mut angle = thing.angle - 22;
                    if angle < 0 {
                        angle += 360;
                    }
                    let rad = (angle as f32).to_radians();
                    let (thing_dy, thing_dx) = rad.sin_cos();
                    let p = player.xy - thing.xy;
                    let thing_proj = p.x * thing_dx + p.y * thing_dy;
                    let thing_dist = p.x * thing_dy - p.y * thing_dx;
                    let quar = thing_proj.abs() >= thing_dist.abs();
                    sprite_angle = if thing_proj >= 0.0 {
                        if quar { 0 } else { 1 }
                    } else if quar {
                        3
                    } else {
                        2
                    };
                    if thing_dist >= 0.0 {
                        sprite_angle = 7 - sprite_angle;
                    }
                }
                let frame_idx = ((scene.frame_count as usize + thing_idx) & 0x1f)
                    * kind.frames.len()
                    >> 5;
                let frame = kind.frames[frame_idx][sprite_angle];
                let sprite = &scene.sprites[frame.pic];
                let canvas_left =
                    (proj - sprite.left_offset as f32) * scale + self.view.midline;
                let canvas_right = canvas_left + sprite.width as f32 * scale;
                let cache = SpriteCache {
                    stamp: scene.frame_count,
                    mirror: frame.mirror,
                    transparent: kind.transparent,
                    hanging: kind.hanging,
                    dist,
                    pic: frame.pic,
                    canvas_left,
                    canvas_right,
                    scale,
                };
                self.sprite_cache[thing_idx] = cache;
                cache
            };
            let viewport_end = self.view.viewport_offset + self.view.viewport_width;
            if (self.view.viewport_offset as f32) < cache.canvas_right
                && cache.canvas_left <= (viewport_end - 1) as f32
            {
                self.things_to_render.push((cache.dist as i32, thing_idx));
            }
        }
    }

    fn draw_thing(&mut self, scene: &Scene, player: &Player, thing_idx: usize) {
        let cache = self.sprite_cache[thing_idx];
        let sprite = &scene.sprites[cache.pic];
        let sector = &scene.sectors[scene.things[thing_idx].sector];
        let world_bottom = if cache.hanging {
            sector.ceilingheight - sprite.height as f32
        } else {
            sector.floorheight
        };
        let world_top = world_bottom + sprite.height as f32;
        let canvas_top = self.view.horizon - (world_top - player.height) * cache.scale;
        let canvas_bottom = self.view.horizon - (world_bottom - player.height) * cache.scale;
        if canvas_bottom <= 0.0 || canvas_top > (self.view.canvas_height - 1) as f32 {
            return;
        }
        let sprite_top_row = canvas_top.ceil() as i32;

        let canvas_left = cache.canvas_left - self.view.viewport_offset as f32;
        let canvas_right = cache.canvas_right - self.view.viewport_offset as f32;
        let limit = self.view.viewport_width as f32;
        let column_from = canvas_left.ceil().clamp(0.0, limit) as i32;
        let column_upto = canvas_right.ceil().clamp(0.0, limit) as i32;

        let colormap: &[u8] = if cache.transparent {
            &scene.colormaps.spectral
        } else {
            self.view.colormap(scene, sector.colormap, cache.dist)
        };
        let col_canvas_to_sprite = sprite.width as f32 / (canvas_right - canvas_left);
        let row_sprite_to_canvas = (canvas_bottom - canvas_top) / sprite.height as f32;
        let row_canvas_to_sprite = 1.0 / row_sprite_to_canvas;
        for column in column_from..column_upto {
            let range = self.occlusion.pop_depth(column, cache.dist);
            if sprite_top_row >= range.upto {
                continue;
            }
            let mut sprite_col = ((column as f32 - canvas_left) * col_canvas_to_sprite) as i32;
            if cache.mirror {
                sprite_col = sprite.width - 1 - sprite_col;
            }
            for post in sprite.posts(sprite_col) {
                let post_beg = post.from as f32 * row_sprite_to_canvas + canvas_top;
                let post_end = post.upto as f32 * row_sprite_to_canvas + canvas_top;
                let post_from =
                    post_beg.ceil().clamp(range.from as f32, range.upto as f32) as i32;
                let post_upto =
                    post_end.ceil().clamp(range.from as f32, range.upto as f32) as i32;
                if post_from >= post_upto {
                    continue;
                }
                let mut post_idx =
                    (post_from as f32 - canvas_top) * row_canvas_to_sprite - post.from as f32;
                let mut idx = (post_from * self.view.viewport_width + column) as usize;
                let idx_upto = (post_upto * self.view.viewport_width) as usize;
                let stride = self.view.viewport_width as usize;
                if cache.transparent {
                    while idx < idx_upto {
                        let sample =
                            (post_idx.max(0.0) as usize).min(post.pixels.len() - 1);
                        let bank = ((post.pixels[sample] as u32 + scene.frame_count)
                            & 0b11000)
                            << 5;
                        let shaded = colormap
                            [(self.view.pixels[idx] as usize) | bank as usize];
                        self.view.pixels[idx] = shaded;
                        post_idx += row_canvas_to_sprite;
                        idx += stride;
                    }
                } else {
                    while idx < idx_upto {
                        let sample =
                            (post_idx.max(0.0) as usize).min(post.pixels.len() - 1);
                        self.view.pixels[idx] = colormap[post.pixels[sample] as usize];
                        post_idx += row_canvas_to_sprite;
                        idx += stride;
                    }
                }
            }
        }
    }

    /// Far-to-near merge of queued sprites and floater jobs. A sprite in
    /// front of the nearest unfinished floater draws whole; otherwise the
    /// floater renders down to the sprite's depth first, bounded by any
    /// deeper job whose columns it must not overtake.
    pub(crate) fn draw_masked(&mut self, scene: &Scene, player: &Player) {
        self.counts.things = self.things_to_render.len();
        self.floaters_to_render.sort_unstable();
        self.things_to_render.sort_unstable();
        loop {
            let (thing_dist, thing_idx) =
                self.things_to_render.last().copied().unwrap_or_default();
            let (floater_dist, floater_idx) =
                self.floaters_to_render.last().copied().unwrap_or_default();
            if thing_dist == 0 && floater_dist == 0 {
                break;
            }
            if thing_dist > floater_dist {
                self.things_to_render.pop();
                self.draw_thing(scene, player, thing_idx);
                continue;
            }
            let mut job = std::mem::take(&mut self.floater_jobs[floater_idx]);
            let mut target_dist = thing_dist.max(job.min_dist);
            let len = self.floaters_to_render.len();
            let mut idx = len as i32 - 2;
            while idx >= 0 {
                let (closer_dist, closer_idx) = self.floaters_to_render[idx as usize];
                if closer_dist <= target_dist {
                    break;
                }
                if closer_idx < floater_idx {
                    idx -= 1;
                    continue;
                }
                target_dist = closer_dist;
                break;
            }
            let new_dist = job.render_until(
                target_dist as f32,
                &mut self.view,
                &mut self.occlusion,
                scene,
            ) as i32;
            self.floater_jobs[floater_idx] = job;
            if new_dist > 1 {
                while idx >= 0 && self.floaters_to_render[idx as usize].0 > new_dist {
                    idx -= 1;
                }
                let slot = (idx + 1) as usize;
                self.floaters_to_render.pop();
                self.floaters_to_render.insert(slot, (new_dist, floater_idx));
            } else {
                self.floaters_to_render.pop();
            }
        }
        for job in self.floater_jobs.drain(..) {
            self.floater_pool.push(job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn projection_is_cached_per_frame() {
        let scene = scene::cross_scene();
        let player = Player::new(Vec2::new(-128.0, 0.0), 0.0);
        let mut renderer = SoftwareRenderer::new(320, 200, 0, 320);
        renderer.view.setup_frame(&scene, &player);
        renderer.prepare_sprite_cache(&scene);
        renderer.append_things(&scene, &player, Some(0));
        assert_eq!(renderer.things_to_render.len(), 1);
        assert_eq!(renderer.sprite_cache[0].stamp, scene.frame_count);
        let first = renderer.sprite_cache[0];
        // A second traversal of the same chain reuses the projection.
        renderer.append_things(&scene, &player, Some(0));
        assert_eq!(renderer.things_to_render.len(), 2);
        assert_eq!(renderer.sprite_cache[0].canvas_left, first.canvas_left);
    }

    #[test]
    fn things_behind_the_camera_are_skipped() {
        let scene = scene::cross_scene();
        // Looking west puts the thing at (64, 0) behind the camera.
        let player = Player::new(Vec2::new(-128.0, 0.0), 180.0);
        let mut renderer = SoftwareRenderer::new(320, 200, 0, 320);
        renderer.view.setup_frame(&scene, &player);
        renderer.prepare_sprite_cache(&scene);
        renderer.append_things(&scene, &player, Some(0));
        assert!(renderer.things_to_render.is_empty());
    }

    #[test]
    fn sprites_outside_the_slice_are_culled() {
        let scene = scene::cross_scene();
        let player = Player::new(Vec2::new(-128.0, 0.0), 0.0);
        // The thing projects dead centre; a slice on the far left never
        // sees it.
        let mut renderer = SoftwareRenderer::new(320, 200, 0, 40);
        renderer.view.setup_frame(&scene, &player);
        renderer.prepare_sprite_cache(&scene);
        renderer.append_things(&scene, &player, Some(0));
        assert!(renderer.things_to_render.is_empty());
    }
}
