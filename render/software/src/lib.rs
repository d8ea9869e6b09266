//! Software 2.5D renderer: a front-to-back BSP walk with per-column
//! occlusion, column-at-a-time wall rasterization, deferred flat filling
//! and depth-interleaved sprites.
//!
//! The canvas can be split into vertical slices, each owned by one
//! [`SoftwareRenderer`] with fully private mutable state so slices render
//! on their own threads and are composited afterwards.

use glam::Vec2;
use scene::{Player, Scene, log};

mod blocks;
mod bsp;
mod defs;
mod floaters;
mod occlusion;
mod planes;
mod segs;
mod things;

pub use bsp::SoftwareRenderer;
pub use defs::{ClipRange, DepthSpan, RenderCounts, RenderOptions};

/// Projection state and the slice-local framebuffer. Grouped apart from the
/// occlusion and worker state so the rasterizers can borrow it while the
/// traversal holds the rest of the renderer.
pub(crate) struct Viewport {
    pub canvas_width: i32,
    pub canvas_height: i32,
    pub viewport_offset: i32,
    pub viewport_width: i32,
    /// Palette-indexed pixels, `viewport_width * canvas_height`, row-major
    /// within the slice.
    pub pixels: Vec<u8>,
    pub options: RenderOptions,

    pub proj_dist: f32,
    pub inv_dist: f32,
    pub horizon: f32,
    pub midline: f32,
    pub inv_sky_width: f32,
    /// World-space ray direction of every slice column at the current
    /// camera orientation.
    pub column_vectors: Vec<Vec2>,
}

impl Viewport {
    fn new(canvas_width: i32, canvas_height: i32, viewport_offset: i32, viewport_width: i32) -> Self {
        Self {
            canvas_width,
            canvas_height,
            viewport_offset,
            viewport_width,
            pixels: vec![0; (viewport_width * canvas_height) as usize],
            options: RenderOptions::default(),
            proj_dist: 0.0,
            inv_dist: 0.0,
            horizon: canvas_height as f32 * 0.5 - 0.5,
            midline: canvas_width as f32 * 0.5 - 0.5,
            inv_sky_width: 0.0,
            column_vectors: vec![Vec2::ZERO; viewport_width as usize],
        }
    }

    /// Refresh everything derived from the camera and recompute the column
    /// ray fan for this slice.
    fn setup_frame(&mut self, scene: &Scene, player: &Player) {
        self.proj_dist = self.canvas_width as f32 / player.fov;
        self.inv_dist = player.fov / self.canvas_width as f32;
        self.horizon = self.canvas_height as f32 * (0.5 + player.vert_angle / player.fov) - 0.5;
        self.midline = self.canvas_width as f32 * 0.5 - 0.5;
        self.inv_sky_width = 256.0 / scene.sky.width as f32;
        for column in 0..self.viewport_width {
            let offset = ((column + self.viewport_offset) as f32 - self.midline) * self.inv_dist;
            self.column_vectors[column as usize] = Vec2::new(
                player.los.x + player.los.y * offset,
                player.los.y - player.los.x * offset,
            );
        }
    }

    /// Light table for a surface at `dist`. Close surfaces get pulled a few
    /// tables brighter; beyond 160 units the sector table is used as-is.
    pub(crate) fn colormap<'s>(&self, scene: &'s Scene, mut idx: i32, dist: f32) -> &'s [u8; 256] {
        if self.options.fullbright {
            return &scene.colormaps.maps[0];
        }
        idx += (((dist as i32) >> 4) - 10).min(0);
        &scene.colormaps.maps[idx.max(0) as usize]
    }
}

/// A full canvas divided into vertical slices rendered in parallel.
pub struct SliceSet {
    width: i32,
    height: i32,
    renderers: Vec<SoftwareRenderer>,
}

impl SliceSet {
    pub fn new(width: i32, height: i32, slices: usize) -> Self {
        let slices = slices.clamp(1, width.max(1) as usize) as i32;
        let mut renderers = Vec::with_capacity(slices as usize);
        let mut offset = 0;
        for slice in 0..slices {
            // Spread any remainder over the leading slices.
            let slice_width = width / slices + i32::from(slice < width % slices);
            log::debug!("slice {slice}: columns {offset}..{}", offset + slice_width);
            renderers.push(SoftwareRenderer::new(width, height, offset, slice_width));
            offset += slice_width;
        }
        Self {
            width,
            height,
            renderers,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn set_options(&mut self, options: RenderOptions) {
        for renderer in &mut self.renderers {
            renderer.set_options(options);
        }
    }

    /// Render every slice on its own thread, then composite them into
    /// `framebuffer` (palette-indexed, `width * height`, row-major).
    pub fn render(&mut self, scene: &Scene, player: &Player, framebuffer: &mut [u8]) {
        std::thread::scope(|scope| {
            for renderer in &mut self.renderers {
                scope.spawn(move || renderer.render_scene(scene, player));
            }
        });
        let width = self.width as usize;
        for renderer in &self.renderers {
            let offset = renderer.viewport_offset() as usize;
            let slice_width = renderer.viewport_width() as usize;
            for row in 0..self.height as usize {
                let dst = row * width + offset;
                let src = row * slice_width;
                framebuffer[dst..dst + slice_width]
                    .copy_from_slice(&renderer.pixels()[src..src + slice_width]);
            }
        }
    }

    /// Traversal counters summed over all slices.
    pub fn counts(&self) -> RenderCounts {
        let mut counts = RenderCounts::default();
        for renderer in &self.renderers {
            counts.accumulate(renderer.counts);
        }
        counts
    }
}
