//! Deferred floor and ceiling filling. Wall rasterization hands over
//! vertical column spans; this module regroups them into horizontal rows,
//! drawing narrow fringes immediately and batching large interiors into
//! rectangles for [`BlockJob`](crate::blocks::BlockJob) to composite at the
//! end of the frame.

use scene::{FlatPic, Player, Scene, Sector};

use crate::Viewport;
use crate::blocks::BlockJob;

impl Viewport {
    /// Fill one horizontal run of a flat at constant depth. The texture
    /// tiles every 64 units of world space.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn draw_flat_row(
        &mut self,
        scene: &Scene,
        player: &Player,
        row: i32,
        from: i32,
        upto: i32,
        flat: &FlatPic,
        colormap_idx: i32,
        height: f32,
    ) {
        let dist = height / (row as f32 - self.horizon) * self.proj_dist;
        let cv = self.column_vectors[from as usize];
        let step_x = player.los.y * self.inv_dist * dist;
        let step_y = -player.los.x * self.inv_dist * dist;
        let mut flat_x = player.xy.x + cv.x * dist;
        let mut flat_y = player.xy.y + cv.y * dist;
        let row_start = (row * self.viewport_width) as usize;
        let colormap = self.colormap(scene, colormap_idx, dist);
        for col in from..upto {
            let idx = (((!(flat_y as i32)) & 0x3f) << 6) + (flat_x as i32 & 0x3f);
            flat_x += step_x;
            flat_y += step_y;
            self.pixels[row_start + col as usize] = colormap[flat.data[idx as usize] as usize];
        }
    }
}

/// Accumulates the column spans of one visible flat surface and converts
/// them to rows. Spans arrive left to right; while consecutive columns stay
/// within ten rows of each other they extend the current batch, otherwise
/// the batch is emitted. A batch's ragged top and bottom edges are drawn
/// row by row from `lines_from` bookkeeping; its rectangular core goes to a
/// [`BlockJob`] keyed by texture, height and light.
pub(crate) struct FlatRenderer {
    is_ceiling: bool,
    /// Per canvas row, the column where the still-open row run began.
    lines_from: Vec<i32>,
    pic: usize,
    has_pic: bool,
    height: f32,
    colormap_idx: i32,
    upper_from: i32,
    upper_upto: i32,
    lower_from: i32,
    lower_upto: i32,
    column_from: i32,
    column_upto: i32,
    /// Job in `jobs` that the current batch appends blocks to.
    current: Option<usize>,
    jobs: Vec<BlockJob>,
}

impl FlatRenderer {
    pub(crate) fn new(canvas_height: i32, is_ceiling: bool) -> Self {
        Self {
            is_ceiling,
            lines_from: vec![0; canvas_height as usize],
            pic: 0,
            has_pic: false,
            height: 0.0,
            colormap_idx: 0,
            upper_from: 0,
            upper_upto: 0,
            lower_from: 0,
            lower_upto: 0,
            column_from: 0,
            column_upto: 0,
            current: None,
            jobs: Vec::new(),
        }
    }

    /// Switch to `sector`'s surface, closing the open batch if the texture,
    /// view-relative height or light differ from the previous surface.
    pub(crate) fn init(
        &mut self,
        view: &mut Viewport,
        scene: &Scene,
        player: &Player,
        pool: &mut Vec<BlockJob>,
        sector: &Sector,
    ) {
        let surface = if self.is_ceiling {
            sector.ceilingheight
        } else {
            sector.floorheight
        };
        let new_height = player.height - surface;
        let new_pic = if self.is_ceiling {
            sector.ceilingpic
        } else {
            sector.floorpic
        };
        if self.has_pic
            && self.pic == new_pic
            && self.height == new_height
            && self.colormap_idx == sector.colormap
        {
            return;
        }
        self.add_column(view, scene, player, pool, 0, 0, 0);
        self.pic = new_pic;
        self.has_pic = true;
        self.height = new_height;
        self.colormap_idx = sector.colormap;
        self.current = None;
    }

    /// Close the open batch and composite every pending rectangle job.
    pub(crate) fn flush(
        &mut self,
        view: &mut Viewport,
        scene: &Scene,
        player: &Player,
        pool: &mut Vec<BlockJob>,
    ) {
        self.add_column(view, scene, player, pool, 0, 0, 0);
        for mut job in self.jobs.drain(..) {
            job.render_all(view, scene, player);
            pool.push(job);
        }
        self.current = None;
    }

    fn draw_edge_rows(&self, view: &mut Viewport, scene: &Scene, player: &Player, from: i32, upto: i32) {
        let flat = &scene.flats[self.pic];
        for row in from..upto {
            view.draw_flat_row(
                scene,
                player,
                row,
                self.lines_from[row as usize],
                self.column_upto,
                flat,
                self.colormap_idx,
                self.height,
            );
        }
    }

    fn draw_core_rows(&self, view: &mut Viewport, scene: &Scene, player: &Player, from: i32, upto: i32) {
        let flat = &scene.flats[self.pic];
        for row in from..upto {
            view.draw_flat_row(
                scene,
                player,
                row,
                self.column_from,
                self.column_upto,
                flat,
                self.colormap_idx,
                self.height,
            );
        }
    }

    fn batch_job(&mut self, pool: &mut Vec<BlockJob>) -> usize {
        if let Some(idx) = self.current {
            return idx;
        }
        let idx = self
            .jobs
            .iter()
            .position(|j| j.matches(self.pic, self.height, self.colormap_idx))
            .unwrap_or_else(|| {
                let mut job = pool.pop().unwrap_or_default();
                job.init(self.pic, self.height, self.colormap_idx);
                self.jobs.push(job);
                self.jobs.len() - 1
            });
        self.current = Some(idx);
        idx
    }

    /// Feed one column span `from..upto` at `column`. A degenerate span or
    /// any jump larger than the merge window closes the current batch.
    pub(crate) fn add_column(
        &mut self,
        view: &mut Viewport,
        scene: &Scene,
        player: &Player,
        pool: &mut Vec<BlockJob>,
        column: i32,
        from: i32,
        upto: i32,
    ) {
        if column != self.column_upto
            || from == upto
            || self.lower_upto <= from
            || upto <= self.upper_from
            || upto >= self.lower_upto + 10
            || from <= self.upper_from - 10
            || upto <= self.lower_from - 10
            || from >= self.upper_upto + 10
        {
            self.draw_edge_rows(view, scene, player, self.upper_from, self.upper_upto);
            if view.options.no_batch || self.lower_from - self.upper_upto <= 10 {
                self.draw_core_rows(view, scene, player, self.upper_upto, self.lower_from);
            } else {
                let (top, bottom) = (self.upper_upto, self.lower_from);
                let (left, right) = (self.column_from, self.column_upto);
                let job = self.batch_job(pool);
                self.jobs[job].add_block(top, bottom, left, right);
            }
            self.draw_edge_rows(view, scene, player, self.lower_from, self.lower_upto);
            self.column_from = column;
            self.column_upto = column + 1;
            self.upper_from = from;
            self.upper_upto = from;
            self.lower_from = upto;
            self.lower_upto = upto;
            return;
        }
        if from <= self.upper_from {
            for row in from..self.upper_from {
                self.lines_from[row as usize] = column;
            }
            self.upper_from = from;
        } else if from <= self.upper_upto {
            self.draw_edge_rows(view, scene, player, self.upper_from, from);
            self.upper_from = from;
        } else if from <= self.lower_from {
            self.draw_edge_rows(view, scene, player, self.upper_from, self.upper_upto);
            self.draw_core_rows(view, scene, player, self.upper_upto, from);
            self.upper_from = from;
            self.upper_upto = from;
        } else {
            self.draw_edge_rows(view, scene, player, self.upper_from, self.upper_upto);
            self.draw_core_rows(view, scene, player, self.upper_upto, self.lower_from);
            self.draw_edge_rows(view, scene, player, self.lower_from, from);
            self.upper_from = from;
            self.upper_upto = from;
            self.lower_from = from;
        }
        if upto >= self.lower_upto {
            for row in self.lower_upto..upto {
                self.lines_from[row as usize] = column;
            }
            self.lower_upto = upto;
        } else if upto >= self.lower_from {
            self.draw_edge_rows(view, scene, player, upto, self.lower_upto);
            self.lower_upto = upto;
        } else if upto >= self.upper_upto {
            self.draw_core_rows(view, scene, player, upto, self.lower_from);
            self.draw_edge_rows(view, scene, player, self.lower_from, self.lower_upto);
            self.lower_from = upto;
            self.lower_upto = upto;
        } else {
            self.draw_edge_rows(view, scene, player, upto, self.upper_upto);
            self.draw_core_rows(view, scene, player, self.upper_upto, self.lower_from);
            self.draw_edge_rows(view, scene, player, self.lower_from, self.lower_upto);
            self.lower_from = upto;
            self.lower_upto = upto;
            self.upper_upto = upto;
        }
        self.column_upto = column + 1;
    }
}
