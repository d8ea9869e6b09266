/// Wall texture stored column-major: byte `height * col + row`. Widths and
/// heights are powers of two so the rasterizer can wrap with a mask.
#[derive(Debug, Clone)]
pub struct WallPic {
    pub width: i32,
    pub height: i32,
    pub data: Vec<u8>,
}

/// 64x64 floor/ceiling tile, row-major.
#[derive(Debug, Clone)]
pub struct FlatPic {
    pub data: Vec<u8>,
}

impl FlatPic {
    pub const WIDTH: i32 = 64;
    pub const HEIGHT: i32 = 64;
}

/// One opaque vertical run within a picture column. `pixels` holds exactly
/// `upto - from` bytes.
#[derive(Debug, Clone)]
pub struct PicPost {
    pub from: i32,
    pub upto: i32,
    pub pixels: Vec<u8>,
}

/// Post-compressed picture with per-column transparency, used for sprites
/// and for the see-through middle textures of two-sided lines.
#[derive(Debug, Clone)]
pub struct Picture {
    pub width: i32,
    pub height: i32,
    /// Horizontal distance from the left edge to the anchor point.
    pub left_offset: i32,
    pub top_offset: i32,
    columns: Vec<Vec<PicPost>>,
}

impl Picture {
    pub fn new(width: i32, height: i32, left_offset: i32, top_offset: i32) -> Self {
        Self {
            width,
            height,
            left_offset,
            top_offset,
            columns: vec![Vec::new(); width.max(0) as usize],
        }
    }

    pub fn push_post(&mut self, column: i32, from: i32, pixels: Vec<u8>) {
        let upto = from + pixels.len() as i32;
        self.columns[column as usize].push(PicPost { from, upto, pixels });
    }

    pub fn posts(&self, column: i32) -> &[PicPost] {
        &self.columns[column as usize]
    }
}

/// Light attenuation tables. `maps[0]` is full brightness, higher indices
/// darker. `spectral` holds four 256-entry banks used for the ghost blend.
#[derive(Debug, Clone)]
pub struct Colormaps {
    pub maps: Vec<[u8; 256]>,
    pub spectral: Vec<u8>,
}

impl Colormaps {
    pub const COUNT: usize = 34;

    /// Tables for synthetic scenes: palette indices are treated as raw
    /// brightness, so map `i` just dims by `2 * i`. Map 0 is the identity.
    pub fn synthetic() -> Self {
        let mut maps = Vec::with_capacity(Self::COUNT);
        for i in 0..Self::COUNT {
            let mut map = [0u8; 256];
            for (c, out) in map.iter_mut().enumerate() {
                *out = (c as u8).saturating_sub(2 * i as u8);
            }
            maps.push(map);
        }
        let mut spectral = Vec::with_capacity(1024);
        for bank in 0..4 {
            spectral.extend_from_slice(&maps[4 * (bank + 1)]);
        }
        Self { maps, spectral }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_colormaps_shape() {
        let cm = Colormaps::synthetic();
        assert_eq!(cm.maps.len(), Colormaps::COUNT);
        assert_eq!(cm.spectral.len(), 1024);
        // Map 0 leaves pixels untouched.
        assert!(cm.maps[0].iter().enumerate().all(|(i, &v)| v == i as u8));
        // Spectral bank 1 comes from map 8.
        assert_eq!(cm.spectral[0x100 + 50], cm.maps[8][50]);
    }

    #[test]
    fn picture_posts_round_trip() {
        let mut pic = Picture::new(4, 16, 2, 0);
        pic.push_post(1, 3, vec![7, 8, 9]);
        pic.push_post(1, 10, vec![1]);
        assert!(pic.posts(0).is_empty());
        let posts = pic.posts(1);
        assert_eq!(posts.len(), 2);
        assert_eq!((posts[0].from, posts[0].upto), (3, 6));
        assert_eq!(posts[1].pixels, vec![1]);
    }
}
