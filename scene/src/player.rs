use crate::Scene;
use glam::Vec2;

pub const VIEW_HEIGHT: f32 = 41.0;

/// The camera. `los` is the unit line-of-sight vector kept in lockstep with
/// `angle`; `vert_angle` tilts the horizon without re-projecting columns.
#[derive(Debug, Clone, Copy)]
pub struct Player {
    pub xy: Vec2,
    pub height: f32,
    /// Yaw in degrees, counter-clockwise, 0 along +x.
    pub angle: f32,
    pub los: Vec2,
    pub vert_angle: f32,
    /// Horizontal field of view as a projection-plane ratio; 2.0 is 90
    /// degrees at square pixels.
    pub fov: f32,
}

impl Player {
    pub fn new(xy: Vec2, angle: f32) -> Self {
        let mut player = Self {
            xy,
            height: VIEW_HEIGHT,
            angle: 0.0,
            los: Vec2::X,
            vert_angle: 0.0,
            fov: 2.0,
        };
        player.set_angle(angle);
        player
    }

    pub fn set_angle(&mut self, degrees: f32) {
        self.angle = degrees;
        let rad = degrees.to_radians();
        self.los = Vec2::new(rad.cos(), rad.sin());
    }

    /// Snap the eye to standing height in whatever sector `xy` is in.
    pub fn update_height(&mut self, scene: &Scene) {
        let sector = &scene.sectors[scene.find_sector(self.xy)];
        self.height =
            (sector.floorheight + VIEW_HEIGHT).min(sector.ceilingheight - 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_updates_line_of_sight() {
        let mut p = Player::new(Vec2::ZERO, 0.0);
        assert!((p.los - Vec2::X).length() < 1e-6);
        p.set_angle(90.0);
        assert!(p.los.x.abs() < 1e-6);
        assert!((p.los.y - 1.0).abs() < 1e-6);
    }
}
