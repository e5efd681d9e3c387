use crate::models::Mask;
use imageproc::drawing::draw_filled_circle_mut;
use rand::{Rng, RngCore};

/// A circular region in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Circle {
    pub center_x: u32,
    pub center_y: u32,
    pub radius: u32,
}

/// Uniform integer in [low, high); collapses to `low` when the range is empty
fn uniform(rng: &mut dyn RngCore, low: u32, high: u32) -> u32 {
    if high <= low {
        low
    } else {
        rng.random_range(low..high)
    }
}

impl Circle {
    /// Random circle centered in the inner half of each axis, radius in [w/10, w/5)
    pub fn random(width: u32, height: u32, rng: &mut dyn RngCore) -> Self {
        let center_x = uniform(rng, width / 4, 3 * width / 4);
        let center_y = uniform(rng, height / 4, 3 * height / 4);
        let radius = uniform(rng, width / 10, width / 5);
        Self {
            center_x,
            center_y,
            radius,
        }
    }

    /// Rasterize into a mask of the given size
    pub fn to_mask(&self, width: u32, height: u32) -> Mask {
        let mut mask = Mask::empty(width, height);
        draw_filled_circle_mut(
            mask.as_gray_mut(),
            (self.center_x as i32, self.center_y as i32),
            self.radius as i32,
            Mask::SET,
        );
        mask
    }
}
