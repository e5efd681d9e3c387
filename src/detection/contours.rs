use crate::models::Mask;
use imageproc::contours::{BorderType, find_contours};
use imageproc::point::Point;

/// Outer boundaries of every region in a mask
///
/// Hole borders are skipped, so a ring yields only its outside edge.
pub fn outer_contours(mask: &Mask) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(mask.as_gray())
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points)
        .filter(|points| !points.is_empty())
        .collect()
}
