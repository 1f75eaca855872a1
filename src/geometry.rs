//! Angle primitives over 2D landmark vectors.

use crate::types::Point;

/// Angle between the lines carrying `v1` and `v2`, in degrees.
///
/// Lines have no direction, so the result is folded into `[0, 90]`:
/// antiparallel vectors give 0, not 180. A zero-length vector has no
/// direction and yields 0.
pub fn angle_between(v1: Point, v2: Point) -> f64 {
    let mag1 = v1.magnitude();
    let mag2 = v2.magnitude();

    if mag1 == 0.0 || mag2 == 0.0 {
        return 0.0;
    }

    // Rounding can push |cos| slightly past 1.
    let cosine = (v1.dot(&v2) / (mag1 * mag2)).clamp(-1.0, 1.0);
    let angle = cosine.acos().to_degrees();

    angle.min(180.0 - angle)
}
