use serde::Serialize;

use crate::detect::Detection;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Position of the selected target relative to the frame center.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Offset {
    /// Positive when the target sits right of center.
    pub dx: i32,
    /// Positive when the target sits below center. Unused by the single-axis decider.
    pub dy: i32,
    pub target_center: Point,
    pub frame_center: Point,
}

/// Offset of `target` from the center of a `frame_width` x `frame_height` frame.
///
/// Both centers use integer floor division, matching pixel-grid semantics.
pub fn compute_offset(target: &Detection, frame_width: u32, frame_height: u32) -> Offset {
    let bbox = target.bbox();
    let target_center = Point {
        x: bbox.x.saturating_add((bbox.width / 2) as i32),
        y: bbox.y.saturating_add((bbox.height / 2) as i32),
    };
    let frame_center = Point {
        x: (frame_width / 2) as i32,
        y: (frame_height / 2) as i32,
    };
    Offset {
        dx: target_center.x.saturating_sub(frame_center.x),
        dy: target_center.y.saturating_sub(frame_center.y),
        target_center,
        frame_center,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use proptest::prelude::*;

    fn person(x: i32, y: i32, w: u32, h: u32) -> Detection {
        Detection::new(BoundingBox::new(x, y, w, h), 15, 0.9).unwrap()
    }

    #[test]
    fn centered_box() {
        let offset = compute_offset(&person(270, 200, 100, 100), 640, 480);
        assert_eq!(offset.target_center, Point { x: 320, y: 250 });
        assert_eq!(offset.frame_center, Point { x: 320, y: 240 });
        assert_eq!(offset.dx, 0);
        assert_eq!(offset.dy, 10);
    }

    #[test]
    fn box_left_of_center() {
        let offset = compute_offset(&person(100, 200, 50, 50), 640, 480);
        assert_eq!(offset.target_center, Point { x: 125, y: 225 });
        assert_eq!(offset.dx, -195);
    }

    #[test]
    fn odd_extents_floor() {
        let offset = compute_offset(&person(0, 0, 5, 3), 7, 5);
        assert_eq!(offset.target_center, Point { x: 2, y: 1 });
        assert_eq!(offset.frame_center, Point { x: 3, y: 2 });
        assert_eq!(offset.dx, -1);
    }

    proptest! {
        #[test]
        fn shifting_the_box_shifts_dx(
            x in -2000i32..2000,
            y in -2000i32..2000,
            w in 0u32..2000,
            h in 0u32..2000,
            shift in -2000i32..2000,
            fw in 1u32..4000,
            fh in 1u32..4000,
        ) {
            let base = compute_offset(&person(x, y, w, h), fw, fh);
            let moved = compute_offset(&person(x + shift, y, w, h), fw, fh);
            prop_assert_eq!(moved.dx - base.dx, shift);
            prop_assert_eq!(moved.dy, base.dy);
        }

        #[test]
        fn shifting_box_with_frame_center_keeps_dx(
            x in 0i32..2000,
            w in 0u32..2000,
            fw in 1u32..2000,
            half_shift in 0u32..1000,
        ) {
            // Growing the frame by 2k moves its center by exactly k.
            let base = compute_offset(&person(x, 0, w, 10), fw, 100);
            let moved = compute_offset(
                &person(x + half_shift as i32, 0, w, 10),
                fw + 2 * half_shift,
                100,
            );
            prop_assert_eq!(moved.frame_center.x - base.frame_center.x, half_shift as i32);
            prop_assert_eq!(moved.dx, base.dx);
        }
    }
}
