// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner ordering: canonicalise four unordered points into
// [top-left, top-right, bottom-right, bottom-left].

use coverscan_core::{Point, Quad};

/// Order four points into a canonical quad.
///
/// The top-left corner has the smallest `x + y` and the bottom-right the
/// largest; the top-right has the largest `x - y` and the bottom-left the
/// smallest. This holds for convex, roughly axis-aligned outlines such as a
/// photographed book cover. It is not a general polygon-orientation solver:
/// a quad rotated close to 45 degrees can map two roles onto one point.
pub fn order_corners(points: [Point; 4]) -> Quad {
    let mut by_sum = points;
    by_sum.sort_by(|a, b| (a.x + a.y).total_cmp(&(b.x + b.y)));

    let mut by_diff = points;
    by_diff.sort_by(|a, b| (b.x - b.y).total_cmp(&(a.x - a.y)));

    Quad::from_ordered([by_sum[0], by_diff[0], by_sum[3], by_diff[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: [(f64, f64); 4]) -> [Point; 4] {
        raw.map(Point::from)
    }

    #[test]
    fn already_ordered_input_is_unchanged() {
        let quad = order_corners(pts([(10.0, 10.0), (500.0, 10.0), (500.0, 700.0), (10.0, 700.0)]));
        assert_eq!(quad.top_left(), Point::new(10.0, 10.0));
        assert_eq!(quad.top_right(), Point::new(500.0, 10.0));
        assert_eq!(quad.bottom_right(), Point::new(500.0, 700.0));
        assert_eq!(quad.bottom_left(), Point::new(10.0, 700.0));
    }

    #[test]
    fn shuffled_input_yields_same_order() {
        let canonical =
            order_corners(pts([(10.0, 10.0), (500.0, 10.0), (500.0, 700.0), (10.0, 700.0)]));
        let shuffled =
            order_corners(pts([(500.0, 700.0), (10.0, 10.0), (10.0, 700.0), (500.0, 10.0)]));
        assert_eq!(canonical, shuffled);
    }

    #[test]
    fn every_permutation_of_a_skewed_quad_is_stable() {
        // A perspective-distorted cover: narrower at the top.
        let corners = pts([(120.0, 40.0), (380.0, 55.0), (450.0, 610.0), (60.0, 590.0)]);
        let expected = order_corners(corners);

        let mut indices = [0usize, 1, 2, 3];
        for _ in 0..24 {
            let permuted = indices.map(|i| corners[i]);
            let quad = order_corners(permuted);
            assert_eq!(quad, expected);

            let tl = quad.top_left();
            let br = quad.bottom_right();
            let tr = quad.top_right();
            let bl = quad.bottom_left();
            assert!(tl.x + tl.y <= br.x + br.y);
            assert!(tr.x - tr.y >= bl.x - bl.y);

            next_permutation(&mut indices);
        }
    }

    /// Lexicographic next permutation; wraps to the first when exhausted.
    fn next_permutation(v: &mut [usize; 4]) {
        let Some(i) = (0..3).rev().find(|&i| v[i] < v[i + 1]) else {
            v.reverse();
            return;
        };
        let j = (i + 1..4).rev().find(|&j| v[j] > v[i]).unwrap_or(i + 1);
        v.swap(i, j);
        v[i + 1..].reverse();
    }

    #[test]
    fn nan_coordinate_does_not_depend_on_input_order() {
        let raw = pts([(10.0, 10.0), (f64::NAN, 12.0), (480.0, 690.0), (15.0, 700.0)]);
        let bits = |quad: Quad| quad.corners().map(|p| (p.x.to_bits(), p.y.to_bits()));

        let forward = bits(order_corners(raw));
        let mut reversed = raw;
        reversed.reverse();
        assert_eq!(bits(order_corners(reversed)), forward);
        assert_eq!(bits(order_corners([raw[2], raw[0], raw[3], raw[1]])), forward);
    }
}
