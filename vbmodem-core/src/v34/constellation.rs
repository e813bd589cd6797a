//! Signal-point constellation (spec §4.8.2): the quadrant-1 base set
//! ordered by ascending energy, its clockwise-rotated quadrants, and the
//! inverse lookup the decoder quantizes received samples against.

const C_MIN: i32 = -11;
const C_MAX: i32 = 11;

/// A single 2D signal point, odd-integer coordinates `(4x+1, 4y+1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Full constellation for a given size `l` (a multiple of 4): `l/4`
/// quadrant-1 points plus their three rotations, and the inverse map from
/// coordinate to `(point_index | quadrant << 14)`.
#[derive(Debug, Clone)]
pub struct Constellation {
    pub points: Vec<Point>,
    /// indexed by `(point_index, quadrant)` -> signal point
    pub by_index_quadrant: Vec<[Point; 4]>,
    inverse: std::collections::HashMap<(i32, i32), u32>,
}

impl Constellation {
    pub fn new(l: u32) -> Self {
        assert!(l % 4 == 0, "constellation size must be a multiple of 4");
        let quadrant1_count = (l / 4) as usize;

        let mut candidates = Vec::new();
        for x in C_MIN..=C_MAX {
            for y in C_MIN..=C_MAX {
                candidates.push(Point { x, y });
            }
        }
        candidates.sort_by(|a, b| {
            let ea = a.x * a.x + a.y * a.y;
            let eb = b.x * b.x + b.y * b.y;
            ea.cmp(&eb).then(b.y.cmp(&a.y))
        });
        let points: Vec<Point> = candidates.into_iter().take(quadrant1_count).collect();

        let mut by_index_quadrant = Vec::with_capacity(points.len());
        let mut inverse = std::collections::HashMap::new();
        for (idx, p) in points.iter().enumerate() {
            let rotated = [
                *p,
                Point { x: -p.y, y: p.x },
                Point { x: -p.x, y: -p.y },
                Point { x: p.y, y: -p.x },
            ];
            for (q, rp) in rotated.iter().enumerate() {
                inverse.insert((rp.x, rp.y), idx as u32 | ((q as u32) << 14));
            }
            by_index_quadrant.push(rotated);
        }

        Self {
            points,
            by_index_quadrant,
            inverse,
        }
    }

    /// Signal point for `index` rotated clockwise by quadrant `z` (0..4).
    pub fn point(&self, index: u32, z: u32) -> Point {
        self.by_index_quadrant[index as usize][(z & 3) as usize]
    }

    /// `(point_index | quadrant << 14)` for the point at raw coordinates
    /// `(x_c, y_c)`, or `None` if outside the constellation.
    pub fn code_for(&self, x_c: i32, y_c: i32) -> Option<u32> {
        self.inverse.get(&(x_c, y_c)).copied()
    }
}

/// Clockwise rotation by quadrant `z`: `0:(x,y) 1:(-y,x) 2:(-x,-y)
/// 3:(y,-x)`.
pub fn rotate(x: i32, y: i32, z: u32) -> (i32, i32) {
    match z & 3 {
        0 => (x, y),
        1 => (-y, x),
        2 => (-x, -y),
        _ => (y, -x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constellation_sorted_by_energy() {
        let c = Constellation::new(16);
        let mut last = 0;
        for p in &c.points {
            let e = p.x * p.x + p.y * p.y;
            assert!(e >= last);
            last = e;
        }
    }

    #[test]
    fn first_point_is_closest_to_origin() {
        let c = Constellation::new(16);
        assert_eq!(c.points[0], Point { x: 1, y: 1 });
    }

    #[test]
    fn rotation_round_trips_through_four_quadrants() {
        let (x, y) = (3, -5);
        let (x1, y1) = rotate(x, y, 1);
        let (x2, y2) = rotate(x1, y1, 1);
        let (x3, y3) = rotate(x2, y2, 1);
        let (x4, y4) = rotate(x3, y3, 1);
        assert_eq!((x4, y4), (x, y));
        let _ = (x2, y2, x3, y3);
    }

    #[test]
    fn inverse_lookup_recovers_index_and_quadrant() {
        let c = Constellation::new(64);
        for idx in 0..c.points.len() as u32 {
            for z in 0..4 {
                let p = c.point(idx, z);
                let code = c.code_for(p.x, p.y).expect("point must be in inverse map");
                assert_eq!(code & 0x3fff, idx);
                assert_eq!(code >> 14, z);
            }
        }
    }
}
