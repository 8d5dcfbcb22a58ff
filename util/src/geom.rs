use glam::{IVec2, IVec3};

/// 8 directions, clock face order starting from north.
pub const DIR_8: [IVec2; 8] = [
    IVec2::from_array([0, -1]),
    IVec2::from_array([1, -1]),
    IVec2::from_array([1, 0]),
    IVec2::from_array([1, 1]),
    IVec2::from_array([0, 1]),
    IVec2::from_array([-1, 1]),
    IVec2::from_array([-1, 0]),
    IVec2::from_array([-1, -1]),
];

/// 4 cardinal directions, clock face order.
pub const DIR_4: [IVec2; 4] = [
    IVec2::from_array([0, -1]),
    IVec2::from_array([1, 0]),
    IVec2::from_array([0, 1]),
    IVec2::from_array([-1, 0]),
];

pub trait VecExt: Sized {
    /// Absolute size of vector in taxicab metric.
    fn taxi_len(&self) -> i32;

    /// Vec points to an adjacent cell in the 8-neighborhood.
    fn is_adjacent_8(&self) -> bool;

    /// Squared Euclidean length.
    fn len_sq(&self) -> i32;

    /// Index into `DIR_8` that best matches the direction of the vector.
    ///
    /// Zero vector maps to north.
    fn to_dir8(&self) -> usize;
}

impl VecExt for IVec2 {
    fn taxi_len(&self) -> i32 {
        self.x.abs() + self.y.abs()
    }

    fn is_adjacent_8(&self) -> bool {
        self.x.abs().max(self.y.abs()) == 1
    }

    fn len_sq(&self) -> i32 {
        self.x * self.x + self.y * self.y
    }

    fn to_dir8(&self) -> usize {
        if *self == IVec2::ZERO {
            return 0;
        }
        // Clock face angle, north is up and y axis points down.
        let angle =
            (self.x as f64).atan2(-(self.y as f64)) / std::f64::consts::PI;
        // Octant sectors centered on the eight directions.
        ((angle * 4.0).round() as i32).rem_euclid(8) as usize
    }
}

impl VecExt for IVec3 {
    fn taxi_len(&self) -> i32 {
        self.x.abs() + self.y.abs() + self.z.abs()
    }

    fn is_adjacent_8(&self) -> bool {
        self.z == 0 && self.truncate().is_adjacent_8()
    }

    fn len_sq(&self) -> i32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    fn to_dir8(&self) -> usize {
        self.truncate().to_dir8()
    }
}

/// Smallest arc between two `DIR_8` indices, 0 to 4.
pub fn arc(a: usize, b: usize) -> usize {
    let d = (a as i32 - b as i32).rem_euclid(8) as usize;
    d.min(8 - d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::ivec2;
    use quickcheck_macros::quickcheck;

    #[test]
    fn dir8_roundtrip() {
        for (i, d) in DIR_8.iter().enumerate() {
            assert_eq!(d.to_dir8(), i);
            // Scaling must not change the sector.
            assert_eq!((*d * 5).to_dir8(), i);
        }
    }

    #[test]
    fn arcs() {
        assert_eq!(arc(0, 0), 0);
        assert_eq!(arc(0, 7), 1);
        assert_eq!(arc(1, 5), 4);
        assert_eq!(arc(6, 2), 4);
        assert_eq!(arc(7, 1), 2);
    }

    #[quickcheck]
    fn taxi_len_symmetric(x: i16, y: i16, z: i16) -> bool {
        let v = IVec3::new(x as i32, y as i32, z as i32);
        v.taxi_len() == (-v).taxi_len() && v.taxi_len() >= 0
    }

    #[quickcheck]
    fn len_sq_dominates_taxi(x: i8, y: i8) -> bool {
        let v = ivec2(x as i32, y as i32);
        v.len_sq() <= v.taxi_len() * v.taxi_len()
    }
}
