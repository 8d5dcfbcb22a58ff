//! Straight and ballistic voxel traces.

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Result of a voxel trace.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trace {
    /// What stopped the trace, `Empty` if nothing did.
    pub hit: VoxelKind,
    /// The blocking voxel, or the target when the trace was clear.
    pub stop: IVec3,
    /// Every traversed voxel, when recording was requested.
    pub trajectory: Vec<IVec3>,
}

impl Trace {
    pub fn blocked(&self) -> bool {
        self.hit.is_blocking()
    }

    fn clear(stop: IVec3, trajectory: Vec<IVec3>) -> Trace {
        Trace {
            hit: VoxelKind::Empty,
            stop,
            trajectory,
        }
    }
}

impl TileEngine {
    /// Trace a straight voxel line, stopping at the first occupied voxel.
    ///
    /// A trace from a point to itself traverses nothing and hits nothing.
    /// The origin voxel itself is never tested, the shot leaves it freely.
    pub fn calculate_line(
        &self,
        field: &Battlefield,
        origin: IVec3,
        target: IVec3,
        store_trajectory: bool,
        exclude: Option<UnitId>,
        exclude_all_but: Option<UnitId>,
    ) -> Trace {
        let mut trajectory = Vec::new();
        if origin == target {
            return Trace::clear(origin, trajectory);
        }

        let delta = (target - origin).abs();
        let step = (target - origin).signum();

        // Permute axes so the longest delta drives the line.
        let (a0, a1, a2) = if delta.x >= delta.y && delta.x >= delta.z {
            (0, 1, 2)
        } else if delta.y >= delta.x && delta.y >= delta.z {
            (1, 0, 2)
        } else {
            (2, 0, 1)
        };

        let primary = delta[a0];
        let mut drift1 = primary / 2;
        let mut drift2 = primary / 2;
        let mut pos = origin;

        for _ in 0..primary {
            pos[a0] += step[a0];
            drift1 -= delta[a1];
            drift2 -= delta[a2];
            if drift1 < 0 {
                pos[a1] += step[a1];
                drift1 += primary;
            }
            if drift2 < 0 {
                pos[a2] += step[a2];
                drift2 += primary;
            }

            if store_trajectory {
                trajectory.push(pos);
            }
            let hit =
                self.voxel_check(field, pos, exclude, false, exclude_all_but);
            if hit.is_blocking() {
                return Trace {
                    hit,
                    stop: pos,
                    trajectory,
                };
            }
        }
        Trace::clear(target, trajectory)
    }

    /// Trace a ballistic arc in 8-voxel straight segments.
    ///
    /// `curvature` scales the apex height; `deviation` jitters the launch
    /// angles (radians) for inaccurate throws.
    pub fn calculate_parabola(
        &self,
        field: &Battlefield,
        origin: IVec3,
        target: IVec3,
        store_trajectory: bool,
        exclude: Option<UnitId>,
        curvature: f64,
        deviation: (f64, f64),
    ) -> Trace {
        let d = (target - origin).as_dvec3();
        let ro = d.length();
        if ro < 1.0 {
            return Trace::clear(target, Vec::new());
        }

        let mut fi = (d.z / ro).acos();
        let mut te = d.y.atan2(d.x);
        te += deviation.0;
        fi += deviation.1;

        let apex = ro.sqrt() * curvature;
        let z_k = 4.0 * apex / (ro * ro);

        let o = origin.as_dvec3();
        let mut trajectory = Vec::new();
        let mut prev = origin;
        let mut i: f64 = 0.0;

        loop {
            i = (i + 8.0).min(ro);
            let next = if i >= ro {
                target
            } else {
                let x = o.x + i * te.cos() * fi.sin();
                let y = o.y + i * te.sin() * fi.sin();
                let z = o.z + i * fi.cos() + z_k * i * (ro - i);
                ivec3(
                    x.round() as i32,
                    y.round() as i32,
                    z.round() as i32,
                )
            };

            let seg = self.calculate_line(
                field,
                prev,
                next,
                store_trajectory,
                exclude,
                None,
            );
            let (hit, stop) = (seg.hit, seg.stop);
            trajectory.extend(seg.trajectory);
            if hit.is_blocking() {
                return Trace {
                    hit,
                    stop,
                    trajectory,
                };
            }
            if i >= ro {
                return Trace::clear(target, trajectory);
            }
            prev = next;
        }
    }

    /// Find a throwing arc that lands in the target tile.
    ///
    /// Searches curvatures coarsely, then refines around the first hit.
    /// `None` means the throw is geometrically impossible.
    pub fn validate_throw(
        &self,
        field: &Battlefield,
        origin: IVec3,
        target: IVec3,
        exclude: Option<UnitId>,
    ) -> Option<f64> {
        let reaches = |curvature: f64| {
            let trace = self.calculate_parabola(
                field,
                origin,
                target,
                false,
                exclude,
                curvature,
                (0.0, 0.0),
            );
            let landing = voxel_to_tile(trace.stop);
            let target_tile = voxel_to_tile(target);
            if landing != target_tile {
                return false;
            }
            // Reaching the target cleanly or bouncing off the target
            // tile's own floor both count as landing there.
            !trace.blocked() || trace.hit == VoxelKind::Floor
        };

        let coarse = (0..5).map(|i| 0.5 + i as f64).find(|&c| reaches(c))?;
        for tenth in 1..=9 {
            let c = coarse - 1.0 + tenth as f64 / 10.0;
            if c > 0.0 && reaches(c) {
                return Some(c);
            }
        }
        Some(coarse)
    }
}
