//! Droplet-based hydraulic erosion over the column surfaces of the field.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use relief_field::ScalarField;
use relief_world::ErosionParams;

use crate::brush::change_height;
use crate::probe::{height_gradient, surface_cell};
use crate::DirtySet;

/// Totals of one erosion pass, in fractional cell units of column height.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ErosionStats {
    pub deposited: f32,
    pub eroded: f32,
    pub droplets: usize,
}

/// Runs `params.iterations` droplets spawned randomly inside `radius` cells
/// of the (cell-unit) center. Each droplet walks downhill in unit steps,
/// eroding over a radial neighborhood while accelerating and depositing
/// when it climbs or exceeds carry capacity.
pub fn erode(
    field: &mut ScalarField,
    params: &ErosionParams,
    center_x: f32,
    center_y: f32,
    center_z: f32,
    radius: i32,
    rng: &mut ChaCha8Rng,
    dirty: &mut DirtySet,
) -> ErosionStats {
    let mut stats = ErosionStats::default();
    let w = field.width() as f32;
    let h = field.height() as f32;
    let d = field.depth() as f32;
    let y_hint = (center_y.max(0.0) as usize).min(field.height().saturating_sub(2));

    for _ in 0..params.iterations {
        let mut pos_x = center_x + rng.gen_range(-radius..radius.max(1)) as f32;
        let mut pos_z = center_z + rng.gen_range(-radius..radius.max(1)) as f32;
        if pos_x < 0.0
            || center_y < 0.0
            || pos_z < 0.0
            || pos_x >= w - 1.0
            || center_y >= h - 1.0
            || pos_z >= d - 1.0
        {
            continue;
        }
        stats.droplets += 1;

        let mut dir_x = 0.0f32;
        let mut dir_z = 0.0f32;
        let mut speed = params.initial_speed;
        let mut water = params.initial_water;
        let mut sediment = 0.0f32;

        for _ in 0..params.max_droplet_lifetime {
            let node_x = pos_x as usize;
            let node_z = pos_z as usize;
            let offset_x = pos_x - node_x as f32;
            let offset_z = pos_z - node_z as f32;

            let here = height_gradient(field, pos_x, pos_z, y_hint);

            // Inertia blending, then a unit step regardless of speed.
            dir_x = dir_x * params.inertia - here.grad_x * (1.0 - params.inertia);
            dir_z = dir_z * params.inertia - here.grad_z * (1.0 - params.inertia);
            let len = (dir_x * dir_x + dir_z * dir_z).sqrt();
            if len != 0.0 {
                dir_x /= len;
                dir_z /= len;
            }
            pos_x += dir_x;
            pos_z += dir_z;

            if (dir_x == 0.0 && dir_z == 0.0)
                || pos_x < 0.0
                || pos_x >= w
                || pos_z < 0.0
                || pos_z >= d
            {
                break;
            }

            let there = height_gradient(field, pos_x, pos_z, y_hint);
            let delta_height = there.height - here.height;
            let capacity = (-delta_height * speed * water * params.sediment_capacity_factor)
                .max(params.min_sediment_capacity);

            if delta_height > 0.0 || sediment > capacity {
                // Climbing fills up to the new height; over capacity the
                // surplus settles gradually. Deposition is not spread over a
                // radius so it can fill small pits.
                let amount = if delta_height > 0.0 {
                    delta_height.min(sediment)
                } else {
                    (sediment - capacity) * params.deposit_speed
                };
                sediment -= amount;
                stats.deposited += amount;

                let deposit = [
                    (node_x, node_z, there.sw_y, (1.0 - offset_x) * (1.0 - offset_z)),
                    (node_x + 1, node_z, there.se_y, offset_x * (1.0 - offset_z)),
                    (node_x, node_z + 1, there.nw_y, (1.0 - offset_x) * offset_z),
                    (node_x + 1, node_z + 1, there.ne_y, offset_x * offset_z),
                ];
                for (x, z, y, weight) in deposit {
                    if x < field.width() && z < field.depth() {
                        change_height(field, x, y, z, amount * weight);
                        dirty.mark(x, z);
                    }
                }
            } else {
                // Erosion never exceeds erode_speed per step nor the height
                // drop, so it cannot dig a hole behind the droplet.
                let amount = if delta_height < 0.0 {
                    params.erode_speed.min(-delta_height)
                } else {
                    params.erode_speed
                };
                let radius = params.erode_radius.max(1);
                let r2 = (radius * radius) as f32;
                for dx in -radius..=radius {
                    let cx = node_x as i32 + dx;
                    if cx < 0 || cx as usize >= field.width() {
                        continue;
                    }
                    for dz in -radius..=radius {
                        let cz = node_z as i32 + dz;
                        if cz < 0 || cz as usize >= field.depth() {
                            continue;
                        }
                        let fx = dx as f32 + offset_x;
                        let fz = dz as f32 + offset_z;
                        let dist2 = fx * fx + fz * fz;
                        if dist2 > r2 {
                            continue;
                        }
                        let (x, z) = (cx as usize, cz as usize);
                        let weighed = amount * (1.2 - dist2 / r2) * 0.116;
                        let y = surface_cell(field, x, z, y_hint);
                        // Never dig past the field floor.
                        let delta_sediment = weighed.min(y as f32);
                        change_height(field, x, y, z, -delta_sediment);
                        sediment += delta_sediment;
                        stats.eroded += delta_sediment;
                        dirty.mark(x, z);
                    }
                }
            }

            speed = (speed * speed + delta_height * params.gravity).max(0.0).sqrt();
            water *= 1.0 - params.evaporate_speed;
        }
    }
    stats
}
