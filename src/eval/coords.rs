// eval/coords.rs - world ↔ grid coordinate mapping
//
// World and grid axes are swapped: grid x follows world z and grid y follows
// world x. Hosts store alpha maps that way, so keep it.

use crate::schema::Vec3;

/// Unrounded grid position of `world` on a `resolution`-sized grid.
#[inline]
pub fn world_to_grid_f(world: Vec3, terrain_size: Vec3, resolution: u32) -> (f32, f32) {
    let res = resolution as f32;
    (
        world.z / terrain_size.x * res,
        world.x / terrain_size.z * res,
    )
}

/// Grid cell containing `world`. Truncates toward zero.
#[inline]
pub fn world_to_grid(world: Vec3, terrain_size: Vec3, resolution: u32) -> (i32, i32) {
    let (gx, gy) = world_to_grid_f(world, terrain_size, resolution);
    (gx as i32, gy as i32)
}

/// World position of grid cell (gx, gy) at height `height`.
#[inline]
pub fn grid_to_world(gx: i32, gy: i32, resolution: u32, terrain_size: Vec3, height: f32) -> Vec3 {
    let res = resolution as f32;
    Vec3::new(
        gy as f32 / res * terrain_size.x,
        height,
        gx as f32 / res * terrain_size.z,
    )
}

/// Target cells per coarse cell. Integer division, as the coarse grid is a
/// power of two no larger than the target.
#[inline]
pub fn cell_spacing(target_resolution: u32, coarse_resolution: u32) -> u32 {
    target_resolution / coarse_resolution.max(1)
}

/// Largest power of two ≤ `requested`, clamped to [1, target].
pub fn snap_resolution(requested: u32, target: u32) -> u32 {
    floor_pow2(requested).min(floor_pow2(target))
}

/// Largest power of two ≤ `v`, or 1 for zero.
pub(crate) fn floor_pow2(v: u32) -> u32 {
    if v == 0 {
        1
    } else {
        1 << (31 - v.leading_zeros())
    }
}
