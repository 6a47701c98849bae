// eval/cache.rs - LRU cache of coarse grids with deterministic input hashing
//
// A chunked refresh runs one job per chunk, and every chunk needs the same
// coarse grid. Grids are keyed by a hash of everything that shapes them and
// stored behind `Arc`, so a hit is a reference count bump.

use crate::eval::grid::CoarseGrid;
use crate::schema::{BrushPoint, DataSource, HeightField, TerrainContext, Vec3};
use lru::LruCache;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Content-addressable cache for coarse grids.
#[derive(Debug)]
pub struct GridCache {
    grids: Mutex<LruCache<u64, Arc<CoarseGrid>>>,
}

impl GridCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            grids: Mutex::new(LruCache::new(cap)),
        }
    }

    // A panic while holding the lock leaves the LRU structurally intact.
    pub(crate) fn lock(&self) -> MutexGuard<'_, LruCache<u64, Arc<CoarseGrid>>> {
        self.grids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: u64) -> Option<Arc<CoarseGrid>> {
        self.lock().get(&key).cloned()
    }

    pub fn put(&self, key: u64, grid: Arc<CoarseGrid>) {
        self.lock().put(key, grid);
    }

    /// Return the cached grid for `key`, building and inserting it on a miss.
    /// The lock is not held while `build` runs.
    pub fn get_or_insert_with<E>(
        &self,
        key: u64,
        build: impl FnOnce() -> Result<CoarseGrid, E>,
    ) -> Result<Arc<CoarseGrid>, E> {
        if let Some(hit) = self.get(key) {
            log::debug!("coarse grid cache hit {key:016x}");
            return Ok(hit);
        }
        let grid = Arc::new(build()?);
        self.put(key, Arc::clone(&grid));
        Ok(grid)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Input hashing ──

/// Everything that determines a coarse grid.
#[derive(Debug, Clone, Copy)]
pub struct GridKey<'a> {
    pub resolution: u32,
    pub data_source: DataSource,
    pub base_value: f32,
    pub ctx: &'a TerrainContext,
    pub heights: Option<&'a HeightField>,
    pub points: &'a [BrushPoint],
}

impl GridKey<'_> {
    /// Hash the inputs. Only the inputs the data source reads are hashed, so
    /// e.g. moving a point does not invalidate a height-field grid.
    pub fn digest(&self) -> u64 {
        let mut h = FxHasher::default();

        self.resolution.hash(&mut h);
        self.data_source.hash(&mut h);
        self.base_value.to_bits().hash(&mut h);
        hash_context(&mut h, self.ctx);

        match self.data_source {
            DataSource::HeightField => match self.heights {
                Some(field) => {
                    true.hash(&mut h);
                    field.resolution.hash(&mut h);
                    for v in &field.values {
                        v.to_bits().hash(&mut h);
                    }
                }
                None => false.hash(&mut h),
            },
            DataSource::CustomPoints => {
                self.points.len().hash(&mut h);
                for p in self.points {
                    hash_point(&mut h, p);
                }
            }
        }

        h.finish()
    }
}

fn hash_vec3(h: &mut FxHasher, v: Vec3) {
    v.x.to_bits().hash(h);
    v.y.to_bits().hash(h);
    v.z.to_bits().hash(h);
}

fn hash_context(h: &mut FxHasher, ctx: &TerrainContext) {
    hash_vec3(h, ctx.size);
    ctx.alpha_resolution.hash(h);
    ctx.height_scale.to_bits().hash(h);
    hash_vec3(h, ctx.origin);
}

fn hash_point(h: &mut FxHasher, p: &BrushPoint) {
    hash_vec3(h, p.position);
    p.value.to_bits().hash(h);
    p.brush_size.hash(h);
    p.hardness.to_bits().hash(h);
    p.opacity.to_bits().hash(h);
    p.overwrite.hash(h);
    p.shape.hash(h);
}
