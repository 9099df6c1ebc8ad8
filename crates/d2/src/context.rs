//! Shared, read-only state of one nesting run.

use crate::boolean::Clipper;
use crate::minkowski::hull_nfp;
use crate::nfp::{Nfp, NfpCalculator};
use crate::nfp_cache::{NfpCache, NfpKey};
use crate::part::{prepare_parts, prepare_sheets, Part, PreparedPart, PreparedSheet, Sheet};
use rayon::{ThreadPool, ThreadPoolBuilder};
use sheetnest_core::{Config, Error, Result};
use std::sync::Arc;

/// One copy of a part; the GA orders these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instance {
    pub part: usize,
    pub instance: usize,
}

/// Everything an evaluation needs: prepared geometry, configuration, the
/// NFP cache and the pool that computes NFP pairs.
///
/// Built once per run and shared by reference; nothing in it changes while
/// individuals are evaluated except the cache contents.
pub struct NestContext {
    config: Config,
    clipper: Clipper,
    calculator: NfpCalculator,
    parts: Vec<PreparedPart>,
    sheets: Vec<PreparedSheet>,
    instances: Vec<Instance>,
    cache: Arc<NfpCache>,
    pool: ThreadPool,
    total_sheet_area: f64,
}

impl std::fmt::Debug for NestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestContext")
            .field("parts", &self.parts.len())
            .field("sheets", &self.sheets.len())
            .field("instances", &self.instances.len())
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl NestContext {
    /// Validates `config` and prepares the geometry. The NFP cache lives in
    /// `config.cache_dir` when set, otherwise in memory.
    pub fn new(parts: &[Part], sheets: &[Sheet], config: Config) -> Result<Self> {
        let cache = match &config.cache_dir {
            Some(dir) => NfpCache::with_dir(dir),
            None => NfpCache::new(),
        };
        Self::with_cache(parts, sheets, config, Arc::new(cache))
    }

    /// Like [`NestContext::new`] but reuses an existing cache.
    pub fn with_cache(parts: &[Part], sheets: &[Sheet], config: Config, cache: Arc<NfpCache>) -> Result<Self> {
        config.validate()?;
        let clipper = Clipper::new(config.clipper_scale);
        let calculator =
            NfpCalculator::new(clipper, config.nfp_step_limit).with_explore_concave(config.explore_concave);

        let sheets = prepare_sheets(sheets, &config, &clipper)?;
        let parts = prepare_parts(parts, &sheets, &config, &clipper)?;

        let instances: Vec<Instance> = parts
            .iter()
            .flat_map(|p| (0..p.quantity).map(move |instance| Instance { part: p.index, instance }))
            .collect();
        let total_sheet_area = sheets.iter().map(|s| s.area * s.quantity as f64).sum();

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("sheetnest-nfp-{i}"))
            .build()
            .map_err(|e| Error::Internal(format!("cannot start NFP pool: {e}")))?;

        Ok(Self {
            config,
            clipper,
            calculator,
            parts,
            sheets,
            instances,
            cache,
            pool,
            total_sheet_area,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clipper(&self) -> &Clipper {
        &self.clipper
    }

    pub fn parts(&self) -> &[PreparedPart] {
        &self.parts
    }

    pub fn sheets(&self) -> &[PreparedSheet] {
        &self.sheets
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn cache(&self) -> &Arc<NfpCache> {
        &self.cache
    }

    /// Area of every sheet copy together.
    pub fn total_sheet_area(&self) -> f64 {
        self.total_sheet_area
    }

    /// Runs `op` on the NFP pool.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// NFP of part `orbiting` (rotation option `orbiting_option`) around part
    /// `stationary` placed at the origin.
    ///
    /// Traces that fail to close are replaced by the hull-based superset.
    pub fn outer_nfp(
        &self,
        stationary: usize,
        stationary_option: usize,
        orbiting: usize,
        orbiting_option: usize,
    ) -> Arc<Nfp> {
        let a = &self.parts[stationary];
        let b = &self.parts[orbiting];
        let key = NfpKey::outer(
            a.signature,
            a.rotation(stationary_option),
            b.signature,
            b.rotation(orbiting_option),
        );
        self.cache.get_or_compute(key, || {
            let a_shape = a.shape(stationary_option);
            let b_shape = b.shape(orbiting_option);
            let nfp = self.calculator.outer(a_shape, b_shape);
            if !nfp.degraded && !nfp.polygons.is_empty() {
                return nfp;
            }
            log::warn!(
                "NFP of part {} ({} deg) around part {} ({} deg) degraded; using hull bound",
                orbiting,
                b.rotation(orbiting_option),
                stationary,
                a.rotation(stationary_option)
            );
            let polygons = hull_nfp(a_shape.points(), b_shape.points()).into_iter().collect();
            Nfp {
                polygons,
                points: Vec::new(),
                degraded: true,
            }
        })
    }

    /// Inner-fit region of part `part` (rotation `option`) in `sheet`.
    pub fn inner_nfp(&self, sheet: &PreparedSheet, part: usize, option: usize) -> Arc<Nfp> {
        let p = &self.parts[part];
        let key = NfpKey::inner(sheet.signature, p.signature, p.rotation(option));
        self.cache
            .get_or_compute(key, || self.calculator.inner(&sheet.region, p.shape(option)))
    }
}
