//! Genetic algorithm nesting problem.
//!
//! An individual is an order over part instances plus a rotation option per
//! instance. Evaluation lays it out with the placement engine; the fitness is
//! the layout's score. Batches go through the [`WorkerPool`], and every result
//! that beats the best so far is reported as soon as it arrives.

use crate::context::NestContext;
use crate::placement::place_individual;
use crate::worker::WorkerPool;
use rand::seq::SliceRandom;
use rand::Rng;
use sheetnest_core::{
    CancellationToken, GaProblem, Individual, NestResult, PermutationChromosome, ProgressCallback, Result,
    ResultCallback,
};
use std::sync::{Arc, Mutex, PoisonError};

/// Problem definition for GA-based nesting.
pub struct NestingProblem {
    ctx: Arc<NestContext>,
    pool: WorkerPool,
    best: Mutex<Option<NestResult>>,
    on_result: Option<ResultCallback>,
    on_progress: Option<ProgressCallback>,
}

impl NestingProblem {
    /// Creates the problem and starts `config.threads` evaluation workers.
    pub fn new(ctx: Arc<NestContext>) -> Result<Self> {
        let pool = WorkerPool::new(Arc::clone(&ctx), ctx.config().threads)?;
        Ok(Self {
            ctx,
            pool,
            best: Mutex::new(None),
            on_result: None,
            on_progress: None,
        })
    }

    /// Called with every new best result.
    pub fn with_result_callback(mut self, callback: ResultCallback) -> Self {
        self.on_result = Some(callback);
        self
    }

    /// Called with every worker progress event.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn context(&self) -> &NestContext {
        &self.ctx
    }

    /// Returns the number of part instances (genes per individual).
    pub fn num_instances(&self) -> usize {
        self.ctx.instances().len()
    }

    /// Best layout seen so far.
    pub fn best_result(&self) -> Option<NestResult> {
        self.best.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Instances by descending part area, every rotation option 0.
    pub fn seeded_individual(&self) -> PermutationChromosome {
        let instances = self.ctx.instances();
        let parts = self.ctx.parts();
        let mut genes: Vec<usize> = (0..instances.len()).collect();
        // Stable, so copies of one part stay in instance order.
        genes.sort_by(|&a, &b| {
            let area_a = parts[instances[a].part].area;
            let area_b = parts[instances[b].part].area;
            area_b.total_cmp(&area_a)
        });
        PermutationChromosome::from_parts(genes, vec![0; instances.len()])
    }

    /// A random rotation option for instance `item`, among those that fit a sheet.
    fn random_rotation<R: Rng>(&self, item: usize, rng: &mut R) -> usize {
        let part = &self.ctx.parts()[self.ctx.instances()[item].part];
        part.fitting.choose(rng).copied().unwrap_or(0)
    }

    /// Keeps `result` if it beats the best so far and reports it.
    ///
    /// The callback runs after the lock is released, so it may read
    /// [`best_result`](Self::best_result).
    fn record(&self, result: NestResult) {
        {
            let mut best = self.best.lock().unwrap_or_else(PoisonError::into_inner);
            let improved = best.as_ref().map_or(true, |current| result.fitness < current.fitness);
            if !improved {
                return;
            }
            *best = Some(result.clone());
        }
        log::info!(
            "new best: fitness {:.4}, {} placed, {} unplaced, utilisation {}",
            result.fitness,
            result.placed_count(),
            result.unplaced.len(),
            result.utilisation_percent()
        );
        if let Some(callback) = &self.on_result {
            callback(&result);
        }
    }
}

impl GaProblem for NestingProblem {
    type Individual = PermutationChromosome;

    fn evaluate(&self, individual: &mut PermutationChromosome) -> Result<()> {
        let result = place_individual(&self.ctx, individual, |_| {});
        individual.set_fitness(result.fitness);
        self.record(result);
        Ok(())
    }

    fn evaluate_batch(
        &self,
        generation: u32,
        individuals: &mut [PermutationChromosome],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let jobs: Vec<(usize, PermutationChromosome)> = individuals
            .iter()
            .enumerate()
            .filter(|(_, ind)| ind.fitness().is_none())
            .map(|(slot, ind)| (slot, ind.clone()))
            .collect();

        self.pool.evaluate(
            generation,
            jobs,
            cancel,
            &mut |event| {
                if let Some(callback) = &self.on_progress {
                    callback(event);
                }
            },
            &mut |slot, result| {
                individuals[slot].set_fitness(result.fitness);
                self.record(result);
            },
        )
    }

    fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<PermutationChromosome> {
        let n = self.num_instances();
        let mut population = Vec::with_capacity(size);
        population.push(self.seeded_individual());

        while population.len() < size {
            let mut genes: Vec<usize> = (0..n).collect();
            genes.shuffle(rng);
            let rotations = (0..n).map(|item| self.random_rotation(item, rng)).collect();
            population.push(PermutationChromosome::from_parts(genes, rotations));
        }
        population
    }

    fn mutate<R: Rng>(&self, individual: &mut PermutationChromosome, rate: f64, rng: &mut R) {
        individual.mutate_with(rate, rng, |item, rng| self.random_rotation(item, rng));
    }

    fn on_generation(&self, generation: u32, best: &PermutationChromosome, population: &[PermutationChromosome]) {
        let unplaced_free = population
            .iter()
            .filter_map(Individual::fitness)
            .filter(|&f| f < 1e8)
            .count();
        log::debug!(
            "generation {}: best fitness {:.4}, {}/{} individuals place everything",
            generation,
            best.fitness().unwrap_or(f64::INFINITY),
            unplaced_free,
            population.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;
    use crate::part::{Part, Sheet};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use sheetnest_core::{Config, GaConfig, GaRunner};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{OnceLock, Weak};

    fn problem(config: Config) -> NestingProblem {
        let parts = vec![
            Part::new(Polygon::rectangle(5.0, 5.0).unwrap(), 2),
            Part::new(Polygon::rectangle(20.0, 4.0).unwrap(), 2),
        ];
        let sheets = vec![Sheet::rectangle(30.0, 30.0).unwrap()];
        let ctx = NestContext::new(&parts, &sheets, config.with_threads(2)).unwrap();
        NestingProblem::new(Arc::new(ctx)).unwrap()
    }

    fn is_permutation(genes: &[usize], n: usize) -> bool {
        let mut sorted = genes.to_vec();
        sorted.sort_unstable();
        sorted == (0..n).collect::<Vec<_>>()
    }

    #[test]
    fn test_seeded_individual_orders_by_area() {
        let p = problem(Config::new());
        let seeded = p.seeded_individual();
        // The 20 x 4 copies (instances 2 and 3) come first.
        assert_eq!(seeded.genes, vec![2, 3, 0, 1]);
        assert!(seeded.rotations.iter().all(|&r| r == 0));
    }

    #[test]
    fn test_initial_population() {
        let p = problem(Config::new().with_rotations(4));
        let mut rng = StdRng::seed_from_u64(7);
        let population = p.initialize_population(6, &mut rng);
        assert_eq!(population.len(), 6);
        assert_eq!(population[0], p.seeded_individual());
        for ind in &population {
            assert!(is_permutation(&ind.genes, 4));
            assert_eq!(ind.rotations.len(), 4);
            assert!(ind.fitness().is_none());
        }
    }

    #[test]
    fn test_mutation_draws_fitting_rotations() {
        // On a 30 x 30 sheet every rotation fits, so all four options appear.
        let p = problem(Config::new().with_rotations(4));
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [false; 4];
        for _ in 0..50 {
            let mut ind = p.seeded_individual();
            p.mutate(&mut ind, 1.0, &mut rng);
            assert!(is_permutation(&ind.genes, 4));
            for &r in &ind.rotations {
                seen[r] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_batch_sets_fitness_and_reports_best() {
        let reported = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reported);
        let p = problem(Config::new().with_rotations(1)).with_result_callback(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let mut population = vec![p.seeded_individual(), PermutationChromosome::new(4)];
        p.evaluate_batch(0, &mut population, &CancellationToken::new()).unwrap();
        assert!(population.iter().all(|ind| ind.fitness().is_some()));
        assert!(reported.load(Ordering::SeqCst) >= 1);

        let best = p.best_result().unwrap();
        assert!(best.all_placed());
        let lowest = population.iter().filter_map(Individual::fitness).fold(f64::INFINITY, f64::min);
        assert_eq!(best.fitness, lowest);
    }

    #[test]
    fn test_result_callback_can_read_best() {
        let slot: Arc<OnceLock<Weak<NestingProblem>>> = Arc::new(OnceLock::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (handle, log) = (Arc::clone(&slot), Arc::clone(&seen));
        let p = Arc::new(problem(Config::new().with_rotations(1)).with_result_callback(Box::new(move |result| {
            if let Some(p) = handle.get().and_then(Weak::upgrade) {
                let best = p.best_result().map(|b| b.fitness);
                log.lock().unwrap().push((result.fitness, best));
            }
        })));
        slot.set(Arc::downgrade(&p)).unwrap();

        let mut ind = p.seeded_individual();
        p.evaluate(&mut ind).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, Some(seen[0].0));
    }

    #[test]
    fn test_short_run_places_everything() {
        let config = Config::new().with_rotations(2).with_population_size(4);
        let p = problem(config.clone());
        let runner = GaRunner::new(GaConfig::from(&config).with_max_generations(3), p);
        let result = runner.run_with_rng(&mut StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(result.generations, 3);
        assert!(result.history.windows(2).all(|w| w[1] <= w[0]));
        let best = runner.problem().best_result().unwrap();
        assert!(best.all_placed());
        assert_eq!(best.fitness, result.best.unwrap().fitness().unwrap());
    }
}
