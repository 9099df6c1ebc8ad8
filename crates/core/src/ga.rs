//! Genetic Algorithm framework for optimization.
//!
//! Domain crates implement [`Individual`] and [`GaProblem`]; [`GaRunner`]
//! drives the generational loop. Fitness is minimized: the population is
//! ranked ascending and index 0 is the best individual.
//!
//! The loop has no convergence criterion of its own. It runs until the
//! [`CancellationToken`] is cancelled (checked between generations) or, when
//! configured, until `max_generations` is reached.

use crate::cancel::CancellationToken;
use crate::{Error, Result};
use rand::prelude::*;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the genetic algorithm.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaConfig {
    /// Population size.
    pub population_size: usize,
    /// Per-gene mutation probability (0.0 - 1.0).
    pub mutation_rate: f64,
    /// Maximum number of generations (None = until cancelled).
    pub max_generations: Option<u32>,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 10,
            mutation_rate: 0.1,
            max_generations: None,
        }
    }
}

impl GaConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size.max(2);
        self
    }

    /// Sets the mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the maximum generations.
    pub fn with_max_generations(mut self, generations: u32) -> Self {
        self.max_generations = Some(generations);
        self
    }
}

impl From<&crate::Config> for GaConfig {
    fn from(config: &crate::Config) -> Self {
        Self {
            population_size: config.population_size.max(2),
            mutation_rate: config.mutation_rate.clamp(0.0, 1.0),
            max_generations: config.max_generations,
        }
    }
}

/// Trait for individuals in the genetic algorithm.
pub trait Individual: Clone + Send + Sync {
    /// Returns the fitness, or `None` if not evaluated yet. Lower is better.
    fn fitness(&self) -> Option<f64>;

    /// Performs crossover with another individual, producing one child.
    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self;
}

/// Trait for problem-specific GA operations.
pub trait GaProblem: Send + Sync {
    /// The individual type for this problem.
    type Individual: Individual;

    /// Evaluates the fitness of an individual.
    fn evaluate(&self, individual: &mut Self::Individual) -> Result<()>;

    /// Evaluates every not-yet-evaluated individual of a generation.
    ///
    /// Default implementation uses rayon. Returning `Err(Error::Cancelled)`
    /// ends the run gracefully; individuals evaluated before that are kept.
    fn evaluate_batch(
        &self,
        _generation: u32,
        individuals: &mut [Self::Individual],
        cancel: &CancellationToken,
    ) -> Result<()> {
        individuals
            .par_iter_mut()
            .filter(|ind| ind.fitness().is_none())
            .try_for_each(|ind| {
                cancel.check()?;
                self.evaluate(ind)
            })
    }

    /// Creates an initial population.
    fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<Self::Individual>;

    /// Mutates an individual in place, each gene with probability `rate`.
    fn mutate<R: Rng>(&self, individual: &mut Self::Individual, rate: f64, rng: &mut R);

    /// Called after each generation is ranked.
    fn on_generation(
        &self,
        _generation: u32,
        _best: &Self::Individual,
        _population: &[Self::Individual],
    ) {
    }
}

/// Progress information during GA execution.
#[derive(Debug, Clone)]
pub struct GaProgress {
    /// Current generation number.
    pub generation: u32,
    /// Best fitness so far.
    pub best_fitness: f64,
    /// Average fitness of the evaluated individuals of this generation.
    pub avg_fitness: f64,
    /// Elapsed time since start.
    pub elapsed: Duration,
}

/// Result of a GA run.
#[derive(Debug, Clone)]
pub struct GaResult<I: Individual> {
    /// The best individual found (None if stopped before any evaluation).
    pub best: Option<I>,
    /// Number of fully evaluated generations.
    pub generations: u32,
    /// Total elapsed time.
    pub elapsed: Duration,
    /// Whether the run ended through cancellation.
    pub cancelled: bool,
    /// Best fitness after each generation.
    pub history: Vec<f64>,
}

/// Genetic algorithm runner.
pub struct GaRunner<P: GaProblem> {
    config: GaConfig,
    problem: P,
    cancel: CancellationToken,
}

impl<P: GaProblem> GaRunner<P> {
    /// Creates a new GA runner with its own cancellation token.
    pub fn new(config: GaConfig, problem: P) -> Self {
        Self::with_cancellation(config, problem, CancellationToken::new())
    }

    /// Creates a new GA runner observing an existing token.
    pub fn with_cancellation(config: GaConfig, problem: P, cancel: CancellationToken) -> Self {
        Self {
            config,
            problem,
            cancel,
        }
    }

    /// Returns a handle to cancel the algorithm.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns the problem being optimized.
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Runs the genetic algorithm with a specific RNG.
    pub fn run_with_rng<R: Rng>(&self, rng: &mut R) -> Result<GaResult<P::Individual>> {
        self.run_with_rng_and_progress::<R, fn(GaProgress)>(rng, None)
    }

    /// Runs the genetic algorithm with a specific RNG and optional progress callback.
    pub fn run_with_rng_and_progress<R: Rng, F>(
        &self,
        rng: &mut R,
        progress_callback: Option<F>,
    ) -> Result<GaResult<P::Individual>>
    where
        F: Fn(GaProgress),
    {
        let start = Instant::now();
        let size = self.config.population_size.max(2);
        let mut history = Vec::new();
        let mut population = self.problem.initialize_population(size, rng);
        if population.is_empty() {
            return Err(Error::Internal("initial population is empty".into()));
        }

        let mut best: Option<P::Individual> = None;
        let mut generation = 0u32;
        let mut cancelled = false;

        loop {
            // Safe point: never stop in the middle of a generation's bookkeeping.
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if let Some(max) = self.config.max_generations {
                if generation >= max {
                    break;
                }
            }

            let outcome = self
                .problem
                .evaluate_batch(generation, &mut population, &self.cancel);
            match outcome {
                Ok(()) => {}
                Err(Error::Cancelled) => {
                    rank(&mut population);
                    update_best(&mut best, &population[0]);
                    cancelled = true;
                    break;
                }
                Err(e) => return Err(e),
            }

            rank(&mut population);
            update_best(&mut best, &population[0]);

            let best_fitness = best
                .as_ref()
                .and_then(Individual::fitness)
                .unwrap_or(f64::INFINITY);
            history.push(best_fitness);

            if let Some(b) = best.as_ref() {
                self.problem.on_generation(generation, b, &population);
            }

            if let Some(ref callback) = progress_callback {
                let evaluated: Vec<f64> = population.iter().filter_map(Individual::fitness).collect();
                let avg_fitness = evaluated.iter().sum::<f64>() / evaluated.len().max(1) as f64;
                callback(GaProgress {
                    generation,
                    best_fitness,
                    avg_fitness,
                    elapsed: start.elapsed(),
                });
            }

            log::debug!(
                "generation {} ranked, best fitness {:.4}",
                generation,
                best_fitness
            );

            population = self.next_generation(&population, rng);
            generation += 1;
        }

        Ok(GaResult {
            best,
            generations: generation,
            elapsed: start.elapsed(),
            cancelled,
            history,
        })
    }

    /// Builds the next population from a ranked one.
    ///
    /// The best individual is carried over unchanged; the rest are children of
    /// rank-weighted parents, mutated per gene.
    fn next_generation<R: Rng>(
        &self,
        ranked: &[P::Individual],
        rng: &mut R,
    ) -> Vec<P::Individual> {
        let size = self.config.population_size.max(2);
        let mut next = Vec::with_capacity(size);
        next.push(ranked[0].clone());

        while next.len() < size {
            let male = weighted_index(ranked.len(), None, rng);
            let female = weighted_index(ranked.len(), Some(male), rng);

            let mut child = ranked[male].crossover(&ranked[female], rng);
            self.problem
                .mutate(&mut child, self.config.mutation_rate, rng);
            next.push(child);

            if next.len() < size {
                let mut child = ranked[female].crossover(&ranked[male], rng);
                self.problem
                    .mutate(&mut child, self.config.mutation_rate, rng);
                next.push(child);
            }
        }

        next
    }
}

/// Sorts ascending by fitness; unevaluated individuals go last.
fn rank<I: Individual>(population: &mut [I]) {
    population.sort_by(|a, b| match (a.fitness(), b.fitness()) {
        (Some(fa), Some(fb)) => fa.partial_cmp(&fb).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Replaces `best` only when the candidate is strictly better.
fn update_best<I: Individual>(best: &mut Option<I>, candidate: &I) {
    let Some(candidate_fitness) = candidate.fitness() else {
        return;
    };
    let improved = match best.as_ref().and_then(Individual::fitness) {
        Some(current) => candidate_fitness < current,
        None => true,
    };
    if improved {
        *best = Some(candidate.clone());
    }
}

/// Picks an index from a ranked population, biased towards the front.
///
/// Interval widths shrink linearly with rank, so better individuals are
/// chosen more often without ever excluding the tail.
pub fn weighted_index<R: Rng>(len: usize, exclude: Option<usize>, rng: &mut R) -> usize {
    let candidates: Vec<usize> = (0..len).filter(|&i| Some(i) != exclude).collect();
    if candidates.is_empty() {
        return 0;
    }

    let n = candidates.len() as f64;
    let weight = 1.0 / n;
    let roll: f64 = rng.gen();
    let mut lower = 0.0;
    let mut upper = weight;

    for (rank, &idx) in candidates.iter().enumerate() {
        if roll >= lower && roll < upper {
            return idx;
        }
        lower = upper;
        upper += 2.0 * weight * ((n - rank as f64) / n);
    }

    candidates[0]
}

/// Chromosome for permutation problems with a rotation choice per item.
///
/// `genes` is the order in which items are processed; `rotations[item]` is the
/// rotation option chosen for item `item` (indexed by item, not by position).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PermutationChromosome {
    /// The permutation (item indices).
    pub genes: Vec<usize>,
    /// Rotation option index per item.
    pub rotations: Vec<usize>,
    /// Cached fitness value.
    fitness: Option<f64>,
}

impl PermutationChromosome {
    /// Creates a chromosome with the identity order and rotation option 0.
    pub fn new(size: usize) -> Self {
        Self {
            genes: (0..size).collect(),
            rotations: vec![0; size],
            fitness: None,
        }
    }

    /// Creates a chromosome from an explicit order and rotation choice.
    pub fn from_parts(genes: Vec<usize>, rotations: Vec<usize>) -> Self {
        Self {
            genes,
            rotations,
            fitness: None,
        }
    }

    /// Creates a random chromosome.
    pub fn random_with_options<R: Rng>(size: usize, rotation_options: usize, rng: &mut R) -> Self {
        let mut genes: Vec<usize> = (0..size).collect();
        genes.shuffle(rng);

        let rotations: Vec<usize> = (0..size)
            .map(|_| rng.gen_range(0..rotation_options.max(1)))
            .collect();

        Self {
            genes,
            rotations,
            fitness: None,
        }
    }

    /// Sets the fitness value.
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = Some(fitness);
    }

    /// Clears the fitness value.
    pub fn invalidate(&mut self) {
        self.fitness = None;
    }

    /// Returns the number of genes.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Order crossover (OX).
    pub fn order_crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        let n = self.genes.len();
        if n < 2 || other.genes.len() != n {
            let mut child = self.clone();
            child.fitness = None;
            return child;
        }

        // Select two crossover points
        let (mut p1, mut p2) = (rng.gen_range(0..n), rng.gen_range(0..n));
        if p1 > p2 {
            std::mem::swap(&mut p1, &mut p2);
        }

        // Copy segment from parent1
        let mut child_genes = vec![usize::MAX; n];
        let mut used = vec![false; n];

        for i in p1..=p2 {
            child_genes[i] = self.genes[i];
            used[self.genes[i]] = true;
        }

        // Fill remaining from parent2, in parent2's order
        let mut j = (p2 + 1) % n;
        for i in 0..n {
            let idx = (p2 + 1 + i) % n;
            if child_genes[idx] == usize::MAX {
                while used[other.genes[j]] {
                    j = (j + 1) % n;
                }
                child_genes[idx] = other.genes[j];
                used[other.genes[j]] = true;
                j = (j + 1) % n;
            }
        }

        // Rotations cross independently (uniform)
        let rotations: Vec<usize> = self
            .rotations
            .iter()
            .zip(&other.rotations)
            .map(|(a, b)| if rng.gen() { *a } else { *b })
            .collect();

        Self {
            genes: child_genes,
            rotations,
            fitness: None,
        }
    }

    /// Per-gene mutation.
    ///
    /// Each position is swapped with its successor with probability `rate`;
    /// each item's rotation is redrawn through `pick_rotation` with
    /// probability `rate`.
    pub fn mutate_with<R, F>(&mut self, rate: f64, rng: &mut R, mut pick_rotation: F)
    where
        R: Rng,
        F: FnMut(usize, &mut R) -> usize,
    {
        let mut changed = false;
        for i in 0..self.genes.len().saturating_sub(1) {
            if rng.gen::<f64>() < rate {
                self.genes.swap(i, i + 1);
                changed = true;
            }
        }
        for item in 0..self.rotations.len() {
            if rng.gen::<f64>() < rate {
                self.rotations[item] = pick_rotation(item, rng);
                changed = true;
            }
        }
        if changed {
            self.fitness = None;
        }
    }
}

impl Individual for PermutationChromosome {
    fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        self.order_crossover(other, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

    #[derive(Debug, Clone)]
    struct SimpleIndividual {
        value: f64,
        fitness: Option<f64>,
    }

    impl Individual for SimpleIndividual {
        fn fitness(&self) -> Option<f64> {
            self.fitness
        }

        fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
            Self {
                value: if rng.gen() { self.value } else { other.value },
                fitness: None,
            }
        }
    }

    struct SimpleProblem {
        evaluations: AtomicU32,
        fail_after: Option<u32>,
    }

    impl SimpleProblem {
        fn new() -> Self {
            Self {
                evaluations: AtomicU32::new(0),
                fail_after: None,
            }
        }
    }

    impl GaProblem for SimpleProblem {
        type Individual = SimpleIndividual;

        fn evaluate(&self, individual: &mut Self::Individual) -> Result<()> {
            let count = self.evaluations.fetch_add(1, AtomicOrdering::SeqCst);
            if let Some(limit) = self.fail_after {
                if count >= limit {
                    return Err(Error::Worker("boom".into()));
                }
            }
            // Minimize x^2, optimal at x=0
            individual.fitness = Some(individual.value * individual.value);
            Ok(())
        }

        fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<SimpleIndividual> {
            (0..size)
                .map(|_| SimpleIndividual {
                    value: rng.gen_range(-100.0..100.0),
                    fitness: None,
                })
                .collect()
        }

        fn mutate<R: Rng>(&self, individual: &mut SimpleIndividual, rate: f64, rng: &mut R) {
            if rng.gen::<f64>() < rate {
                individual.value += rng.gen_range(-10.0..10.0);
            }
        }
    }

    #[test]
    fn test_ga_basic() {
        let config = GaConfig::new()
            .with_population_size(30)
            .with_mutation_rate(0.5)
            .with_max_generations(60);

        let runner = GaRunner::new(config, SimpleProblem::new());
        let mut rng = StdRng::seed_from_u64(7);
        let result = runner.run_with_rng(&mut rng).unwrap();

        let best = result.best.unwrap();
        assert!(best.value.abs() < 10.0);
        assert_eq!(result.generations, 60);
        assert!(!result.cancelled);
    }

    #[test]
    fn test_best_fitness_never_increases() {
        let config = GaConfig::new()
            .with_population_size(12)
            .with_max_generations(40);

        let runner = GaRunner::new(config, SimpleProblem::new());
        let mut rng = StdRng::seed_from_u64(42);
        let result = runner.run_with_rng(&mut rng).unwrap();

        assert_eq!(result.history.len(), 40);
        for pair in result.history.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn test_cancel_before_start() {
        let runner = GaRunner::new(GaConfig::new(), SimpleProblem::new());
        runner.cancel_handle().cancel();

        let mut rng = StdRng::seed_from_u64(1);
        let result = runner.run_with_rng(&mut rng).unwrap();
        assert!(result.cancelled);
        assert!(result.best.is_none());
        assert_eq!(result.generations, 0);
    }

    #[test]
    fn test_cancel_from_progress_callback() {
        let runner = GaRunner::new(GaConfig::new().with_population_size(8), SimpleProblem::new());
        let cancel = runner.cancel_handle();

        let mut rng = StdRng::seed_from_u64(3);
        let result = runner
            .run_with_rng_and_progress(
                &mut rng,
                Some(|progress: GaProgress| {
                    if progress.generation == 4 {
                        cancel.cancel();
                    }
                }),
            )
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.generations, 5);
        assert!(result.best.is_some());
    }

    #[test]
    fn test_evaluation_error_halts_run() {
        let problem = SimpleProblem {
            evaluations: AtomicU32::new(0),
            fail_after: Some(25),
        };
        let runner = GaRunner::new(
            GaConfig::new().with_population_size(10).with_max_generations(10),
            problem,
        );
        let mut rng = StdRng::seed_from_u64(5);
        let err = runner.run_with_rng(&mut rng).unwrap_err();
        assert!(matches!(err, Error::Worker(_)));
    }

    #[test]
    fn test_only_unevaluated_individuals_are_scored() {
        let config = GaConfig::new()
            .with_population_size(10)
            .with_max_generations(3);
        let runner = GaRunner::new(config, SimpleProblem::new());
        let mut rng = StdRng::seed_from_u64(9);
        runner.run_with_rng(&mut rng).unwrap();

        // The elite is carried over already scored.
        let evaluations = runner.problem().evaluations.load(AtomicOrdering::SeqCst);
        assert!(evaluations <= 10 + 9 * 2);
    }

    #[test]
    fn test_weighted_index_respects_exclusion() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let idx = weighted_index(5, Some(0), &mut rng);
            assert!(idx > 0 && idx < 5);
        }
        assert_eq!(weighted_index(1, Some(0), &mut rng), 0);
    }

    #[test]
    fn test_weighted_index_prefers_front() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut counts = [0usize; 10];
        for _ in 0..5000 {
            counts[weighted_index(10, None, &mut rng)] += 1;
        }
        assert!(counts[0] > counts[9]);
    }

    #[test]
    fn test_permutation_crossover() {
        let mut rng = StdRng::seed_from_u64(21);
        let parent1 = PermutationChromosome::random_with_options(10, 4, &mut rng);
        let parent2 = PermutationChromosome::random_with_options(10, 4, &mut rng);

        let child = parent1.order_crossover(&parent2, &mut rng);

        // Child should be a valid permutation
        assert_eq!(child.genes.len(), 10);
        let mut sorted = child.genes.clone();
        sorted.sort();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
        assert!(child.fitness().is_none());
        for (item, rotation) in child.rotations.iter().enumerate() {
            assert!(*rotation == parent1.rotations[item] || *rotation == parent2.rotations[item]);
        }
    }

    #[test]
    fn test_permutation_mutation() {
        let mut rng = StdRng::seed_from_u64(22);
        let mut chromosome = PermutationChromosome::random_with_options(10, 4, &mut rng);
        chromosome.set_fitness(1.0);

        chromosome.mutate_with(1.0, &mut rng, |_, _| 3);

        // Should still be a valid permutation
        let mut sorted = chromosome.genes.clone();
        sorted.sort();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
        assert!(chromosome.rotations.iter().all(|&r| r == 3));
        assert!(chromosome.fitness().is_none());
    }

    #[test]
    fn test_zero_rate_mutation_keeps_fitness() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut chromosome = PermutationChromosome::new(6);
        chromosome.set_fitness(2.5);
        chromosome.mutate_with(0.0, &mut rng, |_, _| 1);
        assert_eq!(chromosome.genes, (0..6).collect::<Vec<_>>());
        assert_eq!(chromosome.fitness(), Some(2.5));
    }
}
