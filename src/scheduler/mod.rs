mod attempt;
mod conflicts;
mod context;
mod placement;
mod repair;
mod scoring;
mod types;

pub use context::{days_in_month, SolverContext};
pub use scoring::{penalty, variance, Coverage};
pub use types::{
    Conflict, ConflictKind, Diagnostic, Severity, SolveError, SolveOptions, SolverConfig,
};

use crate::model::{Schedule, SolveRequest, SolveResponse, StaffId};
use attempt::{Attempt, AttemptOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

/// Grille retenue à l'issue d'une résolution.
#[derive(Debug, Clone)]
pub struct Solution {
    pub schedule: Schedule,
    pub penalty: i64,
    pub diagnostics: Vec<Diagnostic>,
    /// Tentatives effectivement exécutées.
    pub attempts: usize,
}

impl Solution {
    /// Vrai si au moins un diagnostic est de gravité `Error`.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity() == Severity::Error)
    }

    pub fn to_response(&self, ctx: &SolverContext) -> SolveResponse {
        let schedule = ctx
            .staff_ids()
            .map(|id| (ctx.staff(id).name.clone(), self.schedule.row(id).to_vec()))
            .collect();
        SolveResponse {
            schedule,
            diagnostics: self.diagnostics.iter().map(ToString::to_string).collect(),
            year: ctx.year(),
            month: ctx.month(),
            days_in_month: ctx.days(),
            penalty: self.penalty,
            attempts: self.attempts,
        }
    }
}

/// Tentative notée, candidate au meilleur emplacement.
struct Scored {
    index: usize,
    penalty: i64,
    outcome: AttemptOutcome,
}

impl Scored {
    /// Pénalité plus basse d'abord, puis plus petit index.
    fn beats(&self, other: &Scored) -> bool {
        (self.penalty, self.index) < (other.penalty, other.index)
    }
}

/// Scheduler : encapsule le contexte validé d'une requête
#[derive(Debug, Clone)]
pub struct Scheduler {
    ctx: SolverContext,
}

impl Scheduler {
    pub fn new(request: &SolveRequest) -> Result<Self, SolveError> {
        Self::with_config(request, SolverConfig::default())
    }

    pub fn with_config(request: &SolveRequest, config: SolverConfig) -> Result<Self, SolveError> {
        Ok(Self {
            ctx: SolverContext::new(request, config)?,
        })
    }

    pub fn context(&self) -> &SolverContext {
        &self.ctx
    }

    /// Résout avec la graine des options (ou l'entropie de l'OS).
    pub fn solve(&self, opts: SolveOptions) -> Solution {
        let mut rng = match opts.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.solve_with_rng(&mut rng, opts.parallel)
    }

    /// Résout avec un générateur injecté.
    ///
    /// Une graine est tirée par tentative avant de commencer : chaque tentative
    /// possède son propre `StdRng`. En séquentiel, même générateur ⇒ même grille.
    pub fn solve_with_rng<R: Rng>(&self, rng: &mut R, parallel: bool) -> Solution {
        let seeds: Vec<u64> = (0..self.ctx.max_attempts()).map(|_| rng.random()).collect();
        let (best, attempts) = if parallel {
            self.search_parallel(&seeds)
        } else {
            self.search_sequential(&seeds)
        };

        let diagnostics =
            conflicts::collect_diagnostics(&self.ctx, &best.outcome.schedule, &best.outcome.forced);
        info!(
            penalty = best.penalty,
            attempts,
            best_attempt = best.index,
            diagnostics = diagnostics.len(),
            "solve finished"
        );
        Solution {
            schedule: best.outcome.schedule,
            penalty: best.penalty,
            diagnostics,
            attempts,
        }
    }

    fn run_attempt(&self, index: usize, seed: u64) -> (Scored, bool) {
        let outcome = Attempt::new(&self.ctx, StdRng::seed_from_u64(seed)).run();
        let coverage = Coverage::of(&self.ctx, &outcome.schedule);
        let penalty = scoring::penalty_with(&self.ctx, &outcome.schedule, &coverage);
        let done = scoring::is_good_enough(&self.ctx, penalty, &coverage);
        (
            Scored {
                index,
                penalty,
                outcome,
            },
            done,
        )
    }

    fn search_sequential(&self, seeds: &[u64]) -> (Scored, usize) {
        let mut best: Option<Scored> = None;
        let mut attempts = 0;
        for (index, &seed) in seeds.iter().enumerate() {
            let (scored, done) = self.run_attempt(index, seed);
            attempts += 1;
            if best.as_ref().map_or(true, |b| scored.beats(b)) {
                debug!(attempt = index, penalty = scored.penalty, "new best");
                best = Some(scored);
            }
            if done {
                debug!(attempt = index, "early exit");
                break;
            }
        }
        match best {
            Some(best) => (best, attempts),
            // max_attempts >= 1 est garanti par la validation
            None => (self.run_attempt(0, 0).0, 1),
        }
    }

    fn search_parallel(&self, seeds: &[u64]) -> (Scored, usize) {
        let stop = AtomicBool::new(false);
        let best: Mutex<Option<Scored>> = Mutex::new(None);
        let attempts: usize = seeds
            .par_iter()
            .enumerate()
            .map(|(index, &seed)| {
                // vérifié entre deux tentatives, jamais pendant
                if stop.load(Ordering::Relaxed) {
                    return 0;
                }
                let (scored, done) = self.run_attempt(index, seed);
                if done {
                    stop.store(true, Ordering::Relaxed);
                }
                let mut slot = best.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.as_ref().map_or(true, |b| scored.beats(b)) {
                    debug!(attempt = index, penalty = scored.penalty, "new best");
                    *slot = Some(scored);
                }
                1
            })
            .sum();

        match best.into_inner().unwrap_or_else(PoisonError::into_inner) {
            Some(best) => (best, attempts),
            None => (self.run_attempt(0, 0).0, 1),
        }
    }

    /// Audit d'une grille contre les règles dures.
    pub fn detect_conflicts(&self, schedule: &Schedule) -> Vec<Conflict> {
        conflicts::detect_conflicts(&self.ctx, schedule)
    }

    /// Diagnostics d'une grille quelconque (sans placements forcés connus).
    pub fn diagnostics(&self, schedule: &Schedule) -> Vec<Diagnostic> {
        conflicts::collect_diagnostics(&self.ctx, schedule, &[])
    }

    pub fn penalty(&self, schedule: &Schedule) -> i64 {
        penalty(&self.ctx, schedule)
    }

    /// Reconstruit la grille d'une réponse existante.
    pub fn schedule_from_response(&self, response: &SolveResponse) -> Result<Schedule, SolveError> {
        self.ctx.schedule_from_rows(&response.schedule)
    }

    pub fn staff_id(&self, name: &str) -> Option<StaffId> {
        self.ctx.find_staff(name)
    }
}
