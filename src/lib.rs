#![forbid(unsafe_code)]
//! Shift roster — génération de plannings mensuels de postes (sans BD).
//!
//! - Vérificateur de règles d'enchaînement (nuit, repos, inversions, séries).
//! - Solveur par tentatives aléatoires, on garde la meilleure.
//! - Requêtes/réponses JSON, export CSV.

pub mod io;
pub mod model;
pub mod rules;
pub mod scheduler;

pub use model::{
    Schedule, ShiftCode, SolveRequest, SolveResponse, StaffCategory, StaffId, StaffRecord,
};
pub use rules::RuleChecker;
pub use scheduler::{
    Conflict, ConflictKind, Diagnostic, Scheduler, Severity, Solution, SolveError, SolveOptions,
    SolverConfig, SolverContext,
};

/// Valide la requête, résout et met en forme la réponse.
pub fn solve(request: &SolveRequest, opts: SolveOptions) -> Result<SolveResponse, SolveError> {
    let scheduler = Scheduler::new(request)?;
    let solution = scheduler.solve(opts);
    Ok(solution.to_response(scheduler.context()))
}
