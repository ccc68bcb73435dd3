use crate::model::ShiftCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Constantes réglables du moteur (poids de pénalité, seuils, budgets).
///
/// Valeurs empiriques : on les garde nommées et surchargeables plutôt que
/// de les recalculer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverConfig {
    pub penalty_off_days: i64,
    pub penalty_night_target: i64,
    pub penalty_early_missing: i64,
    pub penalty_late_missing: i64,
    pub penalty_night_missing: i64,
    pub penalty_day_shortage: i64,
    pub penalty_duplicate: i64,
    pub penalty_variance: f64,
    pub penalty_range: i64,
    /// Écart max-min d'effectif à partir duquel `penalty_range` s'applique.
    pub range_threshold: usize,
    /// Effectif minimal Early+Day+Late par jour.
    pub min_day_staff: usize,
    /// Effectif à partir duquel un jour peut céder quelqu'un.
    pub surplus_day_staff: usize,
    pub max_consecutive_work: u32,
    /// Au-delà, une série de shifts de jour sans nuit est refusée (Regular).
    pub max_day_shift_streak: u32,
    /// Écart d'effectif qui déclenche l'équilibrage.
    pub balance_spread: usize,
    pub balance_iterations: usize,
    pub shortage_iterations: usize,
    /// Sortie anticipée dès qu'une tentative sans trou descend sous ce seuil.
    pub early_exit_penalty: i64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            penalty_off_days: 100,
            penalty_night_target: 50,
            penalty_early_missing: 300,
            penalty_late_missing: 300,
            penalty_night_missing: 500,
            penalty_day_shortage: 100,
            penalty_duplicate: 500,
            penalty_variance: 30.0,
            penalty_range: 50,
            range_threshold: 3,
            min_day_staff: 3,
            surplus_day_staff: 4,
            max_consecutive_work: 5,
            max_day_shift_streak: 3,
            balance_spread: 2,
            balance_iterations: 30,
            shortage_iterations: 20,
            early_exit_penalty: 100,
        }
    }
}

/// Options d'exécution d'une résolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveOptions {
    /// Graine du générateur ; `None` = entropie de l'OS.
    pub seed: Option<u64>,
    /// Répartit les tentatives sur le pool rayon.
    pub parallel: bool,
}

#[derive(Error, Debug)]
pub enum SolveError {
    #[error("staff list is empty")]
    EmptyStaff,
    #[error("invalid period: {year}-{month}")]
    InvalidPeriod { year: i32, month: u32 },
    #[error("target off days out of range (1..=15): {0}")]
    TargetOffDaysOutOfRange(u32),
    #[error("max attempts out of range (1..=10000): {0}")]
    MaxAttemptsOutOfRange(u32),
    #[error("invalid staff name: {0:?}")]
    InvalidStaffName(String),
    #[error("duplicate staff name: {0}")]
    DuplicateStaff(String),
    #[error("previous streak out of range (0..=10) for {staff}: {value}")]
    PreviousStreakOutOfRange { staff: String, value: u32 },
    #[error("night target out of range (0..=10) for {staff}: {value}")]
    NightTargetOutOfRange { staff: String, value: u32 },
    #[error("too many fixed shifts for {staff}: {count} (max 3)")]
    TooManyFixedShifts { staff: String, count: usize },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Problème détecté sur la grille retenue. Jamais fatal.
///
/// Les jours sont rendus en numérotation 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    MissingEarly { day: usize },
    MissingLate { day: usize },
    MissingNight { day: usize },
    DuplicateEarly { day: usize, count: usize },
    DuplicateLate { day: usize, count: usize },
    DayShortage { day: usize, count: usize },
    UnfilledSlots { staff: String, days: Vec<usize> },
    ForcedPlacement { staff: String, days: Vec<usize> },
    OffDaysDeviation { staff: String, placed: usize, target: u32 },
    NightTargetDeviation { staff: String, placed: u32, target: u32 },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::DayShortage { .. } => Severity::Warning,
            Diagnostic::OffDaysDeviation { .. } | Diagnostic::NightTargetDeviation { .. } => {
                Severity::Info
            }
            _ => Severity::Error,
        }
    }
}

fn join_days(days: &[usize]) -> String {
    days.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingEarly { day } => write!(f, "day {day}: no Early shift assigned"),
            Diagnostic::MissingLate { day } => write!(f, "day {day}: no Late shift assigned"),
            Diagnostic::MissingNight { day } => write!(f, "day {day}: no Night shift assigned"),
            Diagnostic::DuplicateEarly { day, count } => {
                write!(f, "day {day}: {count} Early shifts (expected 1)")
            }
            Diagnostic::DuplicateLate { day, count } => {
                write!(f, "day {day}: {count} Late shifts (expected 1)")
            }
            Diagnostic::DayShortage { day, count } => {
                write!(f, "day {day}: only {count} day-shift staff")
            }
            Diagnostic::UnfilledSlots { staff, days } => {
                write!(f, "{staff}: day(s) {} left unassigned", join_days(days))
            }
            Diagnostic::ForcedPlacement { staff, days } => write!(
                f,
                "{staff}: day(s) {} forced against shift rules",
                join_days(days)
            ),
            Diagnostic::OffDaysDeviation {
                staff,
                placed,
                target,
            } => write!(f, "{staff}: {placed} off days (target {target})"),
            Diagnostic::NightTargetDeviation {
                staff,
                placed,
                target,
            } => write!(f, "{staff}: {placed} night shifts (target {target})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    NightRestWithoutNight,
    NightRestNotFollowedByOff,
    Reversal,
    ConsecutiveOverrun,
    DayShiftStreak,
}

impl ConflictKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictKind::NightRestWithoutNight => "night_rest_without_night",
            ConflictKind::NightRestNotFollowedByOff => "night_rest_not_followed_by_off",
            ConflictKind::Reversal => "reversal",
            ConflictKind::ConsecutiveOverrun => "consecutive_overrun",
            ConflictKind::DayShiftStreak => "day_shift_streak",
        }
    }
}

/// Violation d'une règle dure sur une grille terminée (jour 0-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub staff: String,
    pub day: usize,
    pub code: Option<ShiftCode>,
    pub kind: ConflictKind,
}
