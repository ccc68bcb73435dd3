use super::SolverContext;
use crate::model::{Schedule, ShiftCode};

/// Trous et doublons de couverture d'une grille, en nombre de jours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coverage {
    pub early_missing: usize,
    pub late_missing: usize,
    pub night_missing: usize,
    pub day_shortage: usize,
    pub duplicates: usize,
}

impl Coverage {
    pub fn of(ctx: &SolverContext, schedule: &Schedule) -> Self {
        let min_staff = ctx.config().min_day_staff;
        let mut coverage = Coverage::default();
        for day in 0..schedule.days() {
            let early = schedule.count_code(day, ShiftCode::Early);
            let late = schedule.count_code(day, ShiftCode::Late);
            coverage.early_missing += usize::from(early == 0);
            coverage.late_missing += usize::from(late == 0);
            coverage.night_missing += usize::from(schedule.count_code(day, ShiftCode::Night) == 0);
            coverage.day_shortage += usize::from(schedule.day_shift_headcount(day) < min_staff);
            coverage.duplicates += usize::from(early > 1) + usize::from(late > 1);
        }
        coverage
    }

    /// Aucun jour sans Early, Late ni Night, et aucun jour sous l'effectif minimal.
    pub fn is_complete(&self) -> bool {
        self.early_missing == 0
            && self.late_missing == 0
            && self.night_missing == 0
            && self.day_shortage == 0
    }
}

/// Variance (population) des effectifs journaliers.
pub fn variance(counts: &[usize]) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    let n = counts.len() as f64;
    let mean = counts.iter().sum::<usize>() as f64 / n;
    counts
        .iter()
        .map(|&c| {
            let delta = c as f64 - mean;
            delta * delta
        })
        .sum::<f64>()
        / n
}

fn abs_diff(placed: usize, target: u32) -> i64 {
    (placed as i64 - i64::from(target)).abs()
}

/// Pénalité d'une grille terminée ; plus bas = meilleur.
pub fn penalty(ctx: &SolverContext, schedule: &Schedule) -> i64 {
    penalty_with(ctx, schedule, &Coverage::of(ctx, schedule))
}

pub(super) fn penalty_with(ctx: &SolverContext, schedule: &Schedule, coverage: &Coverage) -> i64 {
    let config = ctx.config();
    let mut total = 0i64;

    for id in ctx.staff_ids() {
        let record = ctx.staff(id);
        if record.is_regular() {
            let offs = schedule.count_in_row(id, ShiftCode::is_off);
            total += abs_diff(offs, ctx.target_off_days()) * config.penalty_off_days;
        }
        if record.night_target > 0 {
            let nights = schedule.night_count(id) as usize;
            total += abs_diff(nights, record.night_target) * config.penalty_night_target;
        }
    }

    total += coverage.early_missing as i64 * config.penalty_early_missing;
    total += coverage.late_missing as i64 * config.penalty_late_missing;
    total += coverage.night_missing as i64 * config.penalty_night_missing;
    total += coverage.day_shortage as i64 * config.penalty_day_shortage;
    total += coverage.duplicates as i64 * config.penalty_duplicate;

    let counts = schedule.daily_headcounts();
    total += (variance(&counts) * config.penalty_variance) as i64;
    if let (Some(&max), Some(&min)) = (counts.iter().max(), counts.iter().min()) {
        let spread = max - min;
        if spread >= config.range_threshold {
            total += spread as i64 * config.penalty_range;
        }
    }
    total
}

/// Condition de sortie anticipée de la boucle de recherche.
pub fn is_good_enough(ctx: &SolverContext, penalty: i64, coverage: &Coverage) -> bool {
    penalty < ctx.config().early_exit_penalty && coverage.is_complete()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SolveRequest, StaffId, StaffRecord};
    use crate::scheduler::SolverConfig;

    fn ctx(staff: Vec<StaffRecord>) -> SolverContext {
        let request = SolveRequest {
            year: 2025,
            month: 2,
            target_off_days: 9,
            max_attempts: 1,
            staff,
        };
        SolverContext::new(&request, SolverConfig::default()).unwrap()
    }

    #[test]
    fn variance_of_flat_and_spread_counts() {
        assert_eq!(variance(&[]), 0.0);
        assert_eq!(variance(&[3, 3, 3]), 0.0);
        assert!((variance(&[2, 4]) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_grid_pays_for_every_gap() {
        let ctx = ctx(vec![StaffRecord::regular("a").with_night_target(2)]);
        let schedule = ctx.empty_schedule();
        let coverage = Coverage::of(&ctx, &schedule);
        assert_eq!(coverage.early_missing, 28);
        assert_eq!(coverage.night_missing, 28);
        assert_eq!(coverage.day_shortage, 28);
        assert_eq!(coverage.duplicates, 0);
        assert!(!coverage.is_complete());

        // 9 repos manquants, 2 nuits manquantes, puis les trous journaliers
        let expected = 9 * 100 + 2 * 50 + 28 * (300 + 300 + 500 + 100);
        assert_eq!(penalty(&ctx, &schedule), expected);
    }

    #[test]
    fn requested_off_counts_toward_off_days() {
        let ctx = ctx(vec![StaffRecord::regular("a")]);
        let a = StaffId::new(0);
        let mut with_plain = ctx.empty_schedule();
        let mut with_requested = ctx.empty_schedule();
        for day in 0..9 {
            with_plain.put(a, day, ShiftCode::Off);
            with_requested.put(a, day, ShiftCode::RequestedOff);
        }
        assert_eq!(penalty(&ctx, &with_plain), penalty(&ctx, &with_requested));
    }

    #[test]
    fn duplicates_and_spread_are_penalised() {
        let ctx = ctx(vec![
            StaffRecord::regular("a"),
            StaffRecord::regular("b"),
            StaffRecord::regular("c"),
        ]);
        let mut schedule = ctx.empty_schedule();
        for id in ctx.staff_ids() {
            schedule.put(id, 0, ShiftCode::Early);
        }
        let coverage = Coverage::of(&ctx, &schedule);
        assert_eq!(coverage.duplicates, 1);
        assert_eq!(coverage.day_shortage, 27);

        let baseline = {
            let mut flat = ctx.empty_schedule();
            flat.put(StaffId::new(0), 0, ShiftCode::Day);
            flat.put(StaffId::new(1), 0, ShiftCode::Day);
            flat.put(StaffId::new(2), 0, ShiftCode::Day);
            penalty(&ctx, &flat)
        };
        // même effectif : un trou Early de moins mais un doublon
        assert!(penalty(&ctx, &schedule) > baseline);
    }
}
