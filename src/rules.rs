//! Vérificateur de règles : « peut-on poser le code X pour S au jour D ? »
//!
//! Sans état entre deux appels ; tout passe par le `SolverContext` et la
//! grille en cours. Les jours sont indexés à partir de 0.

use crate::model::{Schedule, ShiftCode, StaffId};
use crate::scheduler::SolverContext;

/// Transitions interdites entre deux shifts de jour consécutifs :
/// Day→Early, Late→Early, Late→Day.
pub fn is_reversal(prev: ShiftCode, next: ShiftCode) -> bool {
    matches!(
        (prev, next),
        (ShiftCode::Day, ShiftCode::Early)
            | (ShiftCode::Late, ShiftCode::Early)
            | (ShiftCode::Late, ShiftCode::Day)
    )
}

#[derive(Debug, Clone, Copy)]
pub struct RuleChecker<'a> {
    ctx: &'a SolverContext,
}

impl<'a> RuleChecker<'a> {
    pub fn new(ctx: &'a SolverContext) -> Self {
        Self { ctx }
    }

    /// Code de la veille ; au jour 0, le dernier code de la période précédente.
    pub fn previous_code(
        &self,
        staff: StaffId,
        day: usize,
        schedule: &Schedule,
    ) -> Option<ShiftCode> {
        if day == 0 {
            Some(self.ctx.staff(staff).previous_shift)
        } else {
            schedule.get(staff, day - 1)
        }
    }

    /// Jours travaillés contigus avant `day`, report de la période précédente inclus.
    pub fn consecutive_work_before(&self, staff: StaffId, day: usize, schedule: &Schedule) -> u32 {
        let mut streak = 0u32;
        for d in (0..day).rev() {
            match schedule.get(staff, d) {
                Some(code) if code.is_work() => streak += 1,
                _ => return streak,
            }
        }
        streak.saturating_add(self.ctx.staff(staff).previous_streak)
    }

    fn consecutive_work_after(&self, staff: StaffId, day: usize, schedule: &Schedule) -> u32 {
        let days = schedule.days();
        let run = ((day + 1)..days)
            .take_while(|&d| schedule.get(staff, d).is_some_and(ShiftCode::is_work))
            .count();
        // nuit en dernier jour : son lendemain hors période compte aussi
        let trailing_night = run > 0
            && day + 1 + run == days
            && schedule.get(staff, days - 1) == Some(ShiftCode::Night);
        run as u32 + u32::from(trailing_night)
    }

    /// Vrai si la série de travail qui touche `day` (avant ou après) contient
    /// une nuit ou un lendemain de nuit.
    pub fn has_night_in_streak(&self, staff: StaffId, day: usize, schedule: &Schedule) -> bool {
        self.night_before(staff, day, schedule) || self.night_after(staff, day, schedule)
    }

    fn night_before(&self, staff: StaffId, day: usize, schedule: &Schedule) -> bool {
        for d in (0..day).rev() {
            match schedule.get(staff, d) {
                Some(code) if code.is_night_family() => return true,
                Some(code) if code.is_work() => {}
                _ => return false,
            }
        }
        self.ctx.staff(staff).previous_shift.is_night_family()
    }

    fn night_after(&self, staff: StaffId, day: usize, schedule: &Schedule) -> bool {
        for d in (day + 1)..schedule.days() {
            match schedule.get(staff, d) {
                Some(code) if code.is_night_family() => return true,
                Some(code) if code.is_work() => {}
                _ => return false,
            }
        }
        false
    }

    /// Longueur de la série de shifts de jour qui inclurait `day`.
    fn day_shift_streak(&self, staff: StaffId, day: usize, schedule: &Schedule) -> u32 {
        let record = self.ctx.staff(staff);
        let mut streak = 1u32;

        let mut reached_start = true;
        for d in (0..day).rev() {
            if schedule.get(staff, d).is_some_and(ShiftCode::is_day_shift) {
                streak += 1;
            } else {
                reached_start = false;
                break;
            }
        }
        if reached_start && record.previous_shift.is_day_shift() {
            streak = streak.saturating_add(record.previous_streak);
        }

        streak
            + ((day + 1)..schedule.days())
                .take_while(|&d| schedule.get(staff, d).is_some_and(ShiftCode::is_day_shift))
                .count() as u32
    }

    /// Le code `code` est-il légal pour `staff` au jour `day` ?
    ///
    /// Les règles sont évaluées dans l'ordre et s'arrêtent à la première violation.
    pub fn can_place(
        &self,
        staff: StaffId,
        day: usize,
        schedule: &Schedule,
        code: ShiftCode,
    ) -> bool {
        let prev = self.previous_code(staff, day, schedule);

        // lendemain de nuit : repos uniquement
        if prev == Some(ShiftCode::NightRest) && !code.is_off() {
            return false;
        }

        if code.is_day_shift() {
            if prev.is_some_and(|p| is_reversal(p, code)) {
                return false;
            }
            // le voisin de droite a pu être décidé avant nous
            if let Some(next) = schedule.get(staff, day + 1) {
                if next.is_day_shift() && is_reversal(code, next) {
                    return false;
                }
            }
        }

        if code.is_rest() {
            return true;
        }

        if code == ShiftCode::NightRest && prev != Some(ShiftCode::Night) {
            return false;
        }

        let config = self.ctx.config();
        // une nuit réserve aussi la case de son lendemain
        let own = if code == ShiftCode::Night { 2 } else { 1 };
        let total = self.consecutive_work_before(staff, day, schedule)
            + own
            + self.consecutive_work_after(staff, day, schedule);
        if total > config.max_consecutive_work {
            return false;
        }

        if code.is_day_shift()
            && self.ctx.staff(staff).is_regular()
            && self.day_shift_streak(staff, day, schedule) > config.max_day_shift_streak
            && !self.has_night_in_streak(staff, day, schedule)
        {
            return false;
        }

        true
    }

    /// `can_place(.., Night)` plus les contraintes de cascade :
    /// Regular uniquement, case vide, lendemain libre (jamais un repos demandé),
    /// surlendemain vide ou repos.
    pub fn can_place_night(&self, staff: StaffId, day: usize, schedule: &Schedule) -> bool {
        if !self.ctx.staff(staff).is_regular() {
            return false;
        }
        if !schedule.is_empty(staff, day) {
            return false;
        }
        let days = schedule.days();
        if day + 1 < days
            && !matches!(schedule.get(staff, day + 1), None | Some(ShiftCode::NightRest))
        {
            return false;
        }
        if day + 2 < days
            && !matches!(
                schedule.get(staff, day + 2),
                None | Some(ShiftCode::Off) | Some(ShiftCode::RequestedOff)
            )
        {
            return false;
        }
        self.can_place(staff, day, schedule, ShiftCode::Night)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SolveRequest, StaffCategory, StaffRecord};
    use crate::scheduler::SolverConfig;
    use ShiftCode::*;

    // janvier 2025 : 31 jours
    fn ctx(staff: Vec<StaffRecord>) -> SolverContext {
        let request = SolveRequest {
            year: 2025,
            month: 1,
            target_off_days: 9,
            max_attempts: 1,
            staff,
        };
        SolverContext::new(&request, SolverConfig::default()).unwrap()
    }

    fn fill(schedule: &mut Schedule, staff: StaffId, start: usize, codes: &[ShiftCode]) {
        for (offset, code) in codes.iter().enumerate() {
            schedule.put(staff, start + offset, *code);
        }
    }

    const A: StaffId = StaffId::new(0);

    #[test]
    fn work_and_rest_partition_the_vocabulary() {
        for code in ShiftCode::ALL {
            assert_ne!(code.is_work(), code.is_rest(), "{code:?}");
        }
        assert_eq!(ShiftCode::ALL.iter().filter(|c| c.is_work()).count(), 5);
    }

    #[test]
    fn reversal_pairs() {
        assert!(is_reversal(Day, Early));
        assert!(is_reversal(Late, Early));
        assert!(is_reversal(Late, Day));
        assert!(!is_reversal(Early, Day));
        assert!(!is_reversal(Early, Late));
        assert!(!is_reversal(Night, Early));
    }

    #[test]
    fn reversal_checked_in_both_directions() {
        let ctx = ctx(vec![StaffRecord::regular("a")]);
        let rules = RuleChecker::new(&ctx);
        let mut s = ctx.empty_schedule();

        s.put(A, 4, Late);
        assert!(!rules.can_place(A, 5, &s, Early));
        assert!(!rules.can_place(A, 5, &s, Day));
        assert!(rules.can_place(A, 5, &s, Late));

        s.put(A, 10, Early);
        assert!(!rules.can_place(A, 9, &s, Day));
        assert!(!rules.can_place(A, 9, &s, Late));
        assert!(rules.can_place(A, 9, &s, Early));
        assert!(rules.can_place(A, 9, &s, Off));
    }

    #[test]
    fn night_rest_is_followed_by_off_only() {
        let ctx = ctx(vec![StaffRecord::regular("a")]);
        let rules = RuleChecker::new(&ctx);
        let mut s = ctx.empty_schedule();
        fill(&mut s, A, 3, &[Night, NightRest]);

        assert!(rules.can_place(A, 5, &s, Off));
        assert!(rules.can_place(A, 5, &s, RequestedOff));
        assert!(!rules.can_place(A, 5, &s, Paid));
        assert!(!rules.can_place(A, 5, &s, Day));
        assert!(!rules.can_place(A, 5, &s, Night));
        assert!(!rules.can_place(A, 8, &s, NightRest));
    }

    #[test]
    fn previous_period_is_consulted_on_day_zero() {
        let ctx = ctx(vec![StaffRecord::regular("a").with_previous(NightRest, 2)]);
        let rules = RuleChecker::new(&ctx);
        let s = ctx.empty_schedule();
        assert_eq!(rules.previous_code(A, 0, &s), Some(NightRest));
        assert!(!rules.can_place(A, 0, &s, Day));
        assert!(rules.can_place(A, 0, &s, Off));
    }

    #[test]
    fn consecutive_cap_counts_carry_over_and_night_double() {
        let ctx = ctx(vec![StaffRecord::regular("a").with_previous(Day, 3)]);
        let rules = RuleChecker::new(&ctx);
        let mut s = ctx.empty_schedule();
        s.put(A, 0, Early);
        assert_eq!(rules.consecutive_work_before(A, 1, &s), 4);
        // 4 + nuit(2) > 5
        assert!(!rules.can_place(A, 1, &s, Night));

        s.put(A, 0, Off);
        fill(&mut s, A, 1, &[Early, Early, Day]);
        fill(&mut s, A, 5, &[Night, NightRest]);
        // 3 avant + 1 + 2 après
        assert!(!rules.can_place(A, 4, &s, Day));
        assert!(rules.can_place(A, 4, &s, Off));
    }

    #[test]
    fn night_on_last_day_counts_its_rest_in_the_forward_run() {
        let ctx = ctx(vec![
            StaffRecord::regular("a"),
            StaffRecord::new("p", StaffCategory::PartTimeDayOnly),
        ]);
        let rules = RuleChecker::new(&ctx);
        let part = StaffId::new(1);
        let mut s = ctx.empty_schedule();

        // 0 + 1 + (3 + lendemain hors période)
        fill(&mut s, A, 28, &[Day, Day, Night]);
        assert!(rules.can_place(A, 27, &s, Day));

        // 1 + 1 + 4 > 5
        s.put(A, 26, Early);
        assert!(!rules.can_place(A, 27, &s, Day));
        assert!(rules.can_place(A, 27, &s, Off));

        // même série terminée par un Late : pas de jour en plus
        fill(&mut s, part, 26, &[Early]);
        fill(&mut s, part, 28, &[Day, Day, Late]);
        assert!(rules.can_place(part, 27, &s, Day));
    }

    #[test]
    fn day_shift_streak_needs_a_night() {
        let ctx = ctx(vec![
            StaffRecord::regular("a"),
            StaffRecord::new("p", StaffCategory::PartTimeDayOnly),
        ]);
        let rules = RuleChecker::new(&ctx);
        let part = StaffId::new(1);
        let mut s = ctx.empty_schedule();
        fill(&mut s, A, 10, &[Early, Day, Day]);
        fill(&mut s, part, 10, &[Early, Day, Day]);

        assert!(!rules.can_place(A, 13, &s, Day));
        assert!(rules.can_place(part, 13, &s, Day));

        let mut s = ctx.empty_schedule();
        fill(&mut s, A, 10, &[Early, Day, Day]);
        s.put(A, 14, Night);
        assert!(rules.has_night_in_streak(A, 13, &s));
        assert!(rules.can_place(A, 13, &s, Day));
    }

    #[test]
    fn night_rest_requires_night_before() {
        let ctx = ctx(vec![StaffRecord::regular("a")]);
        let rules = RuleChecker::new(&ctx);
        let mut s = ctx.empty_schedule();
        assert!(!rules.can_place(A, 6, &s, NightRest));
        s.put(A, 5, Night);
        assert!(rules.can_place(A, 6, &s, NightRest));
    }

    #[test]
    fn night_placement_guards_the_cascade() {
        let ctx = ctx(vec![
            StaffRecord::regular("a"),
            StaffRecord::new("p", StaffCategory::PartTimeEarlyOnly),
        ]);
        let rules = RuleChecker::new(&ctx);
        let mut s = ctx.empty_schedule();

        assert!(rules.can_place_night(A, 10, &s));
        assert!(!rules.can_place_night(StaffId::new(1), 10, &s));

        s.put(A, 11, RequestedOff);
        assert!(!rules.can_place_night(A, 10, &s));

        s.clear(A, 11);
        s.put(A, 12, Paid);
        assert!(!rules.can_place_night(A, 10, &s));

        s.put(A, 12, RequestedOff);
        assert!(rules.can_place_night(A, 10, &s));

        s.put(A, 10, Day);
        assert!(!rules.can_place_night(A, 10, &s));

        // fin de mois : pas de cascade à vérifier
        assert!(rules.can_place_night(A, 30, &s));
    }
}
