use super::{Conflict, ConflictKind, Diagnostic, SolverContext};
use crate::model::{Schedule, ShiftCode, StaffId};
use crate::rules::is_reversal;

/// Audit d'une grille terminée contre les règles dures.
pub(super) fn detect_conflicts(ctx: &SolverContext, schedule: &Schedule) -> Vec<Conflict> {
    let mut out = Vec::new();
    for id in ctx.staff_ids() {
        night_rest_adjacency(ctx, schedule, id, &mut out);
        reversals(ctx, schedule, id, &mut out);
        work_runs(ctx, schedule, id, &mut out);
    }
    out
}

fn conflict(
    ctx: &SolverContext,
    schedule: &Schedule,
    id: StaffId,
    day: usize,
    kind: ConflictKind,
) -> Conflict {
    Conflict {
        staff: ctx.staff(id).name.clone(),
        day,
        code: schedule.get(id, day),
        kind,
    }
}

fn previous(ctx: &SolverContext, schedule: &Schedule, id: StaffId, day: usize) -> Option<ShiftCode> {
    if day == 0 {
        Some(ctx.staff(id).previous_shift)
    } else {
        schedule.get(id, day - 1)
    }
}

fn night_rest_adjacency(
    ctx: &SolverContext,
    schedule: &Schedule,
    id: StaffId,
    out: &mut Vec<Conflict>,
) {
    for day in 0..schedule.days() {
        if schedule.get(id, day) != Some(ShiftCode::NightRest) {
            continue;
        }
        if previous(ctx, schedule, id, day) != Some(ShiftCode::Night) {
            out.push(conflict(ctx, schedule, id, day, ConflictKind::NightRestWithoutNight));
        }
        if day + 1 < schedule.days() && !schedule.get(id, day + 1).is_some_and(ShiftCode::is_off) {
            out.push(conflict(
                ctx,
                schedule,
                id,
                day + 1,
                ConflictKind::NightRestNotFollowedByOff,
            ));
        }
    }
}

fn reversals(ctx: &SolverContext, schedule: &Schedule, id: StaffId, out: &mut Vec<Conflict>) {
    for day in 0..schedule.days() {
        if let (Some(prev), Some(next)) = (previous(ctx, schedule, id, day), schedule.get(id, day)) {
            if is_reversal(prev, next) {
                out.push(conflict(ctx, schedule, id, day, ConflictKind::Reversal));
            }
        }
    }
}

/// Séries de travail : plafond de jours consécutifs et séries de shifts de jour sans nuit.
///
/// Temps partiel exclu : ses lignes sont remplies d'office, sans plafond.
fn work_runs(ctx: &SolverContext, schedule: &Schedule, id: StaffId, out: &mut Vec<Conflict>) {
    let record = ctx.staff(id);
    if !record.is_regular() {
        return;
    }
    let config = ctx.config();
    let days = schedule.days();
    let is_work = |d: usize| schedule.get(id, d).is_some_and(ShiftCode::is_work);

    let mut start = 0;
    while start < days {
        if !is_work(start) {
            start += 1;
            continue;
        }
        let end = (start..days).find(|&d| !is_work(d)).unwrap_or(days);
        let carried = if start == 0 { record.previous_streak } else { 0 };

        let mut length = carried.saturating_add((end - start) as u32);
        // nuit en dernier jour : son lendemain tombe hors période
        if end == days && schedule.get(id, days - 1) == Some(ShiftCode::Night) {
            length += 1;
        }
        if length > config.max_consecutive_work {
            out.push(conflict(ctx, schedule, id, end - 1, ConflictKind::ConsecutiveOverrun));
        }

        let carried_night = start == 0 && record.previous_shift.is_night_family();
        let has_night = carried_night
            || (start..end).any(|d| schedule.get(id, d).is_some_and(ShiftCode::is_night_family));
        if !has_night {
            day_shift_streaks(ctx, schedule, id, start, end, out);
        }
        start = end;
    }
}

fn day_shift_streaks(
    ctx: &SolverContext,
    schedule: &Schedule,
    id: StaffId,
    start: usize,
    end: usize,
    out: &mut Vec<Conflict>,
) {
    let record = ctx.staff(id);
    let limit = ctx.config().max_day_shift_streak;
    let mut streak = 0u32;
    for day in start..end {
        if schedule.get(id, day).is_some_and(ShiftCode::is_day_shift) {
            if streak == 0 && day == 0 && record.previous_shift.is_day_shift() {
                streak = record.previous_streak;
            }
            streak += 1;
            // signalé une seule fois, au jour qui dépasse
            if streak == limit + 1 {
                out.push(conflict(ctx, schedule, id, day, ConflictKind::DayShiftStreak));
            }
        } else {
            streak = 0;
        }
    }
}

/// Diagnostics de la grille retenue : entrées par jour, puis par personne.
pub(super) fn collect_diagnostics(
    ctx: &SolverContext,
    schedule: &Schedule,
    forced: &[(StaffId, usize)],
) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let min_staff = ctx.config().min_day_staff;

    for day in 0..schedule.days() {
        let n = day + 1;
        match schedule.count_code(day, ShiftCode::Early) {
            0 => out.push(Diagnostic::MissingEarly { day: n }),
            1 => {}
            count => out.push(Diagnostic::DuplicateEarly { day: n, count }),
        }
        match schedule.count_code(day, ShiftCode::Late) {
            0 => out.push(Diagnostic::MissingLate { day: n }),
            1 => {}
            count => out.push(Diagnostic::DuplicateLate { day: n, count }),
        }
        if schedule.count_code(day, ShiftCode::Night) == 0 {
            out.push(Diagnostic::MissingNight { day: n });
        }
        let headcount = schedule.day_shift_headcount(day);
        if headcount < min_staff {
            out.push(Diagnostic::DayShortage {
                day: n,
                count: headcount,
            });
        }
    }

    for id in ctx.staff_ids() {
        let record = ctx.staff(id);
        let unfilled: Vec<usize> = schedule.empty_days(id).into_iter().map(|d| d + 1).collect();
        if !unfilled.is_empty() {
            out.push(Diagnostic::UnfilledSlots {
                staff: record.name.clone(),
                days: unfilled,
            });
        }

        let mut forced_days: Vec<usize> = forced
            .iter()
            .filter(|(staff, _)| *staff == id)
            .map(|(_, day)| day + 1)
            .collect();
        if !forced_days.is_empty() {
            forced_days.sort_unstable();
            out.push(Diagnostic::ForcedPlacement {
                staff: record.name.clone(),
                days: forced_days,
            });
        }

        if !record.is_regular() {
            continue;
        }
        let offs = schedule.count_in_row(id, ShiftCode::is_off);
        if offs != ctx.target_off_days() as usize {
            out.push(Diagnostic::OffDaysDeviation {
                staff: record.name.clone(),
                placed: offs,
                target: ctx.target_off_days(),
            });
        }
        let nights = schedule.night_count(id);
        if record.night_target > 0 && nights != record.night_target {
            out.push(Diagnostic::NightTargetDeviation {
                staff: record.name.clone(),
                placed: nights,
                target: record.night_target,
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SolveRequest, StaffCategory, StaffRecord};
    use crate::scheduler::{Severity, SolverConfig};
    use ShiftCode::*;

    const A: StaffId = StaffId::new(0);

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

    fn kinds(conflicts: &[Conflict]) -> Vec<(usize, ConflictKind)> {
        conflicts.iter().map(|c| (c.day, c.kind)).collect()
    }

    #[test]
    fn night_rest_must_sit_between_night_and_off() {
        let ctx = ctx(vec![StaffRecord::regular("a")]);
        let mut s = ctx.empty_schedule();
        s.put(A, 3, NightRest);
        s.put(A, 4, Day);
        assert_eq!(
            kinds(&detect_conflicts(&ctx, &s)),
            vec![
                (3, ConflictKind::NightRestWithoutNight),
                (4, ConflictKind::NightRestNotFollowedByOff)
            ]
        );

        s.put(A, 2, Night);
        s.put(A, 4, RequestedOff);
        assert!(detect_conflicts(&ctx, &s).is_empty());
    }

    #[test]
    fn reversal_against_previous_period() {
        let ctx = ctx(vec![StaffRecord::regular("a").with_previous(Late, 1)]);
        let mut s = ctx.empty_schedule();
        s.put(A, 0, Early);
        let found = detect_conflicts(&ctx, &s);
        assert_eq!(kinds(&found), vec![(0, ConflictKind::Reversal)]);
        assert_eq!(found[0].code, Some(Early));
        assert_eq!(found[0].kind.as_str(), "reversal");
    }

    #[test]
    fn carried_streak_and_trailing_night_count() {
        let ctx = ctx(vec![StaffRecord::regular("a").with_previous(Night, 0)]);
        let mut s = ctx.empty_schedule();
        // 6 jours de travail d'affilée
        for (d, code) in [NightRest, Night, NightRest, Night, NightRest, Early].iter().enumerate() {
            s.put(A, d, *code);
        }
        let found = kinds(&detect_conflicts(&ctx, &s));
        assert!(found.contains(&(5, ConflictKind::ConsecutiveOverrun)));
        assert!(found.contains(&(1, ConflictKind::NightRestNotFollowedByOff)));

        let mut s = ctx.empty_schedule();
        s.put(A, 0, NightRest);
        s.put(A, 1, Off);
        for d in 23..27 {
            s.put(A, d, Day);
        }
        s.put(A, 27, Night);
        // 4 jours + nuit en fin de mois comptée double
        assert!(kinds(&detect_conflicts(&ctx, &s)).contains(&(27, ConflictKind::ConsecutiveOverrun)));
    }

    #[test]
    fn long_day_run_without_night_is_flagged_once() {
        let ctx = ctx(vec![StaffRecord::regular("a").with_previous(Early, 2)]);
        let mut s = ctx.empty_schedule();
        s.put(A, 0, Early);
        s.put(A, 1, Day);
        assert_eq!(
            kinds(&detect_conflicts(&ctx, &s)),
            vec![(1, ConflictKind::DayShiftStreak)]
        );
    }

    #[test]
    fn part_time_rows_are_not_held_to_the_work_caps() {
        let ctx = ctx(vec![
            StaffRecord::regular("a"),
            StaffRecord::new("jour", StaffCategory::PartTimeDayOnly),
            StaffRecord::new("matin", StaffCategory::PartTimeEarlyOnly),
        ]);
        let mut s = ctx.empty_schedule();
        for d in 0..28 {
            s.put(A, d, Day);
            s.put(StaffId::new(1), d, Day);
            s.put(StaffId::new(2), d, Early);
        }

        let found = detect_conflicts(&ctx, &s);
        assert!(found.iter().all(|c| c.staff == "a"), "{found:?}");
        assert_eq!(
            kinds(&found),
            vec![(27, ConflictKind::ConsecutiveOverrun), (3, ConflictKind::DayShiftStreak)]
        );
    }

    #[test]
    fn diagnostics_are_ordered_and_graded() {
        let ctx = ctx(vec![StaffRecord::regular("a").with_night_target(1)]);
        let mut s = ctx.empty_schedule();
        for d in 0..28 {
            s.put(A, d, Off);
        }
        s.put(A, 0, Early);
        let diags = collect_diagnostics(&ctx, &s, &[(A, 0)]);

        assert_eq!(diags[0], Diagnostic::MissingLate { day: 1 });
        assert_eq!(diags[0].to_string(), "day 1: no Late shift assigned");
        assert_eq!(diags[2].severity(), Severity::Warning);

        let tail: Vec<String> = diags.iter().rev().take(3).map(|d| d.to_string()).collect();
        assert_eq!(
            tail,
            vec![
                "a: 0 night shifts (target 1)",
                "a: 27 off days (target 9)",
                "a: day(s) 1 forced against shift rules",
            ]
        );
    }
}
