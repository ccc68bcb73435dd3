//! Phases de construction : report, demandes, nuits, Early/Late, remplissage.

use super::attempt::Attempt;
use crate::model::{ShiftCode, StaffCategory, StaffId, MAX_FIXED_SHIFTS};
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Reverse;
use std::collections::BTreeSet;

impl<R: Rng> Attempt<'_, R> {
    /// Report de la période précédente : nuit → lendemain + repos, lendemain → repos.
    pub(super) fn carry_over(&mut self) {
        let ctx = self.ctx;
        for id in ctx.staff_ids() {
            match ctx.staff(id).previous_shift {
                ShiftCode::NightRest => self.pin(id, 0, ShiftCode::Off),
                ShiftCode::Night => {
                    self.pin(id, 0, ShiftCode::NightRest);
                    if self.days() > 1 {
                        self.pin(id, 1, ShiftCode::Off);
                    }
                }
                _ => {}
            }
        }
    }

    /// Shifts imposés, congés, demandes de shift, puis temps partiels.
    pub(super) fn apply_fixed_and_requests(&mut self) {
        let ctx = self.ctx;
        for id in ctx.staff_ids() {
            self.apply_fixed_shifts(id);
            self.apply_rest_requests(id);
            self.apply_work_requests(id);
            self.fill_part_time(id);
        }
    }

    fn apply_fixed_shifts(&mut self, id: StaffId) {
        let days = self.days();
        let ctx = self.ctx;
        let record = ctx.staff(id);
        for (day, code) in record
            .fixed_shifts
            .iter()
            .enumerate()
            .take(MAX_FIXED_SHIFTS.min(days))
        {
            let Some(code) = *code else { continue };
            if self.is_locked(id, day) {
                continue;
            }
            self.pin(id, day, code);
            if code != ShiftCode::Night {
                continue;
            }
            if self.schedule.is_empty(id, day + 1) {
                self.pin(id, day + 1, ShiftCode::NightRest);
            }
            if day + 2 < days {
                match self.schedule.get(id, day + 2) {
                    None => self.pin(id, day + 2, ShiftCode::Off),
                    Some(ShiftCode::RequestedOff) => self.lock(id, day + 2),
                    _ => {}
                }
            }
        }
    }

    fn apply_rest_requests(&mut self, id: StaffId) {
        let ctx = self.ctx;
        let record = ctx.staff(id);
        for &d in &record.requested_off_days {
            let Some(day) = self.day_index(d) else { continue };
            // un repos posé par une cascade devient le repos demandé
            if matches!(self.schedule.get(id, day), None | Some(ShiftCode::Off)) {
                self.pin(id, day, ShiftCode::RequestedOff);
            }
        }
        for (days, code) in [
            (&record.refresh_days, ShiftCode::Refresh),
            (&record.paid_leave_days, ShiftCode::Paid),
        ] {
            for &d in days {
                let Some(day) = self.day_index(d) else { continue };
                if self.schedule.is_empty(id, day) {
                    self.pin(id, day, code);
                }
            }
        }
    }

    fn apply_work_requests(&mut self, id: StaffId) {
        let ctx = self.ctx;
        let record = ctx.staff(id);
        for (days, code) in [
            (&record.early_days, ShiftCode::Early),
            (&record.late_days, ShiftCode::Late),
            (&record.day_days, ShiftCode::Day),
        ] {
            if !record.category.allows(code) {
                continue;
            }
            for &d in days {
                let Some(day) = self.day_index(d) else { continue };
                if self.schedule.is_empty(id, day) && self.can_place(id, day, code) {
                    self.pin(id, day, code);
                }
            }
        }
    }

    fn fill_part_time(&mut self, id: StaffId) {
        let category = self.ctx.staff(id).category;
        if category == StaffCategory::Regular {
            return;
        }
        for day in 0..self.days() {
            if !self.schedule.is_empty(id, day) {
                continue;
            }
            match category {
                StaffCategory::Regular => {}
                StaffCategory::PartTimeDayOnly => self.schedule.put(id, day, ShiftCode::Day),
                StaffCategory::PartTimeEarlyOnly => {
                    let code = if self.schedule.count_code(day, ShiftCode::Early) == 0 {
                        ShiftCode::Early
                    } else {
                        ShiftCode::Day
                    };
                    self.schedule.put(id, day, code);
                }
            }
        }
    }

    /// Nuits demandées explicitement (Regular), avec cascade figée.
    pub(super) fn place_night_requests(&mut self) {
        let ctx = self.ctx;
        for id in ctx.regular_ids() {
            for &d in &ctx.staff(id).night_days {
                let Some(day) = self.day_index(d) else { continue };
                if !self.is_locked(id, day) && self.can_place_night(id, day) {
                    self.pin_night(id, day);
                }
            }
        }
    }

    fn pin_night(&mut self, id: StaffId, day: usize) {
        let days = self.days();
        self.pin(id, day, ShiftCode::Night);
        if day + 1 < days && !self.is_locked(id, day + 1) {
            if self.schedule.get(id, day + 1) != Some(ShiftCode::RequestedOff) {
                self.schedule.put(id, day + 1, ShiftCode::NightRest);
            }
            self.lock(id, day + 1);
        }
        if day + 2 < days && !self.is_locked(id, day + 2) {
            match self.schedule.get(id, day + 2) {
                None => self.pin(id, day + 2, ShiftCode::Off),
                Some(ShiftCode::RequestedOff) => self.lock(id, day + 2),
                _ => {}
            }
        }
    }

    /// Pose une nuit et sa cascade sans les figer.
    pub(super) fn place_night(&mut self, id: StaffId, day: usize) {
        let days = self.days();
        self.schedule.put(id, day, ShiftCode::Night);
        if day + 1 < days && self.schedule.get(id, day + 1) != Some(ShiftCode::RequestedOff) {
            self.schedule.put(id, day + 1, ShiftCode::NightRest);
        }
        if self.schedule.is_empty(id, day + 2) {
            self.schedule.put(id, day + 2, ShiftCode::Off);
        }
    }

    /// Une nuit par jour : d'abord alignée sur les repos demandés, puis au hasard.
    pub(super) fn cover_nights(&mut self) {
        self.align_nights_with_rest_days();
        self.fill_remaining_nights();
    }

    fn align_nights_with_rest_days(&mut self) {
        let ctx = self.ctx;
        for id in ctx.regular_ids() {
            let record = ctx.staff(id);
            if self.schedule.night_count(id) >= record.night_target {
                continue;
            }
            let rest_days: BTreeSet<u32> = record
                .requested_off_days
                .iter()
                .chain(&record.refresh_days)
                .chain(&record.paid_leave_days)
                .copied()
                .collect();

            for rest_day in rest_days {
                // nuit deux jours avant le repos (1-based → index)
                let Some(night) = rest_day.checked_sub(3).map(|d| d as usize) else {
                    continue;
                };
                if night >= self.days() || self.schedule.count_code(night, ShiftCode::Night) > 0 {
                    continue;
                }
                if self.can_place_night(id, night) {
                    self.place_night(id, night);
                    if self.schedule.night_count(id) >= record.night_target {
                        break;
                    }
                }
            }
        }
    }

    fn fill_remaining_nights(&mut self) {
        let ctx = self.ctx;
        let mut order: Vec<usize> = (0..self.days()).collect();
        order.shuffle(&mut self.rng);

        for day in order {
            if self.schedule.count_code(day, ShiftCode::Night) > 0 {
                continue;
            }
            let candidates: Vec<(StaffId, i64)> = ctx
                .regular_ids()
                .filter(|&id| self.can_place_night(id, day))
                .map(|id| {
                    let gap = i64::from(ctx.staff(id).night_target)
                        - i64::from(self.schedule.night_count(id));
                    (id, gap)
                })
                .collect();
            if let Some(id) = self.pick_most_behind(&candidates) {
                self.place_night(id, day);
            }
        }
    }

    /// Le plus en retard sur son objectif, tirage au sort entre ex aequo.
    fn pick_most_behind(&mut self, candidates: &[(StaffId, i64)]) -> Option<StaffId> {
        let top = candidates.iter().map(|&(_, gap)| gap).max()?;
        let best: Vec<StaffId> = candidates
            .iter()
            .filter(|&&(_, gap)| gap == top)
            .map(|&(id, _)| id)
            .collect();
        Some(best[self.rng.random_range(0..best.len())])
    }

    /// Un Late puis un Early pour chaque jour qui n'en a pas.
    pub(super) fn cover_early_late(&mut self) {
        for day in 0..self.days() {
            self.cover_role(day, ShiftCode::Late);
            self.cover_role(day, ShiftCode::Early);
        }
    }

    fn cover_role(&mut self, day: usize, code: ShiftCode) {
        if self.schedule.count_code(day, code) > 0 {
            return;
        }
        let ctx = self.ctx;
        let candidates: Vec<StaffId> = ctx
            .staff_ids()
            .filter(|&id| {
                let category = ctx.staff(id).category;
                let eligible = match category {
                    StaffCategory::Regular => true,
                    StaffCategory::PartTimeEarlyOnly => code == ShiftCode::Early,
                    StaffCategory::PartTimeDayOnly => false,
                };
                eligible && self.schedule.is_empty(id, day) && self.can_place(id, day, code)
            })
            .collect();
        if candidates.is_empty() {
            return;
        }
        let id = candidates[self.rng.random_range(0..candidates.len())];
        self.schedule.put(id, day, code);
    }

    /// Day jusqu'au quota, jours les moins pourvus d'abord.
    pub(super) fn fill_day_shifts(&mut self) {
        let ctx = self.ctx;
        for id in ctx.regular_ids() {
            let Some(quota) = ctx.quota(id) else { continue };
            let mut open = self.schedule.empty_days(id);
            open.sort_by_key(|&d| self.schedule.day_shift_headcount(d));

            for day in open {
                let worked = self.schedule.count_in_row(id, ShiftCode::is_work);
                if worked >= quota as usize {
                    break;
                }
                if self.can_place(id, day, ShiftCode::Day) {
                    self.schedule.put(id, day, ShiftCode::Day);
                }
            }
        }
    }

    /// Off jusqu'à l'objectif, sur les jours déjà bien couverts.
    pub(super) fn fill_rest_days(&mut self) {
        let ctx = self.ctx;
        let target = ctx.target_off_days() as usize;
        for id in ctx.regular_ids() {
            let current = self.schedule.count_in_row(id, ShiftCode::is_off);
            if current >= target {
                continue;
            }
            let open = self.schedule.empty_days(id);
            if open.is_empty() {
                continue;
            }
            let needed = target - current;

            let mut scored: Vec<(usize, i64)> = open
                .iter()
                .map(|&day| (day, self.rest_day_score(id, day)))
                .collect();
            scored.sort_by_key(|&(_, score)| Reverse(score));

            let mut placed = 0;
            for (day, _) in scored {
                if placed >= needed {
                    break;
                }
                if self.can_place(id, day, ShiftCode::Off) {
                    self.schedule.put(id, day, ShiftCode::Off);
                    placed += 1;
                }
            }
        }
    }

    fn rest_day_score(&self, id: StaffId, day: usize) -> i64 {
        let ctx = self.ctx;
        let covered = self.schedule.day_shift_headcount(day) as i64;
        let others_open = ctx
            .regular_ids()
            .filter(|&other| other != id && self.schedule.is_empty(other, day))
            .count() as i64;
        let immovable = self.schedule.count_on(day, |c| {
            matches!(
                c,
                ShiftCode::RequestedOff | ShiftCode::Paid | ShiftCode::Refresh
            )
        }) as i64;
        covered + others_open - immovable
    }

    /// Cases encore vides : premier code légal parmi Day, Early, Late, Off.
    pub(super) fn fill_remainder(&mut self) {
        let ctx = self.ctx;
        for id in ctx.regular_ids() {
            let mut open = self.schedule.empty_days(id);
            open.sort_by_key(|&d| self.schedule.day_shift_headcount(d));
            for day in open {
                if let Some(code) = [
                    ShiftCode::Day,
                    ShiftCode::Early,
                    ShiftCode::Late,
                    ShiftCode::Off,
                ]
                .into_iter()
                .find(|&code| self.can_place(id, day, code))
                {
                    self.schedule.put(id, day, code);
                }
            }
        }
    }
}
