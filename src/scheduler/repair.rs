//! Réparations locales après construction : équilibrage, manques, doublons,
//! nettoyage final.

use super::attempt::Attempt;
use crate::model::ShiftCode;
use rand::Rng;
use std::cmp::Reverse;
use tracing::warn;

impl<R: Rng> Attempt<'_, R> {
    /// Échange Day/Off entre le jour le plus chargé et le moins chargé.
    pub(super) fn balance(&mut self) {
        let config = *self.ctx.config();
        for _ in 0..config.balance_iterations {
            let counts = self.schedule.daily_headcounts();
            // premier max et premier min
            let Some(busiest) = (0..counts.len()).min_by_key(|&d| Reverse(counts[d])) else {
                break;
            };
            let Some(thinnest) = (0..counts.len()).min_by_key(|&d| counts[d]) else {
                break;
            };
            if counts[busiest] - counts[thinnest] < config.balance_spread {
                break;
            }
            if !self.try_balance_swap(busiest, thinnest) {
                break;
            }
        }
    }

    fn try_balance_swap(&mut self, busiest: usize, thinnest: usize) -> bool {
        let ctx = self.ctx;
        for id in ctx.regular_ids() {
            if self.is_locked(id, busiest) || self.is_locked(id, thinnest) {
                continue;
            }
            if self.schedule.get(id, busiest) != Some(ShiftCode::Day)
                || self.schedule.get(id, thinnest) != Some(ShiftCode::Off)
            {
                continue;
            }
            self.schedule.clear(id, busiest);
            self.schedule.clear(id, thinnest);
            if self.can_place(id, busiest, ShiftCode::Off)
                && self.can_place(id, thinnest, ShiftCode::Day)
            {
                self.schedule.put(id, busiest, ShiftCode::Off);
                self.schedule.put(id, thinnest, ShiftCode::Day);
                return true;
            }
            self.schedule.put(id, busiest, ShiftCode::Day);
            self.schedule.put(id, thinnest, ShiftCode::Off);
        }
        false
    }

    /// Comble les Early/Late manquants et les jours sous l'effectif minimal.
    pub(super) fn repair_shortages(&mut self) {
        let iterations = self.ctx.config().shortage_iterations;
        for _ in 0..iterations {
            if !self.repair_one_shortage() {
                break;
            }
        }
    }

    fn repair_one_shortage(&mut self) -> bool {
        let min_staff = self.ctx.config().min_day_staff;
        for day in 0..self.days() {
            if self.schedule.count_code(day, ShiftCode::Early) == 0
                && self.convert_day_to(day, ShiftCode::Early)
            {
                return true;
            }
            if self.schedule.count_code(day, ShiftCode::Late) == 0
                && self.convert_day_to(day, ShiftCode::Late)
            {
                return true;
            }
            if self.schedule.day_shift_headcount(day) < min_staff && self.convert_off_to_day(day) {
                return true;
            }
        }
        false
    }

    fn convert_day_to(&mut self, day: usize, target: ShiftCode) -> bool {
        let ctx = self.ctx;
        for id in ctx.regular_ids() {
            if self.is_locked(id, day) || self.schedule.get(id, day) != Some(ShiftCode::Day) {
                continue;
            }
            if self.try_convert(id, day, target) {
                return true;
            }
        }
        false
    }

    /// Off → Day, seulement pour quelqu'un qui garde un autre Off sur un jour en surplus.
    fn convert_off_to_day(&mut self, day: usize) -> bool {
        let ctx = self.ctx;
        let surplus = ctx.config().surplus_day_staff;
        for id in ctx.regular_ids() {
            if self.is_locked(id, day) || self.schedule.get(id, day) != Some(ShiftCode::Off) {
                continue;
            }
            let has_spare_off = (0..self.days()).any(|other| {
                other != day
                    && self.schedule.get(id, other) == Some(ShiftCode::Off)
                    && !self.is_locked(id, other)
                    && self.schedule.day_shift_headcount(other) >= surplus
            });
            if has_spare_off && self.try_convert(id, day, ShiftCode::Day) {
                return true;
            }
        }
        false
    }

    /// Ramène chaque jour à un seul Early et un seul Late.
    pub(super) fn repair_duplicates(&mut self) {
        for day in 0..self.days() {
            self.reduce_duplicates(day, ShiftCode::Early, ShiftCode::Late);
            self.reduce_duplicates(day, ShiftCode::Late, ShiftCode::Early);
        }
    }

    fn reduce_duplicates(&mut self, day: usize, code: ShiftCode, alternate: ShiftCode) {
        let ctx = self.ctx;
        while self.schedule.count_code(day, code) > 1 {
            let holders: Vec<_> = ctx
                .regular_ids()
                .filter(|&id| self.schedule.get(id, day) == Some(code) && !self.is_locked(id, day))
                .collect();

            let mut converted = false;
            for id in holders {
                self.schedule.clear(id, day);
                if self.can_place(id, day, ShiftCode::Day) {
                    self.schedule.put(id, day, ShiftCode::Day);
                    converted = true;
                    break;
                }
                if self.schedule.count_code(day, alternate) == 0
                    && self.can_place(id, day, alternate)
                {
                    self.schedule.put(id, day, alternate);
                    converted = true;
                    break;
                }
                self.schedule.put(id, day, code);
            }
            // le doublon restant sera signalé dans les diagnostics
            if !converted {
                break;
            }
        }
    }

    /// Dernier recours : toute case vide reçoit Day, sinon Off, sinon Day forcé.
    pub(super) fn final_cleanup(&mut self) {
        let ctx = self.ctx;
        for id in ctx.staff_ids() {
            for day in 0..self.days() {
                if !self.schedule.is_empty(id, day) {
                    continue;
                }
                if self.can_place(id, day, ShiftCode::Day) {
                    self.schedule.put(id, day, ShiftCode::Day);
                } else if self.can_place(id, day, ShiftCode::Off) {
                    self.schedule.put(id, day, ShiftCode::Off);
                } else {
                    warn!(staff = %ctx.staff(id).name, day = day + 1, "forcing Day against shift rules");
                    self.schedule.put(id, day, ShiftCode::Day);
                    self.forced.push((id, day));
                }
            }
        }
    }
}
