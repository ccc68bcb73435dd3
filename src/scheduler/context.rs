use super::types::{SolveError, SolverConfig};
use crate::model::{
    Schedule, ShiftCode, SolveRequest, StaffId, StaffRecord, MAX_CARRIED_STREAK, MAX_FIXED_SHIFTS,
    MAX_NIGHT_TARGET,
};
use anyhow::anyhow;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Nombre de jours du mois, `None` si la période est invalide.
pub fn days_in_month(year: i32, month: u32) -> Option<usize> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    usize::try_from(next.signed_duration_since(first).num_days()).ok()
}

/// Contexte immuable d'une résolution : période, table du personnel, quotas, réglages.
///
/// Passé explicitement au vérificateur de règles et à chaque phase.
#[derive(Debug, Clone)]
pub struct SolverContext {
    year: i32,
    month: u32,
    days: usize,
    target_off_days: u32,
    max_attempts: u32,
    staff: Vec<StaffRecord>,
    quotas: Vec<Option<u32>>,
    config: SolverConfig,
}

impl SolverContext {
    /// Valide la requête ; aucune tentative n'est lancée si elle est refusée.
    pub fn new(request: &SolveRequest, config: SolverConfig) -> Result<Self, SolveError> {
        if request.staff.is_empty() {
            return Err(SolveError::EmptyStaff);
        }
        let days = days_in_month(request.year, request.month).ok_or(SolveError::InvalidPeriod {
            year: request.year,
            month: request.month,
        })?;
        if !(1..=15).contains(&request.target_off_days) {
            return Err(SolveError::TargetOffDaysOutOfRange(request.target_off_days));
        }
        if !(1..=10_000).contains(&request.max_attempts) {
            return Err(SolveError::MaxAttemptsOutOfRange(request.max_attempts));
        }

        let mut seen = HashSet::new();
        for record in &request.staff {
            if record.name.trim().is_empty() {
                return Err(SolveError::InvalidStaffName(record.name.clone()));
            }
            if !seen.insert(record.name.as_str()) {
                return Err(SolveError::DuplicateStaff(record.name.clone()));
            }
            if record.previous_streak > MAX_CARRIED_STREAK {
                return Err(SolveError::PreviousStreakOutOfRange {
                    staff: record.name.clone(),
                    value: record.previous_streak,
                });
            }
            if record.night_target > MAX_NIGHT_TARGET {
                return Err(SolveError::NightTargetOutOfRange {
                    staff: record.name.clone(),
                    value: record.night_target,
                });
            }
            if record.fixed_shifts.len() > MAX_FIXED_SHIFTS {
                return Err(SolveError::TooManyFixedShifts {
                    staff: record.name.clone(),
                    count: record.fixed_shifts.len(),
                });
            }
        }

        let quotas = request
            .staff
            .iter()
            .map(|record| {
                if !record.is_regular() {
                    return None;
                }
                let leave = in_period(&record.refresh_days, days) + in_period(&record.paid_leave_days, days);
                let rest = request.target_off_days as usize + leave;
                Some(days.saturating_sub(rest) as u32)
            })
            .collect();

        Ok(Self {
            year: request.year,
            month: request.month,
            days,
            target_off_days: request.target_off_days,
            max_attempts: request.max_attempts,
            staff: request.staff.clone(),
            quotas,
            config,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }
    pub fn month(&self) -> u32 {
        self.month
    }
    pub fn days(&self) -> usize {
        self.days
    }
    pub fn target_off_days(&self) -> u32 {
        self.target_off_days
    }
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn staff(&self, id: StaffId) -> &StaffRecord {
        &self.staff[id.index()]
    }

    pub fn staff_count(&self) -> usize {
        self.staff.len()
    }

    pub fn staff_ids(&self) -> impl Iterator<Item = StaffId> {
        (0..self.staff.len()).map(StaffId::new)
    }

    pub fn regular_ids(&self) -> impl Iterator<Item = StaffId> + '_ {
        self.staff_ids().filter(|&id| self.staff(id).is_regular())
    }

    /// Quota de jours travaillés ; `None` = illimité (temps partiel).
    pub fn quota(&self, id: StaffId) -> Option<u32> {
        self.quotas[id.index()]
    }

    pub fn find_staff(&self, name: &str) -> Option<StaffId> {
        self.staff
            .iter()
            .position(|record| record.name == name)
            .map(StaffId::new)
    }

    pub fn empty_schedule(&self) -> Schedule {
        Schedule::new(self.staff.len(), self.days)
    }

    /// Reconstruit une grille à partir des lignes nommées d'une réponse.
    pub fn schedule_from_rows(
        &self,
        rows: &BTreeMap<String, Vec<Option<ShiftCode>>>,
    ) -> Result<Schedule, SolveError> {
        let mut schedule = self.empty_schedule();
        for (name, codes) in rows {
            let id = self
                .find_staff(name)
                .ok_or_else(|| anyhow!("schedule row for unknown staff: {name}"))?;
            if codes.len() != self.days {
                return Err(anyhow!(
                    "schedule row for {name} has {} days, expected {}",
                    codes.len(),
                    self.days
                )
                .into());
            }
            for (day, code) in codes.iter().enumerate() {
                schedule.set(id, day, *code);
            }
        }
        Ok(schedule)
    }
}

/// Nombre de jours (1-based) d'un ensemble qui tombent dans la période.
fn in_period(days: &BTreeSet<u32>, period: usize) -> usize {
    days.iter().filter(|&&d| d >= 1 && d as usize <= period).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StaffRecord;

    fn request(staff: Vec<StaffRecord>) -> SolveRequest {
        SolveRequest {
            year: 2025,
            month: 2,
            target_off_days: 9,
            max_attempts: 10,
            staff,
        }
    }

    #[test]
    fn february_lengths() {
        assert_eq!(days_in_month(2025, 2), Some(28));
        assert_eq!(days_in_month(2028, 2), Some(29));
        assert_eq!(days_in_month(2025, 12), Some(31));
        assert_eq!(days_in_month(2025, 13), None);
    }

    #[test]
    fn quota_subtracts_leave_inside_period() {
        let mut alice = StaffRecord::regular("alice");
        alice.paid_leave_days.extend([3, 4, 40]);
        let bob = StaffRecord::new("bob", crate::model::StaffCategory::PartTimeDayOnly);
        let ctx = SolverContext::new(&request(vec![alice, bob]), SolverConfig::default()).unwrap();
        assert_eq!(ctx.quota(StaffId::new(0)), Some(28 - 9 - 2));
        assert_eq!(ctx.quota(StaffId::new(1)), None);
    }

    #[test]
    fn rejects_bad_requests() {
        let err = SolverContext::new(&request(vec![]), SolverConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::EmptyStaff));

        let mut req = request(vec![StaffRecord::regular("a"), StaffRecord::regular("a")]);
        let err = SolverContext::new(&req, SolverConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::DuplicateStaff(_)));

        req.staff.pop();
        req.target_off_days = 0;
        let err = SolverContext::new(&req, SolverConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::TargetOffDaysOutOfRange(0)));

        req.target_off_days = 9;
        req.max_attempts = 0;
        let err = SolverContext::new(&req, SolverConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::MaxAttemptsOutOfRange(0)));

        req.max_attempts = 1;
        req.month = 0;
        let err = SolverContext::new(&req, SolverConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::InvalidPeriod { .. }));

        req.month = 2;
        req.staff[0].previous_streak = u32::MAX;
        let err = SolverContext::new(&req, SolverConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::PreviousStreakOutOfRange { value: u32::MAX, .. }));

        req.staff[0].previous_streak = 10;
        req.staff[0].night_target = 11;
        let err = SolverContext::new(&req, SolverConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::NightTargetOutOfRange { value: 11, .. }));
    }
}
