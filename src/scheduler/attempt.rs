use super::SolverContext;
use crate::model::{Schedule, ShiftCode, StaffId};
use crate::rules::RuleChecker;
use rand::Rng;

/// Résultat d'une tentative complète.
#[derive(Debug, Clone)]
pub(super) struct AttemptOutcome {
    pub(super) schedule: Schedule,
    /// Cases posées par le nettoyage final malgré les règles.
    pub(super) forced: Vec<(StaffId, usize)>,
}

/// Une tentative : grille vide, générateur propre, cases figées privées.
///
/// Rien n'est partagé entre deux tentatives à part le contexte en lecture seule.
pub(super) struct Attempt<'a, R: Rng> {
    pub(super) ctx: &'a SolverContext,
    pub(super) rules: RuleChecker<'a>,
    pub(super) rng: R,
    pub(super) schedule: Schedule,
    locked: Vec<bool>,
    pub(super) forced: Vec<(StaffId, usize)>,
}

impl<'a, R: Rng> Attempt<'a, R> {
    pub(super) fn new(ctx: &'a SolverContext, rng: R) -> Self {
        Self {
            ctx,
            rules: RuleChecker::new(ctx),
            rng,
            schedule: ctx.empty_schedule(),
            locked: vec![false; ctx.staff_count() * ctx.days()],
            forced: Vec::new(),
        }
    }

    /// Enchaîne les phases dans l'ordre ; chaque phase reprend la grille de la précédente.
    pub(super) fn run(mut self) -> AttemptOutcome {
        self.carry_over();
        self.apply_fixed_and_requests();
        self.place_night_requests();
        self.cover_nights();
        self.cover_early_late();
        self.fill_day_shifts();
        self.fill_rest_days();
        self.fill_remainder();
        self.balance();
        self.repair_shortages();
        self.repair_duplicates();
        self.final_cleanup();
        AttemptOutcome {
            schedule: self.schedule,
            forced: self.forced,
        }
    }

    pub(super) fn days(&self) -> usize {
        self.ctx.days()
    }

    pub(super) fn is_locked(&self, staff: StaffId, day: usize) -> bool {
        self.locked[staff.index() * self.days() + day]
    }

    pub(super) fn lock(&mut self, staff: StaffId, day: usize) {
        let days = self.days();
        self.locked[staff.index() * days + day] = true;
    }

    /// Pose un code et le rend inamovible.
    pub(super) fn pin(&mut self, staff: StaffId, day: usize, code: ShiftCode) {
        self.schedule.put(staff, day, code);
        self.lock(staff, day);
    }

    pub(super) fn can_place(&self, staff: StaffId, day: usize, code: ShiftCode) -> bool {
        self.rules.can_place(staff, day, &self.schedule, code)
    }

    pub(super) fn can_place_night(&self, staff: StaffId, day: usize) -> bool {
        self.rules.can_place_night(staff, day, &self.schedule)
    }

    /// Remplace le contenu de la case par `target` si la règle l'accepte une
    /// fois la case vidée ; sinon la case est restaurée.
    pub(super) fn try_convert(&mut self, staff: StaffId, day: usize, target: ShiftCode) -> bool {
        let original = self.schedule.get(staff, day);
        self.schedule.clear(staff, day);
        if self.can_place(staff, day, target) {
            self.schedule.put(staff, day, target);
            return true;
        }
        self.schedule.set(staff, day, original);
        false
    }

    /// Convertit un numéro de jour 1-based en index, `None` hors période.
    pub(super) fn day_index(&self, day: u32) -> Option<usize> {
        let day = day as usize;
        (1..=self.days()).contains(&day).then(|| day - 1)
    }
}
