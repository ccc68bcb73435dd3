use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Nombre d'essais par défaut d'une résolution.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2500;

/// Nombre maximal de shifts imposés en début de période.
pub const MAX_FIXED_SHIFTS: usize = 3;

/// Bornes hautes de `previousStreak` et `nightTarget`.
pub const MAX_CARRIED_STREAK: u32 = 10;
pub const MAX_NIGHT_TARGET: u32 = 10;

/// Identifiant fort pour une personne du roster (index stable dans la requête).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StaffId(usize);

impl StaffId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }
    pub fn index(self) -> usize {
        self.0
    }
}

/// Catégorie de contrat : gouverne les codes éligibles et le quota de jours travaillés.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StaffCategory {
    #[default]
    Regular,
    PartTimeDayOnly,
    PartTimeEarlyOnly,
}

impl StaffCategory {
    /// Codes de travail éligibles ; les repos sont toujours permis.
    pub fn allows(self, code: ShiftCode) -> bool {
        match self {
            StaffCategory::Regular => true,
            StaffCategory::PartTimeDayOnly => code.is_rest() || code == ShiftCode::Day,
            StaffCategory::PartTimeEarlyOnly => {
                code.is_rest() || matches!(code, ShiftCode::Early | ShiftCode::Day)
            }
        }
    }
}

/// Code de shift (vocabulaire fermé).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftCode {
    Early,
    Day,
    Late,
    Night,
    /// Repos obligatoire le lendemain d'une nuit.
    NightRest,
    Off,
    /// Repos demandé : équivaut à `Off` mais ne peut pas être déplacé.
    RequestedOff,
    Paid,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown shift code: {0:?}")]
pub struct UnknownShiftCode(pub String);

impl ShiftCode {
    pub const ALL: [ShiftCode; 9] = [
        ShiftCode::Early,
        ShiftCode::Day,
        ShiftCode::Late,
        ShiftCode::Night,
        ShiftCode::NightRest,
        ShiftCode::Off,
        ShiftCode::RequestedOff,
        ShiftCode::Paid,
        ShiftCode::Refresh,
    ];

    /// Glyphe utilisé sur le fil. `RequestedOff` garde l'espace final.
    pub fn as_str(self) -> &'static str {
        match self {
            ShiftCode::Early => "早",
            ShiftCode::Day => "日",
            ShiftCode::Late => "遅",
            ShiftCode::Night => "夜",
            ShiftCode::NightRest => "・",
            ShiftCode::Off => "◎",
            ShiftCode::RequestedOff => "◎ ",
            ShiftCode::Paid => "有",
            ShiftCode::Refresh => "リ休",
        }
    }

    pub fn is_work(self) -> bool {
        matches!(
            self,
            ShiftCode::Early
                | ShiftCode::Day
                | ShiftCode::Late
                | ShiftCode::Night
                | ShiftCode::NightRest
        )
    }

    pub fn is_rest(self) -> bool {
        !self.is_work()
    }

    /// Early, Day ou Late.
    pub fn is_day_shift(self) -> bool {
        matches!(self, ShiftCode::Early | ShiftCode::Day | ShiftCode::Late)
    }

    pub fn is_night_family(self) -> bool {
        matches!(self, ShiftCode::Night | ShiftCode::NightRest)
    }

    /// Off ou RequestedOff (compte pour le quota de repos).
    pub fn is_off(self) -> bool {
        matches!(self, ShiftCode::Off | ShiftCode::RequestedOff)
    }
}

impl fmt::Display for ShiftCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShiftCode {
    type Err = UnknownShiftCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // l'espace final distingue le repos demandé : pas de trim avant ce test
        if s == ShiftCode::RequestedOff.as_str() {
            return Ok(ShiftCode::RequestedOff);
        }
        let trimmed = s.trim();
        if let Some(code) = ShiftCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == trimmed)
        {
            return Ok(code);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "early" => Ok(ShiftCode::Early),
            "day" => Ok(ShiftCode::Day),
            "late" => Ok(ShiftCode::Late),
            "night" => Ok(ShiftCode::Night),
            "night_rest" | "nightrest" => Ok(ShiftCode::NightRest),
            "off" => Ok(ShiftCode::Off),
            "requested_off" | "requestedoff" => Ok(ShiftCode::RequestedOff),
            "paid" => Ok(ShiftCode::Paid),
            "refresh" => Ok(ShiftCode::Refresh),
            _ => Err(UnknownShiftCode(s.to_string())),
        }
    }
}

impl Serialize for ShiftCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ShiftCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Configuration d'une personne pour la période planifiée.
///
/// Les jours sont numérotés à partir de 1, relativement au mois planifié.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffRecord {
    pub name: String,
    #[serde(default)]
    pub category: StaffCategory,
    #[serde(default)]
    pub night_target: u32,
    #[serde(default)]
    pub night_days: BTreeSet<u32>,
    #[serde(default)]
    pub early_days: BTreeSet<u32>,
    #[serde(default)]
    pub late_days: BTreeSet<u32>,
    #[serde(default)]
    pub day_days: BTreeSet<u32>,
    #[serde(default)]
    pub requested_off_days: BTreeSet<u32>,
    #[serde(default)]
    pub refresh_days: BTreeSet<u32>,
    #[serde(default)]
    pub paid_leave_days: BTreeSet<u32>,
    /// Dernier code de la période précédente.
    #[serde(default = "default_previous_shift")]
    pub previous_shift: ShiftCode,
    /// Jours travaillés consécutifs juste avant le jour 1.
    #[serde(default)]
    pub previous_streak: u32,
    /// Codes imposés pour les premiers jours (`null` ou `""` = libre).
    #[serde(default, deserialize_with = "deserialize_fixed_shifts")]
    pub fixed_shifts: Vec<Option<ShiftCode>>,
}

fn default_previous_shift() -> ShiftCode {
    ShiftCode::Off
}

fn deserialize_fixed_shifts<'de, D>(deserializer: D) -> Result<Vec<Option<ShiftCode>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Option<String>> = Vec::deserialize(deserializer)?;
    raw.into_iter()
        .map(|entry| match entry {
            Some(s) if !s.trim().is_empty() => s
                .parse()
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        })
        .collect()
}

impl StaffRecord {
    pub fn new<N: Into<String>>(name: N, category: StaffCategory) -> Self {
        Self {
            name: name.into(),
            category,
            night_target: 0,
            night_days: BTreeSet::new(),
            early_days: BTreeSet::new(),
            late_days: BTreeSet::new(),
            day_days: BTreeSet::new(),
            requested_off_days: BTreeSet::new(),
            refresh_days: BTreeSet::new(),
            paid_leave_days: BTreeSet::new(),
            previous_shift: ShiftCode::Off,
            previous_streak: 0,
            fixed_shifts: Vec::new(),
        }
    }

    pub fn regular<N: Into<String>>(name: N) -> Self {
        Self::new(name, StaffCategory::Regular)
    }

    pub fn with_night_target(mut self, target: u32) -> Self {
        self.night_target = target;
        self
    }

    pub fn with_previous(mut self, shift: ShiftCode, streak: u32) -> Self {
        self.previous_shift = shift;
        self.previous_streak = streak;
        self
    }

    pub fn with_requested_off<I: IntoIterator<Item = u32>>(mut self, days: I) -> Self {
        self.requested_off_days.extend(days);
        self
    }

    pub fn with_night_days<I: IntoIterator<Item = u32>>(mut self, days: I) -> Self {
        self.night_days.extend(days);
        self
    }

    pub fn with_fixed_shifts(mut self, fixed: Vec<Option<ShiftCode>>) -> Self {
        self.fixed_shifts = fixed;
        self
    }

    pub fn is_regular(&self) -> bool {
        self.category == StaffCategory::Regular
    }
}

/// Grille d'une tentative : `staff_count` lignes de `days` cases, stockées à plat.
///
/// Le compteur de nuits par personne est tenu à jour à chaque écriture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    days: usize,
    slots: Vec<Option<ShiftCode>>,
    night_counts: Vec<u32>,
}

impl Schedule {
    pub fn new(staff_count: usize, days: usize) -> Self {
        Self {
            days,
            slots: vec![None; staff_count * days],
            night_counts: vec![0; staff_count],
        }
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn staff_count(&self) -> usize {
        self.night_counts.len()
    }

    pub fn staff_ids(&self) -> impl Iterator<Item = StaffId> {
        (0..self.staff_count()).map(StaffId::new)
    }

    /// Case `(staff, day)` ; `None` si vide ou hors période.
    pub fn get(&self, staff: StaffId, day: usize) -> Option<ShiftCode> {
        if day >= self.days {
            return None;
        }
        self.slots[staff.index() * self.days + day]
    }

    pub fn is_empty(&self, staff: StaffId, day: usize) -> bool {
        day < self.days && self.get(staff, day).is_none()
    }

    pub fn set(&mut self, staff: StaffId, day: usize, code: Option<ShiftCode>) {
        let idx = staff.index() * self.days + day;
        if self.slots[idx] == Some(ShiftCode::Night) {
            self.night_counts[staff.index()] -= 1;
        }
        if code == Some(ShiftCode::Night) {
            self.night_counts[staff.index()] += 1;
        }
        self.slots[idx] = code;
    }

    pub fn put(&mut self, staff: StaffId, day: usize, code: ShiftCode) {
        self.set(staff, day, Some(code));
    }

    pub fn clear(&mut self, staff: StaffId, day: usize) {
        self.set(staff, day, None);
    }

    pub fn row(&self, staff: StaffId) -> &[Option<ShiftCode>] {
        let start = staff.index() * self.days;
        &self.slots[start..start + self.days]
    }

    pub fn night_count(&self, staff: StaffId) -> u32 {
        self.night_counts[staff.index()]
    }

    /// Nombre de personnes tenant exactement `code` le jour `day`.
    pub fn count_code(&self, day: usize, code: ShiftCode) -> usize {
        self.count_on(day, |c| c == code)
    }

    pub fn count_on<F: Fn(ShiftCode) -> bool>(&self, day: usize, pred: F) -> usize {
        self.staff_ids()
            .filter(|&s| self.get(s, day).is_some_and(&pred))
            .count()
    }

    /// Effectif Early + Day + Late du jour.
    pub fn day_shift_headcount(&self, day: usize) -> usize {
        self.count_on(day, ShiftCode::is_day_shift)
    }

    pub fn daily_headcounts(&self) -> Vec<usize> {
        (0..self.days).map(|d| self.day_shift_headcount(d)).collect()
    }

    pub fn count_in_row<F: Fn(ShiftCode) -> bool>(&self, staff: StaffId, pred: F) -> usize {
        self.row(staff).iter().flatten().filter(|c| pred(**c)).count()
    }

    pub fn empty_days(&self, staff: StaffId) -> Vec<usize> {
        (0..self.days).filter(|&d| self.is_empty(staff, d)).collect()
    }
}

/// Requête de résolution telle que reçue de la couche HTTP/UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub year: i32,
    pub month: u32,
    pub target_off_days: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    pub staff: Vec<StaffRecord>,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// Réponse : grille par nom, diagnostics lisibles, période en écho.
///
/// Une case restée vide est sérialisée `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResponse {
    pub schedule: BTreeMap<String, Vec<Option<ShiftCode>>>,
    pub diagnostics: Vec<String>,
    pub year: i32,
    pub month: u32,
    pub days_in_month: usize,
    #[serde(default)]
    pub penalty: i64,
    #[serde(default)]
    pub attempts: usize,
}
