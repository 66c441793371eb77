use anyhow::bail;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const GENDERS: &[&str] = &["Male", "Female", "Other"];

/// Multi-select options offered for supplements. `Other` is a marker that
/// enables the free-text field and is never stored itself.
pub const SUPPLEMENT_OPTIONS: &[&str] = &[
    "Vitamin D3",
    "Magnesium Glycinate",
    "Zinc Picolinate",
    "Omega 3 Fish Oil",
    "Creatine Monohydrate",
    "Other",
];

pub const OTHER_SUPPLEMENT: &str = "Other";
pub const DEFAULT_WORKOUT: &str = "Resistance Training";
pub const DEFAULT_FASTING_WINDOW: &str = "16:8";
pub const DEFAULT_MOOD: &str = "🙂";

/// One user's entry for one day. Field order matches the persisted column order.
///
/// The profile fields are a snapshot of the goals in effect when the row was
/// saved, so older rows keep their old targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    #[serde(rename = "User_ID")]
    pub user_id: String,
    #[serde(rename = "Date")]
    pub date: NaiveDate,

    #[serde(rename = "User_Name")]
    pub name: String,
    #[serde(rename = "User_Age")]
    pub age: i64,
    #[serde(rename = "User_Gender")]
    pub gender: String,
    #[serde(rename = "User_Height")]
    pub height_cm: f64,
    #[serde(rename = "User_Target_W")]
    pub target_weight_kg: f64,
    #[serde(rename = "Target_Steps")]
    pub target_steps: i64,
    #[serde(rename = "Target_Sleep")]
    pub target_sleep_hours: f64,
    #[serde(rename = "Target_Water")]
    pub target_water_l: f64,
    #[serde(rename = "Target_Calories")]
    pub target_calories: i64,

    #[serde(rename = "Weight")]
    pub weight_kg: f64,
    #[serde(rename = "Steps")]
    pub steps: i64,
    #[serde(rename = "Sleep_H")]
    pub sleep_hours: i64,
    #[serde(rename = "Sleep_M")]
    pub sleep_minutes: i64,
    #[serde(rename = "Calories")]
    pub calories: i64,
    #[serde(rename = "Protein")]
    pub protein_g: f64,
    #[serde(rename = "Carbs")]
    pub carbs_g: f64,
    #[serde(rename = "Fats")]
    pub fats_g: f64,
    #[serde(rename = "Fiber")]
    pub fiber_g: f64,
    #[serde(rename = "Tea_Cups")]
    pub tea_cups: i64,
    #[serde(rename = "Toilet_Visits")]
    pub toilet_visits: i64,
    #[serde(rename = "Workout")]
    pub workout: String,
    #[serde(rename = "Supplements")]
    pub supplements: String,
    #[serde(rename = "Fasting_Ratio")]
    pub fasting_window: String,
    #[serde(rename = "Daily_Notes")]
    pub notes: String,
    #[serde(rename = "Mood")]
    pub mood: String,
}

impl DailyRecord {
    /// A record for `(user_id, date)` carrying `profile`, with every observed
    /// metric at its zero value.
    #[must_use]
    pub fn new(user_id: &str, date: NaiveDate, profile: &Profile) -> Self {
        Self {
            user_id: user_id.to_string(),
            date,
            name: profile.name.clone(),
            age: profile.age,
            gender: profile.gender.clone(),
            height_cm: profile.height_cm,
            target_weight_kg: profile.target_weight_kg,
            target_steps: profile.target_steps,
            target_sleep_hours: profile.target_sleep_hours,
            target_water_l: profile.target_water_l,
            target_calories: profile.target_calories,
            weight_kg: 0.0,
            steps: 0,
            sleep_hours: 0,
            sleep_minutes: 0,
            calories: 0,
            protein_g: 0.0,
            carbs_g: 0.0,
            fats_g: 0.0,
            fiber_g: 0.0,
            tea_cups: 0,
            toilet_visits: 0,
            workout: String::new(),
            supplements: String::new(),
            fasting_window: String::new(),
            notes: String::new(),
            mood: String::new(),
        }
    }

    #[must_use]
    pub fn key(&self) -> (&str, NaiveDate) {
        (&self.user_id, self.date)
    }

    #[must_use]
    pub fn has_key(&self, user_id: &str, date: NaiveDate) -> bool {
        self.user_id == user_id && self.date == date
    }

    /// The profile snapshot stored on this row.
    #[must_use]
    pub fn profile(&self) -> Profile {
        Profile {
            name: self.name.clone(),
            age: self.age,
            gender: self.gender.clone(),
            height_cm: self.height_cm,
            target_weight_kg: self.target_weight_kg,
            target_steps: self.target_steps,
            target_sleep_hours: self.target_sleep_hours,
            target_water_l: self.target_water_l,
            target_calories: self.target_calories,
        }
    }

    #[must_use]
    pub fn total_sleep_hours(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let (h, m) = (self.sleep_hours as f64, self.sleep_minutes as f64);
        h + m / 60.0
    }
}

/// Profile and goals. Copied onto every saved record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub height_cm: f64,
    pub target_weight_kg: f64,
    pub target_steps: i64,
    pub target_sleep_hours: f64,
    #[serde(default)]
    pub target_water_l: f64,
    pub target_calories: i64,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "User".to_string(),
            age: 25,
            gender: "Male".to_string(),
            height_cm: 170.0,
            target_weight_kg: 70.0,
            target_steps: 10_000,
            target_sleep_hours: 8.0,
            target_water_l: 0.0,
            target_calories: 2000,
        }
    }
}

/// Partial profile edit; `None` keeps the current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub height_cm: Option<f64>,
    pub target_weight_kg: Option<f64>,
    pub target_steps: Option<i64>,
    pub target_sleep_hours: Option<f64>,
    pub target_water_l: Option<f64>,
    pub target_calories: Option<i64>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn apply(self, base: &Profile) -> Profile {
        Profile {
            name: self.name.unwrap_or_else(|| base.name.clone()),
            age: self.age.unwrap_or(base.age),
            gender: self.gender.unwrap_or_else(|| base.gender.clone()),
            height_cm: self.height_cm.unwrap_or(base.height_cm),
            target_weight_kg: self.target_weight_kg.unwrap_or(base.target_weight_kg),
            target_steps: self.target_steps.unwrap_or(base.target_steps),
            target_sleep_hours: self.target_sleep_hours.unwrap_or(base.target_sleep_hours),
            target_water_l: self.target_water_l.unwrap_or(base.target_water_l),
            target_calories: self.target_calories.unwrap_or(base.target_calories),
        }
    }
}

/// Observed metrics for one day, as collected by a front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyMetrics {
    pub weight_kg: f64,
    pub steps: i64,
    pub sleep_hours: i64,
    pub sleep_minutes: i64,
    pub calories: i64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fats_g: f64,
    pub fiber_g: f64,
    pub tea_cups: i64,
    pub toilet_visits: i64,
    pub workout: String,
    pub supplements: Vec<String>,
    pub other_supplement: Option<String>,
    pub fasting_window: String,
    pub notes: String,
    pub mood: String,
}

impl Default for DailyMetrics {
    fn default() -> Self {
        Self {
            weight_kg: 0.0,
            steps: 0,
            sleep_hours: 0,
            sleep_minutes: 0,
            calories: 0,
            protein_g: 0.0,
            carbs_g: 0.0,
            fats_g: 0.0,
            fiber_g: 0.0,
            tea_cups: 0,
            toilet_visits: 0,
            workout: DEFAULT_WORKOUT.to_string(),
            supplements: Vec::new(),
            other_supplement: None,
            fasting_window: DEFAULT_FASTING_WINDOW.to_string(),
            notes: String::new(),
            mood: DEFAULT_MOOD.to_string(),
        }
    }
}

impl DailyMetrics {
    /// Build the full candidate row for `(user_id, date)` under `profile`.
    #[must_use]
    pub fn into_record(self, user_id: &str, date: NaiveDate, profile: &Profile) -> DailyRecord {
        let supplements = serialize_supplements(&self.supplements, self.other_supplement.as_deref());
        DailyRecord {
            weight_kg: self.weight_kg,
            steps: self.steps,
            sleep_hours: self.sleep_hours,
            sleep_minutes: self.sleep_minutes,
            calories: self.calories,
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fats_g: self.fats_g,
            fiber_g: self.fiber_g,
            tea_cups: self.tea_cups,
            toilet_visits: self.toilet_visits,
            workout: self.workout,
            supplements,
            fasting_window: self.fasting_window,
            notes: self.notes,
            mood: self.mood,
            ..DailyRecord::new(user_id, date, profile)
        }
    }
}

/// Join the chosen supplements for storage.
///
/// The `Other` marker is dropped and a non-empty free-text `other` value is
/// appended last. The result is display text and is never parsed back.
#[must_use]
pub fn serialize_supplements(chosen: &[String], other: Option<&str>) -> String {
    let mut parts: Vec<&str> = chosen
        .iter()
        .map(String::as_str)
        .filter(|s| *s != OTHER_SUPPLEMENT)
        .collect();
    if let Some(o) = other.filter(|o| !o.is_empty()) {
        parts.push(o);
    }
    parts.join(", ")
}

pub fn validate_gender(gender: &str) -> anyhow::Result<String> {
    match GENDERS
        .iter()
        .find(|g| g.eq_ignore_ascii_case(gender.trim()))
    {
        Some(g) => Ok((*g).to_string()),
        None => bail!(
            "Invalid gender '{gender}'. Must be one of: {}",
            GENDERS.join(", ")
        ),
    }
}

/// Match a supplement against the offered options, case-insensitively.
pub fn validate_supplement(name: &str) -> anyhow::Result<String> {
    match SUPPLEMENT_OPTIONS
        .iter()
        .find(|s| s.eq_ignore_ascii_case(name.trim()))
    {
        Some(s) => Ok((*s).to_string()),
        None => bail!(
            "Unknown supplement '{name}'. Choose from: {} (or use --other-supplement)",
            SUPPLEMENT_OPTIONS.join(", ")
        ),
    }
}
