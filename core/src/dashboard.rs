use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{DailyRecord, Profile};

pub const FIBER_TARGET_G: f64 = 25.0;
pub const MIN_TOILET_VISITS: i64 = 1;

const NO_SUPPLEMENTS: &str = "None";
const NO_NOTES: &str = "No notes written today.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BmiClass {
    Underweight,
    #[serde(rename = "Healthy Weight")]
    HealthyWeight,
    Overweight,
    Obese,
}

impl BmiClass {
    #[must_use]
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            Self::Underweight
        } else if bmi < 25.0 {
            Self::HealthyWeight
        } else if bmi < 30.0 {
            Self::Overweight
        } else {
            Self::Obese
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::HealthyWeight => "Healthy Weight",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        }
    }
}

/// Body mass index from kg and cm. Zero when no weight was recorded.
#[must_use]
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    if weight_kg > 0.0 {
        let height_m = height_cm / 100.0;
        weight_kg / (height_m * height_m)
    } else {
        0.0
    }
}

/// `actual / target`, capped at 1.0, with the target floored at 1.
#[must_use]
pub fn goal_progress(actual: f64, target: f64) -> f64 {
    (actual / target.max(1.0)).min(1.0)
}

/// Goals a record is measured against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Goals {
    pub height_cm: f64,
    pub target_steps: i64,
    pub target_calories: i64,
    pub target_sleep_hours: f64,
}

impl From<&Profile> for Goals {
    fn from(p: &Profile) -> Self {
        Self {
            height_cm: p.height_cm,
            target_steps: p.target_steps,
            target_calories: p.target_calories,
            target_sleep_hours: p.target_sleep_hours,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub actual: f64,
    pub target: f64,
    pub ratio: f64,
}

impl Progress {
    #[must_use]
    pub fn new(actual: f64, target: f64) -> Self {
        Self {
            actual,
            target,
            ratio: goal_progress(actual, target),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TipKind {
    Movement,
    Nutrition,
    Digestion,
    Recovery,
    AllTargetsMet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tip {
    pub kind: TipKind,
    pub message: String,
}

impl Tip {
    fn new(kind: TipKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self.kind {
            TipKind::Movement => "Movement",
            TipKind::Nutrition => "Nutrition",
            TipKind::Digestion => "Metabolic",
            TipKind::Recovery => "Recovery",
            TipKind::AllTargetsMet => "All systems go",
        }
    }
}

/// Raw values shown next to the derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayDetails {
    pub weight_kg: f64,
    pub workout: String,
    pub steps: i64,
    pub calories: i64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fats_g: f64,
    pub fiber_g: f64,
    pub fasting_window: String,
    pub toilet_visits: i64,
    pub sleep_hours: i64,
    pub sleep_minutes: i64,
    pub tea_cups: i64,
    pub supplements: String,
    pub notes: String,
    pub mood: String,
}

/// Everything the dashboard shows for one day. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub user_id: String,
    pub date: NaiveDate,
    pub name: String,
    pub bmi: f64,
    pub bmi_class: BmiClass,
    pub total_sleep_hours: f64,
    pub steps: Progress,
    pub calories: Progress,
    pub sleep: Progress,
    pub tips: Vec<Tip>,
    pub details: DayDetails,
}

/// Derive the dashboard for `record` measured against `goals`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_dashboard(record: &DailyRecord, goals: &Goals) -> DashboardView {
    let bmi = bmi(record.weight_kg, goals.height_cm);
    let total_sleep = record.total_sleep_hours();

    DashboardView {
        user_id: record.user_id.clone(),
        date: record.date,
        name: record.name.clone(),
        bmi,
        bmi_class: BmiClass::from_bmi(bmi),
        total_sleep_hours: total_sleep,
        steps: Progress::new(record.steps as f64, goals.target_steps as f64),
        calories: Progress::new(record.calories as f64, goals.target_calories as f64),
        sleep: Progress::new(total_sleep, goals.target_sleep_hours),
        tips: tips(record, goals),
        details: DayDetails {
            weight_kg: record.weight_kg,
            workout: record.workout.clone(),
            steps: record.steps,
            calories: record.calories,
            protein_g: record.protein_g,
            carbs_g: record.carbs_g,
            fats_g: record.fats_g,
            fiber_g: record.fiber_g,
            fasting_window: record.fasting_window.clone(),
            toilet_visits: record.toilet_visits,
            sleep_hours: record.sleep_hours,
            sleep_minutes: record.sleep_minutes,
            tea_cups: record.tea_cups,
            supplements: or_fallback(&record.supplements, NO_SUPPLEMENTS),
            notes: or_fallback(&record.notes, NO_NOTES),
            mood: record.mood.clone(),
        },
    }
}

/// Every triggered tip, or the single affirmation when none fire.
#[must_use]
pub fn tips(record: &DailyRecord, goals: &Goals) -> Vec<Tip> {
    let mut tips = Vec::new();

    if record.steps < goals.target_steps {
        let shortfall = goals.target_steps.saturating_sub(record.steps);
        tips.push(Tip::new(
            TipKind::Movement,
            format!(
                "You are {shortfall} steps away from your goal. A short walk before bed helps insulin sensitivity."
            ),
        ));
    }
    if record.fiber_g < FIBER_TARGET_G {
        tips.push(Tip::new(
            TipKind::Nutrition,
            "Fiber is low. Aim for 25g+ to stabilize blood sugar and support gut microbes.",
        ));
    }
    if record.toilet_visits < MIN_TOILET_VISITS {
        tips.push(Tip::new(
            TipKind::Digestion,
            "Digestion visits are low. Consider extra hydration and magnesium to support motility.",
        ));
    }
    if record.total_sleep_hours() < goals.target_sleep_hours {
        tips.push(Tip::new(
            TipKind::Recovery,
            "Sleep was under target. Prioritize a cool, dark room tonight to maximize growth hormone release.",
        ));
    }

    if tips.is_empty() {
        tips.push(Tip::new(
            TipKind::AllTargetsMet,
            "All systems go! You hit every target today. Keep this momentum!",
        ));
    }
    tips
}

fn or_fallback(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn goals() -> Goals {
        Goals {
            height_cm: 180.0,
            target_steps: 10_000,
            target_calories: 2000,
            target_sleep_hours: 8.0,
        }
    }

    /// A day that meets every target.
    fn good_day() -> DailyRecord {
        let mut r = DailyRecord::new("a@x.com", date("2024-01-01"), &Profile::default());
        r.weight_kg = 75.0;
        r.steps = 12_000;
        r.calories = 1900;
        r.fiber_g = 30.0;
        r.toilet_visits = 2;
        r.sleep_hours = 8;
        r.sleep_minutes = 10;
        r
    }

    #[test]
    fn test_bmi_class_boundaries() {
        assert_eq!(BmiClass::from_bmi(18.49), BmiClass::Underweight);
        assert_eq!(BmiClass::from_bmi(18.5), BmiClass::HealthyWeight);
        assert_eq!(BmiClass::from_bmi(24.99), BmiClass::HealthyWeight);
        assert_eq!(BmiClass::from_bmi(25.0), BmiClass::Overweight);
        assert_eq!(BmiClass::from_bmi(29.99), BmiClass::Overweight);
        assert_eq!(BmiClass::from_bmi(30.0), BmiClass::Obese);
        assert_eq!(BmiClass::HealthyWeight.label(), "Healthy Weight");
    }

    #[test]
    fn test_bmi_zero_weight() {
        assert_eq!(bmi(0.0, 180.0), 0.0);
        assert_eq!(bmi(0.0, 0.0), 0.0);
        assert_eq!(bmi(-3.0, 150.0), 0.0);
    }

    #[test]
    fn test_bmi_value() {
        // 72 / 1.8^2 = 22.22
        assert!((bmi(72.0, 180.0) - 22.222).abs() < 0.001);
    }

    #[test]
    fn test_goal_progress_bounds() {
        assert!((goal_progress(5000.0, 10_000.0) - 0.5).abs() < f64::EPSILON);
        assert_eq!(goal_progress(50_000.0, 10_000.0), 1.0);
        assert_eq!(goal_progress(0.0, 10_000.0), 0.0);
        for actual in [0.0, 0.4, 1.0, 3.0, 1e9] {
            for target in [0.5, 1.0, 7.5, 2000.0] {
                let p = goal_progress(actual, target);
                assert!((0.0..=1.0).contains(&p), "{actual}/{target} gave {p}");
            }
        }
    }

    #[test]
    fn test_goal_progress_floors_target() {
        assert_eq!(goal_progress(0.5, 0.0), 0.5);
        assert_eq!(goal_progress(3.0, 0.0), 1.0);
    }

    #[test]
    fn test_steps_shortfall_tip() {
        let mut r = good_day();
        r.steps = 5000;
        let view = compute_dashboard(&r, &goals());
        assert!((view.steps.ratio - 0.5).abs() < f64::EPSILON);
        assert_eq!(view.tips.len(), 1);
        assert_eq!(view.tips[0].kind, TipKind::Movement);
        assert!(view.tips[0].message.contains("5000"));
    }

    #[test]
    fn test_all_targets_met_gives_affirmation() {
        let view = compute_dashboard(&good_day(), &goals());
        assert_eq!(view.tips.len(), 1);
        assert_eq!(view.tips[0].kind, TipKind::AllTargetsMet);
    }

    #[test]
    fn test_every_tip_can_fire_together() {
        let r = DailyRecord::new("a@x.com", date("2024-01-01"), &Profile::default());
        let kinds: Vec<TipKind> = tips(&r, &goals()).iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TipKind::Movement,
                TipKind::Nutrition,
                TipKind::Digestion,
                TipKind::Recovery
            ]
        );
    }

    #[test]
    fn test_sleep_minutes_count_toward_target() {
        let mut r = good_day();
        r.sleep_hours = 7;
        r.sleep_minutes = 59;
        let view = compute_dashboard(&r, &goals());
        assert!(view.tips.iter().any(|t| t.kind == TipKind::Recovery));

        r.sleep_minutes = 60;
        let view = compute_dashboard(&r, &goals());
        assert!(!view.tips.iter().any(|t| t.kind == TipKind::Recovery));
    }

    #[test]
    fn test_dashboard_uses_goal_height() {
        let mut r = good_day();
        r.height_cm = 150.0;
        let view = compute_dashboard(&r, &goals());
        assert!((view.bmi - 75.0 / (1.8 * 1.8)).abs() < 1e-9);
        assert_eq!(view.bmi_class, BmiClass::HealthyWeight);
    }

    #[test]
    fn test_details_fallbacks() {
        let view = compute_dashboard(&good_day(), &goals());
        assert_eq!(view.details.supplements, "None");
        assert_eq!(view.details.notes, "No notes written today.");
    }

    #[test]
    fn test_dashboard_serializes_class_label() {
        let view = compute_dashboard(&good_day(), &goals());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["bmi_class"], "Healthy Weight");
        assert_eq!(json["tips"][0]["kind"], "all_targets_met");
        assert_eq!(json["date"], "2024-01-01");
    }

    #[test]
    fn test_extreme_negative_steps_do_not_overflow() {
        let mut r = good_day();
        r.steps = i64::MIN;
        let view = compute_dashboard(&r, &Goals::from(&Profile::default()));
        let movement = view
            .tips
            .iter()
            .find(|t| t.kind == TipKind::Movement)
            .unwrap();
        assert!(movement.message.contains(&i64::MAX.to_string()));
        assert!(view.steps.ratio < 0.0);
    }
}
