use std::path::PathBuf;

use anyhow::{Context, Result};

use synclife_core::media::MediaItem;
use synclife_core::models::{
    DailyMetrics, ProfileUpdate, validate_gender, validate_supplement,
};
use synclife_core::service::SyncLifeService;

use super::helpers::{group_thousands, parse_date};

/// Profile fields accepted by `log`. Unset fields keep the current profile.
#[derive(Debug, Default)]
pub(crate) struct ProfileInput {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub target_weight: Option<f64>,
    pub target_steps: Option<i64>,
    pub target_sleep: Option<f64>,
    pub target_water: Option<f64>,
    pub target_calories: Option<i64>,
}

impl ProfileInput {
    pub(crate) fn into_update(self) -> Result<ProfileUpdate> {
        Ok(ProfileUpdate {
            name: self.name,
            age: self.age,
            gender: self.gender.as_deref().map(validate_gender).transpose()?,
            height_cm: self.height,
            target_weight_kg: self.target_weight,
            target_steps: self.target_steps,
            target_sleep_hours: self.target_sleep,
            target_water_l: self.target_water,
            target_calories: self.target_calories,
        })
    }
}

/// Everything `log` collects for the day.
#[derive(Debug)]
pub(crate) struct LogInput {
    pub date: Option<String>,
    pub metrics: DailyMetrics,
    /// `None` keeps the journal note already saved for the day.
    pub notes: Option<String>,
    pub media: Vec<PathBuf>,
    pub profile: ProfileInput,
}

pub(crate) fn cmd_log(
    svc: &mut SyncLifeService,
    user: &str,
    input: LogInput,
    json: bool,
) -> Result<()> {
    let date = parse_date(input.date)?;
    let update = input.profile.into_update()?;

    let mut metrics = input.metrics;
    metrics.supplements = metrics
        .supplements
        .iter()
        .map(|s| validate_supplement(s))
        .collect::<Result<_>>()?;
    metrics.notes = match input.notes {
        Some(n) => n,
        None => svc.saved_notes(user, date),
    };

    let media = read_media(&input.media)?;
    let media_count = media.len();

    let record = svc.log_day(user, date, update, metrics, media)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        let steps = group_thousands(record.steps);
        println!(
            "Saved {} for {}: {:.1} kg, {steps} steps, {}h {}m sleep, {} kcal",
            record.date.format("%Y-%m-%d"),
            record.name,
            record.weight_kg,
            record.sleep_hours,
            record.sleep_minutes,
            record.calories,
        );
        if !record.supplements.is_empty() {
            println!("  Supplements: {}", record.supplements);
        }
        if media_count > 0 {
            eprintln!(
                "Attached {media_count} media file(s) for this session only; they are not saved."
            );
        }
    }

    Ok(())
}

fn read_media(paths: &[PathBuf]) -> Result<Vec<MediaItem>> {
    paths
        .iter()
        .map(|p| {
            let bytes =
                std::fs::read(p).with_context(|| format!("Failed to read {}", p.display()))?;
            let name = p
                .file_name()
                .map_or_else(|| p.display().to_string(), |n| n.to_string_lossy().into_owned());
            Ok(MediaItem {
                name,
                content_type: None,
                bytes,
            })
        })
        .collect()
}
