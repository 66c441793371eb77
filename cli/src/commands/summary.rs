use anyhow::Result;
use chrono::Local;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use synclife_core::dashboard::{DashboardView, Progress};
use synclife_core::service::SyncLifeService;

use super::helpers::{clip, group_thousands, json_error, one_decimal, parse_date, progress_bar};

const BAR_WIDTH: usize = 20;

pub(crate) fn cmd_summary(
    svc: &SyncLifeService,
    user: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let Some(view) = svc.dashboard(user, date) else {
        if json {
            println!("{}", json_error(&format!("No entry for {date}")));
        } else {
            eprintln!("No entry for {date}");
        }
        process::exit(2);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    print_dashboard(&view);
    Ok(())
}

fn print_dashboard(view: &DashboardView) {
    let d = &view.details;
    println!("=== {} | {} ===\n", view.name, view.date);

    println!(
        "  BMI        {:>5}  {}",
        one_decimal(view.bmi),
        view.bmi_class.label()
    );
    print_progress("Steps", &view.steps, &group_thousands(d.steps));
    print_progress("Calories", &view.calories, &format!("{} kcal", d.calories));
    print_progress(
        "Sleep",
        &view.sleep,
        &format!("{}h {}m", d.sleep_hours, d.sleep_minutes),
    );
    println!();

    println!(
        "  Weight {:.1} kg | Workout {} | Fasting {} | Mood {}",
        d.weight_kg, d.workout, d.fasting_window, d.mood
    );
    println!(
        "  Macros P:{:.0}g C:{:.0}g F:{:.0}g Fiber:{:.0}g",
        d.protein_g, d.carbs_g, d.fats_g, d.fiber_g
    );
    println!(
        "  Tea {} cup(s) | Toilet visits {}\n",
        d.tea_cups, d.toilet_visits
    );

    println!("  TIPS");
    for tip in &view.tips {
        println!("    {}: {}", tip.label(), tip.message);
    }
    println!();

    println!("  Supplements: {}", d.supplements);
    println!("  Journal: {}", d.notes);
}

fn print_progress(label: &str, progress: &Progress, actual: &str) {
    let pct = progress.ratio * 100.0;
    println!(
        "  {label:<10} {} {pct:>3.0}%  {actual} / {}",
        progress_bar(progress.ratio, BAR_WIDTH),
        progress.target
    );
}

pub(crate) fn cmd_history(
    svc: &SyncLifeService,
    user: &str,
    days: Option<u32>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight")]
        weight: String,
        #[tabled(rename = "Steps")]
        steps: String,
        #[tabled(rename = "Sleep")]
        sleep: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Workout")]
        workout: String,
        #[tabled(rename = "Mood")]
        mood: String,
    }

    let today = Local::now().date_naive();
    let records = svc.history(user, days, today);

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        match days {
            Some(n) => eprintln!("No entries in the last {n} days"),
            None => eprintln!("No entries yet"),
        }
        process::exit(2);
    }

    let rows: Vec<HistoryRow> = records
        .iter()
        .map(|r| HistoryRow {
            date: r.date.format("%Y-%m-%d").to_string(),
            weight: format!("{} kg", one_decimal(r.weight_kg)),
            steps: group_thousands(r.steps),
            sleep: format!("{}h {}m", r.sleep_hours, r.sleep_minutes),
            calories: r.calories.to_string(),
            workout: clip(&r.workout, 24),
            mood: r.mood.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..5)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}
