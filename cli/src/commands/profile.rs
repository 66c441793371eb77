use anyhow::Result;

use synclife_core::service::SyncLifeService;

use super::helpers::group_thousands;

pub(crate) fn cmd_profile(svc: &SyncLifeService, user: &str, json: bool) -> Result<()> {
    let profile = svc.current_profile(user);
    let saved = svc.load_table().latest_for(user).is_some();

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    if !saved {
        eprintln!("No entries yet; showing defaults. Set them with `synclife log --name ...`.");
    }
    println!("  Name            {}", profile.name);
    println!("  Age             {}", profile.age);
    println!("  Gender          {}", profile.gender);
    println!("  Height          {:.0} cm", profile.height_cm);
    println!("  Target weight   {:.1} kg", profile.target_weight_kg);
    println!("  Target steps    {}", group_thousands(profile.target_steps));
    println!("  Target sleep    {:.1} h", profile.target_sleep_hours);
    println!("  Target calories {} kcal", profile.target_calories);
    Ok(())
}
