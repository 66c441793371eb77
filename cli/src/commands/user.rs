use anyhow::Result;

use synclife_core::service::SyncLifeService;

use super::helpers::prompt_line;

pub(crate) fn cmd_user_register(
    svc: &SyncLifeService,
    email: &str,
    name: &str,
    json: bool,
) -> Result<()> {
    let password = prompt_line("Password")?;
    let user = svc.register(email, name, &password)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        println!("Registered {} <{}>", user.name, user.email);
        println!("Log entries for this account with --user {}", user.email);
    }
    Ok(())
}

pub(crate) fn cmd_user_login(svc: &SyncLifeService, email: &str, json: bool) -> Result<()> {
    let password = prompt_line("Password")?;
    let user = svc.login(email, &password)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        println!("Welcome back, {}", user.name);
    }
    Ok(())
}
