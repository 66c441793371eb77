mod helpers;
mod log;
mod profile;
mod summary;
mod user;

pub(crate) use log::{LogInput, ProfileInput, cmd_log};
pub(crate) use profile::cmd_profile;
pub(crate) use summary::{cmd_history, cmd_summary};
pub(crate) use user::{cmd_user_login, cmd_user_register};
