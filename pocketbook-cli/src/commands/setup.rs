//! Setup command - store the user id imports are attributed to

use anyhow::Result;

use pocketbook_core::config::{Config, USER_ID_ENV};

use super::get_data_dir;
use crate::output;

pub fn run(user_id: Option<String>) -> Result<()> {
    let data_dir = get_data_dir()?;
    let mut config = Config::load(&data_dir)?;

    let Some(user_id) = user_id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()) else {
        match &config.user_id {
            Some(id) => println!("Signed in as {}", id),
            None => output::warning(&format!(
                "No user configured. Run `pb setup <user-id>` or set {}",
                USER_ID_ENV
            )),
        }
        return Ok(());
    };

    config.set_user_id(&user_id);
    config.save(&data_dir)?;
    output::success(&format!("Imports will be attributed to {}", user_id));

    if std::env::var(USER_ID_ENV).is_ok() {
        output::warning(&format!("{} is set and takes precedence", USER_ID_ENV));
    }
    Ok(())
}
