//! List users command handler

use crate::config::Config;
use crate::db::Store;

pub async fn cmd_list_users(config: &Config) -> anyhow::Result<()> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;
    let users = store.list_users().await?;

    if users.is_empty() {
        println!("No users have signed up yet.");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<70}", "");

    for user in users {
        let messages = store.message_count(user.id).await?;
        println!(
            "{:>4}  {:<20} {:<30} {} message(s)",
            user.id.value(),
            user.username,
            user.full_name(),
            messages
        );
    }

    Ok(())
}
