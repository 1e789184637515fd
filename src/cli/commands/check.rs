//! Check command handler

use crate::api::mask_value;
use crate::config::Config;
use crate::db::{AchievementStore, UserStore};
use crate::state::connect_backend;

pub async fn cmd_check(config: &Config) -> anyhow::Result<()> {
    let backend = connect_backend(config).await?;

    println!("Backend:      {}", backend.name());
    match config.storage.backend {
        crate::config::StorageBackend::Sqlite => {
            println!("Database:     {}", config.storage.database_path);
        }
        crate::config::StorageBackend::Supabase => {
            println!(
                "Supabase URL: {}",
                mask_value(config.storage.supabase_url.as_deref())
            );
            println!(
                "Supabase key: {}",
                mask_value(config.storage.supabase_key.as_deref())
            );
        }
    }
    println!(
        "JWT secret:   {}",
        mask_value(config.auth.jwt_secret.as_deref())
    );

    match backend.ping().await {
        Ok(()) => {
            let catalog = backend.list_catalog().await?;
            let has_users = backend.has_users().await?;
            println!("Connection:   ok");
            println!("Catalog:      {} achievements", catalog.len());
            println!("Users:        {}", if has_users { "present" } else { "none" });
            Ok(())
        }
        Err(e) => {
            println!("Connection:   FAILED ({e})");
            anyhow::bail!("storage backend is not reachable")
        }
    }
}
