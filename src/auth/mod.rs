pub mod password;

use anyhow::{Context, Result};
use diesel::prelude::*;
use diesel::SqliteConnection;
use tracing::info;

use crate::models::NewUser;
use crate::schema::users;

struct DefaultUser {
    username: &'static str,
    password: &'static str,
    role: &'static str,
    account_type: &'static str,
}

const DEFAULT_USERS: &[DefaultUser] = &[
    DefaultUser {
        username: "rscoe",
        password: "rscoe@123",
        role: "admin",
        account_type: "admin",
    },
    DefaultUser {
        username: "user",
        password: "user123",
        role: "user",
        account_type: "standard",
    },
];

/// Seeds the stock office accounts on first run. Existing usernames are left
/// untouched, so re-running at every startup is safe.
pub fn seed_default_users(conn: &mut SqliteConnection) -> Result<()> {
    for user in DEFAULT_USERS {
        let row = NewUser {
            username: user.username.to_string(),
            password_hash: password::hash_password(user.password)?,
            role: user.role.to_string(),
            account_type: user.account_type.to_string(),
        };
        let inserted = diesel::insert_or_ignore_into(users::table)
            .values(&row)
            .execute(conn)
            .with_context(|| format!("failed to seed user {}", user.username))?;
        if inserted > 0 {
            info!(username = user.username, "seeded default user");
        }
    }
    Ok(())
}
