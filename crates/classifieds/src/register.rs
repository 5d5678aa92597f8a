use crate::prelude::{println, *};
use chrono::Utc;
use classifieds_core::credentials::{hash_password, validate_login, SALT_LEN};
use colored::Colorize;
use std::io::{self, BufRead, Write};

use crate::store::{SqliteStore, StoreError, UserRecord, UserStore};

#[derive(Debug, Clone, clap::Args)]
pub struct RegisterOptions {
    /// Login name. Prompted for when missing
    #[arg(long)]
    pub username: Option<String>,

    /// Password. Prompted for when missing
    #[arg(long, env = "CLASSIFIEDS_REGISTER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Email accepted for single sign-on
    #[arg(long)]
    pub email: Option<String>,

    /// Free-form role stored with the account
    #[arg(long)]
    pub role: Option<String>,
}

/// Validate and store a new account with a salted password hash
pub fn register_user(
    users: &dyn UserStore,
    username: &str,
    password: &str,
    email: Option<&str>,
    role: Option<&str>,
) -> std::result::Result<UserRecord, Error> {
    let username = username.trim();
    validate_login(username, password)?;

    if users.find_by_username(username)?.is_some() {
        return Err(Error::UserExists(username.to_string()));
    }

    let salt: [u8; SALT_LEN] = rand::random();
    let user = UserRecord {
        username: username.to_string(),
        email: email.map(str::trim).filter(|e| !e.is_empty()).map(str::to_string),
        password_hash: hash_password(password, &salt)?,
        role: role.map(str::to_string),
        created_at: Utc::now(),
    };

    match users.insert_user(&user) {
        Ok(()) => Ok(user),
        Err(StoreError::Duplicate(_)) => Err(Error::UserExists(user.username)),
        Err(e) => Err(e.into()),
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;

    Ok(line.trim().to_string())
}

pub async fn run(options: RegisterOptions, global: crate::Global) -> Result<()> {
    let username = match options.username {
        Some(username) => username,
        None => prompt("Username")?,
    };
    let password = match options.password {
        Some(password) => password,
        None => prompt("Password")?,
    };

    let database = global.database_path()?;
    let store = SqliteStore::open(&database, 1)
        .map_err(|e| eyre!("Failed to open database {}: {}", database.display(), e))?;

    let user = register_user(
        &store,
        &username,
        &password,
        options.email.as_deref(),
        options.role.as_deref(),
    )?;

    log::info!("Registered {} in {}", user.username, database.display());
    println!(
        "{}",
        f!("Registered user: {}", user.username).green().bold()
    );
    if global.verbose {
        if let Some(email) = &user.email {
            println!("{} {}", "Email".bold().cyan(), email);
        }
    }

    Ok(())
}
