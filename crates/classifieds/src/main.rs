use crate::prelude::*;
use clap::Parser;
use std::path::PathBuf;

mod auth;
mod error;
mod import;
mod pipeline;
mod prelude;
mod register;
mod session;
mod store;
mod web;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Authenticated dashboard for browsing classified-ad listings"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// SQLite database holding listings and users
    #[clap(long, env = "CLASSIFIEDS_DATABASE", global = true)]
    database: Option<PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "CLASSIFIEDS_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

impl Global {
    /// Database path, defaulting to the user's data directory
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }

        let dir = dirs_next::data_dir()
            .ok_or_eyre("Unable to determine data directory, pass --database")?
            .join("classifieds");

        std::fs::create_dir_all(&dir)
            .map_err(|e| eyre!("Failed to create data directory {}: {}", dir.display(), e))?;

        Ok(dir.join("classifieds.db"))
    }
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Run the listings web application
    Serve(crate::web::ServeOptions),

    /// Register a user allowed to log in
    Register(crate::register::RegisterOptions),

    /// Import listing documents from a JSON file
    Import(crate::import::ImportOptions),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Serve(options) => crate::web::run(options, app.global).await,
        SubCommands::Register(options) => crate::register::run(options, app.global).await,
        SubCommands::Import(options) => crate::import::run(options, app.global).await,
    }
}
