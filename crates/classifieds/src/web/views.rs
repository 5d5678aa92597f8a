//! JSON views rendered by the handlers

use std::io;
use std::path::{Path, PathBuf};

use classifieds_core::assets::{
    gallery_paths, LOGOS_DIR, LOGOS_FALLBACK, PROPERTIES_DIR, PROPERTIES_FALLBACK,
};
use classifieds_core::normalize::DisplayRecord;
use classifieds_core::page::ListingPage;
use serde::Serialize;

use crate::session::Flash;

#[derive(Debug, Serialize)]
pub struct LoginView {
    pub flashes: Vec<Flash>,
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    #[serde(flatten)]
    pub page: ListingPage,
    pub logos: Vec<String>,
    pub username: String,
    pub flashes: Vec<Flash>,
}

#[derive(Debug, Serialize)]
pub struct DetailView {
    pub item: DisplayRecord,
    pub logos: Vec<String>,
    pub username: String,
    pub flashes: Vec<Flash>,
}

#[derive(Debug, Serialize)]
pub struct ErrorView {
    pub status: u16,
    pub flashes: Vec<Flash>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logos: Vec<String>,
}

pub async fn logos(static_dir: &Path) -> Vec<String> {
    gallery(static_dir, LOGOS_DIR, LOGOS_FALLBACK).await
}

pub async fn property_images(static_dir: &Path) -> Vec<String> {
    gallery(static_dir, PROPERTIES_DIR, PROPERTIES_FALLBACK).await
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("gallery directory {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("failed to read gallery directory {}: {source}", .path.display())]
    Unreadable { path: PathBuf, source: io::Error },
}

/// Image paths under `static_dir/dir`, or the fallback when there are none
async fn gallery(static_dir: &Path, dir: &str, fallback: &str) -> Vec<String> {
    match list_gallery(static_dir, dir, fallback).await {
        Ok(images) => images,
        Err(e @ AssetError::Missing(_)) => {
            log::debug!("{e}");
            vec![fallback.to_string()]
        }
        Err(e) => {
            log::warn!("{e}");
            vec![fallback.to_string()]
        }
    }
}

pub async fn list_gallery(
    static_dir: &Path,
    dir: &str,
    fallback: &str,
) -> Result<Vec<String>, AssetError> {
    let path = static_dir.join(dir);

    let names = list_file_names(&path).await.map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            AssetError::Missing(path.clone())
        } else {
            AssetError::Unreadable {
                path: path.clone(),
                source,
            }
        }
    })?;

    Ok(gallery_paths(dir, names, fallback))
}

async fn list_file_names(path: &Path) -> io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(path).await?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }

    Ok(names)
}
