//! Image galleries served from the static directory

pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

pub const LOGOS_DIR: &str = "logos";
pub const LOGOS_FALLBACK: &str = "logo.png";
pub const PROPERTIES_DIR: &str = "propiedades";
pub const PROPERTIES_FALLBACK: &str = "propiedades/default.jpg";

pub fn is_image_file(name: &str) -> bool {
    name.rsplit_once('.').is_some_and(|(stem, ext)| {
        !stem.is_empty()
            && IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

/// Build the sorted list of static paths for a gallery
///
/// Keeps image files only and prefixes each with `dir`. Returns the fallback
/// path when no image is left.
pub fn gallery_paths<I>(dir: &str, file_names: I, fallback: &str) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut images: Vec<String> = file_names
        .into_iter()
        .filter(|name| is_image_file(name))
        .map(|name| format!("{dir}/{name}"))
        .collect();

    if images.is_empty() {
        return vec![fallback.to_string()];
    }

    images.sort();
    images
}
