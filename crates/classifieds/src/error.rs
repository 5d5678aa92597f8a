#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(#[from] classifieds_core::credentials::CredentialError),

    #[error("Storage error: {0}")]
    Store(#[from] crate::store::StoreError),
}
