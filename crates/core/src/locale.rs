//! Display labels and user-facing messages
//!
//! The application ships with English and Spanish texts. Labels fill in
//! missing listing fields; messages are shown as flash notices.

use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Locale::En),
            "es" | "spanish" | "español" => Ok(Locale::Es),
            other => Err(format!("Unsupported locale: {other}. Valid locales: en, es")),
        }
    }
}

/// Defaults and sentinels used when normalizing listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Labels {
    pub untitled: &'static str,
    pub general: &'static str,
    /// Dashboard sentinel for a date that could not be formatted
    pub invalid_date: &'static str,
    /// Detail sentinel for a date that could not be formatted
    pub no_date: &'static str,
}

/// Flash notices shown after redirects and failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    pub login_required: &'static str,
    pub invalid_data: &'static str,
    pub welcome: &'static str,
    pub bad_credentials: &'static str,
    pub not_authorized: &'static str,
    pub logged_out: &'static str,
    pub load_error: &'static str,
    pub invalid_id: &'static str,
    pub not_found: &'static str,
    pub detail_error: &'static str,
    pub server_error: &'static str,
    welcome_email_prefix: &'static str,
}

impl Messages {
    pub fn welcome_email(&self, email: &str) -> String {
        format!("{} {email}!", self.welcome_email_prefix)
    }
}

impl Locale {
    pub fn labels(self) -> Labels {
        match self {
            Locale::En => Labels {
                untitled: "Untitled",
                general: "General",
                invalid_date: "Invalid date",
                no_date: "No date",
            },
            Locale::Es => Labels {
                untitled: "Sin título",
                general: "General",
                invalid_date: "Fecha inválida",
                no_date: "Sin fecha",
            },
        }
    }

    pub fn messages(self) -> Messages {
        match self {
            Locale::En => Messages {
                login_required: "Log in to continue.",
                invalid_data: "Invalid data.",
                welcome: "Welcome!",
                bad_credentials: "Incorrect username or password.",
                not_authorized: "Your email is not authorized. Contact the administrator.",
                logged_out: "Session closed.",
                load_error: "Error loading data.",
                invalid_id: "Invalid ID.",
                not_found: "Item not found.",
                detail_error: "Error loading details.",
                server_error: "Server error.",
                welcome_email_prefix: "Welcome",
            },
            Locale::Es => Messages {
                login_required: "Inicia sesión para continuar.",
                invalid_data: "Datos inválidos.",
                welcome: "¡Bienvenido!",
                bad_credentials: "Usuario o contraseña incorrectos.",
                not_authorized: "Tu correo no está autorizado. Contacta al administrador.",
                logged_out: "Sesión cerrada.",
                load_error: "Error cargando datos.",
                invalid_id: "ID inválido.",
                not_found: "Elemento no encontrado.",
                detail_error: "Error cargando detalles.",
                server_error: "Error del servidor.",
                welcome_email_prefix: "Bienvenido",
            },
        }
    }
}
