//! # Módulo API
//!
//! Este módulo contiene todas las rutas y controladores de la API REST.
//!
//! ## Módulos principales
//!
//! - [`availability`] - Motor de disponibilidad y franjas alternativas
//! - [`reservation`] - Gestión de reservas (crear, confirmar, cancelar)
//! - [`table`] - Catálogo de mesas (crear, listar, eliminar)
//! - [`errors`] - Manejo de errores de la aplicación

pub mod availability;
pub mod errors;
pub mod reservation;
pub mod table;
mod middleware;

// Re-exportar tipos comunes para facilitar su uso
pub use errors::{AppError, AppResult, ErrorResponse};

use actix_web::web;

/// Configura todas las rutas de la API
///
/// ## Rutas configuradas
///
/// - `/availability` - Ver [`availability::routes`]
/// - `/reservations/*` - Ver [`reservation::routes`]
/// - `/tables/*` - Ver [`table::routes`]
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    availability::routes(cfg);
    reservation::routes(cfg);
    table::routes(cfg);
}
