//! # Manejo de errores de la aplicación
//!
//! Taxonomía cerrada de errores del núcleo de reservas y su mapeo a
//! respuestas HTTP. El detalle crudo de los errores de base de datos se
//! registra solo en el servidor; el cliente recibe un mensaje genérico.

use actix_web::{HttpResponse, ResponseError};
use std::error::Error;
use thiserror::Error;

/// Tipos de error del núcleo de reservas
#[derive(Error, Debug)]
pub enum AppError {
    /// Fallo de la capa de persistencia con contexto de operación
    ///
    /// Se genera desde mongodb::error::Error manteniendo la cadena de
    /// errores original para debugging en el servidor.
    #[error("Error de base de datos en operación '{operation}': {source}")]
    Database {
        operation: String,
        #[source]
        source: mongodb::error::Error,
    },

    /// Entrada malformada o fuera de rango; se reporta tal cual al cliente
    /// y nunca se reintenta
    #[error("Error de validación: {0}")]
    Validation(String),

    /// La mesa (u otro recurso) referenciado no existe
    #[error("No encontrado: {0}")]
    NotFound(String),

    /// Solapamiento detectado en el momento de confirmar, aunque la mesa
    /// pareciera libre al consultar; el cliente debe volver a consultar
    /// disponibilidad
    #[error("Conflicto: {0}")]
    Conflict(String),

    /// Error interno no clasificado
    #[error("Error interno: {0}")]
    Internal(String),
}

impl AppError {
    /// Crea un error de base de datos con contexto de operación
    pub fn database(operation: &str, source: mongodb::error::Error) -> Self {
        Self::Database {
            operation: operation.to_string(),
            source,
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        // Log detallado del error antes de responder
        match self {
            Self::Database { operation, source } => {
                tracing::error!(
                    operation = %operation,
                    error = %source,
                    error_chain = ?source.source(),
                    "Database error occurred"
                );
                // El texto crudo del driver no sale del servidor
                HttpResponse::InternalServerError().json(ErrorResponse {
                    error: "Error de base de datos".to_string(),
                    message: "Error interno del servidor".to_string(),
                })
            }
            Self::Validation(message) => {
                tracing::warn!(message = %message, "Validation error");
                HttpResponse::BadRequest().json(ErrorResponse {
                    error: "Error de validación".to_string(),
                    message: message.clone(),
                })
            }
            Self::NotFound(message) => {
                tracing::info!(message = %message, "Resource not found");
                HttpResponse::NotFound().json(ErrorResponse {
                    error: "No encontrado".to_string(),
                    message: message.clone(),
                })
            }
            Self::Conflict(message) => {
                tracing::info!(message = %message, "Booking conflict");
                HttpResponse::Conflict().json(ErrorResponse {
                    error: "Conflicto".to_string(),
                    message: message.clone(),
                })
            }
            Self::Internal(message) => {
                tracing::error!(message = %message, "Internal error");
                HttpResponse::InternalServerError().json(ErrorResponse {
                    error: "Error interno".to_string(),
                    message: "Error interno del servidor".to_string(),
                })
            }
        }
    }
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

pub type AppResult<T> = Result<T, AppError>;

// Conversión automática desde mongodb::error::Error
impl From<mongodb::error::Error> for AppError {
    fn from(error: mongodb::error::Error) -> Self {
        Self::Database {
            operation: "database_operation".to_string(),
            source: error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn codigos_http_por_tipo() {
        let casos = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                AppError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, esperado) in casos {
            assert_eq!(error.error_response().status(), esperado);
        }
    }
}
