//! # API del catálogo de mesas
//!
//! Altas, listado y borrado de mesas. El borrado se bloquea mientras la
//! mesa tenga reservas activas que la referencien.

use actix_web::{delete, get, post, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use super::middleware::ErrorLogExt;
use super::{AppError, AppResult};
use crate::db::{Mesa, MongoRepo};
use crate::scheduling;

/// Capacidad máxima admitida para una mesa
const CAPACIDAD_MAXIMA: i32 = 20;

#[derive(Deserialize)]
struct NewTable {
    numero_mesa: i64,
    capacidad: i32,
    descripcion: Option<String>,
}

#[derive(Serialize)]
struct TableResponse {
    numero_mesa: i64,
    capacidad: i32,
    descripcion: Option<String>,
    label: String,
}

impl From<Mesa> for TableResponse {
    fn from(mesa: Mesa) -> Self {
        let label =
            scheduling::etiqueta_mesa(mesa.numero_mesa, mesa.capacidad, mesa.descripcion.as_deref());
        TableResponse {
            numero_mesa: mesa.numero_mesa,
            capacidad: mesa.capacidad,
            descripcion: mesa.descripcion,
            label,
        }
    }
}

/// Da de alta una mesa en el catálogo
///
/// # Errores
/// - `400 Bad Request`: número de mesa o capacidad fuera de rango
/// - `409 Conflict`: ya existe una mesa con ese número
/// - `500 Internal Server Error`: Error de base de datos
#[post("/tables")]
async fn create_table(
    repo: web::Data<MongoRepo>,
    data: web::Json<NewTable>,
) -> AppResult<impl Responder> {
    if data.numero_mesa < 1 {
        return Err(AppError::Validation(
            "El número de mesa debe ser mayor a 0".to_string(),
        ));
    }

    if data.capacidad < 1 || data.capacidad > CAPACIDAD_MAXIMA {
        return Err(AppError::Validation(format!(
            "La capacidad debe estar entre 1 y {}",
            CAPACIDAD_MAXIMA
        )));
    }

    // El índice único sobre numero_mesa respalda esta comprobación
    let existente = repo
        .mesa_por_numero(data.numero_mesa)
        .await
        .log_error_context("checking table number uniqueness")?;
    if existente.is_some() {
        return Err(AppError::Conflict(format!(
            "Ya existe la mesa {}",
            data.numero_mesa
        )));
    }

    let mesa = Mesa {
        id: None,
        numero_mesa: data.numero_mesa,
        capacidad: data.capacidad,
        descripcion: data.descripcion.clone(),
        created_at: MongoRepo::current_timestamp(),
    };

    repo.mesas()
        .insert_one(mesa)
        .await
        .log_error_context("inserting new table")
        .map_err(|e| AppError::database("create_table", e))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Mesa creada correctamente",
        "numero_mesa": data.numero_mesa
    })))
}

/// Lista el catálogo completo de mesas
#[get("/tables")]
async fn get_tables(repo: web::Data<MongoRepo>) -> AppResult<impl Responder> {
    let mesas = repo
        .todas_las_mesas()
        .await
        .log_error_context("listing tables")?;

    let respuesta: Vec<TableResponse> = mesas.into_iter().map(TableResponse::from).collect();
    Ok(HttpResponse::Ok().json(respuesta))
}

/// Borra una mesa del catálogo
///
/// Se rechaza mientras existan reservas pendientes o confirmadas que
/// referencien la mesa.
///
/// # Errores
/// - `404 Not Found`: Mesa no encontrada
/// - `409 Conflict`: La mesa tiene reservas activas
/// - `500 Internal Server Error`: Error de base de datos
#[delete("/tables/{numero_mesa}")]
async fn delete_table(
    repo: web::Data<MongoRepo>,
    path: web::Path<i64>,
) -> AppResult<impl Responder> {
    let numero_mesa = path.into_inner();

    let activas = repo
        .reservas_activas_de_mesa(numero_mesa)
        .await
        .log_error_context("counting active reservations before table delete")?;
    if activas > 0 {
        return Err(AppError::Conflict(format!(
            "La mesa {} tiene {} reservas activas",
            numero_mesa, activas
        )));
    }

    let result = repo
        .mesas()
        .delete_one(mongodb::bson::doc! { "numero_mesa": numero_mesa })
        .await
        .log_error_context("deleting table")
        .map_err(|e| AppError::database("delete_table", e))?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Mesa no encontrada".to_string()));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Mesa eliminada correctamente",
        "numero_mesa": numero_mesa
    })))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_table);
    cfg.service(get_tables);
    cfg.service(delete_table);
}
