//! # API de Reservas
//!
//! Este módulo maneja todas las operaciones relacionadas con reservas:
//! - Crear nuevas reservas (con re-chequeo de solapamiento bajo candado)
//! - Listar reservas con filtros opcionales
//! - Confirmar reservas pendientes
//! - Cancelar reservas

use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::DateTime;
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};

use super::middleware::ErrorLogExt;
use super::{AppError, AppResult};
use crate::db::{EstadoReserva, MongoRepo, Reserva, TableLocks, TipoReserva};
use crate::scheduling;

/// Estructura para crear una nueva reserva
///
/// La identidad del cliente (`id_cliente`) la aporta el colaborador que
/// invoca al núcleo, que ya ha validado sesión y token anti-falsificación.
#[derive(Deserialize)]
struct MakeReservation {
    id_cliente: String,
    /// Fecha de la reserva (formato YYYY-MM-DD)
    fecha: String,
    /// Hora de la reserva (formato de 12 horas, "hh:mm AM/PM")
    hora: String,
    numero_personas: i32,
    /// Número visible de la mesa a reservar
    numero_mesa: i64,
    peticiones_especiales: Option<String>,
}

/// Parámetros de consulta para listar reservas
#[derive(Deserialize)]
struct ReservationQuery {
    /// Filtrar por fecha específica (formato YYYY-MM-DD)
    fecha: Option<String>,
    /// Filtrar por estado ("pendiente", "confirmada", "cancelada")
    estado: Option<String>,
}

/// Versión de una reserva para envío al cliente, con el instante interno
/// desplegado de nuevo en fecha y hora externas
#[derive(Serialize)]
struct ReservationResponse {
    id: String,
    id_cliente: String,
    tipo: TipoReserva,
    fecha: String,
    hora: String,
    numero_personas: i32,
    duracion_min: i64,
    estado: EstadoReserva,
    numero_mesa: Option<i64>,
    peticiones_especiales: Option<String>,
}

impl From<Reserva> for ReservationResponse {
    fn from(reserva: Reserva) -> Self {
        let fecha_hora = DateTime::from_timestamp(reserva.fecha_hora, 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or_default();
        ReservationResponse {
            id: reserva.id.map(|id| id.to_hex()).unwrap_or_default(),
            id_cliente: reserva.id_cliente,
            tipo: reserva.tipo,
            fecha: fecha_hora.format("%Y-%m-%d").to_string(),
            hora: scheduling::formatea_hora(fecha_hora),
            numero_personas: reserva.numero_personas,
            duracion_min: reserva.duracion_min,
            estado: reserva.estado,
            numero_mesa: reserva.numero_mesa,
            peticiones_especiales: reserva.peticiones_especiales,
        }
    }
}

/// Crea una nueva reserva
///
/// # Validaciones (en orden, gana el primer fallo)
/// 1. Fecha y hora parseables; antelación mínima de un día
/// 2. Número de personas mayor a 0
/// 3. La mesa debe existir y tener capacidad suficiente
/// 4. La ventana recalculada no debe pisar ninguna reserva activa
///
/// El re-chequeo de solapamiento y la inserción se ejecutan con el candado
/// de la mesa en mano: dos altas simultáneas para la misma mesa con
/// ventanas cruzadas no pueden ganar las dos. Las demás mesas no se ven
/// bloqueadas.
///
/// # Respuesta
/// ```json
/// {
///   "success": true,
///   "message": "Reserva creada correctamente",
///   "id": "507f1f77bcf86cd799439011",
///   "estado": "pendiente"
/// }
/// ```
///
/// # Errores
/// - `400 Bad Request`: Datos de validación incorrectos
/// - `404 Not Found`: Mesa no encontrada
/// - `409 Conflict`: La mesa ya tiene una reserva que pisa esa ventana
/// - `500 Internal Server Error`: Error de base de datos
#[post("/reservations")]
async fn make_reservation(
    repo: web::Data<MongoRepo>,
    locks: web::Data<TableLocks>,
    data: web::Json<MakeReservation>,
) -> AppResult<impl Responder> {
    // Validaciones de entrada
    if data.id_cliente.trim().is_empty() {
        return Err(AppError::Validation(
            "El identificador del cliente es requerido".to_string(),
        ));
    }

    let fecha_hora = scheduling::parse_fecha_hora(&data.fecha, &data.hora)?;
    let ahora = chrono::Utc::now().naive_utc();
    if !scheduling::cumple_antelacion(fecha_hora, ahora) {
        return Err(AppError::Validation(
            "Las reservas deben hacerse al menos con un día de antelación".to_string(),
        ));
    }

    if data.numero_personas < 1 {
        return Err(AppError::Validation(
            "El número de personas debe ser mayor a 0".to_string(),
        ));
    }

    // Verificar que la mesa existe y tiene capacidad
    let mesa = repo
        .mesa_por_numero(data.numero_mesa)
        .await
        .log_error_context("looking up table for reservation")?
        .ok_or_else(|| AppError::NotFound("Mesa no encontrada".to_string()))?;

    if data.numero_personas > mesa.capacidad {
        return Err(AppError::Validation(format!(
            "Esta mesa permite máximo {} personas",
            mesa.capacidad
        )));
    }

    let (inicio, fin) = scheduling::ventana_reserva(fecha_hora, data.numero_personas);

    // Comprobación y alta bajo el candado de la mesa: cierra la ventana de
    // carrera entre el chequeo y la inserción
    let _guard = locks.acquire(data.numero_mesa).await;

    let solapadas = repo
        .cuenta_solapadas(data.numero_mesa, inicio, fin)
        .await
        .log_error_context("re-checking overlap before insert")?;

    if solapadas > 0 {
        return Err(AppError::Conflict(
            "Ya existe una reserva para esta mesa en ese horario".to_string(),
        ));
    }

    let current_time = MongoRepo::current_timestamp();
    let reserva = Reserva {
        id: None,
        id_cliente: data.id_cliente.clone(),
        tipo: TipoReserva::Reserva,
        fecha_hora: inicio,
        fin,
        numero_personas: data.numero_personas,
        duracion_min: scheduling::duracion_minutos(data.numero_personas),
        estado: EstadoReserva::Pendiente,
        numero_mesa: Some(data.numero_mesa),
        peticiones_especiales: data.peticiones_especiales.clone(),
        created_at: current_time,
        updated_at: current_time,
    };

    let result = repo
        .reservas()
        .insert_one(reserva)
        .await
        .log_error_context("inserting new reservation")
        .map_err(|e| AppError::database("insert_reservation", e))?;

    let id = result
        .inserted_id
        .as_object_id()
        .map(|oid| oid.to_hex())
        .unwrap_or_default();

    tracing::info!(
        numero_mesa = data.numero_mesa,
        numero_personas = data.numero_personas,
        id = %id,
        "Reserva creada"
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Reserva creada correctamente",
        "id": id,
        "estado": EstadoReserva::Pendiente.as_str()
    })))
}

/// Lista las reservas con filtros opcionales
///
/// # Filtros disponibles
/// - `fecha`: reservas cuyo inicio cae en ese día (formato YYYY-MM-DD)
/// - `estado`: "pendiente", "confirmada" o "cancelada"
///
/// # Errores
/// - `400 Bad Request`: Filtro malformado
/// - `500 Internal Server Error`: Error de base de datos
#[get("/reservations")]
async fn get_reservations(
    repo: web::Data<MongoRepo>,
    query: web::Query<ReservationQuery>,
) -> AppResult<impl Responder> {
    // Construir filtro dinámico basado en parámetros
    let mut filter = doc! { "tipo": TipoReserva::Reserva.as_str() };

    if let Some(fecha) = &query.fecha {
        let dia = scheduling::parse_fecha(fecha)?;
        let dia_inicio = dia.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        filter.insert(
            "fecha_hora",
            doc! { "$gte": dia_inicio, "$lt": dia_inicio + 24 * 3600 },
        );
    }

    if let Some(estado) = &query.estado {
        let valido = [
            EstadoReserva::Pendiente,
            EstadoReserva::Confirmada,
            EstadoReserva::Cancelada,
        ]
        .iter()
        .any(|e| e.as_str() == estado);
        if !valido {
            return Err(AppError::Validation(format!(
                "Estado desconocido: '{}'",
                estado
            )));
        }
        filter.insert("estado", estado);
    }

    let mut cursor = repo
        .reservas()
        .find(filter)
        .sort(doc! { "fecha_hora": 1 })
        .await
        .log_error_context("listing reservations")
        .map_err(|e| AppError::database("list_reservations", e))?;

    let mut results = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| AppError::database("list_reservations_cursor", e))?
    {
        let reserva = cursor
            .deserialize_current()
            .map_err(|e| AppError::database("deserialize_reserva", e))?;
        results.push(ReservationResponse::from(reserva));
    }

    Ok(HttpResponse::Ok().json(results))
}

/// Confirma una reserva pendiente
///
/// Cambia el estado de "pendiente" a "confirmada" (acción de admin). Solo
/// se pueden confirmar reservas que sigan pendientes.
///
/// # Errores
/// - `400 Bad Request`: ID de reserva inválido
/// - `404 Not Found`: Reserva no encontrada o ya procesada
/// - `500 Internal Server Error`: Error de base de datos
#[post("/reservations/{id}/confirm")]
async fn confirm_reservation(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
) -> AppResult<impl Responder> {
    let reservation_id = ObjectId::parse_str(&path.into_inner())
        .map_err(|_| AppError::Validation("ID de reserva inválido".to_string()))?;

    // Actualizar la reserva solo si sigue pendiente
    let result = repo
        .reservas()
        .update_one(
            doc! {
                "_id": reservation_id,
                "estado": EstadoReserva::Pendiente.as_str()
            },
            doc! {
                "$set": {
                    "estado": EstadoReserva::Confirmada.as_str(),
                    "updated_at": MongoRepo::current_timestamp()
                }
            },
        )
        .await
        .log_error_context("confirming reservation")
        .map_err(|e| AppError::database("confirm_reservation", e))?;

    if result.modified_count == 0 {
        return Err(AppError::NotFound(
            "Reserva no encontrada o ya procesada".to_string(),
        ));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Reserva confirmada correctamente",
        "id": reservation_id.to_hex(),
        "estado": EstadoReserva::Confirmada.as_str()
    })))
}

/// Cancela una reserva
///
/// Cambia el estado a "cancelada". Vale tanto para pendientes como para
/// confirmadas (anulación de admin); una cancelada no se reactiva. La
/// reserva cancelada deja de contar para los solapamientos: su ventana
/// queda libre de inmediato.
///
/// # Errores
/// - `400 Bad Request`: ID de reserva inválido
/// - `404 Not Found`: Reserva no encontrada o ya cancelada
/// - `500 Internal Server Error`: Error de base de datos
#[post("/reservations/{id}/cancel")]
async fn cancel_reservation(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
) -> AppResult<impl Responder> {
    let reservation_id = ObjectId::parse_str(&path.into_inner())
        .map_err(|_| AppError::Validation("ID de reserva inválido".to_string()))?;

    let result = repo
        .reservas()
        .update_one(
            doc! {
                "_id": reservation_id,
                "estado": { "$ne": EstadoReserva::Cancelada.as_str() }
            },
            doc! {
                "$set": {
                    "estado": EstadoReserva::Cancelada.as_str(),
                    "updated_at": MongoRepo::current_timestamp()
                }
            },
        )
        .await
        .log_error_context("cancelling reservation")
        .map_err(|e| AppError::database("cancel_reservation", e))?;

    if result.modified_count == 0 {
        return Err(AppError::NotFound(
            "Reserva no encontrada o ya cancelada".to_string(),
        ));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Reserva cancelada correctamente",
        "id": reservation_id.to_hex(),
        "estado": EstadoReserva::Cancelada.as_str()
    })))
}

/// Configura las rutas relacionadas con reservas
///
/// # Rutas disponibles
/// - `POST /reservations` - Crear nueva reserva
/// - `GET /reservations` - Listar reservas con filtros opcionales
/// - `POST /reservations/{id}/confirm` - Confirmar reserva pendiente
/// - `POST /reservations/{id}/cancel` - Cancelar reserva
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(make_reservation);
    cfg.service(get_reservations);
    cfg.service(confirm_reservation);
    cfg.service(cancel_reservation);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respuesta_despliega_fecha_y_hora_externas() {
        let inicio = chrono::NaiveDate::from_ymd_opt(2025, 6, 10)
            .unwrap()
            .and_hms_opt(18, 30, 0)
            .unwrap();
        let reserva = Reserva {
            id: None,
            id_cliente: "cliente-7".to_string(),
            tipo: TipoReserva::Reserva,
            fecha_hora: inicio.and_utc().timestamp(),
            fin: inicio.and_utc().timestamp() + 3600,
            numero_personas: 2,
            duracion_min: 60,
            estado: EstadoReserva::Pendiente,
            numero_mesa: Some(5),
            peticiones_especiales: None,
            created_at: 0,
            updated_at: 0,
        };

        let respuesta = ReservationResponse::from(reserva);
        assert_eq!(respuesta.fecha, "2025-06-10");
        assert_eq!(respuesta.hora, "06:30 PM");
        assert_eq!(respuesta.numero_mesa, Some(5));
        assert_eq!(respuesta.estado, EstadoReserva::Pendiente);
    }
}
