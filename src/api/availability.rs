//! # API de disponibilidad
//!
//! Motor de disponibilidad de mesas: dada una fecha, una hora y un número
//! de comensales, responde qué mesas pueden acoger la reserva sin chocar
//! con las ya existentes y, si ninguna puede, sugiere franjas alternativas
//! del mismo día.
//!
//! La consulta es puramente de lectura: comprobar disponibilidad nunca
//! bloquea ni aparta una mesa.

use std::collections::HashMap;
use std::env;
use std::time::{Duration, Instant};

use actix_web::{post, web, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::middleware::ErrorLogExt;
use super::{AppError, AppResult};
use crate::db::{Mesa, MongoRepo};
use crate::scheduling;

/// Tiempo máximo del barrido de alternativas antes de devolver resultados
/// parciales
const SCAN_TIMEOUT_MS_DEFAULT: u64 = 2_000;

/// Petición de disponibilidad
#[derive(Deserialize)]
struct AvailabilityRequest {
    /// Fecha solicitada (formato YYYY-MM-DD)
    fecha: String,
    /// Hora solicitada (formato de 12 horas, "hh:mm AM/PM")
    hora: String,
    /// Número de comensales
    numero_personas: i32,
}

/// Mesa disponible tal como la ve el cliente
#[derive(Serialize)]
struct TableInfo {
    table_number: i64,
    capacity: i32,
    label: String,
}

/// Franja alternativa del mismo día con al menos una mesa libre
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct AlternativeSlot {
    /// Hora de la franja en formato externo ("hh:mm AM/PM")
    time: String,
    /// Cuántas mesas con capacidad suficiente quedan libres
    tables: u32,
}

#[derive(Serialize)]
struct AvailabilityResponse {
    success: bool,
    message: String,
    tables: Vec<TableInfo>,
    alternatives: Vec<AlternativeSlot>,
}

/// Filtra el catálogo a las mesas con capacidad suficiente, respetando el
/// orden del catálogo (por número de mesa)
fn mesas_elegibles(mesas: &[Mesa], numero_personas: i32) -> Vec<&Mesa> {
    mesas
        .iter()
        .filter(|m| m.capacidad >= numero_personas)
        .collect()
}

/// Barrido de franjas alternativas del mismo día
///
/// Recorre la rejilla de 12:00 a 22:00 cada 30 minutos y cuenta, para cada
/// franja, cuántas mesas elegibles quedan libres frente a las ocupaciones
/// ya cargadas. Solo entran franjas con al menos una mesa libre. Si se
/// supera `deadline` el barrido se corta y se devuelve lo acumulado.
fn alternativas_del_dia(
    fecha: NaiveDate,
    numero_personas: i32,
    elegibles: &[i64],
    ocupaciones: &HashMap<i64, Vec<(i64, i64)>>,
    deadline: Instant,
) -> Vec<AlternativeSlot> {
    let mut alternativas = Vec::new();

    for franja in scheduling::franjas_del_dia(fecha) {
        if Instant::now() >= deadline {
            tracing::warn!(
                fecha = %fecha,
                encontradas = alternativas.len(),
                "Barrido de alternativas cortado por timeout; resultado parcial"
            );
            break;
        }

        let (inicio, fin) = scheduling::ventana_reserva(franja, numero_personas);
        let libres = elegibles
            .iter()
            .filter(|numero| {
                let ocupadas = ocupaciones
                    .get(numero)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                scheduling::ventana_libre(ocupadas, inicio, fin)
            })
            .count() as u32;

        if libres > 0 {
            alternativas.push(AlternativeSlot {
                time: scheduling::formatea_hora(franja),
                tables: libres,
            });
        }
    }

    alternativas
}

fn scan_deadline() -> Instant {
    let timeout_ms = env::var("AVAILABILITY_SCAN_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(SCAN_TIMEOUT_MS_DEFAULT);
    Instant::now() + Duration::from_millis(timeout_ms)
}

/// Consulta la disponibilidad de mesas para una fecha, hora y grupo
///
/// # Validaciones
/// - Fecha válida (YYYY-MM-DD) y hora válida (hh:mm AM/PM)
/// - La reserva debe empezar después de la medianoche de mañana
/// - Número de personas entre 1 y la capacidad de la mesa más grande
///
/// # Respuesta
/// Con mesas libres:
/// ```json
/// {
///   "success": true,
///   "message": "2 mesas disponibles",
///   "tables": [{"table_number": 5, "capacity": 6, "label": "Mesa 5 - Mediana"}],
///   "alternatives": []
/// }
/// ```
/// Sin mesas libres, se sugieren franjas del mismo día:
/// ```json
/// {
///   "success": false,
///   "message": "No hay mesas disponibles para esa hora",
///   "tables": [],
///   "alternatives": [{"time": "01:00 PM", "tables": 3}]
/// }
/// ```
///
/// # Errores
/// - `400 Bad Request`: Datos de validación incorrectos
/// - `500 Internal Server Error`: Error de base de datos
#[post("/availability")]
async fn check_availability(
    repo: web::Data<MongoRepo>,
    data: web::Json<AvailabilityRequest>,
) -> AppResult<impl Responder> {
    let fecha = scheduling::parse_fecha(&data.fecha)?;
    let fecha_hora = fecha.and_time(scheduling::parse_hora(&data.hora)?);

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

    let mesas = repo
        .todas_las_mesas()
        .await
        .log_error_context("loading table catalog")?;

    let capacidad_maxima = mesas.iter().map(|m| m.capacidad).max().unwrap_or(0);
    if data.numero_personas > capacidad_maxima {
        return Err(AppError::Validation(format!(
            "No hay mesas para {} personas (capacidad máxima: {})",
            data.numero_personas, capacidad_maxima
        )));
    }

    let elegibles = mesas_elegibles(&mesas, data.numero_personas);
    let (inicio, fin) = scheduling::ventana_reserva(fecha_hora, data.numero_personas);

    // Una consulta de solapamiento por mesa elegible
    let mut disponibles = Vec::new();
    for mesa in &elegibles {
        let solapadas = repo
            .cuenta_solapadas(mesa.numero_mesa, inicio, fin)
            .await
            .log_error_context("checking table overlap")?;
        if solapadas == 0 {
            disponibles.push(TableInfo {
                table_number: mesa.numero_mesa,
                capacity: mesa.capacidad,
                label: scheduling::etiqueta_mesa(
                    mesa.numero_mesa,
                    mesa.capacidad,
                    mesa.descripcion.as_deref(),
                ),
            });
        }
    }

    if !disponibles.is_empty() {
        let message = format!("{} mesas disponibles", disponibles.len());
        return Ok(HttpResponse::Ok().json(AvailabilityResponse {
            success: true,
            message,
            tables: disponibles,
            alternatives: Vec::new(),
        }));
    }

    // Sin mesas a la hora pedida: barrido de franjas del mismo día.
    // Las ocupaciones del día se cargan de una vez y el barrido se
    // resuelve en memoria, acotado por el deadline.
    let numeros: Vec<i64> = elegibles.iter().map(|m| m.numero_mesa).collect();
    let dia_inicio = fecha.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
    let dia_fin = dia_inicio + 24 * 3600;

    let ocupaciones = repo
        .ocupaciones(&numeros, dia_inicio, dia_fin)
        .await
        .log_error_context("loading day occupancy")?;

    let alternativas = alternativas_del_dia(
        fecha,
        data.numero_personas,
        &numeros,
        &ocupaciones,
        scan_deadline(),
    );

    Ok(HttpResponse::Ok().json(AvailabilityResponse {
        success: false,
        message: "No hay mesas disponibles para esa hora".to_string(),
        tables: Vec::new(),
        alternatives: alternativas,
    }))
}

/// Configura las rutas de disponibilidad
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(check_availability);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn mesa(numero_mesa: i64, capacidad: i32) -> Mesa {
        Mesa {
            id: None,
            numero_mesa,
            capacidad,
            descripcion: None,
            created_at: 0,
        }
    }

    fn ts(fecha: NaiveDate, h: u32, m: u32) -> i64 {
        fecha
            .and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
            .and_utc()
            .timestamp()
    }

    fn deadline_amplio() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[test]
    fn filtro_de_capacidad() {
        let mesas = vec![mesa(1, 2), mesa(2, 4), mesa(3, 8)];

        let elegibles = mesas_elegibles(&mesas, 5);
        let numeros: Vec<i64> = elegibles.iter().map(|m| m.numero_mesa).collect();
        assert_eq!(numeros, vec![3]);

        // Una mesa de capacidad C nunca es elegible para más de C personas
        for personas in 1..=10 {
            for m in mesas_elegibles(&mesas, personas) {
                assert!(m.capacidad >= personas);
            }
        }
    }

    #[test]
    fn alternativas_solo_con_mesas_libres() {
        let fecha = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let elegibles = vec![5i64];
        // Mesa 5 ocupada de 13:00 a 14:00
        let mut ocupaciones = HashMap::new();
        ocupaciones.insert(5, vec![(ts(fecha, 13, 0), ts(fecha, 14, 0))]);

        let alternativas =
            alternativas_del_dia(fecha, 2, &elegibles, &ocupaciones, deadline_amplio());

        // Las franjas que pisan la ocupación no aparecen; el resto sí,
        // siempre con al menos una mesa libre
        let horas: Vec<&str> = alternativas.iter().map(|a| a.time.as_str()).collect();
        assert!(!horas.contains(&"01:00 PM"));
        assert!(!horas.contains(&"01:30 PM"));
        // 12:00-13:00 termina justo cuando empieza la ocupación: adyacente
        assert!(horas.contains(&"12:00 PM"));
        assert!(horas.contains(&"02:00 PM"));
        for alternativa in &alternativas {
            assert!(alternativa.tables >= 1);
        }
        // 21 franjas en la rejilla, 3 pisadas (12:30, 13:00, 13:30)
        assert_eq!(alternativas.len(), 18);
    }

    #[test]
    fn alternativas_cuenta_mesas_libres() {
        let fecha = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let elegibles = vec![1i64, 2, 3];
        // Solo la mesa 2 está ocupada al mediodía
        let mut ocupaciones = HashMap::new();
        ocupaciones.insert(2, vec![(ts(fecha, 12, 0), ts(fecha, 13, 0))]);

        let alternativas =
            alternativas_del_dia(fecha, 2, &elegibles, &ocupaciones, deadline_amplio());

        let a_mediodia = alternativas
            .iter()
            .find(|a| a.time == "12:00 PM")
            .expect("franja de mediodía presente");
        assert_eq!(a_mediodia.tables, 2);

        let por_la_tarde = alternativas
            .iter()
            .find(|a| a.time == "08:00 PM")
            .expect("franja de la tarde presente");
        assert_eq!(por_la_tarde.tables, 3);
    }

    #[test]
    fn dia_totalmente_ocupado_sin_alternativas() {
        let fecha = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let elegibles = vec![1i64];
        let mut ocupaciones = HashMap::new();
        // Ocupación continua de 00:00 a 24:00
        ocupaciones.insert(1, vec![(ts(fecha, 0, 0), ts(fecha, 0, 0) + 24 * 3600)]);

        let alternativas =
            alternativas_del_dia(fecha, 2, &elegibles, &ocupaciones, deadline_amplio());
        assert!(alternativas.is_empty());
    }

    #[test]
    fn barrido_repetido_es_identico() {
        // Sin escrituras de por medio, dos barridos devuelven lo mismo
        let fecha = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let elegibles = vec![1i64, 2];
        let mut ocupaciones = HashMap::new();
        ocupaciones.insert(1, vec![(ts(fecha, 18, 0), ts(fecha, 20, 0))]);

        let primero = alternativas_del_dia(fecha, 6, &elegibles, &ocupaciones, deadline_amplio());
        let segundo = alternativas_del_dia(fecha, 6, &elegibles, &ocupaciones, deadline_amplio());
        assert_eq!(primero, segundo);
    }

    #[test]
    fn deadline_agotado_devuelve_parcial() {
        let fecha = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let elegibles = vec![1i64];
        let ocupaciones = HashMap::new();

        // Deadline ya vencido: el barrido no produce nada, pero no cuelga
        let vencido = Instant::now();
        let alternativas = alternativas_del_dia(fecha, 2, &elegibles, &ocupaciones, vencido);
        assert!(alternativas.is_empty());
    }
}
