//! # Reglas de planificación de reservas
//!
//! Lógica pura (sin acceso a base de datos) que decide cuándo una mesa
//! está ocupada:
//! - Duración de la ventana según el número de comensales
//! - Test de solapamiento de intervalos semiabiertos
//! - Antelación mínima ("mañana o más tarde")
//! - Parseo de fecha/hora del formato externo
//! - Rejilla de franjas horarias para sugerir alternativas
//!
//! Todas las funciones son deterministas para facilitar los tests.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::api::{AppError, AppResult};

/// Comensales a partir de los cuales la reserva pasa a ventana larga
pub const UMBRAL_GRUPO_GRANDE: i32 = 4;
/// Duración de la ventana para grupos de hasta 4 personas
pub const DURACION_CORTA_MIN: i64 = 60;
/// Duración de la ventana para grupos de 5 o más personas
pub const DURACION_LARGA_MIN: i64 = 120;

/// Primera franja del día que se ofrece como alternativa (12:00)
const FRANJA_INICIO: (u32, u32) = (12, 0);
/// Última franja del día que se ofrece como alternativa (22:00, inclusive)
const FRANJA_FIN: (u32, u32) = (22, 0);
/// Separación entre franjas consecutivas
const FRANJA_PASO_MIN: i64 = 30;

/// Calcula la duración en minutos de la ventana de una reserva
///
/// Regla fija de negocio: grupos de hasta 4 personas ocupan la mesa
/// 1 hora; grupos mayores, 2 horas.
pub fn duracion_minutos(numero_personas: i32) -> i64 {
    if numero_personas <= UMBRAL_GRUPO_GRANDE {
        DURACION_CORTA_MIN
    } else {
        DURACION_LARGA_MIN
    }
}

/// Test de solapamiento de dos intervalos semiabiertos `[a_inicio, a_fin)`
/// y `[b_inicio, b_fin)`
///
/// Dos ventanas que solo se tocan en el borde (una termina justo cuando
/// empieza la otra) NO se solapan.
pub fn se_solapan(a_inicio: i64, a_fin: i64, b_inicio: i64, b_fin: i64) -> bool {
    a_inicio < b_fin && b_inicio < a_fin
}

/// Comprueba si una ventana está libre frente a un conjunto de ocupaciones
///
/// # Parámetros
/// - `ocupadas`: ventanas `(inicio, fin)` ya comprometidas para la mesa
/// - `inicio`, `fin`: ventana candidata
pub fn ventana_libre(ocupadas: &[(i64, i64)], inicio: i64, fin: i64) -> bool {
    !ocupadas
        .iter()
        .any(|&(o_inicio, o_fin)| se_solapan(inicio, fin, o_inicio, o_fin))
}

/// Ventana `[inicio, fin)` de una reserva como timestamps unix
pub fn ventana_reserva(inicio: NaiveDateTime, numero_personas: i32) -> (i64, i64) {
    let fin = inicio + Duration::minutes(duracion_minutos(numero_personas));
    (inicio.and_utc().timestamp(), fin.and_utc().timestamp())
}

/// Valida y parsea una fecha en formato YYYY-MM-DD
///
/// # Errores
/// - `Validation`: Si el formato de fecha es incorrecto
pub fn parse_fecha(fecha: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(fecha.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Formato de fecha inválido, use YYYY-MM-DD".to_string()))
}

/// Valida y parsea una hora en formato de 12 horas "hh:mm AM/PM"
///
/// # Errores
/// - `Validation`: Si el formato de hora es incorrecto
pub fn parse_hora(hora: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(hora.trim(), "%I:%M %p")
        .map_err(|_| AppError::Validation("Formato de hora inválido, use hh:mm AM/PM".to_string()))
}

/// Combina los campos externos de fecha y hora en un instante interno
///
/// El formato externo (fecha calendario + hora de 12 horas) se normaliza
/// aquí una sola vez; el resto del código trabaja con `NaiveDateTime` y
/// timestamps unix.
pub fn parse_fecha_hora(fecha: &str, hora: &str) -> AppResult<NaiveDateTime> {
    Ok(parse_fecha(fecha)?.and_time(parse_hora(hora)?))
}

/// Comprueba la antelación mínima: la reserva debe empezar estrictamente
/// después de la medianoche de mañana
///
/// Una petición para hoy o para cualquier día pasado se rechaza; mañana a
/// las 00:01 ya es válido.
pub fn cumple_antelacion(fecha_hora: NaiveDateTime, ahora: NaiveDateTime) -> bool {
    let frontera = (ahora.date() + Duration::days(1)).and_time(NaiveTime::MIN);
    fecha_hora > frontera
}

/// Etiqueta legible de una mesa para el cliente
///
/// Usa la descripción si el administrador la rellenó; si no, una clase de
/// tamaño derivada de la capacidad.
pub fn etiqueta_mesa(numero_mesa: i64, capacidad: i32, descripcion: Option<&str>) -> String {
    match descripcion {
        Some(d) if !d.trim().is_empty() => format!("Mesa {} - {}", numero_mesa, d.trim()),
        _ => format!("Mesa {} - {}", numero_mesa, clase_tamano(capacidad)),
    }
}

fn clase_tamano(capacidad: i32) -> &'static str {
    if capacidad <= 2 {
        "Pequeña"
    } else if capacidad <= 6 {
        "Mediana"
    } else {
        "Grande"
    }
}

/// Rejilla de franjas candidatas para alternativas: de 12:00 a 22:00
/// (ambas incluidas) cada 30 minutos, siempre sobre la misma fecha
///
/// Produce exactamente 21 instantes.
pub fn franjas_del_dia(fecha: NaiveDate) -> Vec<NaiveDateTime> {
    let inicio = fecha.and_time(hora(FRANJA_INICIO));
    let fin = fecha.and_time(hora(FRANJA_FIN));

    let mut franjas = Vec::new();
    let mut actual = inicio;
    while actual <= fin {
        franjas.push(actual);
        actual += Duration::minutes(FRANJA_PASO_MIN);
    }
    franjas
}

fn hora((h, m): (u32, u32)) -> NaiveTime {
    // Constantes del módulo, siempre válidas
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Formatea un instante interno como hora externa de 12 horas
pub fn formatea_hora(fecha_hora: NaiveDateTime) -> String {
    fecha_hora.format("%I:%M %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(fecha: &str, hora: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(fecha, "%Y-%m-%d")
            .unwrap()
            .and_time(NaiveTime::parse_from_str(hora, "%H:%M").unwrap())
    }

    #[test]
    fn duracion_en_el_umbral() {
        assert_eq!(duracion_minutos(1), 60);
        assert_eq!(duracion_minutos(4), 60);
        assert_eq!(duracion_minutos(5), 120);
        assert_eq!(duracion_minutos(12), 120);
    }

    #[test]
    fn solapamiento_de_intervalos_semiabiertos() {
        // Intersección parcial
        assert!(se_solapan(0, 10, 5, 15));
        assert!(se_solapan(5, 15, 0, 10));
        // Contención
        assert!(se_solapan(0, 10, 2, 8));
        // Idénticos
        assert!(se_solapan(0, 10, 0, 10));
        // Adyacentes: el borde compartido no cuenta
        assert!(!se_solapan(0, 10, 10, 20));
        assert!(!se_solapan(10, 20, 0, 10));
        // Disjuntos
        assert!(!se_solapan(0, 10, 20, 30));
    }

    #[test]
    fn escenario_mesa_cinco() {
        // Reserva confirmada 18:00-19:00 (3 personas). Una petición para
        // las 18:30 (2 personas, 1 hora) choca; una para las 19:00 es
        // adyacente y entra.
        let existente = ventana_reserva(dt("2025-06-10", "18:00"), 3);
        let ocupadas = vec![existente];

        let (i1, f1) = ventana_reserva(dt("2025-06-10", "18:30"), 2);
        assert!(!ventana_libre(&ocupadas, i1, f1));

        let (i2, f2) = ventana_reserva(dt("2025-06-10", "19:00"), 2);
        assert!(ventana_libre(&ocupadas, i2, f2));
    }

    #[test]
    fn antelacion_minima() {
        let ahora = dt("2025-06-09", "14:30");
        // Hoy y ayer se rechazan a cualquier hora
        assert!(!cumple_antelacion(dt("2025-06-09", "23:59"), ahora));
        assert!(!cumple_antelacion(dt("2025-06-08", "12:00"), ahora));
        // La medianoche exacta de mañana queda fuera (estrictamente después)
        assert!(!cumple_antelacion(dt("2025-06-10", "00:00"), ahora));
        // Mañana a las 00:01 ya es válido
        assert!(cumple_antelacion(dt("2025-06-10", "00:01"), ahora));
        assert!(cumple_antelacion(dt("2025-07-01", "20:00"), ahora));
    }

    #[test]
    fn parseo_de_fecha_y_hora() {
        assert!(parse_fecha("2025-06-10").is_ok());
        assert!(parse_fecha("10/06/2025").is_err());
        assert!(parse_fecha("").is_err());

        let h = parse_hora("06:30 PM").unwrap();
        assert_eq!(h, NaiveTime::from_hms_opt(18, 30, 0).unwrap());
        let h = parse_hora("12:00 AM").unwrap();
        assert_eq!(h, NaiveTime::MIN);
        assert!(parse_hora("18:30").is_err());
        assert!(parse_hora("99:99 PM").is_err());

        let fh = parse_fecha_hora("2025-06-10", "07:00 PM").unwrap();
        assert_eq!(fh, dt("2025-06-10", "19:00"));
    }

    #[test]
    fn rejilla_de_franjas() {
        let fecha = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let franjas = franjas_del_dia(fecha);

        assert_eq!(franjas.len(), 21);
        assert_eq!(franjas[0], dt("2025-06-10", "12:00"));
        assert_eq!(franjas[20], dt("2025-06-10", "22:00"));
        // Todas dentro del mismo día y con paso de 30 minutos
        for par in franjas.windows(2) {
            assert_eq!(par[0].date(), fecha);
            assert_eq!(par[1] - par[0], Duration::minutes(30));
        }
    }

    #[test]
    fn etiquetas_de_mesa() {
        assert_eq!(etiqueta_mesa(3, 2, None), "Mesa 3 - Pequeña");
        assert_eq!(etiqueta_mesa(4, 6, Some("  ")), "Mesa 4 - Mediana");
        assert_eq!(etiqueta_mesa(9, 10, None), "Mesa 9 - Grande");
        assert_eq!(
            etiqueta_mesa(1, 4, Some("Junto a la ventana")),
            "Mesa 1 - Junto a la ventana"
        );
    }

    #[test]
    fn formato_de_hora_externa() {
        assert_eq!(formatea_hora(dt("2025-06-10", "18:30")), "06:30 PM");
        assert_eq!(formatea_hora(dt("2025-06-10", "12:00")), "12:00 PM");
        assert_eq!(formatea_hora(dt("2025-06-10", "00:30")), "12:30 AM");
    }
}
