use std::collections::HashMap;
use std::env;

use mongodb::bson::doc;
use mongodb::{Client, Collection, Database};
use serde::{Deserialize, Serialize};

use crate::api::AppError;

pub type Result<T> = std::result::Result<T, AppError>;

/// Discriminante de una fila de `reservas`: reserva de mesa o pedido de
/// comida. Los pedidos no participan en el cálculo de solapamientos.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TipoReserva {
    Reserva,
    Pedido,
}

impl TipoReserva {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoReserva::Reserva => "reserva",
            TipoReserva::Pedido => "pedido",
        }
    }
}

/// Estado de una reserva. Máquina de estados:
/// pendiente → confirmada (admin) o pendiente/confirmada → cancelada.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EstadoReserva {
    Pendiente,
    Confirmada,
    Cancelada,
}

impl EstadoReserva {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoReserva::Pendiente => "pendiente",
            EstadoReserva::Confirmada => "confirmada",
            EstadoReserva::Cancelada => "cancelada",
        }
    }

    /// Estados que ocupan mesa a efectos de solapamiento
    pub fn activos() -> [&'static str; 2] {
        [
            EstadoReserva::Pendiente.as_str(),
            EstadoReserva::Confirmada.as_str(),
        ]
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Mesa {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<mongodb::bson::oid::ObjectId>,
    /// Número visible de la mesa; clave que usan las reservas (no el _id)
    pub numero_mesa: i64,
    pub capacidad: i32,
    pub descripcion: Option<String>,
    pub created_at: i64, // timestamp unix
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Reserva {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<mongodb::bson::oid::ObjectId>,
    pub id_cliente: String,
    pub tipo: TipoReserva,
    /// Inicio de la ventana para reservas; instante del pedido para pedidos
    pub fecha_hora: i64,
    /// Fin de la ventana (`fecha_hora + duracion_min * 60`); solo reservas
    pub fin: i64,
    /// Se persisten ambos para que futuros chequeos de solapamiento usen la
    /// ventana histórica real de cada reserva, no la de la petición actual
    pub numero_personas: i32,
    pub duracion_min: i64,
    pub estado: EstadoReserva,
    pub numero_mesa: Option<i64>,
    pub peticiones_especiales: Option<String>,
    pub created_at: i64, // timestamp unix
    pub updated_at: i64, // timestamp unix
}

#[derive(Debug, Clone)]
pub struct MongoRepo {
    pub client: Client,
    pub database: Database,
}

impl MongoRepo {
    pub async fn init() -> Result<MongoRepo> {
        let mongo_uri = env::var("MONGODB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let client = Client::with_uri_str(&mongo_uri)
            .await
            .map_err(|e| AppError::database("connect", e))?;

        let database_name = env::var("MONGODB_DATABASE")
            .unwrap_or_else(|_| "meson_reservation".to_string());

        let database = client.database(&database_name);

        // Test connection
        database
            .run_command(doc! {"ping": 1})
            .await
            .map_err(|e| AppError::database("ping", e))?;

        tracing::info!("Conexión a MongoDB establecida exitosamente");

        Ok(MongoRepo { client, database })
    }

    pub fn mesas(&self) -> Collection<Mesa> {
        self.database.collection("mesas")
    }

    pub fn reservas(&self) -> Collection<Reserva> {
        self.database.collection("reservas")
    }

    // Método para crear índices si es necesario
    pub async fn create_indexes(&self) -> Result<()> {
        use mongodb::{options::IndexOptions, IndexModel};

        let mesas = self.mesas();
        let mesa_indexes = vec![IndexModel::builder()
            .keys(doc! { "numero_mesa": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build()];

        mesas
            .create_indexes(mesa_indexes)
            .await
            .map_err(|e| AppError::database("create_indexes_mesas", e))?;

        let reservas = self.reservas();
        let reservation_indexes = vec![
            // Cubre los chequeos de solapamiento por mesa
            IndexModel::builder()
                .keys(doc! { "numero_mesa": 1, "fecha_hora": 1 })
                .build(),
            IndexModel::builder().keys(doc! { "estado": 1 }).build(),
            IndexModel::builder().keys(doc! { "tipo": 1 }).build(),
        ];

        reservas
            .create_indexes(reservation_indexes)
            .await
            .map_err(|e| AppError::database("create_indexes_reservas", e))?;

        tracing::info!("Índices MongoDB creados exitosamente");
        Ok(())
    }

    /// Busca una mesa por su número visible
    pub async fn mesa_por_numero(&self, numero_mesa: i64) -> Result<Option<Mesa>> {
        self.mesas()
            .find_one(doc! { "numero_mesa": numero_mesa })
            .await
            .map_err(|e| AppError::database("find_mesa", e))
    }

    /// Carga todas las mesas del catálogo ordenadas por número
    pub async fn todas_las_mesas(&self) -> Result<Vec<Mesa>> {
        let mut cursor = self
            .mesas()
            .find(doc! {})
            .sort(doc! { "numero_mesa": 1 })
            .await
            .map_err(|e| AppError::database("list_mesas", e))?;

        let mut mesas = Vec::new();
        while cursor
            .advance()
            .await
            .map_err(|e| AppError::database("list_mesas_cursor", e))?
        {
            mesas.push(
                cursor
                    .deserialize_current()
                    .map_err(|e| AppError::database("deserialize_mesa", e))?,
            );
        }
        Ok(mesas)
    }

    /// Cuenta las reservas activas de una mesa que intersectan la ventana
    /// `[inicio, fin)`
    ///
    /// Dos ventanas semiabiertas se cruzan sii `a_inicio < b_fin` y
    /// `b_inicio < a_fin`; como cada reserva persiste su propio `fin`, la
    /// consulta compara cada fila contra su ventana histórica real.
    pub async fn cuenta_solapadas(&self, numero_mesa: i64, inicio: i64, fin: i64) -> Result<u64> {
        self.reservas()
            .count_documents(doc! {
                "tipo": TipoReserva::Reserva.as_str(),
                "numero_mesa": numero_mesa,
                "estado": { "$in": EstadoReserva::activos().to_vec() },
                "fecha_hora": { "$lt": fin },
                "fin": { "$gt": inicio },
            })
            .await
            .map_err(|e| AppError::database("count_overlapping", e))
    }

    /// Ventanas activas de un conjunto de mesas que tocan `[inicio, fin)`,
    /// agrupadas por número de mesa
    ///
    /// Una sola consulta por petición: el barrido de franjas alternativas
    /// se resuelve después en memoria contra estas ventanas.
    pub async fn ocupaciones(
        &self,
        numeros_mesa: &[i64],
        inicio: i64,
        fin: i64,
    ) -> Result<HashMap<i64, Vec<(i64, i64)>>> {
        let mut cursor = self
            .reservas()
            .find(doc! {
                "tipo": TipoReserva::Reserva.as_str(),
                "numero_mesa": { "$in": numeros_mesa.to_vec() },
                "estado": { "$in": EstadoReserva::activos().to_vec() },
                "fecha_hora": { "$lt": fin },
                "fin": { "$gt": inicio },
            })
            .await
            .map_err(|e| AppError::database("find_occupancy", e))?;

        let mut por_mesa: HashMap<i64, Vec<(i64, i64)>> = HashMap::new();
        while cursor
            .advance()
            .await
            .map_err(|e| AppError::database("occupancy_cursor", e))?
        {
            let reserva: Reserva = cursor
                .deserialize_current()
                .map_err(|e| AppError::database("deserialize_reserva", e))?;
            if let Some(numero) = reserva.numero_mesa {
                por_mesa
                    .entry(numero)
                    .or_default()
                    .push((reserva.fecha_hora, reserva.fin));
            }
        }
        Ok(por_mesa)
    }

    /// Cuenta las reservas activas (pendientes o confirmadas) de una mesa,
    /// sin filtro temporal; bloquea el borrado de la mesa
    pub async fn reservas_activas_de_mesa(&self, numero_mesa: i64) -> Result<u64> {
        self.reservas()
            .count_documents(doc! {
                "tipo": TipoReserva::Reserva.as_str(),
                "numero_mesa": numero_mesa,
                "estado": { "$in": EstadoReserva::activos().to_vec() },
            })
            .await
            .map_err(|e| AppError::database("count_active_for_table", e))
    }

    // Función auxiliar para obtener timestamp actual
    pub fn current_timestamp() -> i64 {
        chrono::Utc::now().timestamp()
    }
}
