//! # Serialización de escrituras por mesa
//!
//! El alta de una reserva hace "comprobar y después insertar" en dos
//! operaciones de MongoDB. Sin coordinación, dos peticiones simultáneas
//! para la misma mesa pueden pasar ambas la comprobación y colarse las dos.
//! Este registro entrega un mutex asíncrono por número de mesa: el alta
//! mantiene el candado durante comprobación + inserción, y las mesas
//! distintas no se bloquean entre sí.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registro de candados, uno por número de mesa
///
/// Clonable y barato de compartir entre workers de actix; el `HashMap`
/// interno solo se toca el instante de buscar o crear el candado.
#[derive(Debug, Default, Clone)]
pub struct TableLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>,
}

impl TableLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adquiere el candado de una mesa; se libera al soltar la guarda
    pub async fn acquire(&self, numero_mesa: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut mapa = self.inner.lock().unwrap();
            mapa.entry(numero_mesa)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::{se_solapan, ventana_libre};

    /// Simula el alta completa: candado, comprobación contra el almacén
    /// compartido e inserción si la ventana sigue libre.
    async fn intento_de_alta(
        locks: TableLocks,
        almacen: Arc<Mutex<Vec<(i64, i64)>>>,
        numero_mesa: i64,
        inicio: i64,
        fin: i64,
    ) -> bool {
        let _guard = locks.acquire(numero_mesa).await;
        let libre = {
            let ventanas = almacen.lock().unwrap();
            ventana_libre(&ventanas, inicio, fin)
        };
        if !libre {
            return false;
        }
        // Punto donde sin candado se colaría la segunda petición
        tokio::task::yield_now().await;
        almacen.lock().unwrap().push((inicio, fin));
        true
    }

    #[tokio::test]
    async fn dos_altas_simultaneas_solo_una_gana() {
        let locks = TableLocks::new();
        let almacen: Arc<Mutex<Vec<(i64, i64)>>> = Arc::new(Mutex::new(Vec::new()));

        let a = tokio::spawn(intento_de_alta(
            locks.clone(),
            almacen.clone(),
            5,
            1_000,
            4_600,
        ));
        let b = tokio::spawn(intento_de_alta(
            locks.clone(),
            almacen.clone(),
            5,
            1_000,
            4_600,
        ));

        let (ra, rb) = (a.await.unwrap(), b.await.unwrap());
        assert!(ra ^ rb, "exactamente una de las dos altas debe ganar");

        // El invariante se mantiene: ninguna pareja de ventanas se cruza
        let ventanas = almacen.lock().unwrap();
        assert_eq!(ventanas.len(), 1);
        for (i, a) in ventanas.iter().enumerate() {
            for b in ventanas.iter().skip(i + 1) {
                assert!(!se_solapan(a.0, a.1, b.0, b.1));
            }
        }
    }

    #[tokio::test]
    async fn mesas_distintas_no_se_bloquean() {
        let locks = TableLocks::new();

        let guard_5 = locks.acquire(5).await;
        // Con el candado de la mesa 5 en mano, la mesa 7 sigue disponible
        let guard_7 = locks.acquire(7).await;
        drop(guard_5);
        drop(guard_7);
    }

    #[test]
    fn candado_reutilizado_entre_llamadas() {
        tokio_test::block_on(async {
            let locks = TableLocks::new();
            {
                let _g = locks.acquire(3).await;
            }
            // Tras soltar la guarda, el mismo candado vuelve a estar libre
            let _g = locks.acquire(3).await;
        });
    }
}
