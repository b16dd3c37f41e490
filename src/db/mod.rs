// src/db/mod.rs
pub mod locks;
pub mod mongodb;

pub use locks::TableLocks;
pub use mongodb::{EstadoReserva, Mesa, MongoRepo, Reserva, TipoReserva};
