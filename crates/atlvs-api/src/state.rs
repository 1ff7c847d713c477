//! Application state shared by every handler.

use atlvs_core::Config;
use atlvs_gate::{Gate, GateStores};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub gate: Arc<Gate>,
    pub stores: GateStores,
    /// Absent when the stores are not backed by Postgres (tests).
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(config: Config, gate: Gate, stores: GateStores, pool: Option<PgPool>) -> Self {
        Self {
            config,
            gate: Arc::new(gate),
            stores,
            pool,
        }
    }
}
