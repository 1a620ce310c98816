//! Carga de configuración del motor desde variables de entorno.
//! Usa convención `STEPFLOW_*` con valores por defecto conservadores.

use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Opciones de ejecución aplicadas a cada invocación de un `Flow`.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Un handle re-invocado provoca pánico en lugar de sólo registrarse.
    pub strict_handles: bool,
    /// Convierte un frame con handles sin resolver en un fallo `ESTALL`
    /// pasado este límite. `None` mantiene la espera indefinida documentada.
    pub stall_timeout: Option<Duration>,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        let strict_handles = env::var("STEPFLOW_STRICT_HANDLES").map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                                                               .unwrap_or(false);
        let stall_timeout = env::var("STEPFLOW_STALL_TIMEOUT_MS").ok()
                                                                 .and_then(|v| v.parse::<u64>().ok())
                                                                 .map(Duration::from_millis);
        Self { strict_handles, stall_timeout }
    }

    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = Some(timeout);
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict_handles = true;
        self
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
