use std::env;

use log::LevelFilter;

/// Constantes definidas mediante variables de entorno.
///
/// Un ejemplo de archivo `.env` para definir las variables de entorno podria ser:
///
/// ```txt
///     N_WORKERS = "4"
///     CLIENT_TIMEOUT_MS = "1000"
/// ```
pub struct Consts;
impl Consts {
    /// Cantidad de threads workers a invocar, obtenida de la variable de
    /// entorno N_WORKERS.
    /// Como maximo se puede tener 1024 workers (`utils.rs: LIMIT_WORKERS`).
    /// Por defecto se invocan 4 workers.
    pub fn n_workers() -> usize {
        let n = env::var("N_WORKERS")
            .unwrap_or("4".to_string())
            .parse::<usize>()
            .unwrap_or(4);

        if n > LIMIT_WORKERS {
            LIMIT_WORKERS
        } else {
            n
        }
    }

    /// Ventana de tiempo (en milisegundos) que tiene un cliente para retirar
    /// un pedido listo antes de que el worker lo recupere, obtenida de la
    /// variable de entorno CLIENT_TIMEOUT_MS.
    /// Por defecto 1000 ms.
    pub fn client_timeout_ms() -> u64 {
        env::var("CLIENT_TIMEOUT_MS")
            .unwrap_or("1000".to_string())
            .parse::<u64>()
            .unwrap_or(1000)
    }
}

/// Cantidad maxima de workers a invocar.
pub const LIMIT_WORKERS: usize = 1024;

/// Inicializa el logger.
/// Lee la variable de entorno `RUST_LOG` para definir el nivel de log.
///
/// Por defecto el nivel de log es `INFO`.
pub fn init_logger() {
    env_logger::builder()
        .filter(
            None,
            env::var("RUST_LOG")
                .unwrap_or_default()
                .parse::<LevelFilter>()
                .unwrap_or(LevelFilter::Info),
        )
        .format_timestamp(None)
        .init();
}
