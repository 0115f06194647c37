use std::time::Duration;

use crate::error_restaurant::ErrorRestaurant;
use crate::sync::{Condvar, Mutex};

/// Señal one-shot construida con el par Mutex + Condvar.
///
/// A diferencia de un semaforo binario, la señal queda "latcheada": una vez
/// notificada, todo `wait()` posterior retorna inmediatamente. Esto es lo que
/// necesita el pager, donde el worker notifica una unica vez y el cliente
/// puede esperar mas de una vez sobre el mismo pedido.
#[derive(Debug)]
pub struct Signal {
    pair: (Mutex<bool>, Condvar),
}

impl Signal {
    /// Crea la señal sin notificar.
    pub fn new() -> Self {
        Signal {
            pair: (Mutex::new(false), Condvar::new()),
        }
    }

    /// Notifica la señal y despierta a todos los threads que esten esperando.
    ///
    /// # Returns
    /// * `Ok(())` - Si se pudo tomar el lock interno.
    /// * `Err(ErrorRestaurant)` - Si el Mutex interno esta envenenado.
    pub fn notify(&self) -> Result<(), ErrorRestaurant> {
        let (lock, cvar) = &self.pair;

        let mut released = lock
            .lock()
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;
        *released = true;
        cvar.notify_all();
        Ok(())
    }

    /// Espera hasta que la señal sea notificada. Si ya fue notificada retorna
    /// inmediatamente.
    ///
    /// # Returns
    /// * `Ok(())` - La señal fue notificada.
    /// * `Err(ErrorRestaurant)` - Si hubo un error en el wait() o al tomar el
    ///   lock del Mutex.
    pub fn wait(&self) -> Result<(), ErrorRestaurant> {
        let (lock, cvar) = &self.pair;

        let mut released = lock
            .lock()
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;
        while !*released {
            released = cvar
                .wait(released)
                .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;
        }
        Ok(())
    }

    /// Espera la notificacion hasta `timeout` como maximo ("best effort"): si
    /// el tiempo expira, retorna igual sin error.
    ///
    /// # Arguments
    /// * `timeout` - Tiempo maximo de espera.
    /// # Returns
    /// * `Ok(true)` - La señal fue notificada dentro de la ventana.
    /// * `Ok(false)` - Expiro el tiempo de espera.
    /// * `Err(ErrorRestaurant)` - Si hubo un error en el wait() o al tomar el
    ///   lock del Mutex.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool, ErrorRestaurant> {
        let (lock, cvar) = &self.pair;

        let released = lock
            .lock()
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;
        let (released, _timeout_result) = cvar
            .wait_timeout_while(released, timeout, |released| !*released)
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;
        Ok(*released)
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use crate::sync::{thread, Arc};

    use super::*;

    #[test]
    fn test1_wait_returns_immediately_if_already_notified() {
        let signal = Signal::new();
        signal.notify().unwrap();
        signal.wait().unwrap();
    }

    #[test]
    fn test2_wait_blocks_until_another_thread_notifies() {
        let signal = Arc::new(Signal::new());
        let signal_clone = signal.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            signal_clone.notify().unwrap();
        });

        signal.wait().unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test3_wait_timeout_expires_and_returns_false() {
        let signal = Signal::new();

        let start = Instant::now();
        let notified = signal.wait_timeout(Duration::from_millis(50)).unwrap();

        assert!(!notified);
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test4_wait_timeout_returns_true_when_already_notified() {
        let signal = Signal::new();
        signal.notify().unwrap();

        assert!(signal.wait_timeout(Duration::from_millis(50)).unwrap());
    }

    #[test]
    fn test5_second_wait_returns_immediately() {
        let signal = Signal::new();
        signal.notify().unwrap();

        signal.wait().unwrap();
        signal.wait().unwrap();
    }
}
