use std::time::Duration;

use crate::enums::ErrorType;
use crate::error_restaurant::ErrorRestaurant;
use crate::signal::Signal;
use crate::sync::{Arc, AtomicBool, Mutex, Ordering};
use crate::traits::Product;

/// Estado interno de un pedido, compartido entre el pager del cliente y el
/// worker que lo prepara.
///
/// Cada lado guarda su propio `Arc`: cuando ambos lo sueltan, las señales y
/// los slots de productos se destruyen solos, sin lista de limpieza diferida.
pub(crate) struct PagerState {
    /// Identificador del pedido. Estrictamente creciente por orden de encargo.
    pub(crate) id: u32,

    /// Pasa de false a true exactamente una vez, cuando el pedido termina
    /// (con exito o con falla).
    ready: AtomicBool,

    /// Pasa de false a true a lo sumo una vez, siempre antes que `ready`,
    /// cuando algun helper fallo o renuncio.
    failed: AtomicBool,

    /// Un slot por producto encargado, en el mismo orden que el pedido.
    /// En los caminos de falla los slots pueden quedar vacios.
    pub(crate) products: Mutex<Vec<Option<Box<dyn Product>>>>,

    /// Señal que libera el worker para despertar al cliente del `wait`.
    /// Se notifica exactamente una vez por pedido, incluso si fallo.
    pub(crate) waiter: Signal,

    /// Token de retiro: el primero entre el cliente (`collect_order`) y el
    /// worker (timeout de retiro) que lo reclama se queda con los productos.
    collect_claimed: AtomicBool,

    /// Señal que libera el cliente al retirar, para despertar al worker que
    /// duerme su timeout de retiro.
    pub(crate) worker_waiter: Signal,
}

impl std::fmt::Debug for PagerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagerState")
            .field("id", &self.id)
            .field("ready", &self.ready)
            .field("failed", &self.failed)
            .field("waiter", &self.waiter)
            .field("collect_claimed", &self.collect_claimed)
            .field("worker_waiter", &self.worker_waiter)
            .finish()
    }
}

impl PagerState {
    /// Crea el estado de un pedido de `quantity` productos, sin preparar.
    pub(crate) fn new(id: u32, quantity: usize) -> Self {
        PagerState {
            id,
            ready: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            products: Mutex::new((0..quantity).map(|_| None).collect()),
            waiter: Signal::new(),
            collect_claimed: AtomicBool::new(false),
            worker_waiter: Signal::new(),
        }
    }

    /// Marca el pedido como fallado. Idempotente.
    pub(crate) fn mark_failed(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Marca el pedido como listo y despierta al cliente. El flag `ready`
    /// se escribe antes de notificar la señal, asi el cliente que despierta
    /// del `wait` siempre observa `is_ready() == true`.
    pub(crate) fn set_ready_and_wake(&self) -> Result<(), ErrorRestaurant> {
        self.ready.store(true, Ordering::SeqCst);
        self.waiter.notify()
    }

    /// Intenta reclamar el token de retiro. Exactamente un reclamo gana
    /// durante la vida del pedido.
    pub(crate) fn try_claim_collect(&self) -> bool {
        self.collect_claimed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Pager entregado al cliente al encargar un pedido.
///
/// El cliente espera sobre el pager hasta que el pedido este listo y despues
/// lo entrega a `Restaurant::collect_order` para retirar los productos.
pub struct Pager {
    pub(crate) state: Arc<PagerState>,
}

impl Pager {
    /// Bloquea hasta que el pedido este terminado.
    ///
    /// La señal interna queda latcheada: un segundo `wait` sobre el mismo
    /// pager retorna inmediatamente.
    ///
    /// # Returns
    /// * `Ok(())` - El pedido esta listo para retirar.
    /// * `Err(ErrorRestaurant)` - De tipo `FulfillmentFailure` si el pedido
    ///   fallo durante la preparacion.
    pub fn wait(&self) -> Result<(), ErrorRestaurant> {
        self.state.waiter.wait()?;

        if self.state.is_failed() {
            return Err(ErrorRestaurant::new_of_type(
                "The order failed during preparation.",
                ErrorType::FulfillmentFailure,
            ));
        }
        Ok(())
    }

    /// Espera "best effort" hasta `timeout`: si el tiempo expira antes de que
    /// el pedido termine, retorna `Ok(())` igual y un `is_ready()` posterior
    /// seguira leyendo false.
    ///
    /// # Arguments
    /// * `timeout` - Tiempo maximo de espera.
    /// # Returns
    /// * `Ok(())` - El pedido esta listo, o expiro la ventana de espera.
    /// * `Err(ErrorRestaurant)` - De tipo `FulfillmentFailure` si el pedido
    ///   ya quedo marcado como fallado.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<(), ErrorRestaurant> {
        self.state.waiter.wait_timeout(timeout)?;

        if self.state.is_failed() {
            return Err(ErrorRestaurant::new_of_type(
                "The order failed during preparation.",
                ErrorType::FulfillmentFailure,
            ));
        }
        Ok(())
    }

    /// Retorna true si el pedido ya esta terminado. Lectura atomica, sin locks.
    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Identificador del pedido.
    pub fn get_id(&self) -> u32 {
        self.state.id
    }
}

impl std::fmt::Debug for Pager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pager")
            .field("id", &self.get_id())
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test1_new_pager_is_not_ready_and_keeps_its_id() {
        let pager = Pager {
            state: Arc::new(PagerState::new(7, 2)),
        };

        assert!(!pager.is_ready());
        assert_eq!(pager.get_id(), 7);
        assert_eq!(pager.state.products.lock().unwrap().len(), 2);
    }

    #[test]
    fn test2_wait_returns_ok_once_ready() {
        let pager = Pager {
            state: Arc::new(PagerState::new(0, 1)),
        };

        pager.state.set_ready_and_wake().unwrap();

        pager.wait().unwrap();
        assert!(pager.is_ready());
    }

    #[test]
    fn test3_wait_reports_fulfillment_failure() {
        let pager = Pager {
            state: Arc::new(PagerState::new(0, 1)),
        };

        pager.state.mark_failed();
        pager.state.set_ready_and_wake().unwrap();

        let error = pager.wait().unwrap_err();
        assert_eq!(error.type_error, ErrorType::FulfillmentFailure);
    }

    #[test]
    fn test4_wait_timeout_expires_without_error_and_pager_is_not_ready() {
        let pager = Pager {
            state: Arc::new(PagerState::new(0, 1)),
        };

        pager.wait_timeout(Duration::from_millis(30)).unwrap();

        assert!(!pager.is_ready());
    }

    #[test]
    fn test5_collect_token_is_claimed_at_most_once() {
        let state = PagerState::new(0, 1);

        assert!(state.try_claim_collect());
        assert!(!state.try_claim_collect());
    }
}
