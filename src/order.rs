use std::collections::VecDeque;

use crate::enums::ErrorType;
use crate::error_restaurant::ErrorRestaurant;
use crate::pager::PagerState;
use crate::sync::{Arc, AtomicU32, Condvar, Mutex, Ordering};

/// Un pedido encolado, a la espera de un worker que lo prepare.
pub(crate) struct OrderTicket {
    /// Productos encargados, en el orden pedido por el cliente. Puede haber
    /// repetidos.
    pub products: Vec<String>,

    /// Identificador del pedido. Coincide con el id del pager del cliente.
    pub id: u32,

    /// Estado compartido con el pager del cliente.
    pub state: Arc<PagerState>,
}

/// Cola de pedidos pendientes, compartida entre los clientes (productores) y
/// los workers (consumidores).
///
/// Se utiliza Option en el Mutex para que el shutdown notifique (mediante la
/// representacion del valor None) a los workers que no habra mas pedidos para
/// preparar, y asi los workers puedan terminar su ejecucion.
pub(crate) type OrderQueue = Arc<(Mutex<Option<VecDeque<OrderTicket>>>, Condvar)>;

pub(crate) fn new_order_queue() -> OrderQueue {
    Arc::new((Mutex::new(Some(VecDeque::new())), Condvar::new()))
}

/// Encola un pedido nuevo y notifica a los workers.
///
/// El id del pedido se reserva con el lock de la cola tomado, por lo que los
/// ids quedan estrictamente crecientes en el orden de encolado.
///
/// # Arguments
/// * `order_queue` - Cola de pedidos pendientes.
/// * `products` - Productos del pedido, ya validados contra el menu.
/// * `next_id` - Contador de ids de pedidos del restaurante.
/// # Returns
/// * `Ok(Arc<PagerState>)` - Estado del pedido recien encolado, para armar el
///   pager del cliente.
/// * `Err(ErrorRestaurant)` - De tipo `RestaurantClosed` si la cola ya fue
///   cerrada, o generico si el Mutex esta envenenado.
pub(crate) fn push_order(
    order_queue: &OrderQueue,
    products: Vec<String>,
    next_id: &AtomicU32,
) -> Result<Arc<PagerState>, ErrorRestaurant> {
    let (lock, cvar) = &**order_queue;

    let mut guard = lock
        .lock()
        .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;

    match guard.as_mut() {
        Some(queue) => {
            let id = next_id.fetch_add(1, Ordering::SeqCst);
            let state = Arc::new(PagerState::new(id, products.len()));
            queue.push_front(OrderTicket {
                products,
                id,
                state: state.clone(),
            });
            cvar.notify_all();
            Ok(state)
        }
        None => Err(ErrorRestaurant::new_of_type(
            "The restaurant is already closed.",
            ErrorType::RestaurantClosed,
        )),
    }
}

/// Función que espera mediante el wait() de la condvar hasta que haya un
/// pedido en la cola para preparar.
///
/// Es decir, siendo consumidor esperara hasta ser despertado por un
/// notify_all() lanzado por un cliente que encargo un pedido o por el
/// shutdown (en ese caso encontrara un None).
///
/// # Arguments
/// * `order_queue` - Cola de pedidos pendientes.
/// # Returns
/// * `Result<Option<OrderTicket>, ErrorRestaurant>`:
///     * Si se ha recibido un pedido, se devuelve Ok(Some(OrderTicket)).
///     * Si se ha recibido un None, se devuelve Ok(None) indicando que el
///       restaurante cerro y el worker debe terminar.
///     * Si es Err, es porque hubo un error en el wait() o al tomar el lock
///       del Mutex o porque se encontro una cola vacia cuando no deberia ser
///       posible debido al wait() (como minimo deberia haber un elemento).
pub(crate) fn wait_order(order_queue: &OrderQueue) -> Result<Option<OrderTicket>, ErrorRestaurant> {
    let (lock, cvar) = &**order_queue;

    let mut guard = lock
        .lock()
        .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;

    while guard.as_ref().map(|q| q.is_empty()).unwrap_or(false) {
        guard = cvar
            .wait(guard)
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;
    }

    let mut optional_orders = guard.take();
    if let Some(orders) = optional_orders.as_mut() {
        if let Some(ticket) = orders.pop_back() {
            cvar.notify_all();
            *guard = optional_orders;
            Ok(Some(ticket))
        } else {
            Err(ErrorRestaurant::new(
                "Empty VecDeque when it should have at least one element.",
            ))
        }
    } else {
        cvar.notify_all(); // None.. the restaurant is closed. Notify the other workers.
        Ok(None)
    }
}

/// Cierra la cola de pedidos durante el shutdown.
///
/// Si `wait_for_drain` es true, primero espera (con el wait() de la condvar)
/// a que los workers hayan drenado todos los pedidos encolados; recien
/// despues inserta el None y notifica a los workers para que se apaguen. Con
/// cero workers no hay quien drene, por lo que la cola se cierra de inmediato.
///
/// # Arguments
/// * `order_queue` - Cola de pedidos pendientes.
/// * `wait_for_drain` - true si hay workers vivos que vayan a drenar la cola.
/// # Returns
/// * `Ok(())` - La cola quedo cerrada.
/// * `Err(ErrorRestaurant)` - Si hubo un error en el wait() o al tomar el
///   lock del Mutex.
pub(crate) fn close_queue_when_drained(
    order_queue: &OrderQueue,
    wait_for_drain: bool,
) -> Result<(), ErrorRestaurant> {
    let (lock, cvar) = &**order_queue;

    let mut guard = lock
        .lock()
        .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;

    if wait_for_drain {
        while guard.as_ref().map(|q| !q.is_empty()).unwrap_or(false) {
            guard = cvar
                .wait(guard)
                .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;
        }
    }

    guard.take();
    cvar.notify_all();
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::enums::ErrorType;

    use super::*;

    #[test]
    fn test1_push_then_wait_returns_the_same_order() {
        let queue = new_order_queue();
        let next_id = AtomicU32::new(0);

        let state = push_order(&queue, vec!["cafe".to_string()], &next_id).unwrap();

        let ticket = wait_order(&queue).unwrap().unwrap();
        assert_eq!(ticket.id, state.id);
        assert_eq!(ticket.products, vec!["cafe".to_string()]);
    }

    #[test]
    fn test2_ids_are_strictly_increasing_in_push_order() {
        let queue = new_order_queue();
        let next_id = AtomicU32::new(0);

        let first = push_order(&queue, vec!["cafe".to_string()], &next_id).unwrap();
        let second = push_order(&queue, vec!["cafe".to_string()], &next_id).unwrap();
        let third = push_order(&queue, vec!["cafe".to_string()], &next_id).unwrap();

        assert_eq!(first.id, 0);
        assert_eq!(second.id, 1);
        assert_eq!(third.id, 2);
    }

    #[test]
    fn test3_orders_are_served_in_fifo_order() {
        let queue = new_order_queue();
        let next_id = AtomicU32::new(0);

        push_order(&queue, vec!["cafe".to_string()], &next_id).unwrap();
        push_order(&queue, vec!["hamburguesa".to_string()], &next_id).unwrap();

        assert_eq!(wait_order(&queue).unwrap().unwrap().id, 0);
        assert_eq!(wait_order(&queue).unwrap().unwrap().id, 1);
    }

    #[test]
    fn test4_closed_queue_returns_none_to_workers() {
        let queue = new_order_queue();

        close_queue_when_drained(&queue, false).unwrap();

        assert!(wait_order(&queue).unwrap().is_none());
    }

    #[test]
    fn test5_push_after_close_is_rejected() {
        let queue = new_order_queue();
        let next_id = AtomicU32::new(0);

        close_queue_when_drained(&queue, false).unwrap();

        let error = push_order(&queue, vec!["cafe".to_string()], &next_id).unwrap_err();
        assert_eq!(error.type_error, ErrorType::RestaurantClosed);
    }
}
