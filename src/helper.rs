use log::{debug, info};

use crate::enums::HelperOutcome;
use crate::error_restaurant::{ErrorRestaurant, MachineFailure};
use crate::machine_slot::MachineSlot;
use crate::menu::MenuState;
use crate::pager::PagerState;
use crate::sync::{thread, Arc, Mutex};

/// Obtiene la identificación del thread helper actual
pub fn id_helper() -> String {
    thread::current()
        .name()
        .unwrap_or(format!("{:?}", thread::current().id()).as_str())
        .to_string()
}

/// Cuerpo de un thread helper: consigue UN producto para UN pedido.
///
/// El helper se encola en la FIFO de espera del producto y recien llama a la
/// maquina cuando es la cabeza de la cola, garantizando que las admisiones a
/// la maquina respetan el orden de llegada y nunca se superponen.
///
/// Ya siendo cabeza, re-chequea (con el mutex del menu tomado) el flag sticky
/// del producto y el flag de falla del pedido: si alguno esta seteado el
/// helper renuncia sin llamar a la maquina. Si la maquina falla o devuelve un
/// producto vacio, el producto queda marcado como fallado en el menu y el
/// pedido entero queda fallado.
///
/// # Arguments
/// * `product` - Nombre del producto a conseguir.
/// * `position` - Posicion del slot destino dentro del pager del pedido.
/// * `slot` - Slot de la maquina del producto.
/// * `state` - Estado compartido del pedido.
/// * `menu` - Estado del menu, con el mapa sticky de productos fallados.
/// # Returns
/// * `Ok(HelperOutcome)` - Como termino el helper: `Delivered`, `Resigned` o
///   `Failed`.
/// * `Err(ErrorRestaurant)` - Si algun Mutex o Condvar fallo.
pub(crate) fn acquire_product(
    product: String,
    position: usize,
    slot: Arc<MachineSlot>,
    state: Arc<PagerState>,
    menu: Arc<Mutex<MenuState>>,
) -> Result<HelperOutcome, ErrorRestaurant> {
    let (ticket, is_head) = slot.join_waiting_queue()?;

    if !is_head {
        ticket.wait()?;
    }
    // Now, I am first.

    let must_resign = {
        let menu_guard = menu
            .lock()
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;
        menu_guard.product_failed(&product) || state.is_failed()
    };

    let outcome = if must_resign {
        debug!(
            "{}: resigning, {:?} or the whole order already failed.",
            id_helper(),
            product
        );
        state.mark_failed();
        HelperOutcome::Resigned
    } else {
        let obtained = {
            let mut machine = slot
                .machine
                .lock()
                .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;
            machine.get_product()
        };

        match obtained {
            Ok(Some(item)) => {
                state
                    .products
                    .lock()
                    .map_err(|x| ErrorRestaurant::new(&x.to_string()))?[position] = Some(item);
                debug!("{}: product {:?} ready in its slot.", id_helper(), product);
                HelperOutcome::Delivered
            }
            Ok(None) | Err(MachineFailure) => {
                info!(
                    "{}: machine of {:?} failed. The product goes off the menu.",
                    id_helper(),
                    product
                );
                menu.lock()
                    .map_err(|x| ErrorRestaurant::new(&x.to_string()))?
                    .mark_failed(&product);
                state.mark_failed();
                HelperOutcome::Failed
            }
        }
    };

    if let Some(successor) = slot.leave_waiting_queue()? {
        // Notifying the next one that now he can safely get the product.
        successor.notify()?;
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use crate::traits::{MockMachine, MockProduct, Product};

    use super::*;

    fn menu_with(products: &[&str]) -> Arc<Mutex<MenuState>> {
        Arc::new(Mutex::new(MenuState::new(
            products.iter().map(|p| p.to_string()),
        )))
    }

    #[test]
    fn test1_helper_delivers_the_product_into_its_slot() {
        let mut mock = MockMachine::new();
        mock.expect_get_product()
            .times(1)
            .returning(|| Ok(Some(Box::new(MockProduct::new()) as Box<dyn Product>)));
        let slot = Arc::new(MachineSlot::new(Box::new(mock)));
        let state = Arc::new(PagerState::new(0, 2));
        let menu = menu_with(&["cafe"]);

        let outcome =
            acquire_product("cafe".to_string(), 1, slot, state.clone(), menu).unwrap();

        assert_eq!(outcome, HelperOutcome::Delivered);
        assert!(!state.is_failed());
        let slots = state.products.lock().unwrap();
        assert!(slots[0].is_none());
        assert!(slots[1].is_some());
    }

    #[test]
    fn test2_machine_failure_marks_product_and_order_as_failed() {
        let mut mock = MockMachine::new();
        mock.expect_get_product()
            .times(1)
            .returning(|| Err(MachineFailure));
        let slot = Arc::new(MachineSlot::new(Box::new(mock)));
        let state = Arc::new(PagerState::new(0, 1));
        let menu = menu_with(&["cafe"]);

        let outcome =
            acquire_product("cafe".to_string(), 0, slot, state.clone(), menu.clone()).unwrap();

        assert_eq!(outcome, HelperOutcome::Failed);
        assert!(state.is_failed());
        assert!(menu.lock().unwrap().product_failed("cafe"));
        assert!(state.products.lock().unwrap()[0].is_none());
    }

    #[test]
    fn test3_empty_product_is_treated_like_a_machine_failure() {
        let mut mock = MockMachine::new();
        mock.expect_get_product().times(1).returning(|| Ok(None));
        let slot = Arc::new(MachineSlot::new(Box::new(mock)));
        let state = Arc::new(PagerState::new(0, 1));
        let menu = menu_with(&["cafe"]);

        let outcome =
            acquire_product("cafe".to_string(), 0, slot, state.clone(), menu.clone()).unwrap();

        assert_eq!(outcome, HelperOutcome::Failed);
        assert!(state.is_failed());
        assert!(menu.lock().unwrap().product_failed("cafe"));
    }

    #[test]
    fn test4_helper_resigns_if_the_product_already_failed() {
        let mut mock = MockMachine::new();
        mock.expect_get_product().times(0);
        let slot = Arc::new(MachineSlot::new(Box::new(mock)));
        let state = Arc::new(PagerState::new(0, 1));
        let menu = menu_with(&["cafe"]);
        menu.lock().unwrap().mark_failed("cafe");

        let outcome =
            acquire_product("cafe".to_string(), 0, slot, state.clone(), menu).unwrap();

        assert_eq!(outcome, HelperOutcome::Resigned);
        assert!(state.is_failed());
    }

    #[test]
    fn test5_helper_resigns_if_the_order_already_failed() {
        let mut mock = MockMachine::new();
        mock.expect_get_product().times(0);
        let slot = Arc::new(MachineSlot::new(Box::new(mock)));
        let state = Arc::new(PagerState::new(0, 2));
        state.mark_failed();
        let menu = menu_with(&["cafe"]);

        let outcome =
            acquire_product("cafe".to_string(), 0, slot, state.clone(), menu).unwrap();

        assert_eq!(outcome, HelperOutcome::Resigned);
    }

    #[test]
    fn test6_two_helpers_for_the_same_product_serialize_in_fifo_order() {
        let mut mock = MockMachine::new();
        mock.expect_get_product()
            .times(2)
            .returning(|| Ok(Some(Box::new(MockProduct::new()) as Box<dyn Product>)));
        let slot = Arc::new(MachineSlot::new(Box::new(mock)));
        let state = Arc::new(PagerState::new(0, 2));
        let menu = menu_with(&["cafe"]);

        let slot_clone = slot.clone();
        let state_clone = state.clone();
        let menu_clone = menu.clone();
        let second = thread::spawn(move || {
            acquire_product("cafe".to_string(), 1, slot_clone, state_clone, menu_clone)
        });

        let first =
            acquire_product("cafe".to_string(), 0, slot, state.clone(), menu).unwrap();
        let second = second.join().unwrap().unwrap();

        assert_eq!(first, HelperOutcome::Delivered);
        assert_eq!(second, HelperOutcome::Delivered);
        let slots = state.products.lock().unwrap();
        assert!(slots[0].is_some() && slots[1].is_some());
    }
}
