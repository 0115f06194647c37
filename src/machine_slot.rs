use std::collections::VecDeque;

use log::debug;

use crate::error_restaurant::ErrorRestaurant;
use crate::signal::Signal;
use crate::sync::{Arc, Mutex};
use crate::traits::{Machine, Product};

/// Slot de una maquina: el estado por-producto del restaurante.
///
/// La maquina vive dentro de su propio Mutex, que serializa tanto
/// `get_product` como `return_product`: nunca dos threads entran a la misma
/// maquina en simultaneo. La cola de espera implementa la admision FIFO de
/// los helpers: un helper recien llama a la maquina cuando es la cabeza.
pub struct MachineSlot {
    /// Maquina externa del producto, serializada por su mutex.
    pub(crate) machine: Mutex<Box<dyn Machine + Send>>,

    /// Tickets de admision de los helpers que esperan por este producto,
    /// en orden de llegada.
    waiting: Mutex<VecDeque<Arc<Signal>>>,
}

impl MachineSlot {
    pub fn new(machine: Box<dyn Machine + Send>) -> Self {
        MachineSlot {
            machine: Mutex::new(machine),
            waiting: Mutex::new(VecDeque::new()),
        }
    }

    /// Enciende la maquina del slot.
    pub(crate) fn start_machine(&self) -> Result<(), ErrorRestaurant> {
        self.machine
            .lock()
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?
            .start();
        Ok(())
    }

    /// Apaga la maquina del slot.
    pub(crate) fn stop_machine(&self) -> Result<(), ErrorRestaurant> {
        self.machine
            .lock()
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?
            .stop();
        Ok(())
    }

    /// Encola un ticket de admision nuevo en la cola de espera del producto.
    ///
    /// # Returns
    /// * `Ok((ticket, is_head))` - El ticket privado del helper, y true si el
    ///   helper quedo como cabeza de la cola (puede llamar a la maquina ya
    ///   mismo, sin esperar la señal).
    /// * `Err(ErrorRestaurant)` - Si el Mutex de la cola esta envenenado.
    pub(crate) fn join_waiting_queue(&self) -> Result<(Arc<Signal>, bool), ErrorRestaurant> {
        let mut waiting = self
            .waiting
            .lock()
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;

        let ticket = Arc::new(Signal::new());
        waiting.push_back(ticket.clone());
        let is_head = waiting.len() == 1;
        Ok((ticket, is_head))
    }

    /// Saca al helper cabeza de la cola de espera y captura la señal del
    /// sucesor, si hay alguno. El llamador debe notificarla fuera del lock.
    ///
    /// # Returns
    /// * `Ok(Some(signal))` - Señal del nuevo helper cabeza.
    /// * `Ok(None)` - La cola quedo vacia.
    /// * `Err(ErrorRestaurant)` - Si el Mutex de la cola esta envenenado.
    pub(crate) fn leave_waiting_queue(&self) -> Result<Option<Arc<Signal>>, ErrorRestaurant> {
        let mut waiting = self
            .waiting
            .lock()
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;

        waiting.pop_front();
        Ok(waiting.front().cloned())
    }

    /// Devuelve un producto a la maquina, tomando su mutex. Un
    /// `MachineFailure` en esta devolucion se ignora.
    pub(crate) fn give_back(&self, product: Box<dyn Product>) -> Result<(), ErrorRestaurant> {
        let mut machine = self
            .machine
            .lock()
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;

        if machine.return_product(product).is_err() {
            debug!("MachineFailure while returning a product, ignored.");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error_restaurant::MachineFailure;
    use crate::traits::{MockMachine, MockProduct};

    use super::*;

    #[test]
    fn test1_first_helper_in_queue_is_the_head() {
        let mut mock = MockMachine::new();
        mock.expect_get_product().times(0);
        let slot = MachineSlot::new(Box::new(mock));

        let (_ticket, is_head) = slot.join_waiting_queue().unwrap();

        assert!(is_head);
    }

    #[test]
    fn test2_later_helpers_are_not_the_head_and_leave_wakes_in_fifo_order() {
        let slot = MachineSlot::new(Box::new(MockMachine::new()));

        let (first, first_is_head) = slot.join_waiting_queue().unwrap();
        let (second, second_is_head) = slot.join_waiting_queue().unwrap();
        let (third, third_is_head) = slot.join_waiting_queue().unwrap();

        assert!(first_is_head);
        assert!(!second_is_head);
        assert!(!third_is_head);

        let successor = slot.leave_waiting_queue().unwrap().unwrap();
        assert!(Arc::ptr_eq(&successor, &second));

        let successor = slot.leave_waiting_queue().unwrap().unwrap();
        assert!(Arc::ptr_eq(&successor, &third));

        assert!(slot.leave_waiting_queue().unwrap().is_none());
        drop(first);
    }

    #[test]
    fn test3_give_back_swallows_machine_failure() {
        let mut mock = MockMachine::new();
        mock.expect_return_product()
            .times(1)
            .returning(|_| Err(MachineFailure));
        let slot = MachineSlot::new(Box::new(mock));

        slot.give_back(Box::new(MockProduct::new())).unwrap();
    }

    #[test]
    fn test4_start_and_stop_reach_the_machine() {
        let mut mock = MockMachine::new();
        mock.expect_start().times(1).return_const(());
        mock.expect_stop().times(1).return_const(());
        let slot = MachineSlot::new(Box::new(mock));

        slot.start_machine().unwrap();
        slot.stop_machine().unwrap();
    }
}
