use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use log::{debug, error, info};

use crate::enums::HelperOutcome;
use crate::error_restaurant::ErrorRestaurant;
use crate::helper;
use crate::machine_slot::MachineSlot;
use crate::menu::MenuState;
use crate::order::{self, OrderQueue, OrderTicket};
use crate::sync::thread::{self, Builder, JoinHandle};
use crate::sync::{Arc, Mutex};

/// Reporte de actividad de un worker, devuelto por `Restaurant::shutdown`.
///
/// Cada pedido preparado por el worker termina en exactamente una de las tres
/// listas de pedidos. Las entradas quedan en el orden en que el worker las
/// completo, no en el orden de encargo.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    /// Pedidos que el cliente retiro a tiempo.
    pub collected_orders: Vec<Vec<String>>,

    /// Pedidos listos que el cliente no retiro dentro del timeout.
    pub abandoned_orders: Vec<Vec<String>>,

    /// Pedidos fallados por alguna maquina.
    pub failed_orders: Vec<Vec<String>>,

    /// Productos de pedidos fallados cuya maquina fallo realmente (los
    /// helpers que renunciaron sin llamar a la maquina no se cuentan).
    pub failed_products: Vec<String>,
}

/// Estructura encargada de ejecutar el Thread de un Worker para preparar los pedidos
#[derive(Debug)]
pub struct Worker {
    /// Identificador del thread worker
    pub id: usize,

    /// Handle del thread worker. Se utiliza un Option para poder crear una
    /// instancia de Worker sin haber creado el thread.
    pub handle: Option<JoinHandle<Result<WorkerReport, ErrorRestaurant>>>,
}

impl Worker {
    /// Crea una instancia de Worker
    /// El handle del thread se inicializa en None debido a que el thread no se crea en el constructor
    pub fn new(id: usize) -> Self {
        Self { id, handle: None }
    }

    /// Obtiene la identificación del thread worker actual
    pub fn id_worker() -> String {
        thread::current()
            .name()
            .unwrap_or(format!("{:?}", thread::current().id()).as_str())
            .to_string()
    }

    /// Spawnea y ejecuta un thread worker, consumidor de la cola de pedidos.
    ///
    /// En un loop va a esperar (con `order::wait_order`) un Option con el
    /// siguiente pedido de la cola. Si el Option es Some prepara el pedido
    /// completo (helpers, handshake con el pager y timeout de retiro); si es
    /// None el restaurante cerro y el worker termina devolviendo su reporte.
    ///
    /// # Arguments
    /// * `order_queue` - Cola de pedidos pendientes.
    /// * `machines` - Mapa producto -> slot de maquina.
    /// * `menu` - Estado del menu (cierre + productos fallados).
    /// * `pending` - Indice de pedidos listos sin retirar.
    /// * `client_timeout` - Ventana que tiene el cliente para retirar un
    ///   pedido listo.
    pub(crate) fn run(
        &mut self,
        order_queue: OrderQueue,
        machines: Arc<HashMap<String, Arc<MachineSlot>>>,
        menu: Arc<Mutex<MenuState>>,
        pending: Arc<Mutex<BTreeSet<u32>>>,
        client_timeout: Duration,
    ) {
        let handle: Option<JoinHandle<Result<WorkerReport, ErrorRestaurant>>> = Builder::new()
            .name(format!("[ WORKER#{} ]", self.id))
            .spawn(move || {
                let mut report = WorkerReport::default();
                loop {
                    if let Some(ticket) = order::wait_order(&order_queue)? {
                        fulfill_order(
                            ticket,
                            &machines,
                            &menu,
                            &pending,
                            client_timeout,
                            &mut report,
                        )?;
                    } else {
                        debug!(
                            "{}: None received. Closing thread worker.",
                            Self::id_worker(),
                        );
                        break;
                    }
                }
                Ok(report)
            })
            .ok(); // Failed to spawn thread, None indicates this thread is not running.

        self.handle = handle;
    }
}

/// Prepara un pedido completo: un thread helper por producto, el handshake
/// con el pager y la carrera de retiro contra el cliente.
///
/// Luego de joinear los helpers se decide la rama:
/// * **Falla**: el pedido queda listo-pero-fallado, se despierta al cliente,
///   los productos ya conseguidos vuelven a sus maquinas y el pedido se
///   anota en `failed_orders` (mas `failed_products` por cada maquina que
///   fallo de verdad).
/// * **Exito**: el pedido entra al indice de pendientes y el worker duerme
///   hasta `client_timeout` esperando el retiro. El token de retiro decide
///   la carrera: si lo reclama el worker, el pedido fue abandonado y los
///   productos vuelven a sus maquinas; si lo reclamo el cliente, el pedido
///   se anota como retirado.
///
/// # Arguments
/// * `ticket` - Pedido a preparar.
/// * `machines` - Mapa producto -> slot de maquina.
/// * `menu` - Estado del menu.
/// * `pending` - Indice de pedidos listos sin retirar.
/// * `client_timeout` - Ventana de retiro del cliente.
/// * `report` - Reporte del worker donde anotar el resultado.
/// # Returns
/// * `Ok(())` - El pedido fue preparado (con exito o no).
/// * `Err(ErrorRestaurant)` - Si algun Mutex o Condvar del propio worker fallo.
fn fulfill_order(
    ticket: OrderTicket,
    machines: &Arc<HashMap<String, Arc<MachineSlot>>>,
    menu: &Arc<Mutex<MenuState>>,
    pending: &Arc<Mutex<BTreeSet<u32>>>,
    client_timeout: Duration,
    report: &mut WorkerReport,
) -> Result<(), ErrorRestaurant> {
    let OrderTicket {
        products,
        id,
        state,
    } = ticket;

    info!(
        "{} | [Order#{}] NEW ORDER RECEIVED.\n                 Products: {:?}",
        Worker::id_worker(),
        id,
        products
    );

    let mut helpers = Vec::with_capacity(products.len());
    for (position, product) in products.iter().enumerate() {
        let handle = machines.get(product).cloned().and_then(|slot| {
            let name = product.clone();
            let state = state.clone();
            let menu = menu.clone();
            Builder::new()
                .name(format!("[ HELPER {}#{} ]", product, id))
                .spawn(move || helper::acquire_product(name, position, slot, state, menu))
                .ok()
        });
        helpers.push(handle);
    }

    let mut outcomes = Vec::with_capacity(helpers.len());
    for handle in helpers {
        let outcome = match handle.map(JoinHandle::join) {
            Some(Ok(Ok(outcome))) => outcome,
            Some(Ok(Err(error))) => {
                error!(
                    "{}: helper finished with error: {:?}",
                    Worker::id_worker(),
                    error
                );
                state.mark_failed();
                HelperOutcome::Failed
            }
            Some(Err(_)) | None => {
                error!("{}: helper thread lost.", Worker::id_worker());
                state.mark_failed();
                HelperOutcome::Failed
            }
        };
        outcomes.push(outcome);
    }

    if state.is_failed() {
        state.set_ready_and_wake()?;

        info!("{} | [Order#{}] FAILED.", Worker::id_worker(), id);
        report.failed_orders.push(products.clone());

        // Returning products.
        for (position, product) in products.iter().enumerate() {
            let item = state
                .products
                .lock()
                .map_err(|x| ErrorRestaurant::new(&x.to_string()))?[position]
                .take();

            match item {
                Some(item) => {
                    if let Some(slot) = machines.get(product) {
                        slot.give_back(item)?;
                    }
                }
                None => {
                    if outcomes[position] != HelperOutcome::Resigned {
                        report.failed_products.push(product.clone());
                    }
                }
            }
        }
    } else {
        state.set_ready_and_wake()?;

        pending
            .lock()
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?
            .insert(id);

        // Waiting for the client to collect.
        state.worker_waiter.wait_timeout(client_timeout)?;

        if state.try_claim_collect() {
            // The client did not collect the order, thus the products must be
            // returned.
            info!("{} | [Order#{}] ABANDONED.", Worker::id_worker(), id);
            report.abandoned_orders.push(products.clone());

            pending
                .lock()
                .map_err(|x| ErrorRestaurant::new(&x.to_string()))?
                .remove(&id);

            // Returning products.
            for (position, product) in products.iter().enumerate() {
                let item = state
                    .products
                    .lock()
                    .map_err(|x| ErrorRestaurant::new(&x.to_string()))?[position]
                    .take();

                if let Some(item) = item {
                    if let Some(slot) = machines.get(product) {
                        slot.give_back(item)?;
                    }
                }
            }
        } else {
            // The client collected the order.
            info!("{} | [Order#{}] COLLECTED.", Worker::id_worker(), id);
            report.collected_orders.push(products.clone());

            // El cliente puede haber retirado antes de que el pedido entrara
            // al indice de pendientes; el worker borra la entrada tambien.
            pending
                .lock()
                .map_err(|x| ErrorRestaurant::new(&x.to_string()))?
                .remove(&id);
        }
    }

    Ok(())
}

/// # Ejecucion y Creacion de los Workers
///
/// Crea la cantidad pedida de `Worker`, los ejecuta y retorna un
/// `Vec<Worker>` para brindar la posibilidad de hacer join a los hilos de los
/// `Worker` durante el shutdown.
///
/// # Arguments
/// * `quantity` - Cantidad de workers a invocar.
/// * `order_queue` - Cola de pedidos pendientes.
/// * `machines` - Mapa producto -> slot de maquina.
/// * `menu` - Estado del menu.
/// * `pending` - Indice de pedidos listos sin retirar.
/// * `client_timeout` - Ventana de retiro del cliente.
/// # Returns
/// * `Vec<Worker>`: Vector de Workers.
pub(crate) fn create_and_run_workers(
    quantity: usize,
    order_queue: &OrderQueue,
    machines: &Arc<HashMap<String, Arc<MachineSlot>>>,
    menu: &Arc<Mutex<MenuState>>,
    pending: &Arc<Mutex<BTreeSet<u32>>>,
    client_timeout: Duration,
) -> Vec<Worker> {
    let mut workers: Vec<Worker> = (0..quantity).map(Worker::new).collect::<Vec<Worker>>();

    workers.iter_mut().for_each(|w: &mut Worker| {
        w.run(
            order_queue.clone(),
            machines.clone(),
            menu.clone(),
            pending.clone(),
            client_timeout,
        )
    });
    workers
}
