use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use log::{debug, error, info};

use crate::enums::ErrorType;
use crate::error_restaurant::ErrorRestaurant;
use crate::machine_slot::MachineSlot;
use crate::menu::MenuState;
use crate::order::{self, OrderQueue};
use crate::pager::Pager;
use crate::sync::{Arc, AtomicU32, Mutex};
use crate::traits::{Machine, Product};
use crate::utils::Consts;
use crate::worker::{create_and_run_workers, Worker, WorkerReport};

/// Coordinador concurrente de pedidos del restaurante.
///
/// Los clientes encargan pedidos de productos del menu y reciben un `Pager`
/// para esperar y retirar. Un pool fijo de threads workers drena la cola de
/// pedidos; cada worker spawnea un thread helper por producto, que consigue
/// el producto de su maquina respetando la admision FIFO por producto.
pub struct Restaurant {
    /// Mapa producto -> slot de maquina. El conjunto de productos queda fijo
    /// al construir el restaurante.
    machines: Arc<HashMap<String, Arc<MachineSlot>>>,

    /// Estado del menu: flag de cierre + mapa sticky de productos fallados.
    menu: Arc<Mutex<MenuState>>,

    /// Cola de pedidos pendientes de preparacion.
    order_queue: OrderQueue,

    /// Indice de pedidos listos que el cliente todavia no retiro.
    pending: Arc<Mutex<BTreeSet<u32>>>,

    /// Proximo id de pedido. Se reserva con el lock de la cola tomado.
    next_id: AtomicU32,

    /// Ventana de retiro del cliente.
    client_timeout: Duration,

    n_workers: usize,

    /// Workers a joinear durante el shutdown.
    workers: Mutex<Vec<Worker>>,

    /// Reportes guardados por el primer shutdown, para que los shutdowns
    /// siguientes devuelvan lo mismo.
    reports: Mutex<Option<Vec<WorkerReport>>>,
}

impl Restaurant {
    /// Abre el restaurante: enciende todas las maquinas y pone a correr los
    /// `n_workers` threads workers.
    ///
    /// # Arguments
    /// * `machines` - Mapa producto -> maquina externa. Define el menu
    ///   completo; los productos no se agregan ni se quitan despues.
    /// * `n_workers` - Cantidad de threads workers del pool.
    /// * `client_timeout` - Ventana que tiene un cliente para retirar un
    ///   pedido listo antes de que el worker lo recupere.
    pub fn new(
        machines: HashMap<String, Box<dyn Machine + Send>>,
        n_workers: usize,
        client_timeout: Duration,
    ) -> Self {
        let machines: Arc<HashMap<String, Arc<MachineSlot>>> = Arc::new(
            machines
                .into_iter()
                .map(|(product, machine)| (product, Arc::new(MachineSlot::new(machine))))
                .collect(),
        );

        let menu = Arc::new(Mutex::new(MenuState::new(machines.keys().cloned())));

        for (product, slot) in machines.iter() {
            if let Err(err) = slot.start_machine() {
                error!(
                    "[ RESTAURANT ] Error starting machine of {:?}: {:?}",
                    product, err
                );
            }
        }

        let order_queue = order::new_order_queue();
        let pending = Arc::new(Mutex::new(BTreeSet::new()));

        let workers = create_and_run_workers(
            n_workers,
            &order_queue,
            &machines,
            &menu,
            &pending,
            client_timeout,
        );
        info!(
            "[ RESTAURANT ] Open with {} products and {} workers.",
            machines.len(),
            n_workers
        );

        Restaurant {
            machines,
            menu,
            order_queue,
            pending,
            next_id: AtomicU32::new(0),
            client_timeout,
            n_workers,
            workers: Mutex::new(workers),
            reports: Mutex::new(None),
        }
    }

    /// Idem a `new()` pero tomando la cantidad de workers y el timeout de
    /// retiro de las variables de entorno (`Consts`).
    pub fn with_env_config(machines: HashMap<String, Box<dyn Machine + Send>>) -> Self {
        Self::new(
            machines,
            Consts::n_workers(),
            Duration::from_millis(Consts::client_timeout_ms()),
        )
    }

    /// Retorna los nombres de los productos todavia disponibles (no
    /// fallados). Una vez cerrado el restaurante, retorna vacio.
    pub fn get_menu(&self) -> Result<Vec<String>, ErrorRestaurant> {
        let menu = self
            .menu
            .lock()
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;

        if menu.is_shut() {
            return Ok(Vec::new());
        }

        Ok(self
            .machines
            .keys()
            .filter(|product| !menu.product_failed(product))
            .cloned()
            .collect())
    }

    /// Encarga un pedido y devuelve el pager para esperarlo y retirarlo.
    ///
    /// La validacion se hace entera con el mutex del menu tomado; la
    /// validacion y el encolado NO son atomicos entre si: un producto puede
    /// fallar entre el encargo y la preparacion, y eso se manifiesta como
    /// `FulfillmentFailure` al esperar, no como `BadOrder`.
    ///
    /// # Arguments
    /// * `products` - Productos del pedido, en el orden deseado. Se admiten
    ///   repetidos.
    /// # Returns
    /// * `Ok(Pager)` - Pager del pedido encargado.
    /// * `Err(ErrorRestaurant)`:
    ///    * De tipo `RestaurantClosed` si el restaurante ya cerro.
    ///    * De tipo `BadOrder` si el pedido esta vacio, o algun producto no
    ///      existe en el menu o ya esta fallado.
    pub fn order(&self, products: Vec<String>) -> Result<Pager, ErrorRestaurant> {
        {
            let menu = self
                .menu
                .lock()
                .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;

            if menu.is_shut() {
                return Err(ErrorRestaurant::new_of_type(
                    "The restaurant is closed.",
                    ErrorType::RestaurantClosed,
                ));
            }

            if products.is_empty() {
                return Err(ErrorRestaurant::new_of_type(
                    "An order needs at least one product.",
                    ErrorType::BadOrder,
                ));
            }

            for product in &products {
                if !self.machines.contains_key(product) || menu.product_failed(product) {
                    return Err(ErrorRestaurant::new_of_type(
                        &format!("Unknown or failed product: {:?}", product),
                        ErrorType::BadOrder,
                    ));
                }
            }
        }

        let state = order::push_order(&self.order_queue, products, &self.next_id)?;
        debug!("[ RESTAURANT ] Order#{} queued.", state.id);

        Ok(Pager { state })
    }

    /// Retira un pedido listo.
    ///
    /// El cliente compite contra el timeout de retiro del worker mediante el
    /// token de retiro del pager: gana exactamente un lado. Si gana el
    /// cliente, se lleva los productos y libera al worker de inmediato.
    ///
    /// # Arguments
    /// * `pager` - Pager del pedido. `None` modela al cliente que se presenta
    ///   sin pager.
    /// # Returns
    /// * `Ok(Vec<Box<dyn Product>>)` - Productos del pedido, en el mismo
    ///   orden en el que fueron encargados.
    /// * `Err(ErrorRestaurant)`:
    ///    * De tipo `BadPager` si no se entrego pager.
    ///    * De tipo `OrderNotReady` si el pedido todavia no esta listo.
    ///    * De tipo `OrderExpired` si el worker ya recupero el pedido.
    ///    * De tipo `FulfillmentFailure` si el pedido fallo en preparacion.
    pub fn collect_order(
        &self,
        pager: Option<Pager>,
    ) -> Result<Vec<Box<dyn Product>>, ErrorRestaurant> {
        let pager = pager.ok_or_else(|| {
            ErrorRestaurant::new_of_type("No pager was given.", ErrorType::BadPager)
        })?;

        if !pager.is_ready() {
            return Err(ErrorRestaurant::new_of_type(
                "The order is not ready yet.",
                ErrorType::OrderNotReady,
            ));
        }

        if !pager.state.try_claim_collect() {
            return Err(ErrorRestaurant::new_of_type(
                "The worker already took the order back.",
                ErrorType::OrderExpired,
            ));
        }

        self.pending
            .lock()
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?
            .remove(&pager.get_id());

        if pager.state.is_failed() {
            return Err(ErrorRestaurant::new_of_type(
                "The order failed during preparation.",
                ErrorType::FulfillmentFailure,
            ));
        }

        let result: Option<Vec<Box<dyn Product>>> = {
            let mut slots = pager
                .state
                .products
                .lock()
                .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;
            slots.iter_mut().map(|slot| slot.take()).collect()
        };
        let result = result
            .ok_or_else(|| ErrorRestaurant::new("Missing product in an order marked as ready."))?;

        // Se libera al worker que duerme su timeout de retiro.
        pager.state.worker_waiter.notify()?;

        info!("[ RESTAURANT ] Order#{} collected.", pager.get_id());
        Ok(result)
    }

    /// Snapshot de los ids de pedidos listos que todavia no fueron retirados,
    /// en orden creciente.
    pub fn get_pending_orders(&self) -> Result<Vec<u32>, ErrorRestaurant> {
        let pending = self
            .pending
            .lock()
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;

        Ok(pending.iter().copied().collect())
    }

    /// Cierra el restaurante. Idempotente.
    ///
    /// Marca el menu como cerrado (los encargos nuevos se rechazan), espera a
    /// que los workers drenen los pedidos ya encolados, cierra la cola de
    /// pedidos, joinea los workers y apaga toda maquina no fallada. Los
    /// pedidos en vuelo terminan normalmente (exito, falla o abandono).
    ///
    /// # Returns
    /// * `Ok(Vec<WorkerReport>)` - Un reporte por worker. Las llamadas
    ///   siguientes devuelven el mismo vector.
    /// * `Err(ErrorRestaurant)` - Si algun Mutex o Condvar fallo.
    pub fn shutdown(&self) -> Result<Vec<WorkerReport>, ErrorRestaurant> {
        let mut reports = self
            .reports
            .lock()
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;

        if let Some(stored) = reports.as_ref() {
            return Ok(stored.clone());
        }

        self.menu
            .lock()
            .map_err(|x| ErrorRestaurant::new(&x.to_string()))?
            .close();

        order::close_queue_when_drained(&self.order_queue, self.n_workers > 0)?;

        let workers = std::mem::take(
            &mut *self
                .workers
                .lock()
                .map_err(|x| ErrorRestaurant::new(&x.to_string()))?,
        );

        let mut collected = Vec::with_capacity(workers.len());
        for worker in workers {
            match worker.handle {
                Some(handle) => match handle.join() {
                    Ok(Ok(report)) => collected.push(report),
                    Ok(Err(err)) => {
                        error!(
                            "[ RESTAURANT ] Worker#{} finished with error: {:?}",
                            worker.id, err
                        );
                        collected.push(WorkerReport::default());
                    }
                    Err(_) => {
                        error!("[ RESTAURANT ] Error join() of worker#{}", worker.id);
                        collected.push(WorkerReport::default());
                    }
                },
                None => {
                    error!("[ RESTAURANT ] Worker#{} was never running.", worker.id);
                    collected.push(WorkerReport::default());
                }
            }
        }

        {
            let menu = self
                .menu
                .lock()
                .map_err(|x| ErrorRestaurant::new(&x.to_string()))?;
            for (product, slot) in self.machines.iter() {
                if !menu.product_failed(product) {
                    slot.stop_machine()?;
                }
            }
        }

        info!("[ RESTAURANT ] All workers off. Restaurant closed.");
        *reports = Some(collected.clone());
        Ok(collected)
    }

    /// Ventana de retiro configurada para los clientes.
    pub fn client_timeout(&self) -> Duration {
        self.client_timeout
    }
}
