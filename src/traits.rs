use crate::error_restaurant::MachineFailure;

/// Producto opaco producido por una maquina.
///
/// El restaurante nunca inspecciona un producto: solamente lo mueve desde la
/// maquina hacia el pager del cliente, o lo devuelve a la maquina si el pedido
/// fallo o el cliente no lo retiro a tiempo.
#[cfg_attr(test, mockall::automock)]
pub trait Product: Send {}

/// Trait que deben implementar las maquinas externas de cada producto.
///
/// Una maquina produce un unico producto por llamada y puede bloquearse durante
/// la produccion. El restaurante garantiza que nunca dos threads entran a la
/// misma maquina en simultaneo: las llamadas se serializan con la cola FIFO de
/// helpers y el mutex de la maquina.
#[cfg_attr(test, mockall::automock)]
pub trait Machine {
    /// Enciende la maquina. Se invoca una unica vez al construir el restaurante.
    fn start(&mut self);

    /// Apaga la maquina. Se invoca durante el shutdown para toda maquina que no
    /// haya quedado marcada como fallada.
    fn stop(&mut self);

    /// Produce un producto. Puede bloquearse.
    ///
    /// # Returns
    /// * `Ok(Some(product))` - La maquina produjo el producto.
    /// * `Ok(None)` - La maquina devolvio un producto vacio. El restaurante lo
    ///   trata igual que un `MachineFailure`.
    /// * `Err(MachineFailure)` - La maquina fallo. El producto queda marcado
    ///   como fallado para todo pedido futuro.
    fn get_product(&mut self) -> Result<Option<Box<dyn Product>>, MachineFailure>;

    /// Recibe de vuelta un producto ya producido (pedido fallado o abandonado).
    ///
    /// Un `MachineFailure` en este camino de limpieza se ignora.
    fn return_product(&mut self, product: Box<dyn Product>) -> Result<(), MachineFailure>;
}
