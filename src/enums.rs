/////////////////////////////// ERRORS //////////////////////////////////

/// Tipos de errores que pueden ocurrir en el restaurante
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum ErrorType {
    /// Error interno inesperado (por ejemplo un Mutex o Condvar envenenado)
    ErrorGeneric,

    /// Se intento encargar un pedido con el restaurante ya cerrado
    RestaurantClosed,

    /// El pedido esta vacio, o contiene un producto desconocido o ya fallado
    BadOrder,

    /// Se intento retirar un pedido sin pager
    BadPager,

    /// Se intento retirar un pedido que todavia no esta listo
    OrderNotReady,

    /// El cliente llego tarde: el worker ya recupero el pedido
    OrderExpired,

    /// El pedido fallo durante la preparacion (fallo de maquina)
    FulfillmentFailure,
}

/////////////////////////////// HELPERS //////////////////////////////////

/// Resultado con el que termina un thread helper luego de intentar conseguir
/// un producto para un pedido
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum HelperOutcome {
    /// El helper obtuvo el producto de la maquina y lo dejo en su slot del pager
    Delivered,

    /// El helper renuncio a llamar a la maquina porque el producto o el pedido
    /// ya estaban fallados
    Resigned,

    /// La maquina fallo (o devolvio un producto vacio) al pedirle el producto
    Failed,
}
