use crate::enums::ErrorType;

/// Estructura para manejar los errores del restaurante
#[derive(Debug)]
pub struct ErrorRestaurant {
    /// Mensaje de error
    pub mensaje: String,

    /// Tipo de error
    pub type_error: ErrorType,
}

impl ErrorRestaurant {
    /// Crea el error con un mensaje de error y un tipo de error generico.
    pub fn new(mensaje: &str) -> Self {
        ErrorRestaurant {
            mensaje: mensaje.to_string(),
            type_error: ErrorType::ErrorGeneric,
        }
    }

    /// Crea el error con un mensaje de error y un tipo de error especifico.
    pub fn new_of_type(mensaje: &str, type_error: ErrorType) -> Self {
        ErrorRestaurant {
            mensaje: mensaje.to_string(),
            type_error,
        }
    }
}

/// Error lanzado por una maquina externa.
///
/// Las maquinas son colaboradores blackbox: cuando `get_product` falla con este
/// error el producto queda marcado como fallado en el menu; cuando
/// `return_product` falla durante una devolucion, el error se ignora.
#[derive(Debug)]
pub struct MachineFailure;
