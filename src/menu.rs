use std::collections::HashMap;

/// Estado compartido del menu del restaurante.
///
/// Guarda el flag de cierre y el mapa "sticky" de productos fallados. Todo
/// lector y el unico escritor (false -> true) acceden con el mutex del menu
/// tomado, por lo que un producto fallado nunca vuelve a estar disponible.
pub struct MenuState {
    shut: bool,
    failed: HashMap<String, bool>,
}

impl MenuState {
    /// Crea el estado del menu con todos los productos disponibles.
    ///
    /// # Arguments
    /// * `products` - Nombres de los productos del menu. El conjunto queda
    ///   fijo durante toda la vida del restaurante.
    pub fn new<I>(products: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        MenuState {
            shut: false,
            failed: products.into_iter().map(|name| (name, false)).collect(),
        }
    }

    /// Retorna true si el restaurante ya fue cerrado.
    pub fn is_shut(&self) -> bool {
        self.shut
    }

    /// Cierra el restaurante. Idempotente.
    pub fn close(&mut self) {
        self.shut = true;
    }

    /// Retorna true si el producto esta marcado como fallado.
    pub fn product_failed(&self, product: &str) -> bool {
        self.failed.get(product).copied().unwrap_or(false)
    }

    /// Marca un producto como fallado. La marca es monotonica: una vez
    /// fallado, el producto no se recupera.
    pub fn mark_failed(&mut self, product: &str) {
        if let Some(failed) = self.failed.get_mut(product) {
            *failed = true;
        }
    }
}
