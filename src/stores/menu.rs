use futures::future::join_all;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::api::ApiClient;
use crate::errors::ApiError;
use crate::models::producto::{
    ActualizarSubcategoriaPayload, Categoria, CrearSubcategoriaPayload, Producto, Subcategoria,
};
use crate::{log_debug, log_warn};

/// Línea del carrito. El precio unitario queda congelado al momento del alta
/// y el subtotal se recalcula siempre a partir de él, nunca se asigna suelto.
#[derive(Debug, Clone, PartialEq)]
pub struct LineaCarrito {
    pub producto: Producto,
    pub cantidad: i64,
    pub precio_unitario: f64,
    pub subtotal: f64,
}

impl LineaCarrito {
    fn recalcular(&mut self) {
        self.subtotal = self.cantidad as f64 * self.precio_unitario;
    }
}

#[derive(Debug, Default)]
struct MenuState {
    productos: Vec<Producto>,
    categorias: Vec<Categoria>,
    subcategorias: HashMap<i64, Vec<Subcategoria>>,
    carrito: Vec<LineaCarrito>,
    error: Option<String>,
}

/// Catálogo de la sucursal activa + composición del carrito.
///
/// El catálogo es de solo lectura y se reemplaza entero en cada fetch; el
/// carrito solo lo muta este store. Los derivados (agrupado, totales) se
/// recomputan en cada lectura: con catálogos de escala punto-de-venta no hay
/// nada que amortizar y no queda ningún invariante de frescura que mantener.
pub struct MenuStore {
    api: Arc<ApiClient>,
    estado: Mutex<MenuState>,
}

impl MenuStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            estado: Mutex::new(MenuState::default()),
        }
    }

    // -- Catálogo --

    /// Trae el catálogo de la sucursal, ordenado por `orden` ascendente, y lo
    /// reemplaza entero. Si el fetch falla queda el catálogo anterior y el
    /// error a nivel de store.
    pub async fn load_products(&self, sucursal_id: i64) -> Result<(), ApiError> {
        match self
            .api
            .get::<Vec<Producto>>(&format!("/sucursales/{}/productos", sucursal_id))
            .await
        {
            Ok(mut productos) => {
                productos.sort_by_key(|p| p.orden);
                let mut estado = self.estado.lock().unwrap();
                estado.productos = productos;
                estado.error = None;
                Ok(())
            }
            Err(e) => {
                self.estado.lock().unwrap().error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Trae las categorías ordenadas. Un fallo acá no es bloqueante para el
    /// usuario: solo se registra.
    pub async fn load_categories(&self) {
        match self.api.get::<Vec<Categoria>>("/categorias").await {
            Ok(mut categorias) => {
                categorias.sort_by_key(|c| c.orden);
                self.estado.lock().unwrap().categorias = categorias;
            }
            Err(e) => {
                log_warn!("MENU", &format!("No se pudieron cargar categorías: {}", e));
            }
        }
    }

    /// Carga las subcategorías de todas las categorías en paralelo. Las que
    /// fallen se registran y se saltean.
    pub async fn load_subcategorias(&self) {
        let ids: Vec<i64> = self
            .estado
            .lock()
            .unwrap()
            .categorias
            .iter()
            .map(|c| c.id)
            .collect();

        let fetches = ids.into_iter().map(|id| {
            let api = self.api.clone();
            async move {
                let resultado = api
                    .get::<Vec<Subcategoria>>(&format!("/categorias/{}/subcategorias", id))
                    .await;
                (id, resultado)
            }
        });

        let resultados = join_all(fetches).await;

        let mut estado = self.estado.lock().unwrap();
        for (id, resultado) in resultados {
            match resultado {
                Ok(subs) => {
                    estado.subcategorias.insert(id, subs);
                }
                Err(e) => {
                    log_warn!(
                        "MENU",
                        &format!("Subcategorías de la categoría {} fallaron: {}", id, e)
                    );
                }
            }
        }
    }

    pub async fn crear_subcategoria(
        &self,
        categoria_id: i64,
        nombre: &str,
    ) -> Result<Subcategoria, ApiError> {
        if nombre.trim().is_empty() {
            return Err(ApiError::Validation("El nombre no puede estar vacío".into()));
        }

        let payload = CrearSubcategoriaPayload {
            categoria_id,
            nombre: nombre.trim().to_string(),
        };
        let creada: Subcategoria = self
            .api
            .post("/subcategorias", serde_json::to_value(&payload)?)
            .await?;

        self.estado
            .lock()
            .unwrap()
            .subcategorias
            .entry(categoria_id)
            .or_default()
            .push(creada.clone());

        Ok(creada)
    }

    pub async fn actualizar_subcategoria(
        &self,
        id: i64,
        nombre: &str,
        activa: bool,
    ) -> Result<Subcategoria, ApiError> {
        let payload = ActualizarSubcategoriaPayload {
            nombre: nombre.to_string(),
            activa,
        };
        let actualizada: Subcategoria = self
            .api
            .put(&format!("/subcategorias/{}", id), serde_json::to_value(&payload)?)
            .await?;

        let mut estado = self.estado.lock().unwrap();
        if let Some(subs) = estado.subcategorias.get_mut(&actualizada.categoria_id) {
            if let Some(existente) = subs.iter_mut().find(|s| s.id == id) {
                *existente = actualizada.clone();
            }
        }

        Ok(actualizada)
    }

    pub async fn eliminar_subcategoria(&self, id: i64) -> Result<(), ApiError> {
        self.api.delete(&format!("/subcategorias/{}", id)).await?;

        let mut estado = self.estado.lock().unwrap();
        for subs in estado.subcategorias.values_mut() {
            subs.retain(|s| s.id != id);
        }

        Ok(())
    }

    // -- Vistas derivadas (puras, recomputadas en cada lectura) --

    pub fn productos(&self) -> Vec<Producto> {
        self.estado.lock().unwrap().productos.clone()
    }

    pub fn categorias(&self) -> Vec<Categoria> {
        self.estado.lock().unwrap().categorias.clone()
    }

    pub fn subcategorias_de(&self, categoria_id: i64) -> Vec<Subcategoria> {
        self.estado
            .lock()
            .unwrap()
            .subcategorias
            .get(&categoria_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn error(&self) -> Option<String> {
        self.estado.lock().unwrap().error.clone()
    }

    /// Agrupa el catálogo por categoría. El orden de inserción de los grupos
    /// sigue el orden del catálogo, no el de las categorías.
    pub fn agrupados_por_categoria(&self) -> IndexMap<i64, Vec<Producto>> {
        let estado = self.estado.lock().unwrap();
        let mut grupos: IndexMap<i64, Vec<Producto>> = IndexMap::new();
        for producto in &estado.productos {
            grupos
                .entry(producto.categoria_id)
                .or_default()
                .push(producto.clone());
        }
        grupos
    }

    /// Búsqueda por substring, sin distinguir mayúsculas, sobre nombre y
    /// descripción.
    pub fn search(&self, texto: &str) -> Vec<Producto> {
        let aguja = texto.to_lowercase();
        self.estado
            .lock()
            .unwrap()
            .productos
            .iter()
            .filter(|p| {
                p.nombre.to_lowercase().contains(&aguja)
                    || p.descripcion
                        .as_ref()
                        .map(|d| d.to_lowercase().contains(&aguja))
                        .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    pub fn filter_by_category(&self, categoria_id: i64) -> Vec<Producto> {
        self.estado
            .lock()
            .unwrap()
            .productos
            .iter()
            .filter(|p| p.categoria_id == categoria_id)
            .cloned()
            .collect()
    }

    // -- Carrito --

    /// Agrega al carrito. Si ya hay una línea del producto, suma cantidades y
    /// recalcula con el precio unitario que la línea congeló al alta, aunque
    /// el catálogo haya cambiado de precio desde entonces.
    pub fn add_to_cart(&self, producto: &Producto, cantidad: i64) {
        if cantidad <= 0 {
            log_debug!(
                "MENU",
                &format!("Alta de carrito ignorada: cantidad {}", cantidad)
            );
            return;
        }

        let mut estado = self.estado.lock().unwrap();
        if let Some(linea) = estado
            .carrito
            .iter_mut()
            .find(|l| l.producto.id == producto.id)
        {
            linea.cantidad += cantidad;
            linea.recalcular();
            return;
        }

        let mut linea = LineaCarrito {
            producto: producto.clone(),
            cantidad,
            precio_unitario: producto.precio_vigente(),
            subtotal: 0.0,
        };
        linea.recalcular();
        estado.carrito.push(linea);
    }

    /// Fija la cantidad de una línea. Cantidad ≤ 0 la elimina; sobre una
    /// línea inexistente no hace nada.
    pub fn update_quantity(&self, producto_id: i64, cantidad: i64) {
        let mut estado = self.estado.lock().unwrap();
        if cantidad <= 0 {
            estado.carrito.retain(|l| l.producto.id != producto_id);
            return;
        }

        if let Some(linea) = estado
            .carrito
            .iter_mut()
            .find(|l| l.producto.id == producto_id)
        {
            linea.cantidad = cantidad;
            linea.recalcular();
        }
    }

    pub fn clear_cart(&self) {
        self.estado.lock().unwrap().carrito.clear();
    }

    pub fn carrito(&self) -> Vec<LineaCarrito> {
        self.estado.lock().unwrap().carrito.clone()
    }

    /// Total del carrito: suma de subtotales, recomputada en cada lectura.
    pub fn total(&self) -> f64 {
        self.estado
            .lock()
            .unwrap()
            .carrito
            .iter()
            .map(|l| l.subtotal)
            .sum()
    }

    /// Unidades en el carrito: suma de cantidades.
    pub fn cantidad_total(&self) -> i64 {
        self.estado
            .lock()
            .unwrap()
            .carrito
            .iter()
            .map(|l| l.cantidad)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::testing::StubTransport;
    use crate::storage::Storage;
    use tempfile::tempdir;

    fn armar(stub: Arc<StubTransport>) -> (MenuStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::new(dir.path()).unwrap());
        let api = Arc::new(ApiClient::new(stub, storage));
        (MenuStore::new(api), dir)
    }

    fn producto(id: i64, categoria_id: i64, orden: i64, precio: f64) -> Producto {
        Producto {
            id,
            nombre: format!("Producto {}", id),
            descripcion: Some(format!("descripción {}", id)),
            codigo: None,
            categoria_id,
            precio_base: precio,
            precio_sucursal: None,
            disponibilidad: 10,
            orden,
            activo: true,
        }
    }

    fn invariantes(menu: &MenuStore) {
        let carrito = menu.carrito();
        let total: f64 = carrito.iter().map(|l| l.subtotal).sum();
        let cantidad: i64 = carrito.iter().map(|l| l.cantidad).sum();
        assert_eq!(menu.total(), total);
        assert_eq!(menu.cantidad_total(), cantidad);
        for linea in &carrito {
            assert_eq!(linea.subtotal, linea.cantidad as f64 * linea.precio_unitario);
            assert!(linea.cantidad >= 1);
        }
    }

    #[tokio::test]
    async fn agregar_dos_veces_suma_y_congela_el_precio() {
        let (menu, _dir) = armar(Arc::new(StubTransport::new()));
        let p = producto(1, 1, 1, 100.0);

        menu.add_to_cart(&p, 2);
        invariantes(&menu);

        // el catálogo cambió de precio entre medio
        let mut p_mas_caro = p.clone();
        p_mas_caro.precio_base = 150.0;
        menu.add_to_cart(&p_mas_caro, 3);
        invariantes(&menu);

        let carrito = menu.carrito();
        assert_eq!(carrito.len(), 1);
        assert_eq!(carrito[0].cantidad, 5);
        assert_eq!(carrito[0].precio_unitario, 100.0);
        assert_eq!(carrito[0].subtotal, 500.0);
        assert_eq!(menu.total(), 500.0);
        assert_eq!(menu.cantidad_total(), 5);
    }

    #[tokio::test]
    async fn precio_de_sucursal_se_congela_al_alta() {
        let (menu, _dir) = armar(Arc::new(StubTransport::new()));
        let mut p = producto(1, 1, 1, 100.0);
        p.precio_sucursal = Some(80.0);

        menu.add_to_cart(&p, 1);
        assert_eq!(menu.carrito()[0].precio_unitario, 80.0);
        invariantes(&menu);
    }

    #[tokio::test]
    async fn cantidad_cero_elimina_y_linea_inexistente_es_noop() {
        let (menu, _dir) = armar(Arc::new(StubTransport::new()));
        menu.add_to_cart(&producto(1, 1, 1, 100.0), 2);
        menu.add_to_cart(&producto(2, 1, 2, 50.0), 1);

        menu.update_quantity(1, 0);
        invariantes(&menu);
        assert_eq!(menu.carrito().len(), 1);
        assert_eq!(menu.carrito()[0].producto.id, 2);

        // actualizar una línea que no existe no hace nada
        menu.update_quantity(99, 4);
        invariantes(&menu);
        assert_eq!(menu.carrito().len(), 1);
        assert_eq!(menu.cantidad_total(), 1);

        menu.update_quantity(2, 7);
        invariantes(&menu);
        assert_eq!(menu.carrito()[0].subtotal, 350.0);

        menu.clear_cart();
        invariantes(&menu);
        assert_eq!(menu.total(), 0.0);
        assert_eq!(menu.cantidad_total(), 0);
    }

    #[tokio::test]
    async fn load_products_ordena_y_reemplaza() {
        let stub = Arc::new(StubTransport::new());
        stub.responder(
            "GET",
            "/sucursales/2/productos",
            200,
            serde_json::to_value(vec![
                producto(1, 1, 3, 10.0),
                producto(2, 1, 1, 20.0),
                producto(3, 2, 2, 30.0),
            ])
            .unwrap(),
        );
        let (menu, _dir) = armar(stub);

        menu.load_products(2).await.unwrap();
        let ids: Vec<i64> = menu.productos().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!(menu.error().is_none());
    }

    #[tokio::test]
    async fn load_products_fallido_conserva_el_catalogo_anterior() {
        let stub = Arc::new(StubTransport::new());
        stub.responder(
            "GET",
            "/sucursales/2/productos",
            200,
            serde_json::to_value(vec![producto(1, 1, 1, 10.0)]).unwrap(),
        );
        let (menu, _dir) = armar(stub.clone());
        menu.load_products(2).await.unwrap();

        stub.responder(
            "GET",
            "/sucursales/2/productos",
            500,
            serde_json::json!({ "mensaje": "se rompió" }),
        );
        assert!(menu.load_products(2).await.is_err());

        // catálogo previo intacto, error a nivel de store
        assert_eq!(menu.productos().len(), 1);
        assert!(menu.error().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn agrupa_siguiendo_el_orden_del_catalogo() {
        let stub = Arc::new(StubTransport::new());
        stub.responder(
            "GET",
            "/sucursales/2/productos",
            200,
            serde_json::to_value(vec![
                producto(1, 5, 1, 10.0),
                producto(2, 1, 2, 20.0),
                producto(3, 5, 3, 30.0),
                producto(4, 2, 4, 40.0),
            ])
            .unwrap(),
        );
        let (menu, _dir) = armar(stub);
        menu.load_products(2).await.unwrap();

        let grupos = menu.agrupados_por_categoria();
        let claves: Vec<i64> = grupos.keys().copied().collect();
        assert_eq!(claves, vec![5, 1, 2]);
        assert_eq!(grupos[&5].len(), 2);
    }

    #[tokio::test]
    async fn busqueda_y_filtro_no_mutan() {
        let stub = Arc::new(StubTransport::new());
        let mut con_nombre = producto(1, 1, 1, 10.0);
        con_nombre.nombre = "Café con leche".into();
        let mut con_descripcion = producto(2, 2, 2, 20.0);
        con_descripcion.descripcion = Some("molido de CAFÉ".into());
        stub.responder(
            "GET",
            "/sucursales/2/productos",
            200,
            serde_json::to_value(vec![con_nombre, con_descripcion, producto(3, 2, 3, 30.0)])
                .unwrap(),
        );
        let (menu, _dir) = armar(stub);
        menu.load_products(2).await.unwrap();

        let encontrados = menu.search("café");
        let ids: Vec<i64> = encontrados.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);

        assert_eq!(menu.filter_by_category(2).len(), 2);
        assert_eq!(menu.productos().len(), 3);
    }
}
