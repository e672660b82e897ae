use serde::{Deserialize, Serialize};

/// Producto del catálogo de una sucursal. Solo lectura para el cliente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Producto {
    pub id: i64,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub codigo: Option<String>,
    pub categoria_id: i64,
    pub precio_base: f64,
    /// Precio propio de la sucursal; si está presente pisa al precio base.
    #[serde(default)]
    pub precio_sucursal: Option<f64>,
    pub disponibilidad: i64,
    pub orden: i64,
    pub activo: bool,
}

impl Producto {
    /// Precio que ve el cliente: el de la sucursal si existe, si no el base.
    pub fn precio_vigente(&self) -> f64 {
        self.precio_sucursal.unwrap_or(self.precio_base)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Categoria {
    pub id: i64,
    pub nombre: String,
    #[serde(default)]
    pub icono: Option<String>,
    pub orden: i64,
    pub activa: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subcategoria {
    pub id: i64,
    pub categoria_id: i64,
    pub nombre: String,
    pub activa: bool,
}

/// Payload para crear una subcategoría.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrearSubcategoriaPayload {
    pub categoria_id: i64,
    pub nombre: String,
}

/// Payload para actualizar una subcategoría.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualizarSubcategoriaPayload {
    pub nombre: String,
    pub activa: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn producto(precio_base: f64, precio_sucursal: Option<f64>) -> Producto {
        Producto {
            id: 1,
            nombre: "Café".into(),
            descripcion: None,
            codigo: None,
            categoria_id: 1,
            precio_base,
            precio_sucursal,
            disponibilidad: 10,
            orden: 1,
            activo: true,
        }
    }

    #[test]
    fn precio_sucursal_pisa_al_base() {
        assert_eq!(producto(100.0, Some(120.0)).precio_vigente(), 120.0);
        assert_eq!(producto(100.0, None).precio_vigente(), 100.0);
    }
}
