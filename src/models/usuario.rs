use serde::{Deserialize, Serialize};

/// Rol con permiso multi-sucursal y reportes globales.
pub const ROL_ADMIN: &str = "ADMIN";

/// Rol asignado cuando el backend no manda ninguno reconocible.
pub const ROL_POR_DEFECTO: &str = "USUARIO";

/// Usuario canónico que maneja el cliente — el rol ya viene normalizado
/// a un string plano, venga como venga del backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usuario {
    pub id: i64,
    pub nombre: String,
    #[serde(default)]
    pub email: Option<String>,
    pub rol: String,
    pub sucursal_id: i64,
    pub activo: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permisos: Vec<String>,
}

impl Usuario {
    pub fn es_admin(&self) -> bool {
        self.rol == ROL_ADMIN
    }
}

/// Sucursal (sede física) a la que queda ligada la sesión.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sucursal {
    pub id: i64,
    pub nombre: String,
    pub activa: bool,
}

impl Sucursal {
    /// Sucursal sintetizada cuando el backend no manda una: id asignado
    /// del usuario, nombre "Sucursal {id}".
    pub fn sintetica(id: i64) -> Self {
        Self {
            id,
            nombre: format!("Sucursal {}", id),
            activa: true,
        }
    }

    /// Una sucursal persistida solo es usable con id > 0.
    pub fn es_valida(&self) -> bool {
        self.id > 0
    }
}

/// Rol tal como lo lista `GET /roles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rol {
    pub id: i64,
    pub nombre: String,
}

/// El campo `rol` del backend es inconsistente entre endpoints: a veces un
/// string plano, a veces un objeto con `nombre`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RolWire {
    Plano(String),
    Objeto {
        #[serde(default)]
        nombre: Option<String>,
    },
}

/// Usuario tal como llega del backend, antes de normalizar.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsuarioWire {
    pub id: i64,
    pub nombre: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub rol: Option<RolWire>,
    #[serde(default)]
    pub rol_nombre: Option<String>,
    pub sucursal_id: i64,
    #[serde(default = "default_activo")]
    pub activo: bool,
    #[serde(default)]
    pub permisos: Vec<String>,
}

fn default_activo() -> bool {
    true
}

/// Normaliza el rol al primer valor no vacío de: string plano, `nombre` del
/// objeto anidado, campo hermano `rolNombre`. Si nada aplica, rol por defecto.
/// El orden de fallback replica el comportamiento del backend y no debe
/// reordenarse.
pub fn normalizar_rol(rol: Option<&RolWire>, rol_nombre: Option<&str>) -> String {
    match rol {
        Some(RolWire::Plano(s)) if !s.trim().is_empty() => return s.clone(),
        Some(RolWire::Objeto { nombre: Some(n) }) if !n.trim().is_empty() => return n.clone(),
        _ => {}
    }
    if let Some(rn) = rol_nombre {
        if !rn.trim().is_empty() {
            return rn.to_string();
        }
    }
    ROL_POR_DEFECTO.to_string()
}

impl From<UsuarioWire> for Usuario {
    fn from(w: UsuarioWire) -> Self {
        let rol = normalizar_rol(w.rol.as_ref(), w.rol_nombre.as_deref());
        Self {
            id: w.id,
            nombre: w.nombre,
            email: w.email,
            rol,
            sucursal_id: w.sucursal_id,
            activo: w.activo,
            permisos: w.permisos,
        }
    }
}

/// Respuesta de `POST /auth/login`. La sucursal puede faltar.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub usuario: UsuarioWire,
    #[serde(default)]
    pub sucursal: Option<Sucursal>,
}

/// Respuesta de `POST /auth/refresh-token`.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
}
