//! Persisted key-value session state
//!
//! Exactly three keys survive a restart: the bearer token, the user record
//! and the selected sucursal. Each key lives in its own file and is written
//! atomically (temp file + rename); there is no cross-key transaction, so a
//! reader can observe one key updated and another not yet.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ApiError;
use crate::log_warn;
use crate::models::usuario::{Sucursal, Usuario};

pub const KEY_TOKEN: &str = "authToken";
pub const KEY_USUARIO: &str = "authUser";
pub const KEY_SUCURSAL: &str = "authSucursal";

pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn new(dir: &Path) -> Result<Self, ApiError> {
        fs::create_dir_all(dir)
            .map_err(|e| ApiError::Storage(format!("no se pudo crear {}: {}", dir.display(), e)))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Lee una clave. Ausente o ilegible da `None`.
    pub fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    /// Escribe una clave de forma atómica: archivo temporal + rename.
    pub fn set(&self, key: &str, contents: &str) -> Result<(), ApiError> {
        let tmp = self.dir.join(format!("{}.tmp", key));
        fs::write(&tmp, contents)
            .map_err(|e| ApiError::Storage(format!("no se pudo escribir {}: {}", key, e)))?;
        fs::rename(&tmp, self.path_for(key))
            .map_err(|e| ApiError::Storage(format!("no se pudo escribir {}: {}", key, e)))?;
        Ok(())
    }

    pub fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }

    // -- Claves tipadas --

    pub fn token(&self) -> Option<String> {
        self.get(KEY_TOKEN).filter(|t| !t.is_empty())
    }

    pub fn set_token(&self, token: &str) -> Result<(), ApiError> {
        self.set(KEY_TOKEN, token)
    }

    pub fn usuario(&self) -> Option<Usuario> {
        let raw = self.get(KEY_USUARIO)?;
        match serde_json::from_str(&raw) {
            Ok(u) => Some(u),
            Err(e) => {
                log_warn!(
                    "STORAGE",
                    &format!("authUser persistido corrupto, se descarta: {}", e)
                );
                None
            }
        }
    }

    pub fn set_usuario(&self, usuario: &Usuario) -> Result<(), ApiError> {
        self.set(KEY_USUARIO, &serde_json::to_string(usuario)?)
    }

    pub fn sucursal(&self) -> Option<Sucursal> {
        let raw = self.get(KEY_SUCURSAL)?;
        match serde_json::from_str(&raw) {
            Ok(s) => Some(s),
            Err(e) => {
                log_warn!(
                    "STORAGE",
                    &format!("authSucursal persistida corrupta, se descarta: {}", e)
                );
                None
            }
        }
    }

    pub fn set_sucursal(&self, sucursal: &Sucursal) -> Result<(), ApiError> {
        self.set(KEY_SUCURSAL, &serde_json::to_string(sucursal)?)
    }

    /// Borra las tres claves de la sesión.
    pub fn clear_auth(&self) {
        self.remove(KEY_TOKEN);
        self.remove(KEY_USUARIO);
        self.remove(KEY_SUCURSAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn usuario() -> Usuario {
        Usuario {
            id: 1,
            nombre: "Ana".into(),
            email: None,
            rol: "ADMIN".into(),
            sucursal_id: 2,
            activo: true,
            permisos: vec![],
        }
    }

    #[test]
    fn roundtrip_de_claves_tipadas() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path()).unwrap();

        assert!(storage.token().is_none());

        storage.set_token("t-1").unwrap();
        storage.set_usuario(&usuario()).unwrap();
        storage.set_sucursal(&Sucursal::sintetica(2)).unwrap();

        assert_eq!(storage.token().as_deref(), Some("t-1"));
        assert_eq!(storage.usuario().unwrap().nombre, "Ana");
        assert_eq!(storage.sucursal().unwrap().id, 2);

        storage.clear_auth();
        assert!(storage.token().is_none());
        assert!(storage.usuario().is_none());
        assert!(storage.sucursal().is_none());
    }

    #[test]
    fn clave_corrupta_da_none() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path()).unwrap();

        storage.set(KEY_USUARIO, "esto no es json").unwrap();
        assert!(storage.usuario().is_none());
    }
}
