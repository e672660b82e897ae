//! Input validation module
//!
//! Centralized validation for everything the UI can type before a request is
//! issued: credentials, quantities, amounts, and report date ranges.

use chrono::NaiveDate;

/// Validation result type
pub type ValidationResult = Result<(), String>;

/// Validate a username
/// - Length: 3-50 characters
/// - Allowed: alphanumeric, underscore, hyphen, dot
pub fn validate_username(username: &str) -> ValidationResult {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err("El usuario no puede estar vacío".into());
    }

    if trimmed.len() < 3 || trimmed.len() > 50 {
        return Err("El usuario debe tener entre 3 y 50 caracteres".into());
    }

    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || "_-.@".contains(c))
    {
        return Err("El usuario solo puede contener letras, números y ._-@".into());
    }

    Ok(())
}

/// Validate a password before sending it to the backend
pub fn validate_password(password: &str) -> ValidationResult {
    if password.is_empty() {
        return Err("La contraseña no puede estar vacía".into());
    }

    if password.len() > 128 {
        return Err("La contraseña es demasiado larga (máx. 128 caracteres)".into());
    }

    Ok(())
}

/// Validate a cart quantity
pub fn validate_cantidad(cantidad: i64) -> ValidationResult {
    if cantidad < 1 {
        return Err("La cantidad debe ser al menos 1".into());
    }

    if cantidad > 10_000 {
        return Err("Cantidad máxima: 10.000".into());
    }

    Ok(())
}

/// Validate a monetary amount
pub fn validate_monto(monto: f64) -> ValidationResult {
    if monto.is_nan() || monto.is_infinite() {
        return Err("Monto inválido".into());
    }

    if monto <= 0.0 {
        return Err("El monto debe ser mayor que cero".into());
    }

    if monto > 1_000_000_000.0 {
        return Err("Monto máximo superado".into());
    }

    Ok(())
}

/// Validate an expense concept
pub fn validate_concepto(concepto: &str) -> ValidationResult {
    let trimmed = concepto.trim();

    if trimmed.is_empty() {
        return Err("El concepto no puede estar vacío".into());
    }

    if trimmed.len() > 200 {
        return Err("El concepto es demasiado largo (máx. 200 caracteres)".into());
    }

    Ok(())
}

/// Validate an ISO date as the backend expects it (`YYYY-MM-DD`)
pub fn validate_fecha(fecha: &str) -> ValidationResult {
    NaiveDate::parse_from_str(fecha, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| format!("Fecha inválida: '{}' (se espera YYYY-MM-DD)", fecha))
}

/// Validate a report date range: both dates valid and inicio <= fin
pub fn validate_rango_fechas(inicio: &str, fin: &str) -> ValidationResult {
    let desde = NaiveDate::parse_from_str(inicio, "%Y-%m-%d")
        .map_err(|_| format!("Fecha de inicio inválida: '{}'", inicio))?;
    let hasta = NaiveDate::parse_from_str(fin, "%Y-%m-%d")
        .map_err(|_| format!("Fecha de fin inválida: '{}'", fin))?;

    if desde > hasta {
        return Err("La fecha de inicio no puede ser posterior a la de fin".into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_valido() {
        assert!(validate_username("ana.perez").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("ana perez").is_err());
        assert!(validate_username("").is_err());
    }

    #[test]
    fn cantidad_y_monto() {
        assert!(validate_cantidad(1).is_ok());
        assert!(validate_cantidad(0).is_err());
        assert!(validate_monto(150.0).is_ok());
        assert!(validate_monto(0.0).is_err());
        assert!(validate_monto(f64::NAN).is_err());
    }

    #[test]
    fn rango_de_fechas() {
        assert!(validate_rango_fechas("2025-01-01", "2025-01-31").is_ok());
        assert!(validate_rango_fechas("2025-02-01", "2025-01-31").is_err());
        assert!(validate_fecha("01-01-2025").is_err());
        assert!(validate_fecha("2025-13-01").is_err());
    }
}
