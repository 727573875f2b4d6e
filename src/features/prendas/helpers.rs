use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::features::prendas::dto::Prenda;

pub(super) const WELCOME_MESSAGE: &str = "Bienvenido a la API de Prendas.";

pub(super) const LIST_CONNECT_ERROR: &str = "Error al conectarse con MongoDB";
pub(super) const LIST_QUERY_ERROR: &str = "Error al obtener las prendas de la base de datos.";
pub(super) const GET_CONNECT_ERROR: &str = "Error al conectarse a MongoDB";
pub(super) const GET_QUERY_ERROR: &str = "Error al obtener la prenda en la base de datos.";
pub(super) const SEARCH_CONNECT_ERROR: &str = "Error al conectarse a MongoDB.";
pub(super) const SEARCH_QUERY_ERROR: &str = "Error al obtener la prenda de la base de datos.";
pub(super) const CREATE_BAD_REQUEST: &str = "Error en el formato de datos.";
pub(super) const CREATE_CONNECT_ERROR: &str = "Error al conectarse a MongoDB.";
pub(super) const CREATE_QUERY_ERROR: &str = "Error al agregar la prenda a la base de datos.";
pub(super) const PATCH_BAD_REQUEST: &str = "Error en el formato para modificar la prenda.";
pub(super) const PATCH_CONNECT_ERROR: &str = "Error al conectarse a MongoDB.";
pub(super) const PATCH_QUERY_ERROR: &str = "Error al modificar el precio de la prenda.";
pub(super) const DELETE_CONNECT_ERROR: &str = "Error al conectarse a MongoDB";
pub(super) const DELETE_QUERY_ERROR: &str = "Error al eliminar la prenda.";

/// Integer-prefix parsing of a path segment: leading whitespace, an optional sign, then
/// decimal digits up to the first non-digit. `None` means the segment is not a number.
pub fn parse_codigo(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let sign_len = usize::from(matches!(trimmed.as_bytes().first(), Some(b'-' | b'+')));
    let digits_len = trimmed[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }

    trimmed[..sign_len + digits_len].parse::<i64>().ok()
}

pub fn describe_codigo(codigo: Option<i64>) -> String {
    codigo.map_or_else(|| "NaN".to_string(), |value| value.to_string())
}

/// Decodes a request body into a document. Anything that is not a JSON object counts as
/// an absent body; `{}` is present.
pub fn parse_body(bytes: &[u8]) -> Option<Prenda> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    match serde_json::from_slice::<Value>(bytes).ok()? {
        Value::Object(fields) => Some(Prenda::new(fields)),
        _ => None,
    }
}

pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integer_prefix() {
        assert_eq!(parse_codigo("5"), Some(5));
        assert_eq!(parse_codigo("  42"), Some(42));
        assert_eq!(parse_codigo("-3"), Some(-3));
        assert_eq!(parse_codigo("+8"), Some(8));
        assert_eq!(parse_codigo("12abc"), Some(12));
        assert_eq!(parse_codigo("5.9"), Some(5));
        assert_eq!(parse_codigo("0"), Some(0));
        assert_eq!(parse_codigo("-9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_codigo("9223372036854775807"), Some(i64::MAX));
    }

    #[test]
    fn non_numeric_segments_are_nan() {
        assert_eq!(parse_codigo("abc"), None);
        assert_eq!(parse_codigo(""), None);
        assert_eq!(parse_codigo("-"), None);
        assert_eq!(parse_codigo("99999999999999999999"), None);
        assert_eq!(describe_codigo(None), "NaN");
        assert_eq!(describe_codigo(Some(-4)), "-4");
    }

    #[test]
    fn only_json_objects_count_as_bodies() {
        assert!(parse_body(b"").is_none());
        assert!(parse_body(b"  \n").is_none());
        assert!(parse_body(b"{not json").is_none());
        assert!(parse_body(b"[1, 2]").is_none());
        assert!(parse_body(b"0").is_none());
        assert!(parse_body(b"null").is_none());

        let empty = parse_body(b"{}").expect("empty object is a body");
        assert!(empty.is_empty());

        let prenda = parse_body(br#"{"codigo": 5, "nombre": "Short"}"#).expect("body");
        assert_eq!(prenda.codigo(), Some(5));
    }

    #[test]
    fn patterns_are_case_insensitive() {
        let pattern = compile_pattern("camisa").expect("pattern");
        assert!(pattern.is_match("Camisa Azul"));
        assert!(pattern.is_match("SOBRECAMISA"));
        assert!(compile_pattern("(sin cerrar").is_err());
    }
}
