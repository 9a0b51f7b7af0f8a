//! Typed parsing of the product mutation payload.
//!
//! The web client submits product fields as a multipart form whose
//! `variant`, `variantUpdates`, `removeVariantIds` and `removeImageIds`
//! fields are JSON-encoded strings. Everything is parsed into
//! strongly-typed values here, before any business logic runs; a parse
//! failure is a Validation error carrying the contract message.

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::ServiceError;

/// One uploaded image as received from the upload boundary.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Raw product create/update form. All fields optional; the services
/// decide which are required for which operation.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category_id: Option<String>,
    /// JSON channel: full variant replacement.
    pub variant: Option<String>,
    /// JSON channel: per-id variant update/insert.
    pub variant_updates: Option<String>,
    /// JSON channel: explicit variant removal list.
    pub remove_variant_ids: Option<String>,
    /// JSON channel: image removal list.
    pub remove_image_ids: Option<String>,
    pub images: Vec<UploadedImage>,
}

/// A `{variant, stock}` entry from the full-replace channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VariantInput {
    #[serde(alias = "name")]
    pub variant: String,
    #[serde(default)]
    pub stock: i32,
}

/// A `{id?, variant?, stock?}` entry from the per-id channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantUpdateInput {
    pub id: Option<Uuid>,
    pub variant: Option<String>,
    pub stock: Option<i32>,
}

/// Parses the full-replace variant channel.
///
/// Returns `None` for an empty array — an empty replacement list is a
/// no-op, not a wipe.
pub fn parse_variants(raw: &str) -> Result<Option<Vec<VariantInput>>, ServiceError> {
    let parsed: Vec<VariantInput> = serde_json::from_str(raw).map_err(|_| {
        ServiceError::Validation("Invalid variant format; expected JSON array".into())
    })?;
    Ok(if parsed.is_empty() { None } else { Some(parsed) })
}

/// Parses the per-id variant update channel.
pub fn parse_variant_updates(raw: &str) -> Result<Vec<VariantUpdateInput>, ServiceError> {
    serde_json::from_str(raw).map_err(|_| {
        ServiceError::Validation("Invalid variantUpdates format; expected JSON array".into())
    })
}

/// Parses a JSON array of ids, failing with the given contract message.
///
/// Entries that are not valid ids are dropped rather than rejected: a
/// removal list only ever narrows a delete, and ids that cannot resolve
/// are silently ignored by contract.
pub fn parse_id_list(raw: &str, message: &str) -> Result<Vec<Uuid>, ServiceError> {
    let parsed: Vec<String> =
        serde_json::from_str(raw).map_err(|_| ServiceError::Validation(message.into()))?;
    Ok(parsed.iter().filter_map(|s| s.parse().ok()).collect())
}

/// Parses a non-negative decimal price.
pub fn parse_price(raw: &str) -> Result<Decimal, ServiceError> {
    let price: Decimal = raw
        .trim()
        .parse()
        .map_err(|_| ServiceError::Validation("Invalid price".into()))?;
    if price < Decimal::ZERO {
        return Err(ServiceError::Validation("Invalid price".into()));
    }
    Ok(price)
}

/// Rejects payloads where two entries share the same trimmed name
/// (case-sensitively).
pub fn validate_unique_names(variants: &[VariantInput]) -> Result<(), ServiceError> {
    let mut seen = std::collections::HashSet::new();
    for v in variants {
        let name = v.variant.trim();
        if !seen.insert(name) {
            return Err(ServiceError::Conflict(format!(
                "Duplicate variant name in payload: {name}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants_accepts_name_alias() {
        let parsed = parse_variants(r#"[{"variant":"42","stock":2},{"name":"43"}]"#)
            .unwrap()
            .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].variant, "42");
        assert_eq!(parsed[0].stock, 2);
        assert_eq!(parsed[1].variant, "43");
        assert_eq!(parsed[1].stock, 0);
    }

    #[test]
    fn test_parse_variants_empty_array_is_noop() {
        assert_eq!(parse_variants("[]").unwrap(), None);
    }

    #[test]
    fn test_parse_variants_rejects_non_array() {
        let err = parse_variants(r#"{"variant":"42"}"#).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(m)
            if m == "Invalid variant format; expected JSON array"));
    }

    #[test]
    fn test_parse_variant_updates() {
        let parsed = parse_variant_updates(
            r#"[{"id":"00000000-0000-0000-0000-000000000001","stock":7},{"variant":"XL"}]"#,
        )
        .unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].id.is_some());
        assert_eq!(parsed[0].stock, Some(7));
        assert_eq!(parsed[1].variant.as_deref(), Some("XL"));
        assert_eq!(parsed[1].id, None);
    }

    #[test]
    fn test_parse_variant_updates_rejects_garbage() {
        let err = parse_variant_updates("not json").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(m)
            if m == "Invalid variantUpdates format; expected JSON array"));
    }

    #[test]
    fn test_parse_id_list_drops_unresolvable_ids() {
        let ids = parse_id_list(
            r#"["00000000-0000-0000-0000-000000000001","not-an-id"]"#,
            "Invalid removeImageIds format; expected JSON array of ids",
        )
        .unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn test_parse_id_list_rejects_non_array() {
        let err = parse_id_list(
            "42",
            "Invalid removeVariantIds format; expected JSON array of ids",
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(m)
            if m == "Invalid removeVariantIds format; expected JSON array of ids"));
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("100000").unwrap(), Decimal::from(100000));
        assert_eq!(parse_price(" 19.90 ").unwrap(), "19.90".parse().unwrap());
        assert!(matches!(
            parse_price("abc"),
            Err(ServiceError::Validation(m)) if m == "Invalid price"
        ));
        assert!(matches!(
            parse_price("-1"),
            Err(ServiceError::Validation(m)) if m == "Invalid price"
        ));
    }

    #[test]
    fn test_validate_unique_names_is_case_sensitive_on_trimmed_names() {
        let ok = vec![
            VariantInput { variant: "Red".into(), stock: 1 },
            VariantInput { variant: "red".into(), stock: 1 },
        ];
        assert!(validate_unique_names(&ok).is_ok());

        let dup = vec![
            VariantInput { variant: "Red".into(), stock: 1 },
            VariantInput { variant: " Red ".into(), stock: 1 },
        ];
        let err = validate_unique_names(&dup).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(m)
            if m == "Duplicate variant name in payload: Red"));
    }
}
