use serde_json::{Map, Value};
use thiserror::Error;

use crate::invoice::types::{InvoiceData, InvoiceItem};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("arguments must be an object")]
    NotAnObject,

    #[error("`items` is required")]
    MissingItems,

    #[error("`items` must be an array")]
    ItemsNotArray,

    #[error("`items` must contain at least one entry")]
    EmptyItems,

    #[error("items[{index}] must be an object")]
    ItemNotObject { index: usize },

    #[error("items[{index}].item must be a non-empty string")]
    InvalidLabel { index: usize },

    #[error("items[{index}].amount must be a number")]
    InvalidAmount { index: usize },

    #[error("`{field}` must be a string")]
    InvalidMetadata { field: &'static str },
}

/// Parses tool-call arguments into an [`InvoiceData`], or reports the first
/// structural problem found. Unknown fields are ignored; `null` metadata is
/// treated as absent.
pub fn parse_invoice_data(args: &Value) -> Result<InvoiceData, ValidationError> {
    let obj = args.as_object().ok_or(ValidationError::NotAnObject)?;

    let raw_items = match obj.get("items") {
        None | Some(Value::Null) => return Err(ValidationError::MissingItems),
        Some(Value::Array(arr)) => arr,
        Some(_) => return Err(ValidationError::ItemsNotArray),
    };
    if raw_items.is_empty() {
        return Err(ValidationError::EmptyItems);
    }

    let items = raw_items
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_item(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(InvoiceData {
        items,
        invoice_date: optional_string(obj, "invoiceDate")?,
        sender: optional_string(obj, "sender")?,
    })
}

fn parse_item(index: usize, raw: &Value) -> Result<InvoiceItem, ValidationError> {
    let obj = raw
        .as_object()
        .ok_or(ValidationError::ItemNotObject { index })?;

    let item = match obj.get("item") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => return Err(ValidationError::InvalidLabel { index }),
    };
    let amount = match obj.get("amount") {
        Some(Value::Number(n)) => n.clone(),
        _ => return Err(ValidationError::InvalidAmount { index }),
    };

    Ok(InvoiceItem { item, amount })
}

fn optional_string(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::InvalidMetadata { field }),
    }
}
