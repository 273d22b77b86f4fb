//! Structured intent contract shared with the external classifier.
//!
//! The wire protocol keeps the Spanish action vocabulary the assistant was
//! trained on; everything after deserialization speaks the typed enum.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatAction {
    #[serde(rename = "registrar_venta")]
    RegisterSale,
    #[serde(rename = "iniciar_registro_venta")]
    StartSaleFlow,
    #[serde(rename = "consultar_producto")]
    LookupProduct,
    #[serde(rename = "productos_mas_vendidos")]
    TopSellers,
    #[serde(rename = "listar_productos")]
    ListCatalog,
    #[serde(rename = "pedir_aclaracion")]
    RequestClarification,
    /// Any action string outside the recognized set. Kept as a variant so the
    /// executor can answer with a "did not understand" reply instead of
    /// failing deserialization.
    #[serde(other)]
    Unknown,
}

/// The classifier's structured verdict for one inbound message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatIntent {
    #[serde(rename = "accion")]
    pub action: ChatAction,
    #[serde(rename = "producto", default)]
    pub product: Option<String>,
    #[serde(rename = "cantidad", default)]
    pub quantity: Option<i64>,
}

impl ChatIntent {
    pub fn clarification() -> Self {
        Self { action: ChatAction::RequestClarification, product: None, quantity: None }
    }

    /// Quantity defaults to 1 when the classifier omitted it or sent null.
    pub fn quantity_or_default(&self) -> i64 {
        self.quantity.unwrap_or(1)
    }

    pub fn product_name(&self) -> &str {
        self.product.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatAction, ChatIntent};

    #[test]
    fn deserializes_spanish_wire_keys() {
        let intent: ChatIntent = serde_json::from_str(
            r#"{"accion": "registrar_venta", "producto": "cuaderno", "cantidad": 3}"#,
        )
        .expect("valid intent");

        assert_eq!(intent.action, ChatAction::RegisterSale);
        assert_eq!(intent.product.as_deref(), Some("cuaderno"));
        assert_eq!(intent.quantity_or_default(), 3);
    }

    #[test]
    fn null_and_missing_slots_default() {
        let intent: ChatIntent = serde_json::from_str(
            r#"{"accion": "consultar_producto", "producto": null, "cantidad": null}"#,
        )
        .expect("valid intent");
        assert_eq!(intent.quantity_or_default(), 1);
        assert_eq!(intent.product_name(), "");

        let intent: ChatIntent =
            serde_json::from_str(r#"{"accion": "listar_productos"}"#).expect("valid intent");
        assert_eq!(intent.action, ChatAction::ListCatalog);
        assert_eq!(intent.quantity_or_default(), 1);
    }

    #[test]
    fn unrecognized_action_maps_to_unknown() {
        let intent: ChatIntent =
            serde_json::from_str(r#"{"accion": "bailar_salsa"}"#).expect("valid json");
        assert_eq!(intent.action, ChatAction::Unknown);
    }

    #[test]
    fn round_trips_action_names() {
        let json = serde_json::to_string(&ChatIntent::clarification()).expect("serialize");
        assert!(json.contains("pedir_aclaracion"));
    }
}
