//! Typed reply model and its HTML rendering.
//!
//! The chat front-end displays these fragments verbatim inside the assistant
//! bubble, so the rendering here IS the user-visible contract: totals,
//! remaining stock, suggestion lists, fact-sheet rows, and empty states.

use rust_decimal::Decimal;
use serde::Serialize;

use tendero_core::domain::product::Product;
use tendero_db::repositories::TopSeller;

/// Which action asked for a product resolution; only changes the wording of
/// the re-prompt under an ambiguous or missed match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPurpose {
    Register,
    Lookup,
}

impl MatchPurpose {
    fn verb(self) -> &'static str {
        match self {
            Self::Register => "registrar",
            Self::Lookup => "consultar",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// Fixed instructions for starting the guided sale flow.
    SaleFlowPrompt,
    SaleRegistered {
        product_name: String,
        total: Decimal,
        remaining_stock: i64,
        /// Matched name to surface when the query was not an exact hit.
        matched_note: Option<String>,
    },
    InsufficientStock {
        product_name: String,
        available: i64,
    },
    AmbiguousProduct {
        query: String,
        suggestions: Vec<String>,
        purpose: MatchPurpose,
    },
    ProductNotFound {
        query: String,
        suggestions: Vec<String>,
        purpose: MatchPurpose,
    },
    ProductFactSheet {
        product: Product,
        total_sold: i64,
        matched_note: Option<String>,
    },
    TopSellers {
        rows: Vec<TopSeller>,
        grand_total: i64,
    },
    NoSalesYet,
    Catalog {
        products: Vec<Product>,
    },
    EmptyCatalog,
    Clarification,
    NotUnderstood,
}

impl Reply {
    /// Stable machine-readable tag carried next to the rendered fragment.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SaleFlowPrompt => "sale_flow_prompt",
            Self::SaleRegistered { .. } => "sale_registered",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::AmbiguousProduct { .. } => "ambiguous_product",
            Self::ProductNotFound { .. } => "product_not_found",
            Self::ProductFactSheet { .. } => "product_fact_sheet",
            Self::TopSellers { .. } => "top_sellers",
            Self::NoSalesYet => "no_sales_yet",
            Self::Catalog { .. } => "catalog",
            Self::EmptyCatalog => "empty_catalog",
            Self::Clarification => "clarification",
            Self::NotUnderstood => "not_understood",
        }
    }

    /// True for the outcomes that ask the user to rephrase the product.
    pub fn needs_reprompt(&self) -> bool {
        matches!(self, Self::AmbiguousProduct { .. } | Self::ProductNotFound { .. })
    }

    pub fn render_html(&self) -> String {
        match self {
            Self::SaleFlowPrompt => "📝 Perfecto, vamos a registrar una venta.<br><br>\
                 ¿Qué producto vendiste y cuántas unidades?<br><br>\
                 Ejemplo: 'Vendí 3 cuadernos' o '2 lapiceros a $0.50'"
                .to_string(),

            Self::SaleRegistered { product_name, total, remaining_stock, matched_note } => {
                let mut out = format!(
                    "✅ Venta registrada por ${total}<br>\
                     📦 Stock actual de {product_name}: {remaining_stock}"
                );
                if let Some(matched) = matched_note {
                    out.push_str(&format!("<br><br>💡 <em>(Encontré: {matched})</em>"));
                }
                out
            }

            Self::InsufficientStock { product_name, available } => format!(
                "⚠️ Stock insuficiente de {product_name}.<br>Disponible: {available}"
            ),

            Self::AmbiguousProduct { query, suggestions, purpose }
            | Self::ProductNotFound { query, suggestions, purpose }
                if !suggestions.is_empty() =>
            {
                let mut out =
                    format!("🔍 Encontré varios productos similares a '{query}':<br>");
                out.push_str("<ul style=\"margin:8px 0; padding-left:20px;\">");
                for suggestion in suggestions {
                    out.push_str(&format!("<li>{suggestion}</li>"));
                }
                out.push_str("</ul>");
                out.push_str(&format!(
                    "<em>💡 Por favor, especifica cuál producto quieres {}.</em>",
                    purpose.verb()
                ));
                out
            }

            Self::AmbiguousProduct { query, .. } | Self::ProductNotFound { query, .. } => {
                format!("❌ No encontré ningún producto similar a '{query}'")
            }

            Self::ProductFactSheet { product, total_sold, matched_note } => {
                let mut out = String::new();
                if let Some(matched) = matched_note {
                    out.push_str(&format!(
                        "💡 <em>Encontré: <strong>{matched}</strong></em><br><br>"
                    ));
                }

                out.push_str(&format!("<strong>📦 {}</strong>", product.name));
                out.push_str("<table style=\"width:100%; border-collapse: collapse; margin-top:8px;\">");
                out.push_str(&fact_row("💰 Precio de venta", &format!("${}", product.sale_price)));
                out.push_str(&fact_row(
                    "📊 Stock actual",
                    &format!("{} unidades", product.current_stock),
                ));
                out.push_str(&fact_row(
                    "⚠️ Stock mínimo",
                    &format!("{} unidades", product.minimum_stock),
                ));
                out.push_str(&fact_row("🔥 Total vendido", &format!("{total_sold} unidades")));
                out.push_str(&fact_row("📁 Categoría", &product.category.name));
                out.push_str("</table>");

                if product.needs_restock() {
                    out.push_str(
                        "<br>⚠️ <strong>¡Atención!</strong> Este producto necesita reposición",
                    );
                }
                out
            }

            Self::TopSellers { rows, grand_total } => {
                const MEDALS: [&str; 5] = ["🥇", "🥈", "🥉", "4️⃣", "5️⃣"];

                let mut out = "<strong>🔥 Productos más vendidos</strong>".to_string();
                out.push_str("<table style=\"width:100%; border-collapse: collapse; margin-top:8px;\">");
                out.push_str(
                    "<thead><tr>\
                     <th>🏆</th><th>Producto</th><th>Vendidos</th><th>Precio</th>\
                     </tr></thead><tbody>",
                );
                for (i, row) in rows.iter().enumerate() {
                    let medal = MEDALS.get(i).copied().unwrap_or("•");
                    out.push_str(&format!(
                        "<tr><td>{medal}</td><td><strong>{}</strong></td>\
                         <td>{} unidades</td><td>${}</td></tr>",
                        row.name, row.total_quantity, row.sale_price
                    ));
                }
                out.push_str("</tbody></table>");
                out.push_str(&format!(
                    "<br><em>📊 Total vendido (Top 5): <strong>{grand_total}</strong> unidades</em>"
                ));
                out
            }

            Self::NoSalesYet => "📊 Aún no hay ventas registradas.".to_string(),

            Self::Catalog { products } => {
                let mut out = "<strong>📦 Productos registrados</strong>".to_string();
                out.push_str("<table style=\"width:100%; border-collapse: collapse; margin-top:8px;\">");
                out.push_str(
                    "<thead><tr><th>Producto</th><th>Stock</th><th>Precio</th></tr></thead><tbody>",
                );
                for product in products {
                    out.push_str(&format!(
                        "<tr><td>{}</td><td>{}</td><td>${}</td></tr>",
                        product.name, product.current_stock, product.sale_price
                    ));
                }
                out.push_str("</tbody></table>");
                out
            }

            Self::EmptyCatalog => "📦 No tienes productos registrados".to_string(),

            Self::Clarification => "🤔 ¿Podrías darme más detalles?".to_string(),

            Self::NotUnderstood => "❌ No entendí la acción".to_string(),
        }
    }
}

fn fact_row(label: &str, value: &str) -> String {
    format!(
        "<tr><td style=\"font-weight:bold;\">{label}</td><td>{value}</td></tr>"
    )
}
