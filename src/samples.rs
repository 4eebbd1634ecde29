//! Built-in sample scripts that can be loaded from the toolbar.
//!
//! Plain-text samples go through the outline provider; the JSON sample exercises
//! the full document format including descriptions and edge labels.

use serde_json::json;

/// Kinds of built-in samples available from the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// Two steps joined with "then"
    Sequence,
    /// A login flow with a yes/no check
    LoginCheck,
    /// Order handling as a JSON document with tooltips
    OrderDocument,
}

/// Metadata for a single sample.
pub struct SampleInfo {
    /// Stable identifier for the sample
    pub kind: SampleKind,
    /// Human-friendly display name
    pub name: &'static str,
}

/// Returns all samples with their display names.
pub const fn all_samples() -> &'static [SampleInfo] {
    const SAMPLES: &[SampleInfo] = &[
        SampleInfo {
            kind: SampleKind::Sequence,
            name: "Simple sequence",
        },
        SampleInfo {
            kind: SampleKind::LoginCheck,
            name: "Login check",
        },
        SampleInfo {
            kind: SampleKind::OrderDocument,
            name: "Order handling (JSON)",
        },
    ];
    SAMPLES
}

/// Script text of a sample, ready for the script input.
pub fn sample_script(kind: SampleKind) -> String {
    match kind {
        SampleKind::Sequence => "A happens then B happens".to_string(),
        SampleKind::LoginCheck => [
            "fn login(user, password)",
            "Read credentials",
            "Look up the account",
            "Is the password correct?",
            "Create a session then redirect to the dashboard",
        ]
        .join("\n"),
        SampleKind::OrderDocument => order_document(),
    }
}

fn order_document() -> String {
    let doc = json!({
        "flowchart": {
            "nodes": [
                { "id": "start", "label": "Order received", "type": "start" },
                {
                    "id": "stock",
                    "label": "In stock?",
                    "type": "decision",
                    "description": "Checks the warehouse inventory for every line item"
                },
                {
                    "id": "charge",
                    "label": "Charge the customer's card",
                    "type": "process",
                    "description": "Captures the payment authorised at checkout"
                },
                { "id": "backorder", "label": "Place a back order", "type": "process" },
                { "id": "ship", "label": "Ship", "type": "process" },
                { "id": "end", "label": "Done", "type": "end" }
            ],
            "edges": [
                { "source": "start", "target": "stock" },
                { "source": "stock", "target": "charge", "label": "yes" },
                { "source": "stock", "target": "backorder", "label": "no" },
                { "source": "backorder", "target": "stock", "label": "restocked" },
                { "source": "charge", "target": "ship" },
                { "source": "ship", "target": "end" }
            ]
        },
        "functions": ["handle_order"]
    });
    serde_json::to_string_pretty(&doc).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::OutlineProvider;
    use crate::types::GraphDocument;

    #[test]
    fn json_sample_is_a_valid_document() {
        let doc = GraphDocument::from_json(&sample_script(SampleKind::OrderDocument)).unwrap();
        assert_eq!(doc.flowchart.nodes.len(), 6);
        assert!(doc.flowchart.validate().is_ok());
    }

    #[test]
    fn text_samples_produce_flows() {
        let provider = OutlineProvider::default();
        for info in all_samples().iter().filter(|s| s.kind != SampleKind::OrderDocument) {
            let doc = provider.outline(&sample_script(info.kind)).unwrap();
            assert!(doc.flowchart.nodes.len() >= 4, "{}", info.name);
        }
        let login = provider.outline(&sample_script(SampleKind::LoginCheck)).unwrap();
        assert_eq!(login.functions, vec!["login"]);
    }
}
