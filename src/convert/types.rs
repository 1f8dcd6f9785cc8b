//! Response shapes of the conversion service.

use serde::{Deserialize, Deserializer};

/// Body of `/api/convert` and `/api/generate-labels-from-file`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ConvertResponse {
    /// `"success"` or `"error"`; anything else counts as failure.
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Output location, usually relative (`/api/download/<file>`).
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub stats: Option<ConversionStats>,
    /// Converter log lines, shown verbatim in the session log.
    #[serde(default)]
    pub logs: Option<Vec<String>>,
}

impl ConvertResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Message text, or `None` when missing or blank.
    pub fn message_text(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}

/// Per-file statistics. Every field is optional on the wire; a field that is
/// present but not a JSON number decodes as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ConversionStats {
    #[serde(default, deserialize_with = "lenient_count")]
    pub items_processed: Option<i64>,
    #[serde(default)]
    pub generated_file: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub sku_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub pt_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub store_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub box_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_qty: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub jan_map_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub jan_match_success: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub jan_match_fail: Option<i64>,
}

/// One entry of the server-side template library.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TemplateInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified: String,
}

/// Body of `GET /api/templates`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TemplateListResp {
    #[serde(default)]
    pub templates: Vec<TemplateInfo>,
}

/// Accept integers and finite floats; everything else (strings, null, bools) is absent.
fn lenient_count<'de, D>(d: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match v {
        Some(serde_json::Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        _ => None,
    })
}
