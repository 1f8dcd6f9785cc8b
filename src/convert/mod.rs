//! Conversion modes and the HTTP boundary to the conversion service.

/// HTTP client and the `ConversionClient` seam.
pub mod client;
/// Per-mode request policy and payload construction.
pub mod request;
/// Wire types returned by the service.
pub mod types;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use client::{ConversionClient, HttpConversionClient, resolve_download_url};
pub use request::{ConvertRequest, Field, ModePolicy, Operation, SharedInputs};
pub use types::{ConversionStats, ConvertResponse, TemplateInfo};

/// Conversion task selected by the operator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// 配分表 + 明细表 → 箱设定明细.
    #[default]
    Allocation,
    /// 分箱明细 → 受渡伝票.
    DeliveryNote,
    /// 分箱明细 → アソート明細.
    Assortment,
    /// 箱设定明细 → 箱贴.
    BoxLabel,
}

impl Mode {
    /// Tab order in the UI.
    pub const ALL: [Mode; 4] = [
        Mode::Allocation,
        Mode::DeliveryNote,
        Mode::Assortment,
        Mode::BoxLabel,
    ];

    /// Value sent in the multipart `mode` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Allocation => "allocation",
            Mode::DeliveryNote => "delivery_note",
            Mode::Assortment => "assortment",
            Mode::BoxLabel => "box_label",
        }
    }

    /// Tab label shown to the operator.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Allocation => "箱设定明细",
            Mode::DeliveryNote => "受渡伝票",
            Mode::Assortment => "アソート明細",
            Mode::BoxLabel => "箱贴作成",
        }
    }

    /// Next mode in tab order, wrapping around.
    pub fn next(self) -> Mode {
        let idx = Mode::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Mode::ALL[(idx + 1) % Mode::ALL.len()]
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
