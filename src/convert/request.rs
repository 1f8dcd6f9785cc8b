//! Per-mode field relevance and request construction.
//!
//! Which shared inputs a request carries is decided by the mode's
//! [`ModePolicy`] row alone, never by which inputs happen to be set. Stale
//! values left over in [`SharedInputs`] therefore cannot leak into a request
//! for a mode that does not use them.

use std::path::{Path, PathBuf};

use super::Mode;
use crate::error::ConvertError;

/// Remote operation a mode is served by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// `POST /api/convert`.
    Convert,
    /// `POST /api/generate-labels-from-file`; accepts the source file only.
    BoxLabels,
}

/// How a mode treats one shared input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Required,
    Optional,
    Ignored,
}

/// Field schema and behaviour flags of one mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModePolicy {
    pub operation: Operation,
    /// Applies to both the library template name and the uploaded template file.
    pub template: Field,
    pub detail_file: Field,
    pub week_num: Field,
    /// Whether a returned `download_url` is opened automatically.
    pub auto_open: bool,
}

const ALLOCATION: ModePolicy = ModePolicy {
    operation: Operation::Convert,
    template: Field::Optional,
    detail_file: Field::Required,
    week_num: Field::Ignored,
    auto_open: true,
};

const DELIVERY_NOTE: ModePolicy = ModePolicy {
    operation: Operation::Convert,
    template: Field::Optional,
    detail_file: Field::Ignored,
    week_num: Field::Ignored,
    auto_open: true,
};

const ASSORTMENT: ModePolicy = ModePolicy {
    operation: Operation::Convert,
    template: Field::Optional,
    detail_file: Field::Ignored,
    week_num: Field::Optional,
    auto_open: true,
};

const BOX_LABEL: ModePolicy = ModePolicy {
    operation: Operation::BoxLabels,
    template: Field::Ignored,
    detail_file: Field::Ignored,
    week_num: Field::Ignored,
    auto_open: false,
};

impl Mode {
    /// Policy row for this mode.
    pub fn policy(self) -> &'static ModePolicy {
        match self {
            Mode::Allocation => &ALLOCATION,
            Mode::DeliveryNote => &DELIVERY_NOTE,
            Mode::Assortment => &ASSORTMENT,
            Mode::BoxLabel => &BOX_LABEL,
        }
    }
}

/// Mode-scoped inputs shared by every job of the current batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SharedInputs {
    /// Template chosen from the server library.
    pub template_name: Option<String>,
    /// Template uploaded from a local file.
    pub template_file: Option<PathBuf>,
    /// 明细表; required for allocation.
    pub detail_file: Option<PathBuf>,
    /// Week number for assortment, passed through unvalidated.
    pub week_num: String,
}

impl SharedInputs {
    /// Name of the first required input `mode` needs but does not have.
    pub fn missing_required(&self, mode: Mode) -> Option<&'static str> {
        let policy = mode.policy();
        if policy.detail_file == Field::Required && self.detail().is_none() {
            return Some("detail_file");
        }
        if policy.week_num == Field::Required && self.week().is_none() {
            return Some("week_num");
        }
        if policy.template == Field::Required
            && self.template_name().is_none()
            && self.template_file().is_none()
        {
            return Some("template");
        }
        None
    }

    fn detail(&self) -> Option<&Path> {
        self.detail_file
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    fn week(&self) -> Option<&str> {
        Some(self.week_num.as_str()).filter(|w| !w.is_empty())
    }

    fn template_name(&self) -> Option<&str> {
        self.template_name.as_deref().filter(|n| !n.is_empty())
    }

    fn template_file(&self) -> Option<&Path> {
        self.template_file
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

/// Outbound payload for one job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConvertRequest {
    Convert {
        source: PathBuf,
        mode: Mode,
        template_name: Option<String>,
        template_file: Option<PathBuf>,
        detail_file: Option<PathBuf>,
        week_num: Option<String>,
    },
    BoxLabels {
        source: PathBuf,
    },
}

impl ConvertRequest {
    pub fn source(&self) -> &Path {
        match self {
            ConvertRequest::Convert { source, .. } | ConvertRequest::BoxLabels { source } => source,
        }
    }
}

/// Apply one field rule: required values must exist, ignored values are dropped.
fn pick<T: ?Sized + ToOwned>(
    field: Field,
    value: Option<&T>,
    mode: Mode,
    input: &'static str,
) -> Result<Option<T::Owned>, ConvertError> {
    match field {
        Field::Ignored => Ok(None),
        Field::Optional => Ok(value.map(T::to_owned)),
        Field::Required => value
            .map(|v| Some(v.to_owned()))
            .ok_or(ConvertError::MissingRequiredInput { mode, input }),
    }
}

/// Build the request for `source` under `mode`.
///
/// When both a library template name and an uploaded template file are set,
/// the library name wins and the file is not sent.
pub fn build(mode: Mode, source: &Path, inputs: &SharedInputs) -> Result<ConvertRequest, ConvertError> {
    let policy = mode.policy();
    if policy.operation == Operation::BoxLabels {
        return Ok(ConvertRequest::BoxLabels {
            source: source.to_path_buf(),
        });
    }

    let detail_file = pick(policy.detail_file, inputs.detail(), mode, "detail_file")?;
    let week_num = pick(policy.week_num, inputs.week(), mode, "week_num")?;
    let template_name = pick(Field::Optional, inputs.template_name(), mode, "template")?
        .filter(|_| policy.template != Field::Ignored);
    let template_file = if template_name.is_some() {
        None
    } else {
        pick(policy.template, inputs.template_file(), mode, "template")?
    };

    Ok(ConvertRequest::Convert {
        source: source.to_path_buf(),
        mode,
        template_name,
        template_file,
        detail_file,
        week_num,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stale_inputs() -> SharedInputs {
        SharedInputs {
            template_name: None,
            template_file: Some(PathBuf::from("tpl.xlsx")),
            detail_file: Some(PathBuf::from("detail.xlsx")),
            week_num: "42W".into(),
        }
    }

    #[test]
    fn allocation_requires_detail_file() {
        let err = build(Mode::Allocation, Path::new("a.xlsx"), &SharedInputs::default()).unwrap_err();
        assert_eq!(
            err,
            ConvertError::MissingRequiredInput {
                mode: Mode::Allocation,
                input: "detail_file"
            }
        );
    }

    #[test]
    fn allocation_treats_empty_detail_path_as_missing() {
        let inputs = SharedInputs {
            detail_file: Some(PathBuf::new()),
            ..Default::default()
        };
        assert!(build(Mode::Allocation, Path::new("a.xlsx"), &inputs).is_err());
        assert_eq!(inputs.missing_required(Mode::Allocation), Some("detail_file"));
    }

    #[test]
    fn allocation_forwards_detail_and_template_but_not_week() {
        let req = build(Mode::Allocation, Path::new("a.xlsx"), &stale_inputs()).unwrap();
        assert_eq!(
            req,
            ConvertRequest::Convert {
                source: PathBuf::from("a.xlsx"),
                mode: Mode::Allocation,
                template_name: None,
                template_file: Some(PathBuf::from("tpl.xlsx")),
                detail_file: Some(PathBuf::from("detail.xlsx")),
                week_num: None,
            }
        );
    }

    #[test]
    fn library_template_takes_precedence_over_upload() {
        let inputs = SharedInputs {
            template_name: Some("标准模板.xlsx".into()),
            ..stale_inputs()
        };
        let ConvertRequest::Convert {
            template_name,
            template_file,
            ..
        } = build(Mode::DeliveryNote, Path::new("d.xlsx"), &inputs).unwrap()
        else {
            panic!("expected convert request");
        };
        assert_eq!(template_name.as_deref(), Some("标准模板.xlsx"));
        assert_eq!(template_file, None);
    }

    #[test]
    fn delivery_note_never_sends_stale_detail_or_week() {
        let ConvertRequest::Convert {
            detail_file,
            week_num,
            template_file,
            ..
        } = build(Mode::DeliveryNote, Path::new("d.xlsx"), &stale_inputs()).unwrap()
        else {
            panic!("expected convert request");
        };
        assert_eq!(detail_file, None);
        assert_eq!(week_num, None);
        assert_eq!(template_file, Some(PathBuf::from("tpl.xlsx")));
    }

    #[test]
    fn assortment_passes_week_verbatim_or_omits_it() {
        let ConvertRequest::Convert { week_num, detail_file, .. } =
            build(Mode::Assortment, Path::new("s.xlsx"), &stale_inputs()).unwrap()
        else {
            panic!("expected convert request");
        };
        assert_eq!(week_num.as_deref(), Some("42W"));
        assert_eq!(detail_file, None);

        let ConvertRequest::Convert { week_num, .. } =
            build(Mode::Assortment, Path::new("s.xlsx"), &SharedInputs::default()).unwrap()
        else {
            panic!("expected convert request");
        };
        assert_eq!(week_num, None);
    }

    #[test]
    fn box_label_sends_source_only() {
        let inputs = SharedInputs {
            template_name: Some("x".into()),
            ..stale_inputs()
        };
        let req = build(Mode::BoxLabel, Path::new("b.xlsx"), &inputs).unwrap();
        assert_eq!(
            req,
            ConvertRequest::BoxLabels {
                source: PathBuf::from("b.xlsx")
            }
        );
        assert!(!Mode::BoxLabel.policy().auto_open);
    }

    #[test]
    fn only_box_label_suppresses_auto_open() {
        for mode in Mode::ALL {
            assert_eq!(mode.policy().auto_open, mode != Mode::BoxLabel);
        }
    }
}
