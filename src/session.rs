//! Operator session: current mode, its shared inputs, the job queue and the log.

use std::path::PathBuf;
use uuid::Uuid;

use crate::{
    convert::{Field, Mode, ModePolicy, SharedInputs},
    error::SessionError,
    jobs::{Job, JobQueue},
    log::LogBook,
    stats::SummaryStats,
};

/// Everything the orchestrator works on. Cloned as a snapshot for the UI.
///
/// Every mutating entry point except the processor's transitions refuses to
/// run while the queue is busy.
#[derive(Clone, Debug, Default)]
pub struct Session {
    mode: Mode,
    inputs: SharedInputs,
    queue: JobQueue,
    log: LogBook,
}

impl Session {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn inputs(&self) -> &SharedInputs {
        &self.inputs
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn log(&self) -> &LogBook {
        &self.log
    }

    pub fn is_busy(&self) -> bool {
        self.queue.is_busy()
    }

    pub fn summary(&self) -> SummaryStats {
        self.queue.summary()
    }

    pub(crate) fn queue_mut(&mut self) -> &mut JobQueue {
        &mut self.queue
    }

    pub(crate) fn log_mut(&mut self) -> &mut LogBook {
        &mut self.log
    }

    fn guard(&self) -> Result<(), SessionError> {
        if self.is_busy() {
            Err(SessionError::Busy)
        } else {
            Ok(())
        }
    }

    /// Switch mode. Discards the queue and every shared input; the log is kept.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), SessionError> {
        self.guard()?;
        self.queue = JobQueue::default();
        self.inputs = SharedInputs::default();
        self.mode = mode;
        self.log.push(format!("切换到 {} 模式", mode));
        Ok(())
    }

    /// Queue one pending job per file, in the given order.
    pub fn add_files(&mut self, files: Vec<PathBuf>) -> Result<usize, SessionError> {
        let n = self.queue.push_files(files)?;
        self.log.push(format!("添加了 {} 个文件", n));
        Ok(n)
    }

    /// Remove a pending job.
    pub fn remove_job(&mut self, id: Uuid) -> Result<Job, SessionError> {
        let job = self.queue.remove(id)?;
        self.log.push(format!("[{}] 已移除", job.filename));
        Ok(job)
    }

    pub fn clear_queue(&mut self) -> Result<(), SessionError> {
        self.queue.clear()
    }

    /// Set or clear the 明细表.
    pub fn set_detail_file(&mut self, path: Option<PathBuf>) -> Result<(), SessionError> {
        self.guard()?;
        self.inputs.detail_file = path.filter(|p| !p.as_os_str().is_empty());
        Ok(())
    }

    /// Choose an uploaded template; clears any library selection.
    pub fn set_template_file(&mut self, path: Option<PathBuf>) -> Result<(), SessionError> {
        self.guard()?;
        self.inputs.template_file = path.filter(|p| !p.as_os_str().is_empty());
        if self.inputs.template_file.is_some() {
            self.inputs.template_name = None;
        }
        Ok(())
    }

    /// Choose a library template; clears any uploaded template.
    pub fn set_template_name(&mut self, name: Option<String>) -> Result<(), SessionError> {
        self.guard()?;
        self.inputs.template_name = name.filter(|n| !n.is_empty());
        if self.inputs.template_name.is_some() {
            self.inputs.template_file = None;
        }
        Ok(())
    }

    pub fn set_week_num(&mut self, week: String) -> Result<(), SessionError> {
        self.guard()?;
        self.inputs.week_num = week;
        Ok(())
    }

    /// Whether the current mode uses `field` at all (drives which inputs the UI offers).
    pub fn uses(&self, field: impl Fn(&ModePolicy) -> Field) -> bool {
        field(self.mode.policy()) != Field::Ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> Session {
        let mut s = Session::new(Mode::Allocation);
        s.add_files(vec!["a.xlsx".into(), "b.xlsx".into()]).unwrap();
        s.set_detail_file(Some("detail.xlsx".into())).unwrap();
        s.set_template_file(Some("tpl.xlsx".into())).unwrap();
        s.set_week_num("42".into()).unwrap();
        s
    }

    #[test]
    fn mode_switch_resets_queue_and_inputs() {
        for mode in Mode::ALL {
            let mut s = filled();
            s.set_mode(mode).unwrap();
            assert_eq!(s.mode(), mode);
            assert!(s.queue().is_empty());
            assert_eq!(s.inputs(), &SharedInputs::default());
        }
    }

    #[test]
    fn add_calls_accumulate_in_order() {
        let mut s = Session::new(Mode::DeliveryNote);
        s.add_files(vec!["1.xlsx".into(), "2.xlsx".into()]).unwrap();
        s.add_files(vec![]).unwrap();
        s.add_files(vec!["3.xlsx".into()]).unwrap();
        let names: Vec<_> = s.queue().iter().map(|j| j.filename.clone()).collect();
        assert_eq!(names, ["1.xlsx", "2.xlsx", "3.xlsx"]);
    }

    #[test]
    fn template_choices_are_mutually_exclusive() {
        let mut s = filled();
        s.set_template_name(Some("lib.xlsx".into())).unwrap();
        assert_eq!(s.inputs().template_file, None);
        s.set_template_file(Some("mine.xlsx".into())).unwrap();
        assert_eq!(s.inputs().template_name, None);
        s.set_template_name(None).unwrap();
        assert_eq!(
            s.inputs().template_file.as_deref(),
            Some(std::path::Path::new("mine.xlsx"))
        );
    }

    #[test]
    fn every_mutation_is_guarded_while_busy() {
        let mut s = filled();
        let a = s.queue().iter().next().unwrap().id;
        let b = s.queue().iter().nth(1).unwrap().id;
        s.queue_mut().start(a).unwrap();

        assert_eq!(s.set_mode(Mode::BoxLabel), Err(SessionError::Busy));
        assert_eq!(s.add_files(vec!["c.xlsx".into()]), Err(SessionError::Busy));
        assert_eq!(s.remove_job(b).unwrap_err(), SessionError::Busy);
        assert_eq!(s.clear_queue(), Err(SessionError::Busy));
        assert_eq!(s.set_detail_file(None), Err(SessionError::Busy));
        assert_eq!(s.set_template_name(None), Err(SessionError::Busy));
        assert_eq!(s.set_template_file(None), Err(SessionError::Busy));
        assert_eq!(s.set_week_num(String::new()), Err(SessionError::Busy));
        assert_eq!(s.mode(), Mode::Allocation);
        assert_eq!(s.queue().len(), 2);
    }

    #[test]
    fn week_number_reaches_the_request_verbatim() {
        let mut s = Session::new(Mode::Assortment);
        s.set_week_num(" 42W ".into()).unwrap();
        assert_eq!(s.inputs().week_num, " 42W ");
        let req = crate::convert::request::build(
            Mode::Assortment,
            std::path::Path::new("a.xlsx"),
            s.inputs(),
        )
        .unwrap();
        let crate::convert::request::ConvertRequest::Convert { week_num, .. } = req else {
            panic!("assortment should build a convert request");
        };
        assert_eq!(week_num.as_deref(), Some(" 42W "));
    }

    #[test]
    fn field_usage_follows_mode_policy() {
        let s = Session::new(Mode::Assortment);
        assert!(s.uses(|p| p.week_num));
        assert!(!s.uses(|p| p.detail_file));
        let s = Session::new(Mode::BoxLabel);
        assert!(!s.uses(|p| p.template));
    }
}
