//! ジョブ（1ファイル = 1変換）とキューのモデル。

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::{
    convert::{ConversionStats, ConvertResponse},
    error::SessionError,
    stats::{self, SummaryStats},
};

/// ジョブの状態。結果/エラーは対応する状態にだけ存在する。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobState {
    /// 処理待ち。
    Pending,
    /// 変換リクエスト送信中。
    Running,
    /// 正常完了（レスポンス全体を保持）。
    Succeeded(ConvertResponse),
    /// 失敗（正規化済みメッセージ）。
    Failed(String),
}

impl JobState {
    /// 一覧表示用の短いラベル。
    pub fn label(&self) -> &'static str {
        match self {
            JobState::Pending => "等待",
            JobState::Running => "处理中",
            JobState::Succeeded(_) => "成功",
            JobState::Failed(_) => "失败",
        }
    }
}

/// 選択されたファイル1件とその処理状態。
#[derive(Clone, Debug)]
pub struct Job {
    /// 状態更新に使う安定ID。
    pub id: Uuid,
    /// 変換元ファイル。
    pub source: PathBuf,
    /// 表示用のファイル名。
    pub filename: String,
    /// 現在の状態。
    pub state: JobState,
    /// 最後に成功した順序（集計の並び順に使う）。
    pub completed_seq: u64,
}

impl Job {
    /// 待機状態でジョブを作成する。
    pub fn new(source: PathBuf) -> Self {
        // 表示名はパスのファイル名部分から作る。
        let filename = display_name(&source);
        Self {
            id: Uuid::new_v4(),
            source,
            filename,
            state: JobState::Pending,
            completed_seq: 0,
        }
    }

    pub fn result(&self) -> Option<&ConvertResponse> {
        match &self.state {
            JobState::Succeeded(r) => Some(r),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn stats(&self) -> Option<&ConversionStats> {
        self.result().and_then(|r| r.stats.as_ref())
    }
}

fn display_name(path: &Path) -> String {
    // ファイル名が取れないパス（"/" 等）は全体をそのまま表示する。
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// 挿入順を保つジョブキュー。
///
/// バッチ実行中（`lock` 中、または `Running` のジョブがある間）は、
/// 追加・削除・クリアを `SessionError::Busy` で拒否する。
#[derive(Clone, Debug, Default)]
pub struct JobQueue {
    jobs: Vec<Job>,
    locked: bool,
    seq: u64,
}

impl JobQueue {
    /// バッチがキューを保持しているか。
    pub fn is_busy(&self) -> bool {
        self.locked || self.running_count() > 0
    }

    fn guard(&self) -> Result<(), SessionError> {
        if self.is_busy() {
            Err(SessionError::Busy)
        } else {
            Ok(())
        }
    }

    /// ファイルごとにジョブを末尾へ追加し、追加件数を返す。
    pub fn push_files(&mut self, files: Vec<PathBuf>) -> Result<usize, SessionError> {
        self.guard()?;
        let n = files.len();
        self.jobs.extend(files.into_iter().map(Job::new));
        Ok(n)
    }

    /// 待機中のジョブを1件削除する。
    pub fn remove(&mut self, id: Uuid) -> Result<Job, SessionError> {
        self.guard()?;
        let idx = self.position(id)?;
        // 実行済み・失敗済みのジョブは履歴として残す。
        if self.jobs[idx].state != JobState::Pending {
            return Err(SessionError::NotPending);
        }
        Ok(self.jobs.remove(idx))
    }

    /// 全ジョブを破棄する。
    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.guard()?;
        self.jobs.clear();
        Ok(())
    }

    /// バッチ開始時にキューを保持する。
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// バッチ終了時に保持を解除する。
    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// `Pending`/`Failed` → `Running`。再実行でも同じエントリを書き換える。
    pub fn start(&mut self, id: Uuid) -> Result<(), SessionError> {
        let idx = self.position(id)?;
        let job = &mut self.jobs[idx];
        match job.state {
            JobState::Pending | JobState::Failed(_) => {
                job.state = JobState::Running;
                Ok(())
            }
            _ => Err(SessionError::NotRetryable),
        }
    }

    /// `Running` → `Succeeded`。完了順を採番する。
    pub fn succeed(&mut self, id: Uuid, response: ConvertResponse) -> Result<(), SessionError> {
        let idx = self.running_position(id)?;
        // 採番は成功時のみ。再実行で成功した場合も新しい番号になる。
        self.seq += 1;
        let job = &mut self.jobs[idx];
        job.state = JobState::Succeeded(response);
        job.completed_seq = self.seq;
        Ok(())
    }

    /// `Running` → `Failed`。
    pub fn fail(&mut self, id: Uuid, message: String) -> Result<(), SessionError> {
        let idx = self.running_position(id)?;
        self.jobs[idx].state = JobState::Failed(message);
        Ok(())
    }

    fn position(&self, id: Uuid) -> Result<usize, SessionError> {
        self.jobs
            .iter()
            .position(|j| j.id == id)
            .ok_or(SessionError::UnknownJob)
    }

    fn running_position(&self, id: Uuid) -> Result<usize, SessionError> {
        let idx = self.position(id)?;
        if self.jobs[idx].state == JobState::Running {
            Ok(idx)
        } else {
            Err(SessionError::NotRetryable)
        }
    }

    /// 成功済み以外のジョブID（キュー順）。
    pub fn runnable_ids(&self) -> Vec<Uuid> {
        self.jobs
            .iter()
            .filter(|j| !matches!(j.state, JobState::Succeeded(_)))
            .map(|j| j.id)
            .collect()
    }

    /// 成功ジョブの統計を成功順に集計する。
    pub fn summary(&self) -> SummaryStats {
        let mut done: Vec<&Job> = self
            .jobs
            .iter()
            .filter(|j| j.stats().is_some())
            .collect();
        // 最後の値を採る項目があるため、キュー順ではなく成功順に並べる。
        done.sort_by_key(|j| j.completed_seq);
        stats::summarize(done.into_iter().filter_map(Job::stats))
    }

    pub fn get(&self, id: Uuid) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn succeeded_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| matches!(j.state, JobState::Succeeded(_)))
            .count()
    }

    pub fn running_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.state == JobState::Running)
            .count()
    }
}
