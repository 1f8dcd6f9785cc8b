//! Background worker that owns the session and talks to the conversion service.

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    config::Config,
    convert::{ConversionClient, HttpConversionClient, Mode, resolve_download_url},
    error::SessionError,
    processor::{self, BatchObserver},
    session::Session,
};

/// Commands sent from the UI to the worker.
#[derive(Debug)]
pub enum WorkerCmd {
    /// Apply updated settings and rebuild the HTTP client.
    SaveSettings(Config),
    /// Switch mode (full reset of queue and inputs).
    SetMode(Mode),
    /// Queue files; directories expand to the workbooks inside.
    AddFiles(Vec<PathBuf>),
    /// Remove a pending job.
    RemoveJob(Uuid),
    /// Drop every job.
    ClearQueue,
    SetDetailFile(Option<PathBuf>),
    SetTemplateFile(Option<PathBuf>),
    SetTemplateName(Option<String>),
    SetWeekNum(String),
    /// Process every job that has not succeeded yet.
    RunBatch,
    /// Re-run one failed job.
    RetryJob(Uuid),
    /// Reload the server template library.
    RefreshTemplates,
}

/// Events emitted by the worker for UI updates.
#[derive(Clone, Debug)]
pub enum WorkerEvent {
    /// Fresh copy of the session after any change.
    Session(Box<Session>),
    /// Template library names.
    Templates(Vec<String>),
    /// Absolute URL of an output to open.
    OpenDownload(String),
    /// User-visible error message.
    Error(String),
}

/// Forwards processor progress to the UI channel.
struct ChannelObserver<'a> {
    tx: &'a mpsc::Sender<WorkerEvent>,
    base_url: &'a str,
}

#[async_trait]
impl BatchObserver for ChannelObserver<'_> {
    async fn changed(&mut self, session: &Session) {
        let _ = self
            .tx
            .send(WorkerEvent::Session(Box::new(session.clone())))
            .await;
    }

    async fn open_download(&mut self, url: &str) {
        let url = resolve_download_url(self.base_url, url);
        let _ = self.tx.send(WorkerEvent::OpenDownload(url)).await;
    }
}

/// Main worker loop: handle commands sequentially.
///
/// A running batch occupies the loop, so commands sent meanwhile wait until it
/// settles; the UI refuses mutating commands while its snapshot is busy.
pub async fn run(mut rx: mpsc::Receiver<WorkerCmd>, tx: mpsc::Sender<WorkerEvent>, mut cfg: Config) {
    tracing::info!("worker started");

    // An unusable client config is terminal, like a failed auth setup.
    let mut client = match HttpConversionClient::new(&cfg.server.base_url, cfg.timeout()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("http client init failed: {e}");
            let _ = tx
                .send(WorkerEvent::Error(format!("HTTP client init failed: {e}")))
                .await;
            return;
        }
    };
    let mut session = Session::new(cfg.convert.default_mode);

    while let Some(cmd) = rx.recv().await {
        tracing::debug!("worker command: {cmd:?}");
        let res = match cmd {
            WorkerCmd::SaveSettings(new_cfg) => {
                match HttpConversionClient::new(&new_cfg.server.base_url, new_cfg.timeout()) {
                    Ok(c) => {
                        tracing::info!("settings updated: {}", new_cfg.server.base_url);
                        client = c;
                        cfg = new_cfg;
                        refresh_templates(&client, &tx).await;
                    }
                    Err(e) => {
                        tracing::error!("settings rejected: {e}");
                        let _ = tx
                            .send(WorkerEvent::Error(format!("invalid settings: {e}")))
                            .await;
                    }
                }
                Ok(())
            }
            WorkerCmd::SetMode(mode) => session.set_mode(mode),
            WorkerCmd::AddFiles(paths) => match collect_sources(&paths) {
                Ok(files) if files.is_empty() => {
                    let _ = tx
                        .send(WorkerEvent::Error("no .xls/.xlsx files found".into()))
                        .await;
                    Ok(())
                }
                Ok(files) => session.add_files(files).map(|_| ()),
                Err(e) => {
                    tracing::warn!("add files failed: {e}");
                    let _ = tx.send(WorkerEvent::Error(e.to_string())).await;
                    Ok(())
                }
            },
            WorkerCmd::RemoveJob(id) => session.remove_job(id).map(|_| ()),
            WorkerCmd::ClearQueue => session.clear_queue(),
            WorkerCmd::SetDetailFile(p) => session.set_detail_file(p),
            WorkerCmd::SetTemplateFile(p) => session.set_template_file(p),
            WorkerCmd::SetTemplateName(n) => session.set_template_name(n),
            WorkerCmd::SetWeekNum(w) => session.set_week_num(w),
            WorkerCmd::RunBatch => {
                let mut obs = ChannelObserver {
                    tx: &tx,
                    base_url: &cfg.server.base_url,
                };
                processor::run_batch(&mut session, &client, &mut obs).await;
                Ok(())
            }
            WorkerCmd::RetryJob(id) => {
                let mut obs = ChannelObserver {
                    tx: &tx,
                    base_url: &cfg.server.base_url,
                };
                processor::run_one(&mut session, &client, &mut obs, id)
                    .await
                    .map(|_| ())
            }
            WorkerCmd::RefreshTemplates => {
                refresh_templates(&client, &tx).await;
                Ok(())
            }
        };

        if let Err(e) = res {
            report_rejection(&tx, e).await;
        }
        let _ = tx
            .send(WorkerEvent::Session(Box::new(session.clone())))
            .await;
    }
    tracing::info!("worker stopped");
}

async fn report_rejection(tx: &mpsc::Sender<WorkerEvent>, e: SessionError) {
    tracing::warn!("command rejected: {e}");
    let _ = tx.send(WorkerEvent::Error(e.to_string())).await;
}

/// Fetch the template library; failures only produce a message.
async fn refresh_templates<C: ConversionClient + ?Sized>(client: &C, tx: &mpsc::Sender<WorkerEvent>) {
    match client.list_templates().await {
        Ok(list) => {
            tracing::info!("template library: {} entries", list.len());
            for t in &list {
                tracing::debug!("template {} ({} bytes, {})", t.name, t.size, t.modified);
            }
            let names = list.into_iter().map(|t| t.name).collect();
            let _ = tx.send(WorkerEvent::Templates(names)).await;
        }
        Err(e) => {
            tracing::warn!("template list failed: {e}");
            let _ = tx
                .send(WorkerEvent::Error(format!("template list failed: {e}")))
                .await;
        }
    }
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xls") || e.eq_ignore_ascii_case("xlsx"))
}

/// Expand user-entered paths: files are kept as given, directories contribute
/// their `.xls`/`.xlsx` files sorted by name. Missing paths are an error.
pub fn collect_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = vec![];
    for p in paths {
        if p.is_dir() {
            let mut found = std::fs::read_dir(p)?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|f| f.is_file() && is_workbook(f))
                .collect::<Vec<_>>();
            found.sort();
            out.extend(found);
        } else if p.is_file() {
            out.push(p.clone());
        } else {
            anyhow::bail!("file not found: {}", p.display());
        }
    }
    Ok(out)
}

/// Split an input-box line into paths (`;` separated, surrounding quotes removed).
pub fn parse_path_list(input: &str) -> Vec<PathBuf> {
    input
        .split(';')
        .map(|s| s.trim().trim_matches('"').trim_matches('\''))
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{TemplateInfo, client::MockConversionClient};
    use crate::error::ConvertError;

    #[test]
    fn parse_path_list_splits_and_unquotes() {
        let paths = parse_path_list(r#" a.xlsx ; "dir with space/b.xls";; 'c.xlsx' "#);
        assert_eq!(
            paths,
            [
                PathBuf::from("a.xlsx"),
                PathBuf::from("dir with space/b.xls"),
                PathBuf::from("c.xlsx")
            ]
        );
        assert!(parse_path_list("  ").is_empty());
    }

    #[test]
    fn directories_expand_to_sorted_workbooks() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xlsx", "a.XLS", "notes.txt", "c.xlsx"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.xlsx")).unwrap();
        let single = dir.path().join("notes.txt");

        let files = collect_sources(&[dir.path().to_path_buf(), single.clone()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.XLS", "b.xlsx", "c.xlsx", "notes.txt"]);
    }

    #[test]
    fn missing_path_is_an_error() {
        let err = collect_sources(&[PathBuf::from("/no/such/file.xlsx")]).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }

    #[tokio::test]
    async fn refresh_templates_sends_names() {
        let mut client = MockConversionClient::new();
        client.expect_list_templates().returning(|| {
            Ok(vec![TemplateInfo {
                name: "标准模板.xlsx".into(),
                ..Default::default()
            }])
        });
        let (tx, mut rx) = mpsc::channel(4);
        refresh_templates(&client, &tx).await;
        match rx.recv().await {
            Some(WorkerEvent::Templates(names)) => assert_eq!(names, ["标准模板.xlsx"]),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_templates_reports_failure() {
        let mut client = MockConversionClient::new();
        client
            .expect_list_templates()
            .returning(|| Err(ConvertError::TransportFailure("connection refused".into())));
        let (tx, mut rx) = mpsc::channel(4);
        refresh_templates(&client, &tx).await;
        assert!(matches!(rx.recv().await, Some(WorkerEvent::Error(m)) if m.contains("connection refused")));
    }

    #[tokio::test]
    async fn observer_resolves_relative_download_urls() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut obs = ChannelObserver {
            tx: &tx,
            base_url: "http://srv:8000",
        };
        obs.open_download("/api/download/x.xlsx").await;
        match rx.recv().await {
            Some(WorkerEvent::OpenDownload(url)) => {
                assert_eq!(url, "http://srv:8000/api/download/x.xlsx")
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
