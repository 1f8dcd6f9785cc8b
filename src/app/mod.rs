//! TUIのイベントループ、入力処理、状態管理。

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event};
use std::{path::PathBuf, time::Duration};
use tokio::sync::mpsc;

use crate::{
    config::Config,
    events::UiState,
    input::InputBoxState,
    jobs::Job,
    session::Session,
    shortcuts::Shortcuts,
    ui::Tui,
    worker::{self, WorkerCmd, WorkerEvent},
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// 入力処理と描画で共有するアプリ状態。
pub struct App {
    /// 永続化された設定ファイルのパス。
    pub cfg_path: PathBuf,
    /// メモリ上の現在設定。
    pub cfg: Config,
    /// 選択位置やステータスなどUI固有の状態。
    pub ui: UiState,
    /// Workerが最後に送ってきたセッションの写し。
    pub session: Session,
    /// サーバー側テンプレート名の一覧。
    pub templates: Vec<String>,
    /// Workerへのコマンド送信チャネル。
    pub worker_tx: mpsc::Sender<WorkerCmd>,
    /// Workerからのイベント受信チャネル。
    pub worker_rx: mpsc::Receiver<WorkerEvent>,

    /// 設定画面で編集するサーバーURL。
    pub server_url: String,
    /// 設定画面で編集する自動オープン設定。
    pub open_downloads: bool,

    /// 入力ボックスの状態（入力中はSome）。
    pub input_box: Option<InputBoxState>,
    /// ショートカットキー設定。
    pub shortcuts: Shortcuts,
}

impl App {
    /// 一覧で選択中のジョブ。
    pub fn selected_job(&self) -> Option<&Job> {
        self.session.queue().iter().nth(self.ui.selected)
    }
}

/// ユーザーが終了するまでメインTUIループを回す。
pub async fn run_app(terminal: &mut Tui, cfg_path: PathBuf, cfg: Config) -> Result<()> {
    let shortcuts = Shortcuts::load_or_default("shortcut.toml")?;

    // Worker通信用のコマンド/イベントチャネルを作る。
    let (tx_cmd, rx_cmd) = mpsc::channel::<WorkerCmd>(64);
    let (tx_ev, rx_ev) = mpsc::channel::<WorkerEvent>(256);
    tokio::spawn(worker::run(rx_cmd, tx_ev, cfg.clone()));

    let mut app = App {
        cfg_path,
        session: Session::new(cfg.convert.default_mode),
        server_url: cfg.server.base_url.clone(),
        open_downloads: cfg.convert.open_downloads,
        cfg,
        ui: UiState::new(),
        templates: vec![],
        worker_tx: tx_cmd,
        worker_rx: rx_ev,
        input_box: None,
        shortcuts,
    };

    // 起動時にテンプレート一覧を取得する。
    app.worker_tx.send(WorkerCmd::RefreshTemplates).await?;

    loop {
        terminal.draw(|f| draw(f, &app))?;

        // 入力処理の前にWorkerイベントを消化する。
        while let Ok(ev) = app.worker_rx.try_recv() {
            handle_worker_event(&mut app, ev);
        }

        // UIの応答性確保のため短いタイムアウトで入力をポーリングする。
        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(k) => {
                    if is_ctrl_c(&k) || handle_key(&mut app, k).await? {
                        break;
                    }
                }
                Event::Paste(text) => {
                    if let Some(input) = app.input_box.as_mut() {
                        input.insert_str(&text);
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// WorkerイベントをUI状態へ反映する。
fn handle_worker_event(app: &mut App, ev: WorkerEvent) {
    match ev {
        WorkerEvent::Session(session) => {
            let was_busy = app.session.is_busy();
            app.session = *session;
            app.ui.clamp_selection(app.session.queue().len());
            if app.session.is_busy() {
                let q = app.session.queue();
                app.ui.status = format!(
                    "处理中... {}/{}",
                    q.succeeded_count() + q.running_count(),
                    q.len()
                );
            } else if was_busy {
                app.ui.status = "处理完成".into();
            }
        }
        WorkerEvent::Templates(names) => {
            app.ui.set_status(format!("模板库: {} 个", names.len()));
            app.templates = names;
        }
        WorkerEvent::OpenDownload(url) => {
            if app.cfg.convert.open_downloads {
                open_url(app, &url);
            } else {
                app.ui.set_status(format!("输出: {url}"));
            }
        }
        WorkerEvent::Error(s) => {
            app.ui.error = Some(s);
        }
    }
}

/// 既定ブラウザでURLを開く。失敗はステータスに表示するだけ。
pub(crate) fn open_url(app: &mut App, url: &str) {
    tracing::info!("opening {url}");
    match webbrowser::open(url) {
        Ok(()) => app.ui.set_status(format!("已打开: {url}")),
        Err(e) => {
            tracing::warn!("browser open failed: {e}");
            app.ui.error = Some(format!("无法打开 {url}: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::Mode;

    pub(super) fn test_app() -> (App, mpsc::Receiver<WorkerCmd>) {
        let (tx_cmd, rx_cmd) = mpsc::channel(16);
        let (_tx_ev, rx_ev) = mpsc::channel(16);
        let cfg = Config::default();
        let app = App {
            cfg_path: PathBuf::from("unused.toml"),
            session: Session::new(Mode::Allocation),
            server_url: cfg.server.base_url.clone(),
            open_downloads: cfg.convert.open_downloads,
            cfg,
            ui: UiState::new(),
            templates: vec![],
            worker_tx: tx_cmd,
            worker_rx: rx_ev,
            input_box: None,
            shortcuts: Shortcuts::default(),
        };
        (app, rx_cmd)
    }

    #[test]
    fn session_snapshot_replaces_mirror_and_clamps_selection() {
        let (mut app, _rx) = test_app();
        app.ui.selected = 5;
        let mut s = Session::new(Mode::DeliveryNote);
        s.add_files(vec!["a.xlsx".into(), "b.xlsx".into()]).unwrap();
        handle_worker_event(&mut app, WorkerEvent::Session(Box::new(s)));
        assert_eq!(app.session.mode(), Mode::DeliveryNote);
        assert_eq!(app.ui.selected, 1);
    }

    #[test]
    fn busy_snapshot_reports_progress() {
        let (mut app, _rx) = test_app();
        let mut s = Session::new(Mode::DeliveryNote);
        s.add_files(vec!["a.xlsx".into(), "b.xlsx".into()]).unwrap();
        let id = s.queue().iter().next().unwrap().id;
        s.queue_mut().start(id).unwrap();
        handle_worker_event(&mut app, WorkerEvent::Session(Box::new(s.clone())));
        assert_eq!(app.ui.status, "处理中... 1/2");

        s.queue_mut().fail(id, "boom".into()).unwrap();
        handle_worker_event(&mut app, WorkerEvent::Session(Box::new(s)));
        assert_eq!(app.ui.status, "处理完成");
    }

    #[test]
    fn errors_and_templates_update_status() {
        let (mut app, _rx) = test_app();
        handle_worker_event(&mut app, WorkerEvent::Error("HTTP 502".into()));
        assert_eq!(app.ui.error.as_deref(), Some("HTTP 502"));
        handle_worker_event(&mut app, WorkerEvent::Templates(vec!["t.xlsx".into()]));
        assert_eq!(app.templates, ["t.xlsx"]);
        assert_eq!(app.ui.error, None);
    }

    #[test]
    fn downloads_are_only_reported_when_auto_open_is_off() {
        let (mut app, _rx) = test_app();
        app.cfg.convert.open_downloads = false;
        handle_worker_event(
            &mut app,
            WorkerEvent::OpenDownload("http://srv/api/download/x.xlsx".into()),
        );
        assert_eq!(app.ui.status, "输出: http://srv/api/download/x.xlsx");
    }
}
