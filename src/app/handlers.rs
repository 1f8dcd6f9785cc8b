//! キー入力ハンドラー関数。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;

use crate::{
    convert::{Mode, resolve_download_url},
    events::Screen,
    input::{InputBoxState, InputCallbackId},
    jobs::JobState,
    shortcuts,
    worker::{WorkerCmd, parse_path_list},
};

use super::{App, open_url};

/// キー入力を1件処理し、終了すべきならtrueを返す。
pub async fn handle_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // 入力ボックスが開いていれば最優先で処理する。
    if app.input_box.is_some() {
        return handle_input_box_key(app, k).await;
    }

    match app.ui.screen {
        Screen::Main => handle_main_key(app, k).await,
        Screen::Settings => handle_settings_key(app, k).await,
    }
}

/// Ctrl+Cかどうかを判定する。
pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// 処理中ならステータスで知らせ、コマンドを送らない。
fn refuse_while_busy(app: &mut App) -> bool {
    if app.session.is_busy() {
        app.ui.set_status("正在处理，请等待完成后再操作");
        true
    } else {
        false
    }
}

/// 変更系コマンドを送る。処理中は送らない。
async fn send_mutation(app: &mut App, cmd: WorkerCmd) -> Result<()> {
    if !refuse_while_busy(app) {
        app.worker_tx.send(cmd).await?;
    }
    Ok(())
}

/// 入力ボックスを開く。処理中は開かない。
fn open_input(app: &mut App, id: InputCallbackId, initial: String) {
    if !refuse_while_busy(app) {
        app.input_box = Some(InputBoxState::new(id, initial));
    }
}

fn path_text(p: Option<&PathBuf>) -> String {
    p.map(|p| p.display().to_string()).unwrap_or_default()
}

/// テンプレート一覧の次の候補。末尾の次は未選択に戻る。
fn next_template(templates: &[String], current: Option<&str>) -> Option<String> {
    match current.and_then(|c| templates.iter().position(|t| t == c)) {
        None => templates.first().cloned(),
        Some(i) => templates.get(i + 1).cloned(),
    }
}

/// メイン画面のキー処理。
async fn handle_main_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // 分岐内で app を可変借用するため写しを使う。
    let sc = app.shortcuts.main.clone();
    let hit = |keys: &[String]| shortcuts::matches_shortcut(&k, keys);

    if hit(&sc.quit) {
        return Ok(true);
    } else if hit(&sc.settings) {
        reload_settings_buffers(app);
        app.ui.screen = Screen::Settings;
        app.ui.set_status("设置");
    } else if hit(&sc.refresh_templates) {
        app.worker_tx.send(WorkerCmd::RefreshTemplates).await?;
        app.ui.set_status("正在刷新模板库...");
    } else if hit(&sc.run) {
        if app.session.queue().is_empty() {
            app.ui.set_status("请先添加文件");
        } else {
            send_mutation(app, WorkerCmd::RunBatch).await?;
        }
    } else if hit(&sc.retry) {
        match app.selected_job().map(|j| (j.id, matches!(j.state, JobState::Failed(_)))) {
            Some((id, true)) => send_mutation(app, WorkerCmd::RetryJob(id)).await?,
            Some(_) => app.ui.set_status("只能重试失败的任务"),
            None => {}
        }
    } else if hit(&sc.remove) {
        match app.selected_job().map(|j| (j.id, j.state == JobState::Pending)) {
            Some((id, true)) => send_mutation(app, WorkerCmd::RemoveJob(id)).await?,
            Some(_) => app.ui.set_status("只能移除等待中的任务"),
            None => {}
        }
    } else if hit(&sc.clear) {
        send_mutation(app, WorkerCmd::ClearQueue).await?;
    } else if hit(&sc.next_mode) {
        let next = app.session.mode().next();
        send_mutation(app, WorkerCmd::SetMode(next)).await?;
    } else if let Some(i) = app.shortcuts.mode_index(&k) {
        if let Some(&mode) = Mode::ALL.get(i)
            && mode != app.session.mode()
        {
            send_mutation(app, WorkerCmd::SetMode(mode)).await?;
        }
    } else if hit(&sc.add_files) {
        open_input(app, InputCallbackId::AddFiles, String::new());
    } else if hit(&sc.detail_file) {
        if app.session.uses(|p| p.detail_file) {
            let current = path_text(app.session.inputs().detail_file.as_ref());
            open_input(app, InputCallbackId::DetailFile, current);
        }
    } else if hit(&sc.template_file) {
        if app.session.uses(|p| p.template) {
            let current = path_text(app.session.inputs().template_file.as_ref());
            open_input(app, InputCallbackId::TemplateFile, current);
        }
    } else if hit(&sc.cycle_template) {
        if app.session.uses(|p| p.template) {
            if app.templates.is_empty() {
                app.ui.set_status("模板库为空");
            } else {
                let next = next_template(
                    &app.templates,
                    app.session.inputs().template_name.as_deref(),
                );
                send_mutation(app, WorkerCmd::SetTemplateName(next)).await?;
            }
        }
    } else if hit(&sc.week_num) {
        if app.session.uses(|p| p.week_num) {
            let current = app.session.inputs().week_num.clone();
            open_input(app, InputCallbackId::WeekNum, current);
        }
    } else if hit(&sc.open_output) {
        let url = app
            .selected_job()
            .and_then(|j| j.result())
            .and_then(|r| r.download_url.clone());
        match url {
            Some(url) => {
                let url = resolve_download_url(&app.cfg.server.base_url, &url);
                open_url(app, &url);
            }
            None => app.ui.set_status("该任务没有输出文件"),
        }
    } else if hit(&sc.down) {
        if app.ui.selected + 1 < app.session.queue().len() {
            app.ui.selected += 1;
        }
    } else if hit(&sc.up) {
        app.ui.selected = app.ui.selected.saturating_sub(1);
    }

    Ok(false)
}

/// 設定画面のキー処理。
async fn handle_settings_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.settings;

    if shortcuts::matches_shortcut(&k, &sc.cancel) {
        // 変更を破棄してメイン画面へ戻る。
        reload_settings_buffers(app);
        app.ui.screen = Screen::Main;
    } else if shortcuts::matches_shortcut(&k, &sc.save) {
        app.cfg.server.base_url = app.server_url.trim().trim_end_matches('/').to_string();
        app.cfg.convert.open_downloads = app.open_downloads;
        app.cfg.save(&app.cfg_path)?;
        tracing::info!("settings saved to {}", app.cfg_path.display());

        app.worker_tx
            .send(WorkerCmd::SaveSettings(app.cfg.clone()))
            .await?;
        app.ui.screen = Screen::Main;
        app.ui.set_status("设置已保存");
    } else if shortcuts::matches_shortcut(&k, &sc.server_url) {
        app.input_box = Some(InputBoxState::new(
            InputCallbackId::ServerUrl,
            app.server_url.clone(),
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.toggle_open) {
        app.open_downloads = !app.open_downloads;
    }

    Ok(false)
}

/// 入力ボックスのキー処理。
async fn handle_input_box_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let Some(input_state) = &mut app.input_box else {
        return Ok(false);
    };
    let sc = &app.shortcuts.input_box;

    if shortcuts::matches_shortcut(&k, &sc.confirm) {
        let value = input_state.value.clone();
        let callback_id = input_state.callback_id;
        app.input_box = None;
        apply_input_callback(app, callback_id, value).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.cancel) {
        app.input_box = None;
    } else if shortcuts::matches_shortcut(&k, &sc.backspace) {
        input_state.backspace();
    } else if shortcuts::matches_shortcut(&k, &sc.delete) {
        input_state.delete();
    } else if shortcuts::matches_shortcut(&k, &sc.left) {
        input_state.move_left();
    } else if shortcuts::matches_shortcut(&k, &sc.right) {
        input_state.move_right();
    } else if shortcuts::matches_shortcut(&k, &sc.home) {
        input_state.move_home();
    } else if shortcuts::matches_shortcut(&k, &sc.end) {
        input_state.move_end();
    } else if shortcuts::matches_shortcut(&k, &sc.clear_line) {
        input_state.clear_line();
    } else if let KeyCode::Char(c) = k.code
        && !k.modifiers.contains(KeyModifiers::CONTROL)
    {
        input_state.insert_char(c);
    }

    Ok(false)
}

fn optional_path(value: &str) -> Option<PathBuf> {
    let v = value.trim().trim_matches('"');
    (!v.is_empty()).then(|| PathBuf::from(v))
}

/// 入力ボックスのコールバックを適用する。
async fn apply_input_callback(
    app: &mut App,
    callback_id: InputCallbackId,
    value: String,
) -> Result<()> {
    match callback_id {
        InputCallbackId::AddFiles => {
            let paths = parse_path_list(&value);
            if paths.is_empty() {
                app.ui.set_status("未输入路径");
            } else {
                send_mutation(app, WorkerCmd::AddFiles(paths)).await?;
            }
        }
        InputCallbackId::DetailFile => {
            send_mutation(app, WorkerCmd::SetDetailFile(optional_path(&value))).await?
        }
        InputCallbackId::TemplateFile => {
            send_mutation(app, WorkerCmd::SetTemplateFile(optional_path(&value))).await?
        }
        InputCallbackId::WeekNum => send_mutation(app, WorkerCmd::SetWeekNum(value)).await?,
        InputCallbackId::ServerUrl => app.server_url = value.trim().to_string(),
    }
    Ok(())
}

/// 設定画面用の編集バッファを設定値から再読み込みする。
fn reload_settings_buffers(app: &mut App) {
    app.server_url = app.cfg.server.base_url.clone();
    app.open_downloads = app.cfg.convert.open_downloads;
}
