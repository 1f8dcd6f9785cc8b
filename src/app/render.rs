//! TUI描画関連の関数。

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs, Wrap},
};

use crate::{
    convert::Mode,
    events::Screen,
    input,
    jobs::{Job, JobState},
    layout,
    log::Severity,
    session::Session,
    shortcuts::Shortcuts,
    stats::{SummaryStats, format_count},
};

use super::App;

/// 画面全体のレイアウトを描画する。
pub fn draw(f: &mut Frame, app: &App) {
    let main_layout = layout::create_main_layout(f.area());
    let body_layout = layout::create_body_layout(main_layout.body);

    draw_header(f, app, main_layout.header);

    let summary = Paragraph::new(summary_text(app.session.mode(), &app.session.summary()))
        .block(Block::default().borders(Borders::ALL).title("汇总"));
    f.render_widget(summary, main_layout.summary);

    draw_jobs(f, app, body_layout.jobs_table);

    // 設定画面では右パネルを設定表示に切り替える。
    if app.ui.screen == Screen::Settings {
        draw_settings(f, app, body_layout.log_panel);
    } else {
        draw_log(f, &app.session, body_layout.log_panel);
    }

    let help_bar = Paragraph::new(help_text(app.ui.screen, &app.shortcuts))
        .block(Block::default().borders(Borders::ALL).title("HELP"))
        .wrap(Wrap { trim: true });
    f.render_widget(help_bar, main_layout.help_bar);

    f.render_widget(build_status_bar(app), main_layout.status_bar);

    if let Some(input_state) = &app.input_box {
        input::render_input_box(f, input_state);
    }
}

/// モードタブと、現在モードで使う入力項目。
fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let titles = Mode::ALL
        .iter()
        .enumerate()
        .map(|(i, m)| format!("{} {}", i + 1, m.label()));
    let selected = Mode::ALL
        .iter()
        .position(|m| *m == app.session.mode())
        .unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Rgb(255, 140, 0))
                .add_modifier(Modifier::BOLD),
        )
        .divider("|");

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(Block::default().borders(Borders::ALL).inner(area));
    f.render_widget(
        Block::default().borders(Borders::ALL).title("模式"),
        area,
    );
    f.render_widget(tabs, inner[0]);
    f.render_widget(
        Paragraph::new(inputs_text(&app.session)).style(Style::default().fg(Color::Gray)),
        inner[1],
    );
}

/// 現在モードで使う入力項目の一行表示。
fn inputs_text(session: &Session) -> String {
    let inputs = session.inputs();
    let mut parts = vec![];
    if session.uses(|p| p.detail_file) {
        let v = inputs
            .detail_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(未选择)".into());
        parts.push(format!("明细表: {v}"));
    }
    if session.uses(|p| p.template) {
        let v = match (&inputs.template_name, &inputs.template_file) {
            (Some(name), _) => format!("库: {name}"),
            (None, Some(file)) => file.display().to_string(),
            (None, None) => "(默认)".into(),
        };
        parts.push(format!("模板: {v}"));
    }
    if session.uses(|p| p.week_num) {
        let v = if inputs.week_num.is_empty() {
            "-"
        } else {
            inputs.week_num.as_str()
        };
        parts.push(format!("周数: {v}"));
    }
    if parts.is_empty() {
        "无需额外输入".into()
    } else {
        parts.join(" | ")
    }
}

/// 集計バーの文字列。SKU/PT と JAN はモードによって出し分ける。
fn summary_text(mode: Mode, s: &SummaryStats) -> String {
    let mut parts = vec![
        format!("文件 {}", s.count),
        format!("店铺 {}", format_count(Some(s.store_count))),
        format!("箱数 {}", format_count(Some(s.box_count))),
        format!("总枚数 {}", format_count(Some(s.total_qty))),
    ];
    if matches!(mode, Mode::Allocation | Mode::BoxLabel) {
        parts.push(format!("SKU {}", format_count(s.sku_count)));
        parts.push(format!("PT {}", format_count(s.pt_count)));
    }
    if mode == Mode::Allocation {
        parts.push(format!(
            "JAN 映射 {} / 匹配 {} / 未匹配 {}",
            format_count(s.jan_map_count),
            format_count(s.jan_match_success),
            format_count(s.jan_match_fail)
        ));
    }
    parts.join(" | ")
}

fn state_style(state: &JobState) -> Style {
    match state {
        JobState::Pending => Style::default().fg(Color::Gray),
        JobState::Running => Style::default().fg(Color::Yellow),
        JobState::Succeeded(_) => Style::default().fg(Color::Green),
        JobState::Failed(_) => Style::default().fg(Color::Red),
    }
}

fn job_row(i: usize, j: &Job) -> Row<'static> {
    let stats = j.stats().cloned().unwrap_or_default();
    Row::new(vec![
        Cell::from(format!("{}", i + 1)),
        Cell::from(j.filename.clone()),
        Cell::from(j.state.label()).style(state_style(&j.state)),
        Cell::from(format_count(stats.store_count)),
        Cell::from(format_count(stats.box_count)),
        Cell::from(format_count(stats.sku_count)),
        Cell::from(format_count(stats.pt_count)),
        Cell::from(format_count(stats.total_qty)),
    ])
}

/// 選択中ジョブの補足（失敗理由、出力ファイル名、処理件数）。
fn job_detail(j: &Job) -> String {
    if let Some(err) = j.error() {
        return format!(" {}: {} ", j.filename, err);
    }
    match j.stats() {
        Some(s) => {
            let file = s.generated_file.as_deref().unwrap_or("-");
            format!(
                " 输出: {} | 处理 {} 项 ",
                file,
                format_count(s.items_processed)
            )
        }
        None => String::new(),
    }
}

fn draw_jobs(f: &mut Frame, app: &App, area: Rect) {
    let queue = app.session.queue();
    let rows = queue.iter().enumerate().map(|(i, j)| job_row(i, j));
    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(12),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(8),
        ],
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("JOBS ({}/{})", queue.succeeded_count(), queue.len()))
            .title_bottom(app.selected_job().map(job_detail).unwrap_or_default()),
    )
    .header(Row::new(vec!["#", "文件", "状态", "店铺", "箱数", "SKU", "PT", "总枚数"]).bold())
    .row_highlight_style(
        Style::default()
            .bg(Color::Rgb(255, 140, 0))
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    );

    let mut table_state = TableState::default();
    if !queue.is_empty() {
        table_state.select(Some(app.ui.selected));
    }
    f.render_stateful_widget(table, area, &mut table_state);
}

fn severity_color(sev: Severity) -> Color {
    match sev {
        Severity::Neutral => Color::White,
        Severity::Info => Color::Cyan,
        Severity::Success => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

/// 枠内に収まる分だけ最新ログを表示する。
fn draw_log(f: &mut Frame, session: &Session, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    if session.log().is_empty() {
        let hint = Paragraph::new("暂无日志，添加文件后开始处理")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title("LOG"));
        f.render_widget(hint, area);
        return;
    }
    let lines: Vec<Line> = session
        .log()
        .tail(visible)
        .into_iter()
        .map(|e| {
            Line::from(vec![
                Span::styled(format!("{} ", e.time), Style::default().fg(Color::DarkGray)),
                Span::styled(e.text, Style::default().fg(severity_color(e.severity))),
            ])
        })
        .collect();
    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("LOG ({})", session.log().len())),
    );
    f.render_widget(panel, area);
}

fn draw_settings(f: &mut Frame, app: &App, area: Rect) {
    let text = format!(
        "服务地址: {}\n自动打开输出: {}\n\n配置文件: {}\n日志文件: {}",
        app.server_url,
        if app.open_downloads { "是" } else { "否" },
        app.cfg_path.display(),
        app.cfg.log.file,
    );
    let panel = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("SETTINGS"))
        .wrap(Wrap { trim: true });
    f.render_widget(panel, area);
}

/// ステータスバーを構築する。
fn build_status_bar(app: &App) -> Paragraph<'static> {
    let screen_name = match app.ui.screen {
        Screen::Main => "Main",
        Screen::Settings => "Settings",
    };

    let text = match &app.ui.error {
        Some(err) => format!("[{}] 错误: {}", screen_name, err),
        None => format!("[{}] {}", screen_name, app.ui.status),
    };

    let mut status_bar = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("STATUS"))
        .wrap(Wrap { trim: true });
    if app.ui.error.is_some() {
        status_bar = status_bar.style(Style::default().fg(Color::Red));
    }
    status_bar
}

/// 現在画面に応じたヘルプ文字列を返す。
fn help_text(screen: Screen, shortcuts: &Shortcuts) -> String {
    let k = |keys: &[String]| keys.join("/");
    match screen {
        Screen::Main => {
            let m = &shortcuts.main;
            format!(
                "{}: 添加 | {}: 开始 | {}: 重试 | {}: 移除 | {}: 清空 | {}: 模式 | {}: 明细表 | {}: 模板文件 | {}: 模板库 | {}: 刷新模板 | {}: 周数 | {}: 打开输出 | {}: 设置 | {}: 退出",
                k(&m.add_files),
                k(&m.run),
                k(&m.retry),
                k(&m.remove),
                k(&m.clear),
                k(&m.next_mode),
                k(&m.detail_file),
                k(&m.template_file),
                k(&m.cycle_template),
                k(&m.refresh_templates),
                k(&m.week_num),
                k(&m.open_output),
                k(&m.settings),
                k(&m.quit),
            )
        }
        Screen::Settings => {
            let s = &shortcuts.settings;
            format!(
                "{}: 服务地址 | {}: 切换自动打开 | {}: 保存 | {}: 取消",
                k(&s.server_url),
                k(&s.toggle_open),
                k(&s.save),
                k(&s.cancel)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> SummaryStats {
        SummaryStats {
            count: 2,
            store_count: 1200,
            box_count: 30,
            total_qty: 45678,
            sku_count: Some(12),
            pt_count: None,
            jan_map_count: Some(3000),
            jan_match_success: Some(2990),
            jan_match_fail: Some(10),
        }
    }

    #[test]
    fn summary_shows_jan_only_for_allocation() {
        let text = summary_text(Mode::Allocation, &stats());
        assert!(text.contains("店铺 1,200"));
        assert!(text.contains("总枚数 45,678"));
        assert!(text.contains("PT -"));
        assert!(text.contains("JAN 映射 3,000 / 匹配 2,990 / 未匹配 10"));

        let text = summary_text(Mode::BoxLabel, &stats());
        assert!(text.contains("SKU 12"));
        assert!(!text.contains("JAN"));
    }

    #[test]
    fn summary_hides_sku_for_delivery_modes() {
        for mode in [Mode::DeliveryNote, Mode::Assortment] {
            let text = summary_text(mode, &stats());
            assert!(!text.contains("SKU"));
            assert!(!text.contains("PT"));
        }
    }

    #[test]
    fn job_detail_prefers_error_then_output() {
        let mut q = crate::jobs::JobQueue::default();
        q.push_files(vec!["a.xlsx".into(), "b.xlsx".into()]).unwrap();
        let ids: Vec<_> = q.iter().map(|j| j.id).collect();
        q.start(ids[0]).unwrap();
        q.fail(ids[0], "bad header".into()).unwrap();
        q.start(ids[1]).unwrap();
        q.succeed(
            ids[1],
            crate::convert::ConvertResponse {
                status: "success".into(),
                stats: Some(crate::convert::ConversionStats {
                    items_processed: Some(1500),
                    generated_file: Some("out.xlsx".into()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .unwrap();

        let jobs: Vec<_> = q.iter().collect();
        assert_eq!(job_detail(jobs[0]), " a.xlsx: bad header ");
        assert_eq!(job_detail(jobs[1]), " 输出: out.xlsx | 处理 1,500 项 ");
    }

    #[test]
    fn inputs_line_lists_only_used_fields() {
        let mut s = Session::new(Mode::Assortment);
        s.set_week_num("42".into()).unwrap();
        s.set_template_name(Some("库模板.xlsx".into())).unwrap();
        assert_eq!(inputs_text(&s), "模板: 库: 库模板.xlsx | 周数: 42");

        let s = Session::new(Mode::BoxLabel);
        assert_eq!(inputs_text(&s), "无需额外输入");

        let s = Session::new(Mode::Allocation);
        assert_eq!(inputs_text(&s), "明细表: (未选择) | 模板: (默认)");
    }
}
