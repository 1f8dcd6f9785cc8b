//! TUI内での文字列入力コンポーネント（InputBox）。

use ratatui::{
    layout::Alignment,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

/// InputBox入力状態
#[derive(Clone, Debug)]
pub struct InputBoxState {
    /// プロンプトメッセージ
    pub prompt: String,
    /// 現在の入力値
    pub value: String,
    /// カーソル位置（文字単位）
    pub cursor: usize,
    /// 入力完了時のコールバック識別子
    pub callback_id: InputCallbackId,
}

/// 入力完了時のコールバック識別子
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputCallbackId {
    // メイン画面用
    AddFiles,
    DetailFile,
    TemplateFile,
    WeekNum,

    // Settings画面用
    ServerUrl,
}

impl InputCallbackId {
    /// ポップアップに表示する説明文。
    pub fn prompt(self) -> &'static str {
        match self {
            Self::AddFiles => "添加文件或文件夹（多个用 ; 分隔）",
            Self::DetailFile => "明细表路径（留空清除）",
            Self::TemplateFile => "模板文件路径（留空清除）",
            Self::WeekNum => "周数",
            Self::ServerUrl => "转换服务地址",
        }
    }
}

impl InputBoxState {
    /// 初期値付きで入力ボックスを開く。カーソルは末尾。
    pub fn new(callback_id: InputCallbackId, initial: impl Into<String>) -> Self {
        let value = initial.into();
        Self {
            prompt: callback_id.prompt().to_string(),
            cursor: value.chars().count(),
            value,
            callback_id,
        }
    }

    /// 文字単位の位置をバイト位置へ変換する。
    fn byte_at(&self, char_pos: usize) -> usize {
        // 末尾を越えた位置は文字列長に丸める。
        self.value
            .char_indices()
            .nth(char_pos)
            .map_or(self.value.len(), |(i, _)| i)
    }

    fn char_count(&self) -> usize {
        self.value.chars().count()
    }

    /// 文字を挿入
    pub fn insert_char(&mut self, c: char) {
        // マルチバイト文字を壊さないよう、バイト境界で挿入する。
        let at = self.byte_at(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// 貼り付けなどでまとめて挿入する。改行は無視する。
    pub fn insert_str(&mut self, s: &str) {
        // 制御文字（改行・タブ等）は1行入力に不要なので捨てる。
        for c in s.chars().filter(|c| !c.is_control()) {
            self.insert_char(c);
        }
    }

    /// Backspace（カーソル前の文字を削除）
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            // カーソルを1文字戻してから、その位置の文字を取り除く。
            self.cursor -= 1;
            let at = self.byte_at(self.cursor);
            self.value.remove(at);
        }
    }

    /// Delete（カーソル位置の文字を削除）
    pub fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let at = self.byte_at(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_count();
    }

    /// 行全体をクリア
    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}

/// InputBoxをポップアップとして描画
pub fn render_input_box(f: &mut Frame, state: &InputBoxState) {
    let popup_area = centered_popup(f.area(), 70, 7);
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("输入")
        .style(Style::default().bg(Color::DarkGray));
    f.render_widget(block, popup_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // プロンプト
            Constraint::Length(1), // 入力フィールド
            Constraint::Length(1),
            Constraint::Length(1), // ヘルプ
        ])
        .split(popup_area);

    f.render_widget(
        Paragraph::new(state.prompt.as_str()).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        rows[0],
    );

    let line = visible_with_cursor(&state.value, state.cursor, rows[1].width as usize);
    f.render_widget(
        Paragraph::new(line).style(Style::default().fg(Color::Green)),
        rows[1],
    );

    f.render_widget(
        Paragraph::new("Enter=确定 | Esc=取消 | Ctrl+U=清空")
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center),
        rows[3],
    );
}

/// 表示幅に収まるよう横スクロールし、カーソル位置に `|` を差し込む。
fn visible_with_cursor(value: &str, cursor: usize, width: usize) -> String {
    // `|` の分を1桁空け、カーソルが右端に来るようにずらす。
    let room = width.saturating_sub(1);
    let offset = cursor.saturating_sub(room);
    let chars: Vec<char> = value.chars().skip(offset).take(room).collect();
    let at = (cursor - offset).min(chars.len());
    let before: String = chars[..at].iter().collect();
    let after: String = chars[at..].iter().collect();
    format!("{before}|{after}")
}

/// 中央配置のポップアップ領域を計算
fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}
