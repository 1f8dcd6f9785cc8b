//! レイアウト計算のヘルパー関数

use ratatui::prelude::*;

/// メイン画面の各領域
pub struct MainLayout {
    /// モードタブと入力項目の領域
    pub header: Rect,
    /// 集計バーの領域
    pub summary: Rect,
    /// Jobs Table + LOG Panelの領域
    pub body: Rect,
    /// HELPバーの領域
    pub help_bar: Rect,
    /// STATUSバーの領域
    pub status_bar: Rect,
}

/// ボディ部の2つの領域（Jobs Table + LOG Panel）
pub struct BodyLayout {
    pub jobs_table: Rect,
    pub log_panel: Rect,
}

/// メイン画面を縦に5分割（Header + Summary + Body + HELP + STATUS）
pub fn create_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // モードタブ + 入力項目
            Constraint::Length(3), // 集計
            Constraint::Min(5),    // Body
            Constraint::Length(3), // HELPバー
            Constraint::Length(3), // STATUSバー
        ])
        .split(area);

    MainLayout {
        header: chunks[0],
        summary: chunks[1],
        body: chunks[2],
        help_bar: chunks[3],
        status_bar: chunks[4],
    }
}

/// Body領域を2つに分割（Jobs Table 55% + LOG Panel 45%）
pub fn create_body_layout(area: Rect) -> BodyLayout {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    BodyLayout {
        jobs_table: chunks[0],
        log_panel: chunks[1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_layout_keeps_fixed_bars() {
        let l = create_main_layout(Rect::new(0, 0, 100, 40));
        assert_eq!(l.header.height, 4);
        assert_eq!(l.summary.height, 3);
        assert_eq!(l.help_bar.height, 3);
        assert_eq!(l.status_bar.height, 3);
        assert_eq!(l.body.height, 40 - 4 - 3 - 3 - 3);
        assert_eq!(l.status_bar.y + l.status_bar.height, 40);
    }
}
