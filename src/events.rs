//! 画面遷移用のUI状態と画面種別。

/// TUIで現在表示中の画面。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// ジョブ一覧・ログ・集計のメイン画面。
    Main,
    /// 接続先などの設定画面。
    Settings,
}

/// 描画側と共有するUI状態。
#[derive(Clone, Debug)]
pub struct UiState {
    /// 現在の画面。
    pub screen: Screen,
    /// ジョブ一覧の選択行。
    pub selected: usize,
    /// 画面下部のステータス文言。
    pub status: String,
    /// エラーメッセージ（強調表示用）。
    pub error: Option<String>,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Main,
            selected: 0,
            status: "Ready".into(),
            error: None,
        }
    }

    /// ステータスを更新し、直前のエラー表示を消す。
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.error = None;
    }

    /// 行数が減ったときに選択位置を範囲内へ戻す。
    pub fn clamp_selection(&mut self, len: usize) {
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
