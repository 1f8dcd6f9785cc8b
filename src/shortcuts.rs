//! ショートカット設定の管理。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// ショートカット設定の全体。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Shortcuts {
    pub main: MainShortcuts,
    pub settings: SettingsShortcuts,
    pub input_box: InputBoxShortcuts,
}

/// メイン画面のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MainShortcuts {
    pub quit: Vec<String>,
    pub settings: Vec<String>,
    pub add_files: Vec<String>,
    pub run: Vec<String>,
    pub retry: Vec<String>,
    pub remove: Vec<String>,
    pub clear: Vec<String>,
    pub next_mode: Vec<String>,
    /// 各要素が `Mode::ALL` の同じ位置のモードに対応する。
    pub select_mode: Vec<String>,
    pub detail_file: Vec<String>,
    pub template_file: Vec<String>,
    pub cycle_template: Vec<String>,
    pub refresh_templates: Vec<String>,
    pub week_num: Vec<String>,
    pub open_output: Vec<String>,
    pub down: Vec<String>,
    pub up: Vec<String>,
}

/// 設定画面のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsShortcuts {
    pub cancel: Vec<String>,
    pub save: Vec<String>,
    pub server_url: Vec<String>,
    pub toggle_open: Vec<String>,
}

/// InputBoxのショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputBoxShortcuts {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub backspace: Vec<String>,
    pub delete: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub home: Vec<String>,
    pub end: Vec<String>,
    pub clear_line: Vec<String>,
}

impl Shortcuts {
    /// TOMLから読み込み、無ければデフォルトを返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// 押されたキーに対応するモード番号（`select_mode` の位置）。
    pub fn mode_index(&self, key: &KeyEvent) -> Option<usize> {
        self.main
            .select_mode
            .iter()
            .position(|s| matches_single_shortcut(key, s))
    }
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for MainShortcuts {
    fn default() -> Self {
        Self {
            quit: keys(&["q"]),
            settings: keys(&["t"]),
            add_files: keys(&["a"]),
            run: keys(&["Enter", "r"]),
            retry: keys(&["f"]),
            remove: keys(&["x", "Delete"]),
            clear: keys(&["c"]),
            next_mode: keys(&["m", "Tab"]),
            select_mode: keys(&["1", "2", "3", "4"]),
            detail_file: keys(&["d"]),
            template_file: keys(&["u"]),
            cycle_template: keys(&["p"]),
            refresh_templates: keys(&["Ctrl+r"]),
            week_num: keys(&["w"]),
            open_output: keys(&["o"]),
            down: keys(&["Down", "j"]),
            up: keys(&["Up", "k"]),
        }
    }
}

impl Default for SettingsShortcuts {
    fn default() -> Self {
        Self {
            cancel: keys(&["Esc"]),
            save: keys(&["Enter"]),
            server_url: keys(&["s"]),
            toggle_open: keys(&["b"]),
        }
    }
}

impl Default for InputBoxShortcuts {
    fn default() -> Self {
        // パス入力で文字キーを潰さないよう、移動は専用キーのみ。
        Self {
            confirm: keys(&["Enter"]),
            cancel: keys(&["Esc"]),
            backspace: keys(&["Backspace"]),
            delete: keys(&["Delete"]),
            left: keys(&["Left"]),
            right: keys(&["Right"]),
            home: keys(&["Home", "Ctrl+a"]),
            end: keys(&["End", "Ctrl+e"]),
            clear_line: keys(&["Ctrl+u"]),
        }
    }
}

/// KeyEventがいずれかのショートカット文字列と一致するか判定する。
pub fn matches_shortcut(key: &KeyEvent, shortcuts: &[String]) -> bool {
    shortcuts.iter().any(|s| matches_single_shortcut(key, s))
}

/// KeyEventが単一のショートカット文字列と一致するか判定する（例: "Ctrl+u", "a", "Enter"）。
fn matches_single_shortcut(key: &KeyEvent, shortcut: &str) -> bool {
    // "Ctrl+u" のような修飾キー付き形式と単独キーを分ける。
    // 末尾が "+" の場合は "+" キーそのものとみなす。
    let (modifiers_str, key_str) = match shortcut.rsplit_once('+') {
        Some((mods, k)) if !k.is_empty() => (mods.split('+').collect::<Vec<_>>(), k),
        _ => (vec![], shortcut),
    };

    // 修飾キーを解析して期待値を作る。未知の修飾子は一致しない。
    let mut expected = KeyModifiers::empty();
    for modifier in modifiers_str {
        match modifier.to_ascii_lowercase().as_str() {
            "ctrl" => expected |= KeyModifiers::CONTROL,
            "alt" => expected |= KeyModifiers::ALT,
            "shift" => expected |= KeyModifiers::SHIFT,
            _ => return false,
        }
    }

    // 文字キーは大文字入力で SHIFT が付くため、比較から外す。
    let actual = match key.code {
        KeyCode::Char(_) if !expected.contains(KeyModifiers::SHIFT) => {
            key.modifiers.difference(KeyModifiers::SHIFT)
        }
        _ => key.modifiers,
    };
    if actual != expected {
        return false;
    }

    // キー名をキーコードへ変換して比較する。
    let code = match key_str.to_ascii_lowercase().as_str() {
        "enter" => KeyCode::Enter,
        "esc" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "delete" => KeyCode::Delete,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        _ => {
            // 1文字ならそのまま文字キーとして扱う。
            let mut chars = key_str.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return false,
            }
        }
    };
    key.code == code
}
