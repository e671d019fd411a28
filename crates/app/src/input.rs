//! Line-oriented commands typed at the session prompt.

use exam_core::keyboard::{Key, KeyEvent, Modifiers};
use exam_core::navigation::PaletteFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Key(KeyEvent),
    Note(String),
    Filter(PaletteFilter),
    /// One-based question number.
    Jump(usize),
    FirstUnanswered,
    AutoAdvance(bool),
    Pause,
    Resume,
    Submit,
    Yes,
    No,
    Retry,
    Show,
    Palette,
    Help,
    Reset,
    Quit,
}

/// Parse one line. Returns `None` for anything unrecognised.
pub fn parse_line(line: &str) -> Option<Input> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let input = match word.to_ascii_lowercase().as_str() {
        "note" => Input::Note(rest.to_string()),
        "filter" => Input::Filter(rest.parse().ok()?),
        "jump" | "go" => Input::Jump(rest.parse().ok().filter(|&n| n > 0)?),
        "u" | "unanswered" => Input::FirstUnanswered,
        "auto" => match rest {
            "on" => Input::AutoAdvance(true),
            "off" => Input::AutoAdvance(false),
            _ => return None,
        },
        "pause" => Input::Pause,
        "resume" => Input::Resume,
        "submit" => Input::Submit,
        "y" | "yes" => Input::Yes,
        "no" => Input::No,
        "retry" => Input::Retry,
        "show" | "" => Input::Show,
        "palette" => Input::Palette,
        "help" | "?" => Input::Help,
        "reset" => Input::Reset,
        "q" | "quit" | "exit" => Input::Quit,
        "left" => Input::Key(KeyEvent::new(Key::ArrowLeft)),
        "right" => Input::Key(KeyEvent::new(Key::ArrowRight)),
        _ if rest.is_empty() => Input::Key(parse_key(word)?),
        _ => return None,
    };
    Some(input)
}

/// `2`, `n`, `alt+3`.
fn parse_key(word: &str) -> Option<KeyEvent> {
    let (modifiers, key) = match word.split_once('+') {
        Some((modifier, key)) if modifier.eq_ignore_ascii_case("alt") => (Modifiers::ALT, key),
        Some(_) => return None,
        None => (Modifiers::NONE, word),
    };
    let mut chars = key.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some(KeyEvent::new(Key::Char(c)).with_modifiers(modifiers))
}

pub const HELP: &str = "\
  1-9          select option          alt+1-9   strike out option
  n / p        next / previous        f / r     flag / review later
  c            clear answer           u         first unanswered
  jump N       go to question N       filter X  all|flagged|review|answered|unanswered
  note TEXT    set note (empty clears) auto on|off
  palette      show palette           show      redraw question
  pause/resume                        submit    finish the test
  reset        abandon and delete     quit      leave (progress is kept)";
