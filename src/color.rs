use crossterm::style::Color;
use supports_color::Stream;

/// Detect the level of color support
pub fn color_level() -> ColorLevel {
    match supports_color::on(Stream::Stdout) {
        Some(level) => match level.has_16m {
            true => ColorLevel::TrueColor,
            false => match level.has_256 {
                true => ColorLevel::Color256,
                false => ColorLevel::Color16,
            },
        },
        None => ColorLevel::None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorLevel {
    /// No color support
    None,
    /// 16 basic colors
    Color16,
    /// 256 ANSI colors
    Color256,
    /// True color (24-bit RGB)
    TrueColor,
}

impl ColorLevel {
    /// `color` as the terminal can show it, or `None` when no color escape
    /// should be written at all.
    pub fn adapt(self, color: Color) -> Option<Color> {
        match (self, color) {
            (ColorLevel::None, _) => None,
            (ColorLevel::TrueColor, color) => Some(color),
            (ColorLevel::Color256, Color::Rgb { r, g, b }) => Some(Color::AnsiValue(rgb_to_ansi256(r, g, b))),
            (ColorLevel::Color16, Color::Rgb { r, g, b }) => Some(rgb_to_basic(r, g, b)),
            (ColorLevel::Color16, Color::AnsiValue(value)) => {
                let (r, g, b) = ansi256_to_rgb(value);
                Some(if value < 16 { basic(value) } else { rgb_to_basic(r, g, b) })
            }
            (_, color) => Some(color),
        }
    }
}

fn rgb_to_ansi256(r: u8, g: u8, b: u8) -> u8 {
    if r == g && g == b {
        return match r {
            0..8 => 16,
            249.. => 231,
            _ => 232 + ((r as u16 - 8) * 24 / 241) as u8,
        };
    }
    let scale = |v: u8| (v as u16 * 5 + 127) / 255;
    (16 + 36 * scale(r) + 6 * scale(g) + scale(b)) as u8
}

fn ansi256_to_rgb(value: u8) -> (u8, u8, u8) {
    match value {
        0..16 => (0, 0, 0),
        16..232 => {
            let index = value - 16;
            let level = |v: u8| if v == 0 { 0 } else { 55 + 40 * v };
            (level(index / 36), level((index / 6) % 6), level(index % 6))
        }
        _ => {
            let gray = 8 + 10 * (value - 232);
            (gray, gray, gray)
        }
    }
}

fn rgb_to_basic(r: u8, g: u8, b: u8) -> Color {
    let bits = (r > 95) as u8 | ((g > 95) as u8) << 1 | ((b > 95) as u8) << 2;
    let bright = r.max(g).max(b) > 191;
    basic(bits + if bright { 8 } else { 0 })
}

fn basic(index: u8) -> Color {
    match index {
        0 => Color::Black,
        1 => Color::DarkRed,
        2 => Color::DarkGreen,
        3 => Color::DarkYellow,
        4 => Color::DarkBlue,
        5 => Color::DarkMagenta,
        6 => Color::DarkCyan,
        7 => Color::Grey,
        8 => Color::DarkGrey,
        9 => Color::Red,
        10 => Color::Green,
        11 => Color::Yellow,
        12 => Color::Blue,
        13 => Color::Magenta,
        14 => Color::Cyan,
        _ => Color::White,
    }
}
