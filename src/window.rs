//! Framed top-level view with a title bar.

use crossterm::style::Color;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::canvas::Painter;
use crate::geometry::Rect;
use crate::terminal::Style;
use crate::view::View;

/// Smallest width and height a window accepts through `ChangeBounds`.
pub const MIN_WINDOW_SIZE: i32 = 2;

/// Title bar narrower than this has no room for the close box.
const MIN_TITLE_BAR: i32 = 7;
/// Close box plus a space on each side of the caption.
const MIN_TITLE_BAR_WITH_CAPTION: i32 = MIN_TITLE_BAR + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderType {
    #[default]
    Single,
    Double,
    /// Frame drawn with spaces; still takes one cell on every side.
    Empty,
}

/// Glyph set for one border type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderChars {
    pub upper_left: char,
    pub horizontal: char,
    pub close_left: char,
    pub close: char,
    pub close_right: char,
    pub upper_right: char,
    pub caption_space: char,
    pub lower_left: char,
    pub lower_right: char,
    pub vertical: char,
}

impl BorderType {
    pub fn chars(self) -> BorderChars {
        let (upper_left, horizontal, upper_right, lower_left, lower_right, vertical) = match self {
            BorderType::Single => ('┌', '─', '┐', '└', '┘', '│'),
            BorderType::Double => ('╔', '═', '╗', '╚', '╝', '║'),
            BorderType::Empty => (' ', ' ', ' ', ' ', ' ', ' '),
        };
        BorderChars {
            upper_left,
            horizontal,
            close_left: '[',
            close: '■',
            close_right: ']',
            upper_right,
            caption_space: ' ',
            lower_left,
            lower_right,
            vertical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Border {
    pub kind: BorderType,
    pub style: Style,
}

impl Default for Border {
    fn default() -> Self {
        Self {
            kind: BorderType::Single,
            style: Style::new(Color::White, Color::Grey),
        }
    }
}

pub struct Window {
    pub(crate) view: View,
    caption: String,
    border: Border,
}

impl Window {
    pub(crate) fn new(view: View, caption: impl Into<String>) -> Self {
        let mut view = view.with_inset(1);
        view.set_style(Style::new(Color::White, Color::Grey));
        Self {
            view,
            caption: caption.into(),
            border: Border::default(),
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn set_caption(&mut self, caption: impl Into<String>) {
        self.caption = caption.into();
    }

    pub fn border(&self) -> Border {
        self.border
    }

    pub fn set_border(&mut self, border: Border) {
        self.border = border;
    }

    /// `bounds` grown to the minimum window size.
    pub fn clamp_bounds(bounds: Rect) -> Rect {
        Rect {
            width: bounds.width.max(MIN_WINDOW_SIZE),
            height: bounds.height.max(MIN_WINDOW_SIZE),
            ..bounds
        }
    }

    pub fn draw(&self, painter: &mut Painter<'_>) {
        if !self.view.visible() {
            return;
        }
        self.view.draw(painter);

        let bounds = self.view.bounds();
        let chars = self.border.kind.chars();
        painter.set_brush(self.border.style);

        draw_title_bar(painter, Rect::new(0, 0, bounds.width, 1), &self.caption, &chars);
        draw_bottom_bar(painter, Rect::new(0, bounds.height - 1, bounds.width, 1), &chars);
        draw_side(painter, Rect::new(0, 1, 1, bounds.height - 2), &chars);
        draw_side(painter, Rect::new(bounds.width - 1, 1, 1, bounds.height - 2), &chars);
    }
}

/// Draws `┌─[■]─ caption ─┐`, dropping the caption and then the close box as
/// the bar narrows. Long captions are truncated.
pub fn draw_title_bar(painter: &mut Painter<'_>, bar: Rect, caption: &str, chars: &BorderChars) {
    fn put(painter: &mut Painter<'_>, bar: Rect, column: &mut i32, ch: char) {
        painter.print_char(bar.x + *column, bar.y, ch);
        *column += 1;
    }

    let mut column = 0;
    put(painter, bar, &mut column, chars.upper_left);

    if bar.width >= MIN_TITLE_BAR {
        for ch in [chars.horizontal, chars.close_left, chars.close, chars.close_right] {
            put(painter, bar, &mut column, ch);
        }

        if bar.width > MIN_TITLE_BAR_WITH_CAPTION {
            let caption_width = caption.width() as i32;
            let padding_left = (bar.width - caption_width - 2) / 2;
            while column < padding_left {
                put(painter, bar, &mut column, chars.horizontal);
            }

            put(painter, bar, &mut column, chars.caption_space);
            let shown = if bar.width > caption_width + MIN_TITLE_BAR_WITH_CAPTION {
                caption_width
            } else {
                bar.width - MIN_TITLE_BAR_WITH_CAPTION
            };
            column = painter.print_str(bar.x + column, bar.y, fit(caption, shown)) - bar.x;
            put(painter, bar, &mut column, chars.caption_space);
        }
    }

    while column < bar.width - 1 {
        put(painter, bar, &mut column, chars.horizontal);
    }
    painter.print_char(bar.x + column, bar.y, chars.upper_right);
}

/// Longest prefix of `text` at most `cells` columns wide.
fn fit(text: &str, cells: i32) -> &str {
    let mut used = 0;
    for (index, ch) in text.char_indices() {
        used += ch.width().unwrap_or(0) as i32;
        if used > cells {
            return &text[..index];
        }
    }
    text
}

/// Draws `└────┘`.
pub fn draw_bottom_bar(painter: &mut Painter<'_>, bar: Rect, chars: &BorderChars) {
    painter.print_char(bar.x, bar.y, chars.lower_left);
    for column in 1..bar.width - 1 {
        painter.print_char(bar.x + column, bar.y, chars.horizontal);
    }
    painter.print_char(bar.x + (bar.width - 1).max(1), bar.y, chars.lower_right);
}

pub fn draw_side(painter: &mut Painter<'_>, side: Rect, chars: &BorderChars) {
    for row in 0..side.height {
        painter.print_char(side.x, side.y + row, chars.vertical);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasId, Canvases};
    use crate::terminal::HeadlessSurface;

    fn title(width: i32, caption: &str) -> String {
        let mut surface = HeadlessSurface::new(width as u16, 1);
        let mut canvases = Canvases::new(Style::default());
        let mut painter = Painter::new(&mut canvases, &mut surface, CanvasId::SCREEN);
        draw_title_bar(
            &mut painter,
            Rect::new(0, 0, width, 1),
            caption,
            &BorderType::Single.chars(),
        );
        surface.row_text(0)
    }

    #[test]
    fn title_bar_centers_caption() {
        assert_eq!(title(20, "Hi"), "┌─[■]─── Hi ───────┐");
    }

    #[test]
    fn title_bar_truncates_long_caption() {
        assert_eq!(title(12, "Hello World"), "┌─[■] Hel ─┐");
        assert_eq!(title(10, "abc"), "┌─[■] a ─┐");
    }

    #[test]
    fn title_bar_measures_wide_captions_in_cells() {
        // Wide glyphs cover the cell after them.
        assert_eq!(title(20, "世界"), "┌─[■]── 世 界  ──────┐");
        assert_eq!(title(12, "世界"), "┌─[■] 世  ──┐");
        assert_eq!(title(10, "世界"), "┌─[■]  ──┐");
    }

    #[test]
    fn title_bar_degrades_when_narrow() {
        assert_eq!(title(9, "caption"), "┌─[■]───┐");
        assert_eq!(title(7, "caption"), "┌─[■]─┐");
        assert_eq!(title(6, "caption"), "┌────┐");
        assert_eq!(title(2, "caption"), "┌┐");
    }

    #[test]
    fn window_draws_full_frame() {
        let mut surface = HeadlessSurface::new(12, 4);
        let mut canvases = Canvases::new(Style::default());
        let canvas = canvases.create_canvas_from(CanvasId::SCREEN, Rect::ZERO);
        let client = canvases.create_canvas_from(canvas, Rect::ZERO);
        let bounds = Rect::new(0, 0, 12, 4);
        canvases.update_bounds(canvas, bounds);

        let mut window = Window::new(View::new(canvas, client), "Edit");
        window.view_mut().set_bounds(bounds);
        assert_eq!(window.view().client_bounds(), Rect::new(1, 1, 10, 2));

        window.draw(&mut Painter::new(&mut canvases, &mut surface, canvas));
        assert_eq!(surface.row_text(0), "┌─[■] Edi ─┐");
        assert_eq!(surface.row_text(1), format!("│{}│", " ".repeat(10)));
        assert_eq!(surface.row_text(3), format!("└{}┘", "─".repeat(10)));
    }

    #[test]
    fn double_border_glyphs() {
        let chars = BorderType::Double.chars();
        assert_eq!(chars.upper_left, '╔');
        assert_eq!(chars.vertical, '║');
        assert_eq!(BorderType::Empty.chars().horizontal, ' ');
    }

    #[test]
    fn clamp_enforces_minimum_size() {
        assert_eq!(
            Window::clamp_bounds(Rect::new(3, 3, 0, 1)),
            Rect::new(3, 3, 2, 2)
        );
        assert_eq!(
            Window::clamp_bounds(Rect::new(0, 0, 8, 5)),
            Rect::new(0, 0, 8, 5)
        );
    }
}
