//! Chained drawing proxies.
//!
//! Every view owns a canvas whose offset is the view's bounds in its parent's
//! client coordinates and whose draw area is the view's own local rectangle.
//! A write is checked against each canvas's draw area on the way up and
//! translated by its offset, until it reaches [`CanvasId::SCREEN`], where it
//! becomes a cell on the [`Surface`]. A write that falls outside any level is
//! dropped silently.

use std::collections::HashMap;

use tracing::trace;
use unicode_width::UnicodeWidthChar;

use crate::geometry::Rect;
use crate::terminal::{Style, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasId(u64);

impl CanvasId {
    /// The physical screen every chain terminates at.
    pub const SCREEN: CanvasId = CanvasId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    parent: CanvasId,
    brush: Style,
    /// Converts local positions to parent positions.
    offset: Rect,
    /// Local drawable area.
    draw: Rect,
}

impl Canvas {
    fn new(parent: CanvasId, offset: Rect, brush: Style) -> Self {
        Self {
            parent,
            brush,
            offset,
            draw: offset.at_origin(),
        }
    }

    pub fn parent(&self) -> CanvasId {
        self.parent
    }

    pub fn offset(&self) -> Rect {
        self.offset
    }

    pub fn draw_area(&self) -> Rect {
        self.draw
    }

    pub fn brush(&self) -> Style {
        self.brush
    }
}

/// Arena of canvases, keyed by [`CanvasId`].
pub struct Canvases {
    slots: HashMap<CanvasId, Canvas>,
    next: u64,
    screen_brush: Style,
    painted: bool,
}

impl Canvases {
    pub fn new(screen_brush: Style) -> Self {
        Self {
            slots: HashMap::new(),
            next: 1,
            screen_brush,
            painted: false,
        }
    }

    /// Child canvas of `parent` placed at `rect`, drawing in `{0, 0, rect.width, rect.height}`.
    pub fn create_canvas_from(&mut self, parent: CanvasId, rect: Rect) -> CanvasId {
        let id = CanvasId(self.next);
        self.next += 1;
        let brush = self.brush(parent);
        self.slots.insert(id, Canvas::new(parent, rect, brush));
        trace!(canvas = id.0, parent = parent.0, ?rect, "create canvas");
        id
    }

    /// Rebinds an existing canvas to a new offset and draw area in place.
    pub fn update_bounds(&mut self, id: CanvasId, rect: Rect) {
        if let Some(canvas) = self.slots.get_mut(&id) {
            canvas.offset = rect;
            canvas.draw = rect.at_origin();
        }
    }

    pub fn reparent(&mut self, id: CanvasId, parent: CanvasId) {
        if id == parent {
            return;
        }
        if let Some(canvas) = self.slots.get_mut(&id) {
            canvas.parent = parent;
        }
    }

    pub fn release(&mut self, id: CanvasId) {
        self.slots.remove(&id);
    }

    pub fn get(&self, id: CanvasId) -> Option<&Canvas> {
        self.slots.get(&id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn set_brush(&mut self, id: CanvasId, brush: Style) {
        if id == CanvasId::SCREEN {
            self.screen_brush = brush;
        } else if let Some(canvas) = self.slots.get_mut(&id) {
            canvas.brush = brush;
        }
    }

    pub fn brush(&self, id: CanvasId) -> Style {
        self.slots
            .get(&id)
            .map(|canvas| canvas.brush)
            .unwrap_or(self.screen_brush)
    }

    /// Screen position of local point `(x, y)` on canvas `id`, or `None` when
    /// some canvas in the chain clips it.
    pub fn resolve(&self, id: CanvasId, x: i32, y: i32) -> Option<(i32, i32)> {
        let (mut id, mut x, mut y) = (id, x, y);
        while id != CanvasId::SCREEN {
            let canvas = self.slots.get(&id)?;
            if !canvas.draw.contains(x, y) {
                return None;
            }
            x += canvas.offset.x;
            y += canvas.offset.y;
            id = canvas.parent;
        }
        Some((x, y))
    }

    /// Whether anything reached the screen since the last call.
    pub fn take_painted(&mut self) -> bool {
        std::mem::take(&mut self.painted)
    }

    pub fn is_painted(&self) -> bool {
        self.painted
    }

    pub(crate) fn mark_painted(&mut self) {
        self.painted = true;
    }
}

/// Drawing handle for one canvas.
pub struct Painter<'a> {
    canvases: &'a mut Canvases,
    surface: &'a mut dyn Surface,
    canvas: CanvasId,
}

impl<'a> Painter<'a> {
    pub fn new(canvases: &'a mut Canvases, surface: &'a mut dyn Surface, canvas: CanvasId) -> Self {
        Self {
            canvases,
            surface,
            canvas,
        }
    }

    pub fn canvas(&self) -> CanvasId {
        self.canvas
    }

    /// Painter for another canvas sharing the same surface.
    pub fn on(&mut self, canvas: CanvasId) -> Painter<'_> {
        Painter {
            canvases: self.canvases,
            surface: self.surface,
            canvas,
        }
    }

    /// Local drawable area, or the whole screen for the screen canvas.
    pub fn area(&self) -> Rect {
        match self.canvases.get(self.canvas) {
            Some(canvas) => canvas.draw_area(),
            None => {
                let (width, height) = self.surface.size();
                Rect::sized(width as i32, height as i32)
            }
        }
    }

    pub fn set_brush(&mut self, brush: Style) -> &mut Self {
        self.canvases.set_brush(self.canvas, brush);
        self
    }

    pub fn brush(&self) -> Style {
        self.canvases.brush(self.canvas)
    }

    pub fn print_char(&mut self, x: i32, y: i32, ch: char) -> &mut Self {
        let brush = self.brush();
        self.print_char_with_brush(x, y, ch, brush)
    }

    pub fn print_char_with_brush(&mut self, x: i32, y: i32, ch: char, brush: Style) -> &mut Self {
        if let Some((sx, sy)) = self.canvases.resolve(self.canvas, x, y) {
            self.surface.set_cell(sx, sy, ch, brush);
            self.canvases.mark_painted();
        }
        self
    }

    /// Prints `text` from `(x, y)` and returns the column after the last
    /// character. Wide characters advance by their display width.
    pub fn print_str(&mut self, x: i32, y: i32, text: &str) -> i32 {
        let mut column = x;
        for ch in text.chars() {
            let width = ch.width().unwrap_or(0) as i32;
            if width == 0 {
                continue;
            }
            self.print_char(column, y, ch);
            column += width;
        }
        column
    }

    /// Paints `bounds` (local coordinates) with spaces in the current brush.
    pub fn fill(&mut self, bounds: Rect) -> &mut Self {
        let visible = bounds.intersect(&self.area());
        for y in visible.y..visible.bottom() {
            for x in visible.x..visible.right() {
                self.print_char(x, y, ' ');
            }
        }
        self
    }
}
