use crossterm::style::Color;

use crate::canvas::{CanvasId, Painter};
use crate::geometry::Rect;
use crate::terminal::Style;
use crate::tree::Context;

/// Replaces the default background fill of a view.
pub type DrawHook = Box<dyn FnMut(&mut Painter<'_>, &View)>;
/// Called after the view gains (`true`) or loses (`false`) activation.
pub type ActivateHook = Box<dyn FnMut(&mut Context<'_>, bool)>;
/// Called after a `ChangeBounds` message has been applied, with the new bounds.
pub type ChangeBoundsHook = Box<dyn FnMut(&mut Context<'_>, Rect)>;

/// Visual attributes shared by every drawable node.
pub struct View {
    bounds: Rect,
    /// Chrome reserved on every side of the client area.
    inset: i32,
    visible: bool,
    focused: bool,
    style: Style,
    canvas: CanvasId,
    client_canvas: CanvasId,
    pub(crate) on_draw: Option<DrawHook>,
    pub(crate) on_activate: Option<ActivateHook>,
    pub(crate) on_change_bounds: Option<ChangeBoundsHook>,
}

impl View {
    pub(crate) fn new(canvas: CanvasId, client_canvas: CanvasId) -> Self {
        Self {
            bounds: Rect::ZERO,
            inset: 0,
            visible: true,
            focused: false,
            style: Style::default(),
            canvas,
            client_canvas,
            on_draw: None,
            on_activate: None,
            on_change_bounds: None,
        }
    }

    pub(crate) fn with_inset(mut self, inset: i32) -> Self {
        self.inset = inset;
        self
    }

    /// Bounds in the parent's client coordinates.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub(crate) fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    /// Area available to children, relative to the view's own origin.
    pub fn client_bounds(&self) -> Rect {
        Rect::new(
            self.inset,
            self.inset,
            self.bounds.width - 2 * self.inset,
            self.bounds.height - 2 * self.inset,
        )
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn focused(&self) -> bool {
        self.focused
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    pub fn foreground(&self) -> Color {
        self.style.foreground
    }

    pub fn set_foreground(&mut self, color: Color) {
        self.style.foreground = color;
    }

    pub fn background(&self) -> Color {
        self.style.background
    }

    pub fn set_background(&mut self, color: Color) {
        self.style.background = color;
    }

    pub fn canvas(&self) -> CanvasId {
        self.canvas
    }

    /// Canvas children of this view draw through.
    pub fn client_canvas(&self) -> CanvasId {
        self.client_canvas
    }

    pub fn set_on_draw(&mut self, hook: impl FnMut(&mut Painter<'_>, &View) + 'static) {
        self.on_draw = Some(Box::new(hook));
    }

    pub fn set_on_activate(&mut self, hook: impl FnMut(&mut Context<'_>, bool) + 'static) {
        self.on_activate = Some(Box::new(hook));
    }

    pub fn set_on_change_bounds(&mut self, hook: impl FnMut(&mut Context<'_>, Rect) + 'static) {
        self.on_change_bounds = Some(Box::new(hook));
    }

    /// Default look: the whole view filled with its background.
    pub fn draw(&self, painter: &mut Painter<'_>) {
        if !self.visible {
            return;
        }
        painter.set_brush(self.style).fill(self.bounds.at_origin());
    }
}
