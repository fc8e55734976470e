//! Arena of components and the message dispatch over it.
//!
//! Nodes live in a flat map keyed by [`Handle`]. A child list owns the
//! lifetime of its entries; the parent link is only a back-reference used for
//! position resolution and z-order requests.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::time::Duration;

use tracing::{debug, trace};

use crate::bus::Bus;
use crate::canvas::{CanvasId, Canvases, Painter};
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::message::{Activation, Handle, Message, MessageKind};
use crate::terminal::{Style, Surface};
use crate::timer::{Tick, Timer};
use crate::view::View;
use crate::window::Window;
use crate::zorder;

/// Handles messages addressed to the node. Returns `false` to fall through to
/// the built-in handling.
pub type MessageHook = Box<dyn FnMut(&mut Context<'_>, &Message) -> bool>;
/// Decides the enabled state actually stored for a requested state.
pub type EnabledHook = Box<dyn FnMut(bool) -> bool>;

pub enum NodeKind {
    /// Invisible node that only routes messages.
    Component,
    View(View),
    Window(Window),
    Timer(Timer),
}

pub struct Node {
    handle: Handle,
    name: String,
    enabled: bool,
    zorder: i32,
    parent: Option<Handle>,
    /// Ascending z-order once sorted.
    children: Vec<Handle>,
    on_message: Option<MessageHook>,
    on_enabled: Option<EnabledHook>,
    kind: NodeKind,
}

impl Node {
    fn new(name: &str, kind: NodeKind) -> Self {
        let (enabled, zorder) = match kind {
            NodeKind::Timer(_) => (false, zorder::TOPMOST),
            _ => (true, 0),
        };
        Self {
            handle: Handle::new(),
            name: name.to_string(),
            enabled,
            zorder,
            parent: None,
            children: Vec::new(),
            on_message: None,
            on_enabled: None,
            kind,
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn zorder(&self) -> i32 {
        self.zorder
    }

    pub fn parent(&self) -> Option<Handle> {
        self.parent
    }

    pub fn children(&self) -> &[Handle] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// For timers this also requires the wait loop to be alive.
    pub fn is_enabled(&self) -> bool {
        match &self.kind {
            NodeKind::Timer(timer) => self.enabled && timer.is_running(),
            _ => self.enabled,
        }
    }

    pub fn view(&self) -> Option<&View> {
        match &self.kind {
            NodeKind::View(view) => Some(view),
            NodeKind::Window(window) => Some(&window.view),
            _ => None,
        }
    }

    pub fn view_mut(&mut self) -> Option<&mut View> {
        match &mut self.kind {
            NodeKind::View(view) => Some(view),
            NodeKind::Window(window) => Some(&mut window.view),
            _ => None,
        }
    }
}

/// What a hook sees: the tree and the node it belongs to.
pub struct Context<'a> {
    tree: &'a mut ComponentTree,
    handle: Handle,
}

impl<'a> Context<'a> {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn tree(&self) -> &ComponentTree {
        &*self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ComponentTree {
        &mut *self.tree
    }

    pub fn view(&self) -> Option<&View> {
        self.tree.view(self.handle)
    }

    pub fn view_mut(&mut self) -> Option<&mut View> {
        self.tree.view_mut(self.handle)
    }

    /// Queues `msg` from the run loop without blocking.
    pub fn post(&self, msg: Message) {
        self.tree.bus.post(msg);
    }

    /// Painter on this node's canvas, if it is drawable.
    pub fn painter(&mut self) -> Option<Painter<'_>> {
        self.tree.painter(self.handle)
    }
}

pub struct ComponentTree {
    nodes: HashMap<Handle, Node>,
    canvases: Canvases,
    surface: Box<dyn Surface>,
    bus: Bus,
}

impl ComponentTree {
    pub fn new(bus: Bus, surface: Box<dyn Surface>, screen_brush: Style) -> Self {
        Self {
            nodes: HashMap::new(),
            canvases: Canvases::new(screen_brush),
            surface,
            bus,
        }
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn surface(&self) -> &dyn Surface {
        &*self.surface
    }

    pub fn surface_mut(&mut self) -> &mut dyn Surface {
        &mut *self.surface
    }

    pub fn canvases(&self) -> &Canvases {
        &self.canvases
    }

    pub fn set_screen_brush(&mut self, brush: Style) {
        self.canvases.set_brush(CanvasId::SCREEN, brush);
    }

    /// Whether anything reached the surface since the last call.
    pub fn take_painted(&mut self) -> bool {
        self.canvases.take_painted()
    }

    /// Like [`ComponentTree::take_painted`] without resetting the flag.
    pub fn is_painted(&self) -> bool {
        self.canvases.is_painted()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.nodes.contains_key(&handle)
    }

    pub fn get(&self, handle: Handle) -> Option<&Node> {
        self.nodes.get(&handle)
    }

    fn node_mut(&mut self, handle: Handle) -> Result<&mut Node> {
        self.nodes.get_mut(&handle).ok_or(Error::UnknownNode(handle))
    }

    fn insert(&mut self, node: Node) -> Handle {
        let handle = node.handle;
        debug!(%handle, name = %node.name, "create node");
        self.nodes.insert(handle, node);
        handle
    }

    fn new_view(&mut self) -> View {
        let canvas = self.canvases.create_canvas_from(CanvasId::SCREEN, Rect::ZERO);
        let client = self.canvases.create_canvas_from(canvas, Rect::ZERO);
        View::new(canvas, client)
    }

    pub fn create_component(&mut self, name: &str) -> Handle {
        self.insert(Node::new(name, NodeKind::Component))
    }

    pub fn create_view(&mut self, name: &str) -> Handle {
        let view = self.new_view();
        self.insert(Node::new(name, NodeKind::View(view)))
    }

    /// Window captioned with its name.
    pub fn create_window(&mut self, name: &str) -> Handle {
        let window = Window::new(self.new_view(), name);
        self.insert(Node::new(name, NodeKind::Window(window)))
    }

    /// Disabled timer at the top z-order. Enable it to start ticking.
    pub fn create_timer(&mut self, name: &str, interval: Duration) -> Handle {
        self.insert(Node::new(name, NodeKind::Timer(Timer::new(interval))))
    }

    pub fn name(&self, handle: Handle) -> Option<&str> {
        self.get(handle).map(Node::name)
    }

    pub fn parent(&self, handle: Handle) -> Option<Handle> {
        self.get(handle).and_then(Node::parent)
    }

    pub fn children(&self, handle: Handle) -> Option<&[Handle]> {
        self.get(handle).map(Node::children)
    }

    pub fn zorder(&self, handle: Handle) -> Option<i32> {
        self.get(handle).map(Node::zorder)
    }

    pub fn is_enabled(&self, handle: Handle) -> bool {
        self.get(handle).is_some_and(Node::is_enabled)
    }

    pub fn view(&self, handle: Handle) -> Option<&View> {
        self.get(handle).and_then(Node::view)
    }

    pub fn view_mut(&mut self, handle: Handle) -> Option<&mut View> {
        self.nodes.get_mut(&handle).and_then(Node::view_mut)
    }

    pub fn window(&self, handle: Handle) -> Option<&Window> {
        match self.get(handle).map(Node::kind) {
            Some(NodeKind::Window(window)) => Some(window),
            _ => None,
        }
    }

    pub fn window_mut(&mut self, handle: Handle) -> Option<&mut Window> {
        match self.nodes.get_mut(&handle).map(|node| &mut node.kind) {
            Some(NodeKind::Window(window)) => Some(window),
            _ => None,
        }
    }

    pub fn timer(&self, handle: Handle) -> Option<&Timer> {
        match self.get(handle).map(Node::kind) {
            Some(NodeKind::Timer(timer)) => Some(timer),
            _ => None,
        }
    }

    fn timer_mut(&mut self, handle: Handle) -> Option<&mut Timer> {
        match self.nodes.get_mut(&handle).map(|node| &mut node.kind) {
            Some(NodeKind::Timer(timer)) => Some(timer),
            _ => None,
        }
    }

    pub fn set_on_message(
        &mut self,
        handle: Handle,
        hook: impl FnMut(&mut Context<'_>, &Message) -> bool + 'static,
    ) -> Result<()> {
        self.node_mut(handle)?.on_message = Some(Box::new(hook));
        Ok(())
    }

    pub fn set_on_enabled(
        &mut self,
        handle: Handle,
        hook: impl FnMut(bool) -> bool + 'static,
    ) -> Result<()> {
        self.node_mut(handle)?.on_enabled = Some(Box::new(hook));
        Ok(())
    }

    pub fn set_timer_callback(
        &mut self,
        handle: Handle,
        callback: impl FnMut(&Tick) -> ControlFlow<()> + Send + 'static,
    ) -> Result<()> {
        self.timer_mut(handle)
            .ok_or(Error::UnknownNode(handle))?
            .set_callback(callback);
        Ok(())
    }

    /// Changes the tick interval, restarting a running timer.
    pub fn set_interval(&mut self, handle: Handle, interval: Duration) -> Result<()> {
        let timer = self.timer_mut(handle).ok_or(Error::UnknownNode(handle))?;
        timer.set_interval(interval);
        if timer.is_running() {
            self.start_timer(handle);
        }
        Ok(())
    }

    fn start_timer(&mut self, handle: Handle) {
        let tick = Tick {
            timer: handle,
            parent: self.parent(handle),
            bus: self.bus.clone(),
        };
        if let Some(timer) = self.timer_mut(handle) {
            timer.start(tick);
        }
    }

    fn is_ancestor(&self, ancestor: Handle, handle: Handle) -> bool {
        let mut current = Some(handle);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Attaches `child` under `parent`, detaching it from any previous parent.
    /// The child lands after siblings with the same z-order.
    pub fn add_child(&mut self, parent: Handle, child: Handle) -> Result<()> {
        if !self.contains(parent) {
            return Err(Error::UnknownNode(parent));
        }
        let Some(zorder) = self.zorder(child) else {
            return Err(Error::UnknownNode(child));
        };
        if self.is_ancestor(child, parent) {
            return Err(Error::WouldCycle { parent, child });
        }

        if let Some(previous) = self.parent(child) {
            self.detach(previous, child);
        }

        let index = self
            .children(parent)
            .map(|siblings| {
                zorder::insertion_index(siblings, zorder, |sibling| {
                    self.zorder(*sibling).unwrap_or_default()
                })
            })
            .unwrap_or_default();
        self.node_mut(parent)?.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        debug!(%parent, %child, index, "add child");

        self.rebind_canvas(child);
        if self.timer(child).is_some_and(Timer::is_running) {
            self.start_timer(child);
        }
        Ok(())
    }

    /// Detaches `child` from `parent`, keeping the order of the remaining
    /// children. The child and its subtree stay alive in the arena.
    pub fn remove_child(&mut self, parent: Handle, child: Handle) -> Result<()> {
        if !self.contains(parent) {
            return Err(Error::UnknownNode(parent));
        }
        if self.detach(parent, child) {
            debug!(%parent, %child, "remove child");
            self.rebind_canvas(child);
            if self.timer(child).is_some_and(Timer::is_running) {
                self.start_timer(child);
            }
        }
        Ok(())
    }

    fn detach(&mut self, parent: Handle, child: Handle) -> bool {
        let Some(node) = self.nodes.get_mut(&parent) else {
            return false;
        };
        let Some(index) = node.children.iter().position(|c| *c == child) else {
            return false;
        };
        node.children.remove(index);
        if let Some(child) = self.nodes.get_mut(&child) {
            child.parent = None;
        }
        true
    }

    /// Removes `handle` and its whole subtree from the arena.
    pub fn destroy(&mut self, handle: Handle) -> Result<()> {
        if !self.contains(handle) {
            return Err(Error::UnknownNode(handle));
        }
        if let Some(parent) = self.parent(handle) {
            self.detach(parent, handle);
        }

        let mut pending = vec![handle];
        while let Some(current) = pending.pop() {
            let Some(mut node) = self.nodes.remove(&current) else {
                continue;
            };
            pending.extend(node.children.drain(..));
            if let Some(view) = node.view() {
                self.canvases.release(view.client_canvas());
                self.canvases.release(view.canvas());
            }
            // Dropping a timer cancels its task.
            trace!(handle = %current, name = %node.name, "destroy node");
        }
        Ok(())
    }

    /// Canvas the children of `handle` draw through: the client canvas of the
    /// nearest view at or above it, or the screen.
    fn host_canvas(&self, handle: Option<Handle>) -> CanvasId {
        let mut current = handle;
        while let Some(node) = current.and_then(|h| self.get(h)) {
            if let Some(view) = node.view() {
                return view.client_canvas();
            }
            current = node.parent;
        }
        CanvasId::SCREEN
    }

    fn rebind_canvas(&mut self, handle: Handle) {
        let host = self.host_canvas(self.parent(handle));
        let Some(node) = self.get(handle) else {
            return;
        };
        match node.view().map(View::canvas) {
            Some(canvas) => self.canvases.reparent(canvas, host),
            None => {
                for child in node.children.clone() {
                    self.rebind_canvas(child);
                }
            }
        }
    }

    /// Moves and resizes a view, rebinding its canvases in place.
    pub fn set_bounds(&mut self, handle: Handle, bounds: Rect) -> Result<()> {
        let view = self.view_mut(handle).ok_or(Error::UnknownNode(handle))?;
        view.set_bounds(bounds);
        let (canvas, client_canvas, client) =
            (view.canvas(), view.client_canvas(), view.client_bounds());
        self.canvases.update_bounds(canvas, bounds);
        self.canvases.update_bounds(client_canvas, client);
        Ok(())
    }

    /// Applies the enable hook, if any, and returns the state actually stored.
    /// Timers start or stop to match.
    pub fn set_enabled(&mut self, handle: Handle, enabled: bool) -> Result<bool> {
        let node = self.node_mut(handle)?;
        let stored = match node.on_enabled.as_mut() {
            Some(hook) => hook(enabled),
            None => enabled,
        };
        node.enabled = stored;
        if stored != enabled {
            trace!(%handle, requested = enabled, stored, "enable vetoed");
        }

        let running = self.timer(handle).map(Timer::is_running);
        match running {
            Some(false) if stored => self.start_timer(handle),
            Some(true) if !stored => {
                if let Some(timer) = self.timer_mut(handle) {
                    timer.stop();
                }
            }
            _ => {}
        }
        Ok(stored)
    }

    /// Only stores the value. Send `ZOrderChanged` to the parent to re-sort.
    pub fn set_zorder(&mut self, handle: Handle, zorder: i32) -> Result<()> {
        self.node_mut(handle)?.zorder = zorder;
        Ok(())
    }

    fn sort_children(&mut self, handle: Handle) {
        let Some(mut children) = self.get(handle).map(|node| node.children.clone()) else {
            return;
        };
        zorder::sort_by_zorder(&mut children, |child| {
            self.zorder(*child).unwrap_or_default()
        });
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.children = children;
        }
    }

    /// Delivers `msg` to the subtree rooted at `handle`. Returns `true` when
    /// a node in the subtree was the message's target.
    pub fn handle_message(&mut self, handle: Handle, msg: &Message) -> bool {
        let Some(children) = self.children(handle).map(<[Handle]>::to_vec) else {
            return false;
        };

        if msg.target == handle {
            self.handle_own(handle, msg);
            return true;
        }

        if msg.is_broadcast() {
            self.handle_own(handle, msg);
            for child in children {
                self.handle_message(child, msg);
            }
            return false;
        }

        children
            .into_iter()
            .any(|child| self.handle_message(child, msg))
    }

    fn handle_own(&mut self, handle: Handle, msg: &Message) {
        trace!(%handle, kind = ?msg.kind, "handle message");
        let hook = self
            .nodes
            .get_mut(&handle)
            .and_then(|node| node.on_message.take());
        if let Some(mut hook) = hook {
            let handled = hook(&mut Context { tree: self, handle }, msg);
            if let Some(node) = self.nodes.get_mut(&handle) {
                node.on_message.get_or_insert(hook);
            }
            if handled {
                return;
            }
        }

        match msg.kind {
            MessageKind::ZOrderChanged => {
                self.sort_children(handle);
                self.bus.post(Message::draw(handle));
            }
            MessageKind::Draw => self.draw(handle, msg.is_broadcast()),
            MessageKind::Enable => {
                if let Some(enabled) = msg.enabled() {
                    if let Err(err) = self.set_enabled(handle, enabled) {
                        trace!(%handle, %err, "enable message failed");
                    }
                }
            }
            MessageKind::ChangeBounds => {
                if let Some(bounds) = msg.bounds() {
                    self.change_bounds(handle, bounds);
                }
            }
            MessageKind::Activate => {
                if let Some(activation) = msg.activation() {
                    self.activate(handle, activation == Activation::Active);
                }
            }
            _ => {}
        }
    }

    fn change_bounds(&mut self, handle: Handle, bounds: Rect) {
        let bounds = if self.window(handle).is_some() {
            Window::clamp_bounds(bounds)
        } else {
            bounds
        };
        if self.set_bounds(handle, bounds).is_err() {
            return;
        }

        let hook = self
            .view_mut(handle)
            .and_then(|view| view.on_change_bounds.take());
        if let Some(mut hook) = hook {
            hook(&mut Context { tree: self, handle }, bounds);
            if let Some(view) = self.view_mut(handle) {
                view.on_change_bounds.get_or_insert(hook);
            }
        }

        // The old area may have covered other views.
        self.bus.post(Message::draw(Handle::APPLICATION));
    }

    fn activate(&mut self, handle: Handle, active: bool) {
        let hook = self.view_mut(handle).and_then(|view| view.on_activate.take());
        let Some(mut hook) = hook else {
            if self.view(handle).is_some() {
                self.bus.post(Message::draw(handle));
            }
            return;
        };
        hook(&mut Context { tree: self, handle }, active);
        if let Some(view) = self.view_mut(handle) {
            view.on_activate.get_or_insert(hook);
        }
        self.bus.post(Message::draw(handle));
    }

    /// Targeted draws paint the node and then each child back to front. A
    /// broadcast draw paints only the node; forwarding reaches the children.
    fn draw(&mut self, handle: Handle, broadcast: bool) {
        let drawable = self.is_drawable(handle);
        if drawable {
            self.paint(handle);
        }
        if broadcast || (!drawable && self.view(handle).is_some()) {
            return;
        }
        let children = self.children(handle).map(<[Handle]>::to_vec).unwrap_or_default();
        for child in children {
            self.handle_message(child, &Message::draw(child));
        }
    }

    fn paint(&mut self, handle: Handle) {
        let hook = self.view_mut(handle).and_then(|view| view.on_draw.take());
        let Some(node) = self.nodes.get(&handle) else {
            return;
        };
        let Some(view) = node.view() else {
            return;
        };
        let mut painter = Painter::new(&mut self.canvases, &mut *self.surface, view.canvas());
        let hook = match (&node.kind, hook) {
            (_, Some(mut hook)) => {
                hook(&mut painter, view);
                Some(hook)
            }
            (NodeKind::Window(window), None) => {
                window.draw(&mut painter);
                None
            }
            (_, None) => {
                view.draw(&mut painter);
                None
            }
        };
        if let (Some(hook), Some(view)) = (hook, self.view_mut(handle)) {
            view.on_draw.get_or_insert(hook);
        }
    }

    /// Painter on the canvas of a view, or `None` for non-visual nodes.
    pub fn painter(&mut self, handle: Handle) -> Option<Painter<'_>> {
        let canvas = self.view(handle)?.canvas();
        Some(Painter::new(&mut self.canvases, &mut *self.surface, canvas))
    }

    /// Painter on the whole screen, below every window.
    pub fn screen_painter(&mut self) -> Painter<'_> {
        Painter::new(&mut self.canvases, &mut *self.surface, CanvasId::SCREEN)
    }

    /// Nearest view strictly above `handle`; plain components are skipped.
    fn view_ancestor(&self, handle: Handle) -> Option<Handle> {
        let mut current = self.parent(handle);
        while let Some(candidate) = current {
            if self.view(candidate).is_some() {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// Screen rectangle of a view after clipping by every ancestor's client
    /// area. [`Rect::ZERO`] as soon as any level clips it away entirely.
    pub fn calculate_absolute_position(&self, handle: Handle) -> Rect {
        let Some(view) = self.view(handle) else {
            return Rect::ZERO;
        };
        let mut rect = view.bounds();
        let mut ancestor = self.view_ancestor(handle);

        while let Some(parent) = ancestor {
            let Some(parent_view) = self.view(parent) else {
                break;
            };
            let bounds = parent_view.bounds();
            let client = parent_view.client_bounds();
            let origin_x = bounds.x + client.x;
            let origin_y = bounds.y + client.y;

            rect = rect.translate(origin_x, origin_y);
            let visible = Rect::new(
                origin_x,
                origin_y,
                bounds.width.min(client.width),
                bounds.height.min(client.height),
            );
            rect = rect.intersect(&visible);
            if rect.is_empty() {
                return Rect::ZERO;
            }
            ancestor = self.view_ancestor(parent);
        }
        rect
    }

    /// Visible itself and under visible ancestors, with a non-empty absolute
    /// rectangle. Non-visual nodes are always drawable.
    pub fn is_drawable(&self, handle: Handle) -> bool {
        let Some(view) = self.view(handle) else {
            return self.contains(handle);
        };
        if !view.visible() {
            return false;
        }
        let mut ancestor = self.view_ancestor(handle);
        while let Some(parent) = ancestor {
            if !self.view(parent).is_some_and(View::visible) {
                return false;
            }
            ancestor = self.view_ancestor(parent);
        }
        !self.calculate_absolute_position(handle).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{self, Mailbox};
    use crate::message::Payload;
    use crate::terminal::HeadlessSurface;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn tree() -> (ComponentTree, Mailbox) {
        let (bus, mailbox) = bus::channel();
        let surface = HeadlessSurface::new(80, 25);
        (
            ComponentTree::new(bus, Box::new(surface), Style::default()),
            mailbox,
        )
    }

    fn record(tree: &mut ComponentTree, handle: Handle, log: &Rc<RefCell<Vec<String>>>) {
        let log = log.clone();
        let name = tree.name(handle).unwrap_or_default().to_string();
        tree.set_on_message(handle, move |_, msg| {
            log.borrow_mut().push(format!("{name}:{:?}", msg.kind));
            true
        })
        .unwrap();
    }

    fn names(tree: &ComponentTree, handles: &[Handle]) -> Vec<String> {
        handles
            .iter()
            .map(|h| tree.name(*h).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn zorder_changed_sorts_children_stably() {
        let (mut tree, mailbox) = tree();
        let root = tree.create_component("root");
        let zorders = [("a", 5), ("b", 1), ("c", 5), ("d", -3), ("e", 1)];
        let mut handles = Vec::new();
        for (name, _) in zorders {
            let child = tree.create_component(name);
            tree.add_child(root, child).unwrap();
            handles.push(child);
        }
        for (handle, (_, zorder)) in handles.iter().zip(zorders) {
            tree.set_zorder(*handle, zorder).unwrap();
        }
        // Setting the field alone does not re-sort.
        assert_eq!(
            names(&tree, tree.children(root).unwrap()),
            ["a", "b", "c", "d", "e"]
        );

        tree.handle_message(root, &Message::zorder_changed(root));
        assert_eq!(
            names(&tree, tree.children(root).unwrap()),
            ["d", "b", "e", "a", "c"]
        );
        let redraw = mailbox.try_receive().unwrap();
        assert_eq!((redraw.target, redraw.kind), (root, MessageKind::Draw));
    }

    #[test]
    fn add_child_inserts_by_zorder() {
        let (mut tree, _mailbox) = tree();
        let root = tree.create_component("root");
        let timer = tree.create_timer("timer", Duration::from_secs(60));
        let low = tree.create_component("low");
        let high = tree.create_component("high");
        tree.set_zorder(high, 10).unwrap();

        tree.add_child(root, timer).unwrap();
        tree.add_child(root, high).unwrap();
        tree.add_child(root, low).unwrap();
        assert_eq!(
            names(&tree, tree.children(root).unwrap()),
            ["low", "high", "timer"]
        );
    }

    #[test]
    fn broadcast_reaches_every_node_once() {
        let (mut tree, _mailbox) = tree();
        let log = Rc::new(RefCell::new(Vec::new()));
        let root = tree.create_component("root");
        let mut all = vec![root];
        let mut frontier = vec![root];
        for depth in 0..3 {
            let mut next = Vec::new();
            for parent in frontier {
                for i in 0..=depth {
                    let child = tree.create_component(&format!("n{depth}{i}"));
                    tree.add_child(parent, child).unwrap();
                    next.push(child);
                    all.push(child);
                }
            }
            frontier = next;
        }
        for handle in &all {
            record(&mut tree, *handle, &log);
        }

        let stop = tree.handle_message(root, &Message::empty());
        assert!(!stop);
        assert_eq!(log.borrow().len(), all.len());
        assert_eq!(log.borrow()[0], "root:Null");
    }

    #[test]
    fn targeted_message_reaches_only_its_target() {
        let (mut tree, _mailbox) = tree();
        let log = Rc::new(RefCell::new(Vec::new()));
        let root = tree.create_component("root");
        let left = tree.create_component("left");
        let right = tree.create_component("right");
        let leaf = tree.create_component("leaf");
        tree.add_child(root, left).unwrap();
        tree.add_child(root, right).unwrap();
        tree.add_child(left, leaf).unwrap();
        for handle in [root, left, right, leaf] {
            record(&mut tree, handle, &log);
        }

        let ping = Message::new(leaf, MessageKind::user(1), Payload::None);
        assert!(tree.handle_message(root, &ping));
        assert_eq!(*log.borrow(), [format!("leaf:{:?}", MessageKind::user(1))]);

        log.borrow_mut().clear();
        let stray = Message::new(Handle::new(), MessageKind::Null, Payload::None);
        assert!(!tree.handle_message(root, &stray));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn hook_returning_false_falls_through() {
        let (mut tree, _mailbox) = tree();
        let node = tree.create_component("node");
        let seen = Rc::new(RefCell::new(0));
        {
            let seen = seen.clone();
            tree.set_on_message(node, move |_, _| {
                *seen.borrow_mut() += 1;
                false
            })
            .unwrap();
        }
        tree.handle_message(node, &Message::enable(node, false));
        assert_eq!(*seen.borrow(), 1);
        assert!(!tree.is_enabled(node));
    }

    #[test]
    fn enable_hook_can_veto() {
        let (mut tree, _mailbox) = tree();
        let node = tree.create_component("stubborn");
        tree.set_on_enabled(node, |_| true).unwrap();

        assert!(tree.set_enabled(node, false).unwrap());
        assert!(tree.is_enabled(node));

        tree.handle_message(node, &Message::enable(node, false));
        assert!(tree.is_enabled(node));
    }

    #[test]
    fn remove_child_keeps_order_and_subtree() {
        let (mut tree, _mailbox) = tree();
        let root = tree.create_component("root");
        let kids: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|name| {
                let child = tree.create_component(name);
                tree.add_child(root, child).unwrap();
                child
            })
            .collect();
        let grandchild = tree.create_component("g");
        tree.add_child(kids[1], grandchild).unwrap();

        tree.remove_child(root, kids[1]).unwrap();
        assert_eq!(names(&tree, tree.children(root).unwrap()), ["a", "c", "d"]);
        assert_eq!(tree.parent(kids[1]), None);
        assert_eq!(tree.parent(grandchild), Some(kids[1]));
        assert!(tree.contains(grandchild));
    }

    #[test]
    fn reparenting_moves_between_lists() {
        let (mut tree, _mailbox) = tree();
        let first = tree.create_component("first");
        let second = tree.create_component("second");
        let child = tree.create_component("child");
        tree.add_child(first, child).unwrap();
        tree.add_child(second, child).unwrap();

        assert!(tree.children(first).unwrap().is_empty());
        assert_eq!(tree.children(second).unwrap(), [child]);
        assert_eq!(tree.parent(child), Some(second));
    }

    #[test]
    fn cycles_are_rejected() {
        let (mut tree, _mailbox) = tree();
        let a = tree.create_component("a");
        let b = tree.create_component("b");
        tree.add_child(a, b).unwrap();
        assert!(matches!(tree.add_child(b, a), Err(Error::WouldCycle { .. })));
        assert!(matches!(tree.add_child(a, a), Err(Error::WouldCycle { .. })));
        assert!(matches!(
            tree.add_child(a, Handle::new()),
            Err(Error::UnknownNode(_))
        ));
    }

    #[test]
    fn destroy_removes_subtree_and_canvases() {
        let (mut tree, _mailbox) = tree();
        let window = tree.create_window("w");
        let view = tree.create_view("v");
        let timer = tree.create_timer("t", Duration::from_secs(60));
        tree.add_child(window, view).unwrap();
        tree.add_child(view, timer).unwrap();
        assert_eq!(tree.canvases().len(), 4);

        tree.destroy(window).unwrap();
        assert!(tree.is_empty());
        assert!(tree.canvases().is_empty());
        assert!(matches!(tree.destroy(window), Err(Error::UnknownNode(_))));
    }

    fn nested(tree: &mut ComponentTree, grandchild_bounds: Rect) -> (Handle, Handle, Handle) {
        let parent = tree.create_view("parent");
        let child = tree.create_view("child");
        let grandchild = tree.create_view("grandchild");
        tree.add_child(parent, child).unwrap();
        tree.add_child(child, grandchild).unwrap();
        tree.set_bounds(parent, Rect::new(0, 0, 50, 30)).unwrap();
        tree.set_bounds(child, Rect::new(2, 2, 40, 20)).unwrap();
        tree.set_bounds(grandchild, grandchild_bounds).unwrap();
        (parent, child, grandchild)
    }

    #[test]
    fn absolute_position_composes_offsets() {
        let (mut tree, _mailbox) = tree();
        let (_, _, grandchild) = nested(&mut tree, Rect::new(2, 2, 5, 5));
        assert_eq!(
            tree.calculate_absolute_position(grandchild),
            Rect::new(4, 4, 5, 5)
        );
        assert!(tree.is_drawable(grandchild));
    }

    #[test]
    fn absolute_position_clips_out() {
        let (mut tree, _mailbox) = tree();
        let (_, _, grandchild) = nested(&mut tree, Rect::new(-30, -30, 5, 5));
        assert_eq!(tree.calculate_absolute_position(grandchild), Rect::ZERO);
        assert!(!tree.is_drawable(grandchild));
    }

    #[test]
    fn absolute_position_short_circuits_on_hidden_ancestor() {
        let (mut tree, _mailbox) = tree();
        let (_, child, grandchild) = nested(&mut tree, Rect::new(1, 1, 3, 3));
        tree.set_bounds(child, Rect::new(60, 40, 10, 10)).unwrap();
        assert_eq!(tree.calculate_absolute_position(grandchild), Rect::ZERO);
    }

    #[test]
    fn absolute_position_respects_window_client_area() {
        let (mut tree, _mailbox) = tree();
        let window = tree.create_window("w");
        let view = tree.create_view("v");
        tree.add_child(window, view).unwrap();
        tree.set_bounds(window, Rect::new(10, 5, 20, 10)).unwrap();
        tree.set_bounds(view, Rect::new(-1, 0, 30, 3)).unwrap();
        assert_eq!(
            tree.calculate_absolute_position(view),
            Rect::new(11, 6, 18, 3)
        );
    }

    #[test]
    fn hidden_ancestor_hides_descendants() {
        let (mut tree, _mailbox) = tree();
        let window = tree.create_window("w");
        let panel = tree.create_view("panel");
        let view = tree.create_view("v");
        tree.add_child(window, panel).unwrap();
        tree.add_child(panel, view).unwrap();
        tree.set_bounds(window, Rect::new(0, 0, 20, 10)).unwrap();
        tree.set_bounds(panel, Rect::new(0, 0, 10, 5)).unwrap();
        tree.set_bounds(view, Rect::new(1, 1, 3, 2)).unwrap();
        assert!(tree.is_drawable(view));

        tree.view_mut(window).unwrap().set_visible(false);
        assert!(!tree.is_drawable(panel));
        assert!(!tree.is_drawable(view));
        tree.handle_message(window, &Message::draw(window));
        assert!(!tree.take_painted());

        tree.view_mut(window).unwrap().set_visible(true);
        assert!(tree.is_drawable(view));
    }

    #[test]
    fn targeted_draw_paints_children_through_canvas_chain() {
        let (mut tree, _mailbox) = tree();
        let window = tree.create_window("w");
        let view = tree.create_view("v");
        tree.add_child(window, view).unwrap();
        tree.set_bounds(window, Rect::new(10, 5, 20, 10)).unwrap();
        tree.set_bounds(view, Rect::new(0, 0, 2, 1)).unwrap();
        tree.view_mut(view)
            .unwrap()
            .set_on_draw(|painter, _| {
                painter.print_str(0, 0, "ok");
            });

        assert!(tree.handle_message(window, &Message::draw(window)));
        assert!(tree.take_painted());
        let cell = |x, y| tree.surface().cell(x, y).map(|c| c.ch);
        assert_eq!(cell(10, 5), Some('┌'));
        assert_eq!(cell(11, 6), Some('o'));
        assert_eq!(cell(12, 6), Some('k'));
    }

    #[test]
    fn change_bounds_clamps_windows_and_requests_redraw() {
        let (mut tree, mailbox) = tree();
        let window = tree.create_window("w");
        let moved = Rc::new(RefCell::new(None));
        {
            let moved = moved.clone();
            tree.view_mut(window)
                .unwrap()
                .set_on_change_bounds(move |_, bounds| *moved.borrow_mut() = Some(bounds));
        }

        tree.handle_message(window, &Message::change_bounds(window, Rect::new(1, 1, 1, 0)));
        assert_eq!(tree.view(window).unwrap().bounds(), Rect::new(1, 1, 2, 2));
        assert_eq!(*moved.borrow(), Some(Rect::new(1, 1, 2, 2)));
        let redraw = mailbox.try_receive().unwrap();
        assert_eq!(
            (redraw.target, redraw.kind),
            (Handle::APPLICATION, MessageKind::Draw)
        );
    }

    #[test]
    fn disabling_a_timer_stops_it() {
        let (mut tree, _mailbox) = tree();
        let timer = tree.create_timer("t", Duration::from_secs(60));
        assert!(!tree.is_enabled(timer));

        tree.set_enabled(timer, true).unwrap();
        assert!(tree.is_enabled(timer));
        assert!(tree.timer(timer).unwrap().is_running());

        tree.set_interval(timer, Duration::from_secs(30)).unwrap();
        assert!(tree.timer(timer).unwrap().is_running());
        assert_eq!(tree.timer(timer).unwrap().interval(), Duration::from_secs(30));

        tree.handle_message(timer, &Message::enable(timer, false));
        assert!(!tree.is_enabled(timer));
        assert!(!tree.timer(timer).unwrap().is_running());
    }

    #[test]
    fn timer_ticks_reach_parent_through_bus() {
        let (mut tree, mailbox) = tree();
        let parent = tree.create_component("parent");
        let timer = tree.create_timer("t", Duration::from_millis(5));
        tree.add_child(parent, timer).unwrap();
        tree.set_enabled(timer, true).unwrap();

        let tick = mailbox.receive_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!((tick.target, tick.kind), (parent, MessageKind::Timer));
        tree.set_enabled(timer, false).unwrap();
    }
}
