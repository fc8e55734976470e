use std::env;
use std::fs::File;
use std::ops::ControlFlow;
use std::time::Duration;

use anyhow::{Context as _, Result};
use crossterm::event::KeyCode;
use crossterm::style::Color;
use tracing::{info, trace};
use tracing_subscriber::EnvFilter;

use termvision::terminal::{CrosstermEvents, CrosstermSurface};
use termvision::{
    Application, ApplicationConfig, ComponentTree, Handle, Message, MessageKind, Rect,
};

fn main() -> Result<()> {
    // stdout belongs to the UI, so logs go to a file (termvision.log by default)
    let log_path = env::var("TERMVISION_LOG").unwrap_or_else(|_| "termvision.log".to_string());
    let log_file =
        File::create(&log_path).with_context(|| format!("failed to create log file {log_path}"))?;
    let (writer, _guard) = tracing_appender::non_blocking(log_file);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_writer(writer)
        .with_ansi(false)
        .init();

    info!("termvision demo starting");

    let mut app = Application::new(
        ApplicationConfig::from_env(),
        CrosstermSurface::new(),
        CrosstermEvents::new(),
    );
    build(&mut app)?;

    app.init().context("failed to initialize terminal")?;
    // run() restores the terminal itself, even when it fails
    let result = app.run();

    info!("termvision demo shutting down");
    result?;
    Ok(())
}

fn colored_view(
    tree: &mut ComponentTree,
    name: &str,
    bounds: Rect,
    background: Color,
) -> termvision::Result<Handle> {
    let view = tree.create_view(name);
    tree.set_bounds(view, bounds)?;
    if let Some(view) = tree.view_mut(view) {
        view.set_background(background);
    }
    Ok(view)
}

fn build(app: &mut Application) -> termvision::Result<()> {
    let tree = app.tree_mut();

    // Two overlapping views that trade places every time the swap timer ticks.
    let overlap = tree.create_window("Overlap (q quits)");
    tree.set_bounds(overlap, Rect::new(2, 1, 36, 14))?;
    let blue = colored_view(tree, "blue", Rect::new(2, 2, 14, 6), Color::Blue)?;
    let red = colored_view(tree, "red", Rect::new(8, 4, 14, 6), Color::Red)?;
    tree.set_zorder(red, 1)?;
    tree.add_child(overlap, blue)?;
    tree.add_child(overlap, red)?;

    let swap = tree.create_timer("swap", Duration::from_secs(2));
    tree.add_child(overlap, swap)?;
    tree.set_on_message(overlap, move |cx, msg| match msg.kind {
        MessageKind::Timer => {
            let tree = cx.tree_mut();
            let (blue_z, red_z) = (
                tree.zorder(blue).unwrap_or_default(),
                tree.zorder(red).unwrap_or_default(),
            );
            for (view, zorder) in [(blue, red_z), (red, blue_z)] {
                if let Err(err) = tree.set_zorder(view, zorder) {
                    trace!(%err, "swap failed");
                }
            }
            cx.post(Message::zorder_changed(cx.handle()));
            true
        }
        MessageKind::Key => {
            let quit = msg
                .key_event()
                .is_some_and(|key| key.code == KeyCode::Char('q'));
            if quit {
                cx.post(Message::quit());
            }
            quit
        }
        _ => false,
    })?;
    tree.set_enabled(swap, true)?;

    // A view sliding in from outside the client area until it leaves again.
    let drift = tree.create_window("Drift");
    tree.set_bounds(drift, Rect::new(30, 6, 30, 12))?;
    let start = Rect::new(-3, -3, 4, 2);
    let drifter = colored_view(tree, "drifter", start, Color::Yellow)?;
    tree.add_child(drift, drifter)?;

    let mover = tree.create_timer("mover", Duration::from_millis(400));
    tree.add_child(drift, mover)?;
    let mut position = start;
    tree.set_timer_callback(mover, move |tick| {
        position = position.translate(2, 1);
        if position.y > 12 {
            return ControlFlow::Break(());
        }
        match tick.bus.send(Message::change_bounds(drifter, position)) {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        }
    })?;
    tree.set_enabled(mover, true)?;

    app.add_window(drift)?;
    app.add_window(overlap)?;
    app.set_main_window(overlap)?;
    Ok(())
}
