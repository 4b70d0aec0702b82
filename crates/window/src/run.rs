use crate::window::Window;

/// Drive `frame` once per iteration until the window wants to close, calling
/// [`Window::update`] after every frame. Returns the number of frames run.
///
/// The first error from `frame` stops the loop and is returned as is.
pub fn run_loop<W, E>(
    window: &mut W,
    mut frame: impl FnMut(&mut W) -> Result<(), E>,
) -> Result<u64, E>
where
    W: Window,
{
    let mut frames = 0;
    while !window.should_close() {
        frame(window)?;
        window.update();
        frames += 1;
    }
    tracing::info!(frames, "render loop finished");
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeadlessWindow, WindowProperties};
    use slim_events::EventBus;
    use std::rc::Rc;

    fn window() -> HeadlessWindow {
        HeadlessWindow::create(WindowProperties::default(), Rc::new(EventBus::new())).unwrap()
    }

    #[test]
    fn runs_until_close() {
        let mut window = window();
        window.close_after(3);
        let frames = run_loop(&mut window, |w| {
            w.context().clear();
            Ok::<_, ()>(())
        })
        .unwrap();
        assert_eq!(frames, 3);
        assert_eq!(window.native().clears(), 3);
        assert_eq!(window.native().frames_presented(), 3);
    }

    #[test]
    fn frame_error_stops_the_loop() {
        let mut window = window();
        let mut calls = 0;
        let result = run_loop(&mut window, |_| {
            calls += 1;
            if calls == 2 { Err("boom") } else { Ok(()) }
        });
        assert_eq!(result, Err("boom"));
        assert_eq!(window.native().frames_presented(), 1);
    }

    #[test]
    fn closed_window_runs_no_frames() {
        let mut window = window();
        window.request_close();
        let frames = run_loop(&mut window, |_| Ok::<_, ()>(())).unwrap();
        assert_eq!(frames, 0);
    }
}
