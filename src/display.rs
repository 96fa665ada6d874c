//! Blocking preview window using minifb.

use anyhow::{anyhow, Result};
use log::{debug, info};
use minifb::{Key, ScaleMode, Window, WindowOptions};

use crate::render::Figure;

const TARGET_FPS: usize = 60;

/// Show `figure` in a window and block until the user closes it
/// (or presses Escape).
pub fn show(figure: &Figure, title: &str) -> Result<()> {
    let width = figure.width() as usize;
    let height = figure.height() as usize;
    let buffer = figure.to_argb();

    let mut window = Window::new(
        title,
        width,
        height,
        WindowOptions {
            resize: true,
            scale_mode: ScaleMode::AspectRatioStretch,
            ..WindowOptions::default()
        },
    )
    .map_err(|e| anyhow!("Failed to open display window: {e}"))?;
    window.set_target_fps(TARGET_FPS);

    info!("showing {width}x{height} figure; close the window to continue");
    while window.is_open() && !window.is_key_down(Key::Escape) {
        window
            .update_with_buffer(&buffer, width, height)
            .map_err(|e| anyhow!("Failed to update display window: {e}"))?;
    }
    debug!("display window closed");
    Ok(())
}
