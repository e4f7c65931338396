//! Window platform: winit events in, pixels presentation out
//!
//! The loop owns the thread, so events are pumped once per tick instead of
//! handing control to winit. Key transitions are buffered by the handler and
//! applied to the new input generation when the pump returns.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use hotframe_core::audio::SyncMarkers;
use hotframe_core::config::VideoConfig;
use hotframe_core::input::{KeyboardInput, KeyboardMapping};
use hotframe_core::{FrameBuffer, Platform};
use hotframe_shared::InputFrame;
use pixels::{Pixels, SurfaceTexture};
use smallvec::SmallVec;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

const MARKER_PAD: u32 = 16;
const MARKER_ROW_HEIGHT: u32 = 4;

const WHITE: [u8; 4] = [0xff, 0xff, 0xff, 0xff];
const RED: [u8; 4] = [0xff, 0x00, 0x00, 0xff];
const YELLOW: [u8; 4] = [0xff, 0xff, 0x00, 0xff];

/// Window, surface and keyboard state driven by winit callbacks.
struct WindowApp {
    title: String,
    width: u32,
    height: u32,
    scale: u32,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    keys: SmallVec<[(KeyCode, bool); 16]>,
    focus_lost: bool,
    exit_requested: bool,
}

impl WindowApp {
    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let size = LogicalSize::new(self.width * self.scale, self.height * self.scale);
        let attributes = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(size)
            .with_min_inner_size(LogicalSize::new(self.width, self.height));
        let window = Arc::new(event_loop.create_window(attributes)?);

        let physical = window.inner_size();
        let surface = SurfaceTexture::new(physical.width, physical.height, Arc::clone(&window));
        let pixels = Pixels::new(self.width, self.height, surface)?;

        self.window = Some(window);
        self.pixels = Some(pixels);
        Ok(())
    }
}

impl ApplicationHandler for WindowApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.create_window(event_loop) {
            tracing::error!("Failed to create window: {}", e);
            self.exit_requested = true;
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.exit_requested = true;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(pixels) = &mut self.pixels
                    && size.width > 0
                    && size.height > 0
                    && let Err(e) = pixels.resize_surface(size.width, size.height)
                {
                    tracing::warn!("Failed to resize surface: {}", e);
                }
            }
            WindowEvent::Focused(false) => self.focus_lost = true,
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.keys.push((code, state == ElementState::Pressed));
            }
            _ => {}
        }
    }
}

/// Desktop [`Platform`] backed by a winit window and a pixels surface.
pub struct WindowPlatform {
    event_loop: EventLoop<()>,
    app: WindowApp,
    keyboard: KeyboardInput,
    /// Device ring size, for scaling sync markers to the window.
    sound_buffer_size: Option<u32>,
}

impl WindowPlatform {
    pub fn new(
        title: &str,
        video: &VideoConfig,
        mapping: KeyboardMapping,
        sound_buffer_size: Option<u32>,
    ) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new()?;
        Ok(Self {
            event_loop,
            app: WindowApp {
                title: title.to_string(),
                width: video.width,
                height: video.height,
                scale: video.scale.max(1),
                window: None,
                pixels: None,
                keys: SmallVec::new(),
                focus_lost: false,
                exit_requested: false,
            },
            keyboard: KeyboardInput::new(mapping),
            sound_buffer_size,
        })
    }
}

impl Platform for WindowPlatform {
    fn pump_events(&mut self, _old: &InputFrame, new: &mut InputFrame) -> ControlFlow<()> {
        let status = self.event_loop.pump_app_events(Some(Duration::ZERO), &mut self.app);

        for (key, is_down) in self.app.keys.drain(..) {
            self.keyboard.handle_key(new, key, is_down);
        }
        if std::mem::take(&mut self.app.focus_lost) {
            self.keyboard.release_all(new);
        }

        if matches!(status, PumpStatus::Exit(_)) || self.app.exit_requested {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn present(&mut self, frame: &FrameBuffer, markers: Option<&SyncMarkers>) {
        let Some(pixels) = &mut self.app.pixels else {
            return;
        };
        let width = frame.width();
        let target = pixels.frame_mut();
        for (dst, &src) in target.chunks_exact_mut(4).zip(frame.pixels()) {
            let [b, g, r, _] = src.to_le_bytes();
            dst.copy_from_slice(&[r, g, b, 0xff]);
        }

        if let (Some(markers), Some(buffer_size)) = (markers, self.sound_buffer_size) {
            draw_sync_markers(target, width, frame.height(), markers, buffer_size);
        }

        if let Err(e) = pixels.render() {
            tracing::warn!("Failed to present frame: {}", e);
        }
    }
}

/// One row per marker. Top half: play and write cursors at output time
/// (white, red). Bottom half: the region written and the expected flip
/// position (yellow), then the cursors seen at the flip (white, red).
fn draw_sync_markers(target: &mut [u8], width: u32, height: u32, markers: &SyncMarkers, buffer_size: u32) {
    if width <= 2 * MARKER_PAD || buffer_size == 0 {
        return;
    }
    let span = (width - 2 * MARKER_PAD) as f32 / buffer_size as f32;
    let x_for = |cursor: u32| MARKER_PAD + (cursor as f32 * span) as u32;

    for (row, marker) in markers.iter().enumerate() {
        let top = MARKER_PAD + row as u32 * (MARKER_ROW_HEIGHT * 2);
        if top + MARKER_ROW_HEIGHT * 2 > height {
            break;
        }
        let bottom = top + MARKER_ROW_HEIGHT;

        draw_vertical(target, width, x_for(marker.output_play_cursor), top, bottom, WHITE);
        draw_vertical(target, width, x_for(marker.output_write_cursor), top, bottom, RED);

        let location = x_for(marker.output_location);
        let end = x_for((marker.output_location + marker.output_byte_count) % buffer_size);
        draw_vertical(target, width, location, bottom, bottom + MARKER_ROW_HEIGHT, YELLOW);
        draw_vertical(target, width, end, bottom, bottom + MARKER_ROW_HEIGHT, YELLOW);

        draw_vertical(target, width, x_for(marker.expected_flip_play_cursor), top, bottom + MARKER_ROW_HEIGHT, YELLOW);
        draw_vertical(target, width, x_for(marker.flip_play_cursor), bottom, bottom + MARKER_ROW_HEIGHT, WHITE);
        draw_vertical(target, width, x_for(marker.flip_write_cursor), bottom, bottom + MARKER_ROW_HEIGHT, RED);
    }
}

fn draw_vertical(target: &mut [u8], width: u32, x: u32, top: u32, bottom: u32, color: [u8; 4]) {
    if x >= width {
        return;
    }
    for y in top..bottom {
        let at = ((y * width + x) * 4) as usize;
        if let Some(pixel) = target.get_mut(at..at + 4) {
            pixel.copy_from_slice(&color);
        }
    }
}
