//! GLFW-backed window
//!
//! Translates GLFW events into [`PlatformEvent`]s and provides the Vulkan
//! surface hooks the backend needs. Created with the NoApi hint — Vulkan
//! owns presentation, no GL context is wanted.

use crate::core::error::{EngineError, EngineResult};
use crate::platform::{KeyCode, MouseButton, PlatformEvent, WindowSurface};

/// GLFW window wrapper
pub struct GlfwWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl GlfwWindow {
    /// Create a window configured for Vulkan rendering
    pub fn new(title: &str, width: u32, height: u32) -> EngineResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| EngineError::device_failure("window", format!("GLFW init failed: {e}")))?;

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or_else(|| EngineError::device_failure("window", "window creation failed"))?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_scroll_polling(true);
        window.set_mouse_button_polling(true);
        window.set_iconify_polling(true);
        window.set_maximize_polling(true);

        Ok(Self {
            glfw,
            window,
            events,
        })
    }

    /// Instance extensions GLFW needs for surface creation
    pub fn required_instance_extensions(&self) -> EngineResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| {
                EngineError::device_failure("window", "no Vulkan instance extensions reported")
            })
    }

    /// Create the Vulkan surface for this window
    pub fn create_vulkan_surface(
        &mut self,
        instance: ash::vk::Instance,
    ) -> EngineResult<ash::vk::SurfaceKHR> {
        let mut surface = ash::vk::SurfaceKHR::null();
        let result = self
            .window
            .create_window_surface(instance, std::ptr::null(), &mut surface);
        if result == ash::vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(EngineError::device_failure(
                "window",
                format!("surface creation failed: {result:?}"),
            ))
        }
    }

    fn translate(event: glfw::WindowEvent) -> Option<PlatformEvent> {
        match event {
            glfw::WindowEvent::Close => Some(PlatformEvent::CloseRequested),
            glfw::WindowEvent::Key(key, _, action, _) => {
                let code = translate_key(key)?;
                let (pressed, repeat) = match action {
                    glfw::Action::Press => (true, false),
                    glfw::Action::Repeat => (true, true),
                    glfw::Action::Release => (false, false),
                };
                Some(PlatformEvent::Key {
                    code,
                    pressed,
                    repeat,
                })
            }
            glfw::WindowEvent::MouseButton(button, action, _) => {
                let button = match button {
                    glfw::MouseButton::Button1 => MouseButton::Left,
                    glfw::MouseButton::Button2 => MouseButton::Right,
                    glfw::MouseButton::Button3 => MouseButton::Middle,
                    _ => return None,
                };
                Some(PlatformEvent::MouseButton {
                    button,
                    pressed: action != glfw::Action::Release,
                })
            }
            glfw::WindowEvent::CursorPos(x, y) => Some(PlatformEvent::MouseMotion { x, y }),
            glfw::WindowEvent::Scroll(dx, dy) => Some(PlatformEvent::MouseWheel { dx, dy }),
            glfw::WindowEvent::FramebufferSize(w, h) => {
                Some(PlatformEvent::Resized(w.max(0) as u32, h.max(0) as u32))
            }
            glfw::WindowEvent::Iconify(true) => Some(PlatformEvent::Minimized),
            glfw::WindowEvent::Iconify(false) => Some(PlatformEvent::Restored),
            glfw::WindowEvent::Maximize(true) => Some(PlatformEvent::Maximized),
            _ => None,
        }
    }
}

impl WindowSurface for GlfwWindow {
    fn pump_events(&mut self) -> Vec<PlatformEvent> {
        self.glfw.poll_events();
        let mut translated = Vec::new();
        for (_, event) in glfw::flush_messages(&self.events) {
            if let Some(event) = Self::translate(event) {
                translated.push(event);
            }
        }
        if self.window.should_close()
            && !translated.contains(&PlatformEvent::CloseRequested)
        {
            translated.push(PlatformEvent::CloseRequested);
        }
        translated
    }

    fn drawable_extent(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }
}

fn translate_key(key: glfw::Key) -> Option<KeyCode> {
    use glfw::Key;
    Some(match key {
        Key::A => KeyCode::A,
        Key::B => KeyCode::B,
        Key::C => KeyCode::C,
        Key::D => KeyCode::D,
        Key::E => KeyCode::E,
        Key::F => KeyCode::F,
        Key::G => KeyCode::G,
        Key::H => KeyCode::H,
        Key::I => KeyCode::I,
        Key::J => KeyCode::J,
        Key::K => KeyCode::K,
        Key::L => KeyCode::L,
        Key::M => KeyCode::M,
        Key::N => KeyCode::N,
        Key::O => KeyCode::O,
        Key::P => KeyCode::P,
        Key::Q => KeyCode::Q,
        Key::R => KeyCode::R,
        Key::S => KeyCode::S,
        Key::T => KeyCode::T,
        Key::U => KeyCode::U,
        Key::V => KeyCode::V,
        Key::W => KeyCode::W,
        Key::X => KeyCode::X,
        Key::Y => KeyCode::Y,
        Key::Z => KeyCode::Z,
        Key::Num0 => KeyCode::Num0,
        Key::Num1 => KeyCode::Num1,
        Key::Num2 => KeyCode::Num2,
        Key::Num3 => KeyCode::Num3,
        Key::Num4 => KeyCode::Num4,
        Key::Num5 => KeyCode::Num5,
        Key::Num6 => KeyCode::Num6,
        Key::Num7 => KeyCode::Num7,
        Key::Num8 => KeyCode::Num8,
        Key::Num9 => KeyCode::Num9,
        Key::Space => KeyCode::Space,
        Key::Enter => KeyCode::Enter,
        Key::Escape => KeyCode::Escape,
        Key::Tab => KeyCode::Tab,
        Key::LeftShift => KeyCode::LeftShift,
        Key::RightShift => KeyCode::RightShift,
        Key::Up => KeyCode::Up,
        Key::Down => KeyCode::Down,
        Key::Left => KeyCode::Left,
        Key::Right => KeyCode::Right,
        _ => return None,
    })
}
