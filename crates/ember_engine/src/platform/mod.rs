//! Platform window and input
//!
//! The engine core consumes platform events through an opaque poll
//! interface; the transport (GLFW here) is an implementation detail behind
//! [`WindowSurface`].

pub mod glfw_window;

use std::collections::HashSet;

/// Keys the engine tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum KeyCode {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Num0, Num1, Num2, Num3, Num4, Num5, Num6, Num7, Num8, Num9,
    Space, Enter, Escape, Tab, LeftShift, RightShift,
    Up, Down, Left, Right,
}

/// Mouse buttons the engine tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left button
    Left,
    /// Right button
    Right,
    /// Middle button / wheel click
    Middle,
}

/// Events produced by the platform window
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlatformEvent {
    /// The user asked to close the window
    CloseRequested,
    /// Key state change; `repeat` marks OS key-repeat, which must not
    /// re-trigger pressed edges
    Key {
        /// Which key
        code: KeyCode,
        /// Down (true) or up (false)
        pressed: bool,
        /// OS auto-repeat of an already-held key
        repeat: bool,
    },
    /// Mouse button state change
    MouseButton {
        /// Which button
        button: MouseButton,
        /// Down (true) or up (false)
        pressed: bool,
    },
    /// Absolute cursor position in screen coordinates
    MouseMotion {
        /// Cursor x
        x: f64,
        /// Cursor y
        y: f64,
    },
    /// Scroll wheel movement
    MouseWheel {
        /// Horizontal scroll
        dx: f64,
        /// Vertical scroll
        dy: f64,
    },
    /// The drawable area changed size (pixels)
    Resized(u32, u32),
    /// The window was maximized
    Maximized,
    /// The window was minimized/iconified
    Minimized,
    /// The window was restored from minimization
    Restored,
}

/// Opaque platform window: event source plus drawable surface
pub trait WindowSurface {
    /// Poll the platform and return all pending events
    fn pump_events(&mut self) -> Vec<PlatformEvent>;

    /// Current drawable (framebuffer) size in pixels; (0, 0) while the
    /// window has no presentable area
    fn drawable_extent(&self) -> (u32, u32);
}

/// Aggregated input state fed by platform events.
///
/// Edge sets (`was_pressed`, `was_released`) and wheel/motion deltas are
/// transient and cleared during the Housekeeping stage.
#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
    pressed_this_frame: HashSet<KeyCode>,
    released_this_frame: HashSet<KeyCode>,
    buttons_held: HashSet<MouseButton>,
    cursor: (f64, f64),
    cursor_delta: (f64, f64),
    wheel_delta: (f64, f64),
}

impl InputState {
    /// Empty input state
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a key event. Repeat events leave all state untouched.
    pub fn apply_key(&mut self, code: KeyCode, pressed: bool, repeat: bool) {
        if repeat {
            return;
        }
        if pressed {
            if self.held.insert(code) {
                self.pressed_this_frame.insert(code);
            }
        } else if self.held.remove(&code) {
            self.released_this_frame.insert(code);
        }
    }

    /// Apply a mouse button event
    pub fn apply_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if pressed {
            self.buttons_held.insert(button);
        } else {
            self.buttons_held.remove(&button);
        }
    }

    /// Apply an absolute cursor position
    pub fn apply_cursor(&mut self, x: f64, y: f64) {
        self.cursor_delta.0 += x - self.cursor.0;
        self.cursor_delta.1 += y - self.cursor.1;
        self.cursor = (x, y);
    }

    /// Accumulate wheel movement
    pub fn apply_wheel(&mut self, dx: f64, dy: f64) {
        self.wheel_delta.0 += dx;
        self.wheel_delta.1 += dy;
    }

    /// True while the key is held down
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.held.contains(&code)
    }

    /// True if the key went down since the last Housekeeping
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.pressed_this_frame.contains(&code)
    }

    /// True if the key went up since the last Housekeeping
    pub fn was_released(&self, code: KeyCode) -> bool {
        self.released_this_frame.contains(&code)
    }

    /// True while the mouse button is held down
    pub fn is_button_held(&self, button: MouseButton) -> bool {
        self.buttons_held.contains(&button)
    }

    /// Current cursor position
    pub fn cursor(&self) -> (f64, f64) {
        self.cursor
    }

    /// Cursor movement accumulated this frame
    pub fn cursor_delta(&self) -> (f64, f64) {
        self.cursor_delta
    }

    /// Wheel movement accumulated this frame
    pub fn wheel_delta(&self) -> (f64, f64) {
        self.wheel_delta
    }

    /// Clear transient per-frame flags; held state survives
    pub fn clear_transient(&mut self) {
        self.pressed_this_frame.clear();
        self.released_this_frame.clear();
        self.cursor_delta = (0.0, 0.0);
        self.wheel_delta = (0.0, 0.0);
    }
}
