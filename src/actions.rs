use anyhow::{Result, anyhow};
use log::{info, warn};

use crate::config::Screen;

/// Virtual pointer + keyboard. Falls back to NO-OP when uinput is missing.
pub struct UinputSink {
    enabled: bool,
    screen: Screen,
    /// Where we believe the OS pointer is; `None` until homed.
    cursor: Option<(i32, i32)>,
    scroll_acc: f32,
    #[allow(dead_code)]
    linux: Option<Box<LinuxUinput>>,
}

impl UinputSink {
    pub fn new(screen: Screen) -> Result<Self> {
        #[cfg(target_os = "linux")]
        {
            let dev = LinuxUinput::create()?;
            return Ok(Self {
                enabled: true,
                screen,
                cursor: None,
                scroll_acc: 0.0,
                linux: Some(Box::new(dev)),
            });
        }
        #[allow(unreachable_code)]
        {
            warn!("uinput not available; running in NO-OP mode");
            Ok(Self::noop(screen))
        }
    }

    pub fn noop(screen: Screen) -> Self {
        Self {
            enabled: true,
            screen,
            cursor: None,
            scroll_acc: 0.0,
            linux: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, en: bool) {
        self.enabled = en;
        self.scroll_acc = 0.0;
    }

    /// Moves the pointer to an absolute pixel position using relative
    /// motion. The first move drives the pointer into the top-left corner so
    /// later deltas land where intended (requires a flat accel profile).
    pub fn move_to(&mut self, x: f32, y: f32) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let w = i32::try_from(self.screen.width).unwrap_or(i32::MAX).max(1);
        let h = i32::try_from(self.screen.height).unwrap_or(i32::MAX).max(1);
        let tx = (x.round() as i32).clamp(0, w - 1);
        let ty = (y.round() as i32).clamp(0, h - 1);

        let (cx, cy) = match self.cursor {
            Some(c) => c,
            None => {
                self.rel_move(w.saturating_mul(-2), h.saturating_mul(-2))?;
                (0, 0)
            }
        };
        let (dx, dy) = (tx - cx, ty - cy);
        if dx != 0 || dy != 0 {
            self.rel_move(dx, dy)?;
        }
        self.cursor = Some((tx, ty));
        Ok(())
    }

    /// Forget the believed cursor position; the next move re-homes.
    pub fn forget_cursor(&mut self) {
        self.cursor = None;
        self.scroll_acc = 0.0;
    }

    fn rel_move(&mut self, dx: i32, dy: i32) -> Result<()> {
        #[cfg(target_os = "linux")]
        if let Some(dev) = self.linux.as_mut() {
            dev.rel_move(dx, dy)?;
        }
        let _ = (dx, dy);
        Ok(())
    }

    /// Accumulates pixel scroll and emits whole wheel notches. Positive
    /// `delta_px` scrolls content down.
    pub fn scroll_pixels(&mut self, delta_px: f32, step_px: f32) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.scroll_acc += delta_px;
        let steps = (self.scroll_acc / step_px) as i32;
        if steps != 0 {
            self.scroll_acc -= steps as f32 * step_px;
            // wheel up is positive on evdev
            self.scroll_vertical(-steps)?;
        }
        Ok(())
    }

    pub fn scroll_vertical(&mut self, steps: i32) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        #[cfg(target_os = "linux")]
        if let Some(dev) = self.linux.as_mut() {
            dev.scroll_vertical(steps)?;
        }
        Ok(())
    }

    pub fn click_mouse(&mut self, which: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let button = which.to_ascii_lowercase();
        if !matches!(button.as_str(), "left" | "right" | "middle") {
            return Err(anyhow!("unknown mouse button: {which}"));
        }
        #[cfg(target_os = "linux")]
        if let Some(dev) = self.linux.as_mut() {
            dev.click(&button)?;
        }
        Ok(())
    }

    pub fn double_click_left(&mut self) -> Result<()> {
        self.click_mouse("left")?;
        self.click_mouse("left")
    }

    /// Send a chord like "CTRL+EQUAL" or single "RIGHT"
    pub fn key_chord(&mut self, chord: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let parts: Vec<_> = chord
            .split('+')
            .map(|s| s.trim().to_ascii_uppercase())
            .collect();
        #[cfg(target_os = "linux")]
        {
            let mut keys = Vec::with_capacity(parts.len());
            for p in &parts {
                keys.push(map_key(p)?);
            }
            if let Some(dev) = self.linux.as_mut() {
                // press in order
                for k in &keys {
                    dev.key_send(*k, 1)?;
                }
                dev.sync()?;
                // release in reverse
                for k in keys.iter().rev() {
                    dev.key_send(*k, 0)?;
                }
                dev.sync()?;
            }
        }
        #[cfg(not(target_os = "linux"))]
        let _ = parts;
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn map_key(tok: &str) -> Result<uinput::event::keyboard::Key> {
    use uinput::event::keyboard::Key as K;
    let k = match tok {
        "CTRL" | "CONTROL" => K::LeftControl,
        "ALT" => K::LeftAlt,
        "SHIFT" => K::LeftShift,
        "SUPER" | "META" | "WIN" => K::LeftMeta,
        "TAB" => K::Tab,
        "MINUS" | "-" => K::Minus,
        "EQUAL" | "=" => K::Equal,
        "LEFT" => K::Left,
        "RIGHT" => K::Right,
        "UP" => K::Up,
        "DOWN" => K::Down,
        "PAGEUP" => K::PageUp,
        "PAGEDOWN" => K::PageDown,
        "SPACE" => K::Space,
        "ENTER" => K::Enter,
        "ESC" | "ESCAPE" => K::Esc,
        other => return Err(anyhow!("unsupported key token: {other}")),
    };
    Ok(k)
}

#[cfg(target_os = "linux")]
struct LinuxUinput {
    dev: uinput::device::Device,
}

#[cfg(target_os = "linux")]
impl LinuxUinput {
    fn create() -> Result<Self> {
        use uinput::event::{controller::Mouse, keyboard::Key, relative};

        let mut builder = uinput::default()?
            .name("Pinchctl Virtual Pointer")?
            // relative axes + wheel
            .event(relative::Position::X)?
            .event(relative::Position::Y)?
            .event(relative::Wheel::Vertical)?
            // mouse buttons
            .event(Mouse::Left)?
            .event(Mouse::Right)?
            .event(Mouse::Middle)?;
        // keys for binding chords
        for key in [
            Key::LeftControl,
            Key::LeftAlt,
            Key::LeftShift,
            Key::LeftMeta,
            Key::Tab,
            Key::Minus,
            Key::Equal,
            Key::Left,
            Key::Right,
            Key::Up,
            Key::Down,
            Key::PageUp,
            Key::PageDown,
            Key::Space,
            Key::Enter,
            Key::Esc,
        ] {
            builder = builder.event(key)?;
        }
        let dev = builder.create()?;

        info!("uinput: created virtual pointer");
        Ok(Self { dev })
    }

    fn sync(&mut self) -> Result<()> {
        self.dev.synchronize()?;
        Ok(())
    }

    fn key_send(&mut self, key: uinput::event::keyboard::Key, val: i32) -> Result<()> {
        self.dev.send(key, val)?;
        Ok(())
    }

    fn rel_move(&mut self, dx: i32, dy: i32) -> Result<()> {
        use uinput::event::relative::Position;
        if dx != 0 {
            self.dev.send(Position::X, dx)?;
        }
        if dy != 0 {
            self.dev.send(Position::Y, dy)?;
        }
        self.sync()
    }

    fn click(&mut self, button: &str) -> Result<()> {
        use uinput::event::controller::Mouse;
        let b = match button {
            "right" => Mouse::Right,
            "middle" => Mouse::Middle,
            _ => Mouse::Left,
        };
        self.dev.send(b, 1)?;
        self.sync()?;
        self.dev.send(b, 0)?;
        self.sync()
    }

    fn scroll_vertical(&mut self, steps: i32) -> Result<()> {
        use uinput::event::relative::Wheel;
        self.dev.send(Wheel::Vertical, steps)?;
        self.sync()
    }
}
