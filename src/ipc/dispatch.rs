use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use std::{collections::HashMap, process::Command, thread};

use crate::actions::UinputSink;
use crate::config::Profile;
use crate::events::{EventSink, PointerEvent};

/// Routes pipeline events to the virtual device. Pointer and click events map
/// directly; swipes go through the profile bindings.
pub struct BoundSink {
    sink: UinputSink,
    bindings: HashMap<String, String>,
    allow_commands: bool,
    scroll_step_px: f32,
}

impl BoundSink {
    pub fn new(sink: UinputSink, profile: &Profile) -> Self {
        Self {
            sink,
            bindings: profile.bindings.clone(),
            allow_commands: profile.meta.allow_commands,
            scroll_step_px: profile.output.scroll_step_px,
        }
    }

    pub fn reconfigure(&mut self, profile: &Profile) {
        self.bindings = profile.bindings.clone();
        self.allow_commands = profile.meta.allow_commands;
        self.scroll_step_px = profile.output.scroll_step_px;
        self.sink.forget_cursor();
    }

    pub fn output_enabled(&self) -> bool {
        self.sink.is_enabled()
    }

    /// Called when the producer goes away; the OS pointer may move meanwhile.
    pub fn forget_cursor(&mut self) {
        self.sink.forget_cursor();
    }

    fn run_binding(&mut self, key: &str) -> Result<()> {
        let action = self.bindings.get(key).cloned().unwrap_or_default();
        if action.is_empty() {
            debug!("no binding for {key}");
            return Ok(());
        }
        if action == "toggle" {
            let en = !self.sink.is_enabled();
            self.sink.set_enabled(en);
            info!("output {}", if en { "enabled" } else { "muted" });
            return Ok(());
        }
        if !self.sink.is_enabled() {
            return Ok(());
        }

        if let Some(rest) = action.strip_prefix("mouse:") {
            return self.sink.click_mouse(rest.trim());
        }
        if let Some(rest) = action.strip_prefix("scroll:") {
            let mut parts = rest.split('@');
            let axis = parts.next().map(str::trim).unwrap_or("vertical");
            let steps: i32 = parts
                .next()
                .map(str::trim)
                .unwrap_or("+1")
                .parse()
                .unwrap_or(1);
            if axis.eq_ignore_ascii_case("vertical") {
                self.sink.scroll_vertical(steps)?;
            } else {
                warn!("binding {key}: unsupported scroll axis '{axis}'");
            }
            return Ok(());
        }
        if let Some(rest) = action.strip_prefix("key:") {
            return self.sink.key_chord(rest.trim());
        }
        if let Some(rest) = action.strip_prefix("cmd:") {
            if !self.allow_commands {
                return Err(anyhow!("binding {key} uses cmd: but allow_commands=false"));
            }
            return spawn_shell(rest.trim());
        }

        Err(anyhow!("unknown action mapping for {} -> '{}'", key, action))
    }
}

/// Starts `sh -c <cmd>` without waiting; a helper thread reaps the child.
fn spawn_shell(cmd: &str) -> Result<()> {
    let mut child = Command::new("sh").arg("-c").arg(cmd).spawn()?;
    info!("spawned '{cmd}' (pid={})", child.id());
    let cmd = cmd.to_string();
    thread::spawn(move || match child.wait() {
        Ok(st) if !st.success() => warn!("'{cmd}' exited with {st}"),
        Ok(_) => {}
        Err(e) => warn!("waiting for '{cmd}' failed: {e}"),
    });
    Ok(())
}

impl EventSink for BoundSink {
    fn emit(&mut self, ev: &PointerEvent) -> Result<()> {
        match *ev {
            PointerEvent::PointerMove { x, y, .. } => self.sink.move_to(x, y),
            PointerEvent::Click { .. } => self.sink.click_mouse("left"),
            PointerEvent::DoubleClick { .. } => self.sink.double_click_left(),
            PointerEvent::SecondaryClick { .. } => self.sink.click_mouse("right"),
            PointerEvent::Scroll { delta_y } => {
                self.sink.scroll_pixels(delta_y, self.scroll_step_px)
            }
            PointerEvent::Swipe { direction } => {
                self.run_binding(&format!("swipe.{}", direction.as_str()))
            }
            // element-level notifications; the OS pointer needs nothing extra
            PointerEvent::PointerDown { .. }
            | PointerEvent::PointerUp { .. }
            | PointerEvent::DragBegin { .. }
            | PointerEvent::DragEnd { .. } => Ok(()),
        }
    }
}
