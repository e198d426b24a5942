use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::{Deserialize, Deserializer};
use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
    #[serde(default)]
    pub allow_commands: bool,
    #[serde(default = "default_true")]
    pub hot_reload: bool,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            name: Some("default".into()),
            allow_commands: false,
            hot_reload: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Display geometry used to scale normalized positions into pixels.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Screen {
    pub width: u32,
    pub height: u32,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PointerCfg {
    /// EMA factor while no pinch is held.
    pub alpha_free: f32,
    /// EMA factor while engaged; lower holds the click target steady.
    pub alpha_engaged: f32,
}

impl Default for PointerCfg {
    fn default() -> Self {
        Self {
            alpha_free: 0.25,
            alpha_engaged: 0.10,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PinchCfg {
    pub pinch_threshold: f32,
    pub exclusion_threshold: f32,
    pub ambiguity_epsilon: f32,
}

impl Default for PinchCfg {
    fn default() -> Self {
        Self {
            pinch_threshold: 0.04,
            exclusion_threshold: 0.06,
            ambiguity_epsilon: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct StabilityCfg {
    /// Consecutive agreeing frames needed to engage (history capacity).
    pub engage_frames: usize,
    /// Trailing `None` frames needed to release.
    pub release_frames: usize,
}

impl Default for StabilityCfg {
    fn default() -> Self {
        Self {
            engage_frames: 4,
            release_frames: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct InteractionCfg {
    pub drag_threshold_px: f32,
    pub scroll_speed: f32,
    pub double_click_ms: u64,
    pub double_click_px: f32,
}

impl Default for InteractionCfg {
    fn default() -> Self {
        Self {
            drag_threshold_px: 40.0,
            scroll_speed: 2.0,
            double_click_ms: 400,
            double_click_px: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SwipeCfg {
    pub enabled: bool,
    pub threshold_px: f32,
    pub max_vertical_px: f32,
    pub window_ms: u64,
    pub cooldown_ms: u64,
    pub min_samples: usize,
}

impl Default for SwipeCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_px: 150.0,
            max_vertical_px: 80.0,
            window_ms: 300,
            cooldown_ms: 500,
            min_samples: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct OutputCfg {
    /// Pixels of scroll that make up one wheel notch.
    pub scroll_step_px: f32,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self {
            scroll_step_px: 40.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub screen: Screen,
    #[serde(default)]
    pub pointer: PointerCfg,
    #[serde(default)]
    pub pinch: PinchCfg,
    #[serde(default)]
    pub stability: StabilityCfg,
    #[serde(default)]
    pub interaction: InteractionCfg,
    #[serde(default)]
    pub swipe: SwipeCfg,
    #[serde(default)]
    pub output: OutputCfg,

    // Accept nested/dotted tables and flatten them into "a.b" -> "value"
    #[serde(default, deserialize_with = "deserialize_bindings_flat")]
    pub bindings: HashMap<String, String>,
}

impl Default for Profile {
    fn default() -> Self {
        let bindings = [("swipe.left", "key:RIGHT"), ("swipe.right", "key:LEFT")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            meta: Meta::default(),
            screen: Screen::default(),
            pointer: PointerCfg::default(),
            pinch: PinchCfg::default(),
            stability: StabilityCfg::default(),
            interaction: InteractionCfg::default(),
            swipe: SwipeCfg::default(),
            output: OutputCfg::default(),
            bindings,
        }
    }
}

impl Profile {
    pub fn parse(txt: &str) -> Result<Self> {
        let profile: Profile = toml::from_str(txt)?;
        validate_profile(&profile)?;
        Ok(profile)
    }
}

// --------- custom bindings deserializer (tolerant) ----------
fn deserialize_bindings_flat<'de, D>(
    de: D,
) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = toml::Value::deserialize(de)?;
    let table = match val {
        toml::Value::Table(t) => t,
        other => {
            return Err(serde::de::Error::custom(format!(
                "bindings must be a table, got {:?}",
                other.type_str()
            )));
        }
    };

    let mut out = HashMap::new();
    flatten_table("", &table, &mut out).map_err(serde::de::Error::custom)?;
    Ok(out)
}

fn flatten_table(
    prefix: &str,
    table: &toml::value::Table,
    out: &mut HashMap<String, String>,
) -> std::result::Result<(), String> {
    for (k, v) in table {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        match v {
            toml::Value::String(s) => {
                out.insert(key, s.clone());
            }
            toml::Value::Table(sub) => {
                flatten_table(&key, sub, out)?;
            }
            other => {
                return Err(format!(
                    "binding '{}' value must be a string, got {}",
                    key,
                    other.type_str()
                ));
            }
        }
    }
    Ok(())
}
// ------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DaemonConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

fn home_dir() -> Result<PathBuf> {
    UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .ok_or_else(|| anyhow!("cannot determine home directory"))
}

fn config_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".config").join("pinchctl"))
}

fn profiles_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join("profiles"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl DaemonConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        let cfgdir = config_dir()?;
        let profdir = profiles_dir()?;
        fs::create_dir_all(&profdir)?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = cfgdir.join("active");
        if !active_ptr.exists() {
            let mut f = fs::File::create(&active_ptr)?;
            f.write_all(b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let profile = load_profile(&active_name)?;

        Ok(Self {
            active_name,
            profile,
            config_dir: cfgdir,
            profiles_dir: profdir,
            active_ptr,
        })
    }

    pub fn active_path(&self) -> PathBuf {
        self.profiles_dir.join(format!("{}.toml", self.active_name))
    }

    /// Whether an on-disk change at `path` should reload the active profile.
    pub fn watches_change(&self, path: &Path) -> bool {
        self.profile.meta.hot_reload && path.file_name() == self.active_path().file_name()
    }

    pub fn reload(&mut self) -> Result<()> {
        self.profile = load_profile(&self.active_name)?;
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        let profile = load_profile(name)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.profile = profile;
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }

    pub fn doctor_report(&self, control_sock: &Path, frames_sock: &Path) -> serde_json::Value {
        let uinput_ok = Path::new("/dev/uinput").exists();
        let in_input_group = check_in_input_group();
        serde_json::json!({
            "uinput_present": uinput_ok,
            "input_group_member": in_input_group,
            "profiles_dir": self.profiles_dir,
            "active_profile": self.active_name,
            "screen": [self.profile.screen.width, self.profile.screen.height],
            "control_socket": control_sock,
            "frames_socket": frames_sock,
            "hints": {
                "udev_rule": "/etc/udev/rules.d/80-uinput.rules",
                "add_user_to_input_group": "sudo usermod -aG input $USER && newgrp input",
                "pointer_accel": "set a flat acceleration profile for 'Pinchctl Virtual Pointer'"
            }
        })
    }
}

/// Reads and validates `<profiles_dir>/<name>.toml`.
pub fn load_profile(name: &str) -> Result<Profile> {
    let path = profiles_dir()?.join(format!("{name}.toml"));
    load_profile_from(&path)
}

pub fn load_profile_from(path: &Path) -> Result<Profile> {
    let txt = fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
    Profile::parse(&txt).map_err(|e| anyhow!("failed to parse {}: {e}", path.display()))
}

/// The profile compiled into the binary.
pub fn builtin_profile() -> Result<Profile> {
    Profile::parse(default_profile_text())
}

/// Keeps pixel math in `i32` without overflow, corner homing included.
pub const MAX_SCREEN_PX: u32 = 1 << 16;

fn validate_profile(p: &Profile) -> Result<()> {
    if p.screen.width == 0 || p.screen.height == 0 {
        return Err(anyhow!("screen dimensions must be positive"));
    }
    if p.screen.width > MAX_SCREEN_PX || p.screen.height > MAX_SCREEN_PX {
        return Err(anyhow!("screen dimensions must not exceed {MAX_SCREEN_PX} px"));
    }
    for (name, a) in [
        ("pointer.alpha_free", p.pointer.alpha_free),
        ("pointer.alpha_engaged", p.pointer.alpha_engaged),
    ] {
        if !(a > 0.0 && a <= 1.0) {
            return Err(anyhow!("{name} must be in (0,1]"));
        }
    }
    for (name, d) in [
        ("pinch.pinch_threshold", p.pinch.pinch_threshold),
        ("pinch.exclusion_threshold", p.pinch.exclusion_threshold),
        ("pinch.ambiguity_epsilon", p.pinch.ambiguity_epsilon),
    ] {
        if !(0.0..1.0).contains(&d) {
            return Err(anyhow!("{name} must be in [0,1) normalized units"));
        }
    }
    if p.stability.release_frames == 0
        || p.stability.engage_frames < p.stability.release_frames
    {
        return Err(anyhow!(
            "stability needs engage_frames >= release_frames >= 1"
        ));
    }
    if p.interaction.double_click_ms == 0 || p.swipe.window_ms == 0 {
        return Err(anyhow!("thresholds must be positive durations"));
    }
    if p.interaction.drag_threshold_px <= 0.0 || p.swipe.threshold_px <= 0.0 {
        return Err(anyhow!("pixel thresholds must be positive"));
    }
    if p.swipe.min_samples < 2 {
        return Err(anyhow!("swipe.min_samples must be at least 2"));
    }
    if p.output.scroll_step_px <= 0.0 {
        return Err(anyhow!("output.scroll_step_px must be positive"));
    }

    for (k, v) in &p.bindings {
        if k.trim().is_empty() {
            return Err(anyhow!("empty binding key"));
        }
        if v.trim().is_empty() {
            return Err(anyhow!("binding '{}' has empty action", k));
        }

        let ok = v.starts_with("mouse:")
            || v.starts_with("scroll:")
            || v.starts_with("key:")
            || v == "toggle"
            || v.starts_with("cmd:");
        if !ok {
            return Err(anyhow!("binding '{}' has invalid action '{}'", k, v));
        }
        if v.starts_with("cmd:") && !p.meta.allow_commands {
            return Err(anyhow!(
                "binding '{}' uses cmd: but allow_commands=false",
                k
            ));
        }
    }
    Ok(())
}

fn check_in_input_group() -> bool {
    if let Ok(s) = fs::read_to_string("/etc/group") {
        let user = whoami::username();
        for line in s.lines() {
            if line.starts_with("input:") {
                if line
                    .split(':')
                    .nth(3)
                    .unwrap_or("")
                    .split(',')
                    .any(|u| u == user)
                {
                    return true;
                }
            }
        }
    }
    false
}
