use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::PathBuf,
};

use color_eyre::{
    Result,
    eyre::{Context, ContextCompat, eyre},
};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    style::{Attribute, Attributes, Color, ContentStyle},
};
use directories::ProjectDirs;
use itertools::Itertools;
use serde::{
    Deserialize,
    de::{Deserializer, Error},
};

use crate::browser::PaginationPolicy;

/// Main configuration struct for the application
#[derive(Clone, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
#[cfg_attr(not(test), serde(default))]
pub struct Config {
    /// Directory where the data (logs) must be stored
    pub data_dir: PathBuf,
    /// Whether the read-only mode is enabled on startup
    pub read_only: bool,
    /// Default account/region selection
    pub context: ContextConfig,
    /// Configuration for the browsing surfaces
    pub browser: BrowserConfig,
    /// Configuration for the catalog of resource kinds
    pub catalog: CatalogConfig,
    /// Configuration settings for application logging
    pub logs: LogsConfig,
    /// Configuration for the key bindings used within the TUI
    pub keybindings: KeyBindingsConfig,
    /// Configuration for the visual theme of the TUI
    pub theme: Theme,
}

/// Default account/region selection, overridden by command-line flags
#[derive(Clone, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
#[cfg_attr(not(test), serde(default))]
pub struct ContextConfig {
    /// Profiles to browse, resources of every profile are fetched concurrently
    pub profiles: Vec<String>,
    /// Region to browse
    pub region: String,
}

/// Configuration for the browsing surfaces
#[derive(Clone, Copy, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
#[cfg_attr(not(test), serde(default))]
pub struct BrowserConfig {
    /// Number of resources requested per page, for kinds supporting pagination
    pub page_size: usize,
    /// How close (in rows) the cursor must get to the end of the list to load the next page
    pub prefetch_window: usize,
    /// Minimum matches of an active text filter before the next page is loaded automatically
    pub min_filtered_for_autofetch: usize,
    /// Number of trailing characters of the resource identifier to type when confirming destructive actions
    pub typed_confirm_suffix_len: usize,
}

/// Configuration for the catalog of resource kinds
#[derive(Clone, Default, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
#[cfg_attr(not(test), serde(default))]
pub struct CatalogConfig {
    /// Path to a manifest file with the kinds to register, instead of the built-in catalog
    pub manifest: Option<PathBuf>,
}

/// Configuration settings for application logging
#[derive(Clone, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
#[cfg_attr(not(test), serde(default))]
pub struct LogsConfig {
    /// Whether application logging is enabled
    pub enabled: bool,
    /// The log filter to apply, controlling which logs are recorded.
    ///
    /// This string supports the `tracing-subscriber`'s environment filter syntax.
    pub filter: String,
}

/// Configuration for the key bindings used in the TUI.
///
/// Actions declared by the resource kinds are bound to plain characters, these are the bindings of the surface itself.
#[derive(Clone, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
#[cfg_attr(not(test), serde(default))]
pub struct KeyBindingsConfig(
    #[serde(deserialize_with = "deserialize_bindings_with_defaults")] BTreeMap<KeyBindingAction, KeyBinding>,
);

/// Actions of a browsing surface that can be bound to keys
#[derive(Copy, Clone, Deserialize, PartialOrd, PartialEq, Eq, Ord, Debug, strum::Display)]
#[cfg_attr(test, derive(strum::EnumIter))]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KeyBindingAction {
    /// Go back to the previous surface, or exit on the first one
    Quit,
    /// Open the detail of the selected resource
    Detail,
    /// Start typing a free-text filter
    Filter,
    /// Start typing a command
    Command,
    /// Mark the selected resource to compare it with another one
    Mark,
    /// Compare the marked resource with the selected one
    Diff,
    /// Load the next page, even if a text filter is active
    LoadMore,
    /// Fetch the resources again
    Refresh,
}

/// A single logical key binding, triggered by any of its key events
#[derive(Clone, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct KeyBinding(#[serde(deserialize_with = "deserialize_key_events")] Vec<KeyEvent>);

/// TUI theme configuration
#[derive(Clone, Deserialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
#[cfg_attr(not(test), serde(default))]
pub struct Theme {
    /// Style of the main text, like cell values
    #[serde(deserialize_with = "deserialize_style")]
    pub primary: ContentStyle,
    /// Style of less important text, like the column headers and status bar
    #[serde(deserialize_with = "deserialize_style")]
    pub secondary: ContentStyle,
    /// Style of highlighted elements, like the sort indicator or active filters
    #[serde(deserialize_with = "deserialize_style")]
    pub accent: ContentStyle,
    /// Style of hints and informational messages
    #[serde(deserialize_with = "deserialize_style")]
    pub comment: ContentStyle,
    /// Style of errors
    #[serde(deserialize_with = "deserialize_style")]
    pub error: ContentStyle,
    /// Style of warnings, like the read-only badge or confirmation prompts
    #[serde(deserialize_with = "deserialize_style")]
    pub warning: ContentStyle,
    /// Style of the marked resource
    #[serde(deserialize_with = "deserialize_style")]
    pub marked: ContentStyle,
    /// Optional background color for the selected row
    #[serde(deserialize_with = "deserialize_color")]
    pub highlight: Option<Color>,
    /// The symbol displayed next to the selected row
    pub highlight_symbol: String,
    /// Style applied to the selected row
    #[serde(deserialize_with = "deserialize_style")]
    pub highlight_primary: ContentStyle,
}

impl Config {
    /// Initializes the application configuration.
    ///
    /// Attempts to load the configuration from the user's config directory (`config.toml`). If the file does not exist
    /// or has missing fields, it falls back to default values.
    pub fn init(config_file: Option<PathBuf>) -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("org", "CloudScope", "CloudScope").wrap_err("Couldn't initialize project directory")?;
        let config_dir = proj_dirs.config_dir().to_path_buf();

        let config_path = config_file.unwrap_or_else(|| config_dir.join("config.toml"));
        let mut config = if config_path.exists() {
            let config_str = fs::read_to_string(&config_path)
                .wrap_err_with(|| format!("Couldn't read config file {}", config_path.display()))?;
            toml::from_str(&config_str)
                .wrap_err_with(|| format!("Couldn't parse config file {}", config_path.display()))?
        } else {
            Config::default()
        };
        if config.data_dir.as_os_str().is_empty() {
            config.data_dir = proj_dirs.data_dir().to_path_buf();
        }

        config.validate().wrap_err_with(|| format!("Couldn't parse config file {}", config_path.display()))?;

        fs::create_dir_all(&config.data_dir)
            .wrap_err_with(|| format!("Couldn't create data dir {}", config.data_dir.display()))?;

        Ok(config)
    }

    /// Validates the values that can't be checked while deserializing
    fn validate(&self) -> Result<()> {
        let conflicts = self.keybindings.find_conflicts();
        if !conflicts.is_empty() {
            return Err(eyre!(
                "There are some key binding conflicts:\n{}",
                conflicts
                    .into_iter()
                    .map(|(_, a)| format!("- {}", a.into_iter().join(", ")))
                    .join("\n")
            ));
        }
        if self.browser.page_size == 0 {
            return Err(eyre!("browser.page_size must be greater than zero"));
        }
        if self.browser.typed_confirm_suffix_len == 0 {
            return Err(eyre!("browser.typed_confirm_suffix_len must be greater than zero"));
        }
        Ok(())
    }
}

impl BrowserConfig {
    /// The policy driving automatic pagination
    pub fn pagination_policy(&self) -> PaginationPolicy {
        PaginationPolicy {
            prefetch_window: self.prefetch_window,
            min_filtered: self.min_filtered_for_autofetch,
        }
    }
}

impl KeyBindingsConfig {
    /// Finds the [KeyBindingAction] associated with the given [KeyEvent], if any
    pub fn get_action_matching(&self, event: &KeyEvent) -> Option<KeyBindingAction> {
        self.0
            .iter()
            .find_map(|(action, binding)| binding.matches(event).then_some(*action))
    }

    /// Finds all ambiguous key bindings where a single `KeyEvent` maps to multiple `KeyBindingAction`s
    pub fn find_conflicts(&self) -> Vec<(KeyEvent, Vec<KeyBindingAction>)> {
        let mut by_event: HashMap<KeyEvent, Vec<KeyBindingAction>> = HashMap::new();
        for (action, binding) in self.0.iter() {
            for event in binding.0.iter() {
                by_event.entry(*event).or_default().push(*action);
            }
        }
        by_event.into_iter().filter(|(_, actions)| actions.len() > 1).collect()
    }

    /// Whether any binding is triggered by the given plain character, which then can't be used as an action shortcut
    pub fn is_reserved(&self, c: char) -> bool {
        self.get_action_matching(&KeyEvent::from(KeyCode::Char(c))).is_some()
    }

    /// Short help line listing the bindings of every action
    pub fn help_line(&self) -> String {
        self.0
            .iter()
            .map(|(action, binding)| format!("{}: {action}", binding.label()))
            .join("  ")
    }
}

impl KeyBinding {
    /// Checks if a given `KeyEvent` matches any of the key events of this binding, considering only the key `code` and
    /// its `modifiers`
    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.0
            .iter()
            .any(|e| e.code == event.code && e.modifiers == event.modifiers)
    }

    /// Label of the first key event of this binding, like `ctrl-r` or `enter`
    pub fn label(&self) -> String {
        let Some(event) = self.0.first() else {
            return String::new();
        };
        let mut label = String::new();
        for (modifier, name) in MODIFIERS {
            if event.modifiers.contains(*modifier) {
                label.push_str(name);
                label.push('-');
            }
        }
        match event.code {
            KeyCode::Char(' ') => label.push_str("space"),
            KeyCode::Char(c) => label.push(c),
            code => label.push_str(&code.to_string().to_lowercase()),
        }
        label
    }
}

impl Theme {
    /// Style applied to the selected row, including the background color
    pub fn highlight_primary_full(&self) -> ContentStyle {
        let mut style = self.highlight_primary;
        if let Some(color) = self.highlight {
            style.background_color = Some(color);
        }
        style
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            read_only: false,
            context: ContextConfig::default(),
            browser: BrowserConfig::default(),
            catalog: CatalogConfig::default(),
            logs: LogsConfig::default(),
            keybindings: KeyBindingsConfig::default(),
            theme: Theme::default(),
        }
    }
}
impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            profiles: vec![String::from("default")],
            region: String::from("us-east-1"),
        }
    }
}
impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            prefetch_window: 10,
            min_filtered_for_autofetch: 10,
            typed_confirm_suffix_len: 6,
        }
    }
}
impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            filter: String::from("info"),
        }
    }
}
impl Default for KeyBindingsConfig {
    fn default() -> Self {
        let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        let plain = |code| KeyEvent::from(code);
        Self(BTreeMap::from([
            (KeyBindingAction::Quit, KeyBinding(vec![plain(KeyCode::Esc)])),
            (KeyBindingAction::Detail, KeyBinding(vec![plain(KeyCode::Enter)])),
            (KeyBindingAction::Filter, KeyBinding(vec![plain(KeyCode::Char('/'))])),
            (KeyBindingAction::Command, KeyBinding(vec![plain(KeyCode::Char(':'))])),
            (KeyBindingAction::Mark, KeyBinding(vec![plain(KeyCode::Char(' '))])),
            (KeyBindingAction::Diff, KeyBinding(vec![ctrl('d')])),
            (KeyBindingAction::LoadMore, KeyBinding(vec![ctrl('n'), plain(KeyCode::F(3))])),
            (KeyBindingAction::Refresh, KeyBinding(vec![ctrl('r'), plain(KeyCode::F(5))])),
        ]))
    }
}
impl Default for Theme {
    fn default() -> Self {
        let primary = ContentStyle::new();

        let mut secondary = ContentStyle::new();
        secondary.attributes.set(Attribute::Dim);

        let mut accent = ContentStyle::new();
        accent.foreground_color = Some(Color::Yellow);

        let mut comment = ContentStyle::new();
        comment.foreground_color = Some(Color::Green);
        comment.attributes.set(Attribute::Italic);

        let mut error = ContentStyle::new();
        error.foreground_color = Some(Color::DarkRed);

        let mut warning = ContentStyle::new();
        warning.foreground_color = Some(Color::Magenta);
        warning.attributes.set(Attribute::Bold);

        let mut marked = ContentStyle::new();
        marked.foreground_color = Some(Color::Cyan);
        marked.attributes.set(Attribute::Bold);

        Self {
            primary,
            secondary,
            accent,
            comment,
            error,
            warning,
            marked,
            highlight: Some(Color::DarkGrey),
            highlight_symbol: String::from("» "),
            highlight_primary: primary,
        }
    }
}

/// Deserializes the key bindings map.
///
/// On regular builds, the user-provided bindings are merged with the defaults, but tests require every action to be
/// present so the default config file is kept complete.
fn deserialize_bindings_with_defaults<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<KeyBindingAction, KeyBinding>, D::Error>
where
    D: Deserializer<'de>,
{
    let user_bindings = BTreeMap::<KeyBindingAction, KeyBinding>::deserialize(deserializer)?;

    #[cfg(test)]
    {
        use strum::IntoEnumIterator;
        if let Some(missing) = KeyBindingAction::iter().find(|a| !user_bindings.contains_key(a)) {
            return Err(D::Error::custom(format!("Missing key binding for action '{missing}'")));
        }
        Ok(user_bindings)
    }
    #[cfg(not(test))]
    {
        let mut bindings = user_bindings;
        for (action, default_binding) in KeyBindingsConfig::default().0 {
            bindings.entry(action).or_insert(default_binding);
        }
        Ok(bindings)
    }
}

/// Deserializes a string or a list of strings into key events
fn deserialize_key_events<'de, D>(deserializer: D) -> Result<Vec<KeyEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrVec {
        Single(String),
        Multiple(Vec<String>),
    }

    let strings = match StringOrVec::deserialize(deserializer)? {
        StringOrVec::Single(s) => vec![s],
        StringOrVec::Multiple(v) => v,
    };
    strings
        .iter()
        .map(|s| parse_key_event(s).map_err(D::Error::custom))
        .collect()
}

/// Deserializes a string into an optional [`Color`]
fn deserialize_color<'de, D>(deserializer: D) -> Result<Option<Color>, D::Error>
where
    D: Deserializer<'de>,
{
    parse_color(&String::deserialize(deserializer)?).map_err(D::Error::custom)
}

/// Deserializes a string into a [`ContentStyle`], like `"bold"`, `"italic blue"` or `"underline dim green"`
fn deserialize_style<'de, D>(deserializer: D) -> Result<ContentStyle, D::Error>
where
    D: Deserializer<'de>,
{
    parse_style(&String::deserialize(deserializer)?).map_err(D::Error::custom)
}

const MODIFIERS: &[(KeyModifiers, &str)] = &[
    (KeyModifiers::CONTROL, "ctrl"),
    (KeyModifiers::ALT, "alt"),
    (KeyModifiers::SHIFT, "shift"),
];

const STYLE_ATTRIBUTES: &[(&str, Attribute)] = &[
    ("bold", Attribute::Bold),
    ("dim", Attribute::Dim),
    ("italic", Attribute::Italic),
    ("underlined", Attribute::Underlined),
    ("underline", Attribute::Underlined),
];

/// Parses a key event like `ctrl-r`, `alt+enter` or `f5`
fn parse_key_event(raw: &str) -> Result<KeyEvent, String> {
    let lower = raw.to_ascii_lowercase();
    let mut rest = lower.as_str();
    let mut modifiers = KeyModifiers::empty();
    'outer: loop {
        for (modifier, name) in MODIFIERS {
            if let Some(after) = rest.strip_prefix(name)
                && let Some(after) = after.strip_prefix(['-', '+'])
                && !after.is_empty()
            {
                modifiers.insert(*modifier);
                rest = after;
                continue 'outer;
            }
        }
        break;
    }

    let code = match rest {
        "esc" => KeyCode::Esc,
        "enter" => KeyCode::Enter,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "backspace" => KeyCode::Backspace,
        "delete" => KeyCode::Delete,
        "tab" => KeyCode::Tab,
        "space" => KeyCode::Char(' '),
        f if f.len() > 1 && f.starts_with('f') && f[1..].parse::<u8>().is_ok_and(|n| (1..=12).contains(&n)) => {
            KeyCode::F(f[1..].parse().map_err(|_| format!("Unable to parse key binding: {raw}"))?)
        }
        c if c.chars().count() == 1 => {
            let c = c.chars().next().ok_or_else(|| format!("Unable to parse key binding: {raw}"))?;
            if modifiers.contains(KeyModifiers::SHIFT) {
                KeyCode::Char(c.to_ascii_uppercase())
            } else {
                KeyCode::Char(c)
            }
        }
        _ => return Err(format!("Unable to parse key binding: {raw}")),
    };
    Ok(KeyEvent::new(code, modifiers))
}

/// Parses an optional [`Color`], where an empty string or `none` means no color
fn parse_color(raw: &str) -> Result<Option<Color>, String> {
    let lower = raw.trim().to_ascii_lowercase();
    if lower.is_empty() || lower == "none" {
        Ok(None)
    } else {
        parse_color_inner(&lower).map(Some)
    }
}

/// Parses a [`ContentStyle`]: any number of leading attributes, followed by an optional foreground color
fn parse_style(raw: &str) -> Result<ContentStyle, String> {
    let lower = raw.to_ascii_lowercase();
    let mut style = ContentStyle::new();
    let mut rest = lower.trim();
    'outer: loop {
        for (name, attribute) in STYLE_ATTRIBUTES {
            if let Some(after) = rest.strip_prefix(name) {
                style.attributes.set(*attribute);
                rest = after.trim_start();
                continue 'outer;
            }
        }
        break;
    }
    if !rest.is_empty() && rest != "default" {
        style.foreground_color = Some(parse_color_inner(rest)?);
    }
    Ok(style)
}

/// Parses a color name, `rgb(r, g, b)`, `#rrggbb` or an ANSI index
fn parse_color_inner(raw: &str) -> Result<Color, String> {
    let err = || format!("Unable to parse color: {raw}");
    let named = match raw.replace(' ', "").as_str() {
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "gray" | "grey" => Some(Color::Grey),
        "darkgray" | "darkgrey" => Some(Color::DarkGrey),
        "darkred" => Some(Color::DarkRed),
        "darkgreen" => Some(Color::DarkGreen),
        "darkyellow" => Some(Color::DarkYellow),
        "darkblue" => Some(Color::DarkBlue),
        "darkmagenta" => Some(Color::DarkMagenta),
        "darkcyan" => Some(Color::DarkCyan),
        "white" => Some(Color::White),
        _ => None,
    };
    if let Some(color) = named {
        return Ok(color);
    }
    if let Some(inner) = raw.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
        let rgb: Vec<u8> = inner
            .split(',')
            .map(|c| c.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .map_err(|_| err())?;
        let [r, g, b] = rgb[..] else {
            return Err(err());
        };
        return Ok(Color::Rgb { r, g, b });
    }
    if let Some(hex) = raw.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(err());
        }
        let channel = |ix: usize| u8::from_str_radix(&hex[ix..ix + 2], 16).map_err(|_| err());
        return Ok(Color::Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        });
    }
    raw.parse::<u8>().map(Color::AnsiValue).map_err(|_| err())
}
