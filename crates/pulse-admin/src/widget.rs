//! Changelog widget binding.
//!
//! The changelog page hosts a third-party widget. Mounting it injects a
//! style override and, unless the widget loader is already registered in
//! the document, a script tag whose markup attributes carry the project
//! settings and the displayed user. Unmounting removes everything mounting
//! added.

use std::sync::atomic::{AtomicBool, Ordering};

use pulse_core::UserIdentity;
use rand_core::{OsRng, RngCore as _};
use serde::Deserialize;

/// Id of the element the widget renders into.
pub const TARGET_CONTAINER_ID: &str = "changelog-component";

/// Name of the global function the widget script defines once loaded.
pub const LOADER_FUNCTION: &str = "loadChangelog";

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
  #[default]
  Light,
  Dark,
}

impl ColorMode {
  pub fn as_str(self) -> &'static str {
    match self {
      ColorMode::Light => "light",
      ColorMode::Dark => "dark",
    }
  }
}

/// Widget settings, deserialised from the `[widget]` table of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
  pub script_url: String,
  pub slug:       String,
  pub color_mode: ColorMode,
  /// `v2` selects the changelog layout.
  pub variant:    String,
}

impl Default for WidgetConfig {
  fn default() -> Self {
    Self {
      script_url: "https://features.vote/widget/widget.js".to_owned(),
      slug:       "pulse".to_owned(),
      color_mode: ColorMode::Light,
      variant:    "v2".to_owned(),
    }
  }
}

/// A fresh random key identifying one page session to the widget host.
pub fn session_key() -> String {
  let mut bytes = [0u8; 16];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

// ─── Head elements ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
  pub src:        String,
  pub attributes: Vec<(&'static str, String)>,
  /// Container the loader is invoked for once the script has loaded.
  pub on_load:    String,
}

impl ScriptTag {
  /// The widget script for `user`. `user_id`, `user_email` and `user_name`
  /// are only emitted when the corresponding field is known.
  pub fn changelog(config: &WidgetConfig, session_key: &str, user: &UserIdentity) -> Self {
    let mut attributes = vec![
      ("slug", config.slug.clone()),
      ("color_mode", config.color_mode.as_str().to_owned()),
      ("variant", config.variant.clone()),
    ];
    let optional = [
      ("user_id", &user.id),
      ("user_email", &user.email),
      ("user_name", &user.full_name),
    ];
    for (name, value) in optional {
      if let Some(value) = value {
        attributes.push((name, value.clone()));
      }
    }

    Self {
      src: format!("{}?sessionKey={session_key}", config.script_url),
      attributes,
      on_load: TARGET_CONTAINER_ID.to_owned(),
    }
  }

  pub fn attribute(&self, name: &str) -> Option<&str> {
    self
      .attributes
      .iter()
      .find(|(n, _)| *n == name)
      .map(|(_, v)| v.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadElement {
  Style(String),
  Script(ScriptTag),
  /// Invoke an already registered loader for the given container.
  LoaderCall(String),
}

/// CSS letting the widget container span the full viewport width.
pub fn style_override(container_id: &str) -> String {
  format!(
    "
s-page,
s-page > *,
s-page > * > * {{
  max-width: none !important;
}}
#{container_id} {{
  width: 100vw !important;
  max-width: 100vw !important;
  margin-left: calc(-50vw + 50%) !important;
  margin-right: calc(-50vw + 50%) !important;
  padding: 2rem !important;
  position: relative !important;
  left: 0 !important;
  right: 0 !important;
}}
#{container_id} > * {{
  width: 100% !important;
  max-width: 100% !important;
}}
"
  )
}

// ─── Document ────────────────────────────────────────────────────────────────

/// Register-once guard for the widget loader.
#[derive(Debug, Default)]
pub struct LoaderRegistry {
  registered: AtomicBool,
}

impl LoaderRegistry {
  /// Record that the loader is available. Returns `true` only for the call
  /// that performed the registration.
  pub fn register(&self) -> bool {
    !self.registered.swap(true, Ordering::AcqRel)
  }

  pub fn is_registered(&self) -> bool { self.registered.load(Ordering::Acquire) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementId(u64);

/// The `<head>` of one rendered document.
#[derive(Debug, Default)]
pub struct DocumentHead {
  elements: Vec<(ElementId, HeadElement)>,
  next_id:  u64,
  loader:   LoaderRegistry,
}

impl DocumentHead {
  pub fn append(&mut self, element: HeadElement) -> ElementId {
    let id = ElementId(self.next_id);
    self.next_id += 1;
    self.elements.push((id, element));
    id
  }

  /// Returns whether an element was removed.
  pub fn remove(&mut self, id: ElementId) -> bool {
    let before = self.elements.len();
    self.elements.retain(|(e, _)| *e != id);
    self.elements.len() != before
  }

  pub fn elements(&self) -> impl Iterator<Item = &HeadElement> {
    self.elements.iter().map(|(_, e)| e)
  }

  pub fn loader(&self) -> &LoaderRegistry { &self.loader }
}

/// Handle for a mounted widget; pass it back to [`WidgetMount::unmount`].
#[derive(Debug)]
pub struct WidgetMount {
  injected: Vec<ElementId>,
}

impl WidgetMount {
  pub fn mount(head: &mut DocumentHead, script: ScriptTag) -> Self {
    let mut injected = vec![head.append(HeadElement::Style(style_override(&script.on_load)))];

    if head.loader().is_registered() {
      injected.push(head.append(HeadElement::LoaderCall(script.on_load)));
    } else {
      injected.push(head.append(HeadElement::Script(script)));
    }

    Self { injected }
  }

  /// Record that the injected script ran and defined the loader. Later
  /// mounts into the same head call the loader instead of injecting the
  /// script again. Returns `false` if the loader was already registered.
  pub fn script_loaded(&self, head: &DocumentHead) -> bool {
    head.loader().register()
  }

  /// Remove every element this mount injected. The loader registration
  /// outlives the mount.
  pub fn unmount(self, head: &mut DocumentHead) {
    for id in self.injected {
      head.remove(id);
    }
  }
}

/// The widget as hosted by one page: a single session key, remounted
/// whenever the displayed user changes.
pub struct ChangelogWidget {
  config:      WidgetConfig,
  session_key: String,
  mounted:     Option<WidgetMount>,
}

impl ChangelogWidget {
  pub fn new(config: &WidgetConfig) -> Self {
    Self { config: config.clone(), session_key: session_key(), mounted: None }
  }

  /// Show the widget for `user`, replacing any previous mount.
  pub fn show(&mut self, head: &mut DocumentHead, user: &UserIdentity) {
    self.hide(head);
    let script = ScriptTag::changelog(&self.config, &self.session_key, user);
    self.mounted = Some(WidgetMount::mount(head, script));
  }

  pub fn hide(&mut self, head: &mut DocumentHead) {
    if let Some(mount) = self.mounted.take() {
      mount.unmount(head);
    }
  }

  /// Forward the script's load event; see [`WidgetMount::script_loaded`].
  pub fn script_loaded(&self, head: &DocumentHead) -> bool {
    self.mounted.as_ref().is_some_and(|m| m.script_loaded(head))
  }
}
