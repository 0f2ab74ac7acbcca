//! HTML generation for the embedded admin pages.
//!
//! Uses `quick-xml`'s writer so every attribute value and text node is
//! escaped. `<style>` and inline JSON bodies are written raw; callers only
//! pass trusted CSS or JSON that has been made safe with [`script_json`].

use std::io::Cursor;

use quick_xml::{
  Writer,
  events::{BytesEnd, BytesStart, BytesText, Event},
};
use serde::Serialize;

use crate::widget::{DocumentHead, HeadElement, LOADER_FUNCTION};

const APP_BRIDGE_SRC: &str = "https://cdn.shopify.com/shopifycloud/app-bridge.js";
const POLARIS_SRC: &str = "https://cdn.shopify.com/shopifycloud/polaris.js";

/// Serialise `value` for embedding inside a `<script>` element.
///
/// `<`, `>` and `&` only occur inside JSON strings, where their `\uXXXX`
/// escapes decode to the same value, so no `</script>` or `<!--` can reach
/// the HTML parser.
pub fn script_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
  let json = serde_json::to_string(value)?;
  let mut out = String::with_capacity(json.len());
  for c in json.chars() {
    match c {
      '<' => out.push_str("\\u003c"),
      '>' => out.push_str("\\u003e"),
      '&' => out.push_str("\\u0026"),
      c => out.push(c),
    }
  }
  Ok(out)
}

pub struct HtmlWriter {
  writer: Writer<Cursor<Vec<u8>>>,
}

impl HtmlWriter {
  fn new() -> Self {
    Self { writer: Writer::new(Cursor::new(Vec::new())) }
  }

  // Writes go to an in-memory buffer and cannot fail.
  fn emit(&mut self, event: Event<'_>) { self.writer.write_event(event).unwrap(); }

  pub fn start(&mut self, tag: &str, attrs: &[(&str, &str)]) -> &mut Self {
    let mut el = BytesStart::new(tag);
    for (k, v) in attrs {
      el.push_attribute((*k, *v));
    }
    self.emit(Event::Start(el));
    self
  }

  pub fn end(&mut self, tag: &str) -> &mut Self {
    self.emit(Event::End(BytesEnd::new(tag)));
    self
  }

  pub fn text(&mut self, text: &str) -> &mut Self {
    self.emit(Event::Text(BytesText::new(text)));
    self
  }

  /// `<tag attrs>text</tag>` with `text` escaped.
  pub fn text_elem(&mut self, tag: &str, attrs: &[(&str, &str)], text: &str) -> &mut Self {
    self.start(tag, attrs).text(text).end(tag)
  }

  /// `<tag attrs>raw</tag>` with `raw` written verbatim.
  fn raw_elem(&mut self, tag: &str, attrs: &[(&str, &str)], raw: &str) -> &mut Self {
    self.start(tag, attrs);
    self.emit(Event::Text(BytesText::from_escaped(raw)));
    self.end(tag)
  }

  fn void(&mut self, tag: &str, attrs: &[(&str, &str)]) -> &mut Self {
    let mut el = BytesStart::new(tag);
    for (k, v) in attrs {
      el.push_attribute((*k, *v));
    }
    self.emit(Event::Empty(el));
    self
  }

  fn head_element(&mut self, element: &HeadElement) {
    match element {
      HeadElement::Style(css) => {
        self.raw_elem("style", &[], css);
      }
      HeadElement::Script(tag) => {
        let on_load = loader_call(&tag.on_load);
        let mut attrs: Vec<(&str, &str)> = vec![
          ("src", tag.src.as_str()),
          ("async", ""),
          ("onload", on_load.as_str()),
        ];
        attrs.extend(tag.attributes.iter().map(|(k, v)| (*k, v.as_str())));
        self.start("script", &attrs).end("script");
      }
      HeadElement::LoaderCall(container) => {
        self.raw_elem("script", &[], &loader_call(container));
      }
    }
  }
}

fn loader_call(container: &str) -> String {
  // Container ids are crate constants, never user input.
  format!("window.{LOADER_FUNCTION} && window.{LOADER_FUNCTION}('{container}')")
}

/// Page-level inputs shared by every admin document.
pub struct Document<'a> {
  pub title:     &'a str,
  pub api_key:   &'a str,
  pub head:      &'a DocumentHead,
  /// Pre-escaped JSON exposed to client code as `#loader-data`.
  pub data_json: &'a str,
}

impl Document<'_> {
  pub fn render(&self, body: impl FnOnce(&mut HtmlWriter)) -> String {
    let mut w = HtmlWriter::new();
    w.emit(Event::DocType(BytesText::from_escaped("html")));
    w.start("html", &[("lang", "en")]);

    w.start("head", &[]);
    w.void("meta", &[("charset", "utf-8")]);
    w.void("meta", &[("name", "viewport"), ("content", "width=device-width,initial-scale=1")]);
    w.void("meta", &[("name", "shopify-api-key"), ("content", self.api_key)]);
    w.text_elem("title", &[], self.title);
    w.start("script", &[("src", APP_BRIDGE_SRC)]).end("script");
    w.start("script", &[("src", POLARIS_SRC)]).end("script");
    for element in self.head.elements() {
      w.head_element(element);
    }
    w.end("head");

    w.start("body", &[]);
    body(&mut w);
    w.raw_elem(
      "script",
      &[("type", "application/json"), ("id", "loader-data")],
      self.data_json,
    );
    w.end("body");
    w.end("html");

    String::from_utf8_lossy(&w.writer.into_inner().into_inner()).into_owned()
  }
}
