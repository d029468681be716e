//! The `background` shorthand, classified by token shape. Position and size
//! are separated by `/`.

use super::{is_length_like, split_value_tokens, Longhands};
use crate::declaration::Declaration;

pub(super) const LONGHANDS: &[&str] = &[
  "background-color",
  "background-image",
  "background-repeat",
  "background-attachment",
  "background-position",
  "background-size",
  "background-origin",
  "background-clip",
];

const DEFAULT_COLOR: &str = "transparent";
const DEFAULT_IMAGE: &str = "none";
const DEFAULT_REPEAT: &str = "repeat";
const DEFAULT_ATTACHMENT: &str = "scroll";
const DEFAULT_POSITION: &str = "0% 0%";
const DEFAULT_SIZE: &str = "auto";
const DEFAULT_ORIGIN: &str = "padding-box";
const DEFAULT_CLIP: &str = "border-box";

fn is_image(lower: &str) -> bool {
  lower.starts_with("url(")
    || lower.starts_with("linear-gradient(")
    || lower.starts_with("radial-gradient(")
    || lower.starts_with("conic-gradient(")
    || lower.starts_with("repeating-linear-gradient(")
    || lower.starts_with("repeating-radial-gradient(")
    || lower.starts_with("image-set(")
}

fn is_repeat(lower: &str) -> bool {
  matches!(
    lower,
    "repeat" | "repeat-x" | "repeat-y" | "no-repeat" | "space" | "round"
  )
}

fn is_attachment(lower: &str) -> bool {
  matches!(lower, "scroll" | "fixed" | "local")
}

fn is_box(lower: &str) -> bool {
  matches!(lower, "border-box" | "padding-box" | "content-box")
}

fn is_position(token: &str) -> bool {
  matches!(
    token.to_ascii_lowercase().as_str(),
    "left" | "right" | "top" | "bottom" | "center"
  ) || is_length_like(token)
}

fn is_size(token: &str) -> bool {
  matches!(token.to_ascii_lowercase().as_str(), "auto" | "cover" | "contain")
    || is_length_like(token)
}

pub(super) fn expand(decl: &Declaration) -> Option<Longhands> {
  let tokens = split_value_tokens(&decl.value);
  if tokens.is_empty() {
    return None;
  }

  let mut color = None;
  let mut image = None;
  let mut repeat: Vec<&str> = Vec::new();
  let mut attachment = None;
  let mut position: Vec<String> = Vec::new();
  let mut size: Vec<String> = Vec::new();
  let mut origin = None;
  let mut clip = None;
  let mut in_size = false;

  for token in tokens {
    let lower = token.to_ascii_lowercase();

    if token == "/" {
      in_size = true;
      continue;
    }
    if in_size {
      if is_size(token) {
        size.push(token.to_string());
        continue;
      }
      in_size = false;
    }

    if image.is_none() && (is_image(&lower) || lower == "none") {
      image = Some(token.to_string());
    } else if is_repeat(&lower) && repeat.len() < 2 {
      repeat.push(token);
    } else if attachment.is_none() && is_attachment(&lower) {
      attachment = Some(token.to_string());
    } else if is_box(&lower) {
      // One box keyword sets both origin and clip; a second overrides clip.
      if origin.is_none() {
        origin = Some(token.to_string());
        clip = Some(token.to_string());
      } else {
        clip = Some(token.to_string());
      }
    } else if let Some((pos, sz)) = split_at_slash(token) {
      // A slash glued to the position token, e.g. `center/cover`.
      if !pos.is_empty() && !is_position(pos) {
        return None;
      }
      if !pos.is_empty() {
        position.push(pos.to_string());
      }
      if !sz.is_empty() {
        size.push(sz.to_string());
      }
      in_size = true;
    } else if is_position(token) {
      position.push(token.to_string());
    } else if color.is_none() {
      color = Some(token.to_string());
    } else {
      return None;
    }
  }

  Some(
    [
      ("background-color", color.unwrap_or_else(|| DEFAULT_COLOR.into())),
      ("background-image", image.unwrap_or_else(|| DEFAULT_IMAGE.into())),
      (
        "background-repeat",
        if repeat.is_empty() {
          DEFAULT_REPEAT.into()
        } else {
          repeat.join(" ")
        },
      ),
      (
        "background-attachment",
        attachment.unwrap_or_else(|| DEFAULT_ATTACHMENT.into()),
      ),
      (
        "background-position",
        if position.is_empty() {
          DEFAULT_POSITION.into()
        } else {
          position.join(" ")
        },
      ),
      (
        "background-size",
        if size.is_empty() {
          DEFAULT_SIZE.into()
        } else {
          size.join(" ")
        },
      ),
      ("background-origin", origin.unwrap_or_else(|| DEFAULT_ORIGIN.into())),
      ("background-clip", clip.unwrap_or_else(|| DEFAULT_CLIP.into())),
    ]
    .into_iter()
    .map(|(name, value)| Declaration::new(name, &value, decl.important))
    .collect(),
  )
}

fn split_at_slash(token: &str) -> Option<(&str, &str)> {
  let mut depth = 0usize;
  for (i, b) in token.bytes().enumerate() {
    match b {
      b'(' => depth += 1,
      b')' => depth = depth.saturating_sub(1),
      b'/' if depth == 0 => return Some((&token[..i], &token[i + 1..])),
      _ => {}
    }
  }
  None
}

/// Builds a minimal `background` value from values in [`LONGHANDS`] order.
pub(super) fn minimal_background(values: &[&str]) -> Option<String> {
  let &[color, image, repeat, attachment, position, size, origin, clip] = values else {
    return None;
  };

  let mut parts: Vec<String> = Vec::new();
  if !color.eq_ignore_ascii_case(DEFAULT_COLOR) {
    parts.push(color.to_string());
  }
  if !image.eq_ignore_ascii_case(DEFAULT_IMAGE) {
    parts.push(image.to_string());
  }
  if !repeat.eq_ignore_ascii_case(DEFAULT_REPEAT) {
    parts.push(repeat.to_string());
  }
  if !attachment.eq_ignore_ascii_case(DEFAULT_ATTACHMENT) {
    parts.push(attachment.to_string());
  }
  if !size.eq_ignore_ascii_case(DEFAULT_SIZE) {
    parts.push(format!("{} / {}", position, size));
  } else if !position.eq_ignore_ascii_case(DEFAULT_POSITION) {
    parts.push(position.to_string());
  }
  let origin_default = origin.eq_ignore_ascii_case(DEFAULT_ORIGIN);
  let clip_default = clip.eq_ignore_ascii_case(DEFAULT_CLIP);
  if !(origin_default && clip_default) {
    if origin.eq_ignore_ascii_case(clip) {
      parts.push(origin.to_string());
    } else {
      parts.push(format!("{} {}", origin, clip));
    }
  }

  if parts.is_empty() {
    return Some(DEFAULT_IMAGE.to_string());
  }
  Some(parts.join(" "))
}
