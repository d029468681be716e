//! `@import` resolution.
//!
//! Each unresolved import is fetched, parsed, recursively resolved, media-
//! composed and spliced into the parent's rule list at the position the
//! import statement occupied. One renumbering pass at the end restores the
//! id-equals-position invariant; the media index rebuilds lazily.
//!
//! Fetching goes through the [`ImportFetcher`] trait; the default
//! implementation reads files and performs HTTP GETs, refusing sensitive
//! filesystem paths and anything outside the scheme/extension allowlists.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use ahash::AHashMap;
use bitflags::bitflags;
use log::debug;

use crate::error::{Error, ImportError};
use crate::media_query::MediaQuery;
use crate::rules::CssRule;
use crate::stylesheet::StyleSheet;

bitflags! {
  /// URL schemes the resolver may follow.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct Schemes: u8 {
    const HTTPS = 1;
    const HTTP = 1 << 1;
    const FILE = 1 << 2;
  }
}

/// Filesystem prefixes the default fetcher refuses to read.
const SENSITIVE_PREFIXES: [&str; 4] = ["/etc/", "/proc/", "/sys/", "/dev/"];

/// Fetches the text of an import target.
///
/// The resolver passes its normalized absolute URL: a file path resolved
/// against `base_path`, or an HTTP URL resolved against `base_uri`.
pub trait ImportFetcher {
  fn fetch(&self, url: &str, options: &ImportOptions) -> Result<String, Error<ImportError>>;
}

/// Options for `@import` resolution.
#[derive(Clone)]
pub struct ImportOptions {
  /// Maximum import nesting depth.
  pub max_depth: u8,
  pub allowed_schemes: Schemes,
  /// Permitted URL path extensions; an empty extension is always allowed.
  pub extensions: Vec<String>,
  /// Timeout for HTTP fetches performed by the default fetcher.
  pub timeout: Duration,
  pub follow_redirects: bool,
  /// Base directory for relative file imports.
  pub base_path: Option<PathBuf>,
  /// Base URI for relative HTTP imports.
  pub base_uri: Option<String>,
  /// Overrides the default file/HTTP fetcher.
  pub fetcher: Option<Rc<dyn ImportFetcher>>,
}

impl Default for ImportOptions {
  fn default() -> ImportOptions {
    ImportOptions {
      max_depth: 5,
      allowed_schemes: Schemes::HTTPS,
      extensions: vec!["css".into()],
      timeout: Duration::from_secs(10),
      follow_redirects: true,
      base_path: None,
      base_uri: None,
      fetcher: None,
    }
  }
}

impl std::fmt::Debug for ImportOptions {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    f.debug_struct("ImportOptions")
      .field("max_depth", &self.max_depth)
      .field("allowed_schemes", &self.allowed_schemes)
      .field("extensions", &self.extensions)
      .field("timeout", &self.timeout)
      .field("follow_redirects", &self.follow_redirects)
      .field("base_path", &self.base_path)
      .field("base_uri", &self.base_uri)
      .field("fetcher", &self.fetcher.as_ref().map(|_| ".."))
      .finish()
  }
}

/// The built-in fetcher: file reads for paths and `file://`, HTTP GET for
/// `http(s)://`, refusing everything else.
pub struct DefaultFetcher;

impl ImportFetcher for DefaultFetcher {
  fn fetch(&self, url: &str, options: &ImportOptions) -> Result<String, Error<ImportError>> {
    fetch_uri(url, options)
  }
}

pub(crate) fn fetch_uri(url: &str, options: &ImportOptions) -> Result<String, Error<ImportError>> {
  match scheme_of(url) {
    Some("file") => read_file(Path::new(url.trim_start_matches("file://"))),
    Some("http") | Some("https") => http_get(url, options),
    Some(other) => Err(Error::new(ImportError::DisallowedScheme(other.to_string()))),
    None => read_file(Path::new(url)),
  }
}

fn read_file(path: &Path) -> Result<String, Error<ImportError>> {
  let display = path.to_string_lossy();
  if SENSITIVE_PREFIXES.iter().any(|p| display.starts_with(p)) {
    return Err(Error::new(ImportError::SensitivePath(display.into_owned())));
  }
  std::fs::read_to_string(path).map_err(|e| Error::new(ImportError::Io(e)))
}

#[cfg(feature = "http")]
fn http_get(url: &str, options: &ImportOptions) -> Result<String, Error<ImportError>> {
  let redirects = if options.follow_redirects {
    reqwest::redirect::Policy::limited(10)
  } else {
    reqwest::redirect::Policy::none()
  };
  let client = reqwest::blocking::Client::builder()
    .timeout(options.timeout)
    .redirect(redirects)
    .build()
    .map_err(|e| Error::new(ImportError::Network(e.to_string())))?;
  client
    .get(url)
    .send()
    .and_then(|response| response.error_for_status())
    .and_then(|response| response.text())
    .map_err(|e| Error::new(ImportError::Network(e.to_string())))
}

#[cfg(not(feature = "http"))]
fn http_get(url: &str, _options: &ImportOptions) -> Result<String, Error<ImportError>> {
  Err(Error::new(ImportError::FetchUnsupported(url.to_string())))
}

fn scheme_of(url: &str) -> Option<&str> {
  let colon = url.find(':')?;
  let scheme = &url[..colon];
  if !scheme.is_empty()
    && scheme.as_bytes()[0].is_ascii_alphabetic()
    && scheme
      .bytes()
      .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.')
  {
    Some(scheme)
  } else {
    None
  }
}

#[derive(Debug, Clone, PartialEq)]
enum TargetKind {
  File(PathBuf),
  Http,
}

#[derive(Debug, Clone)]
struct Target {
  /// The normalized absolute URL handed to the fetcher and used for cycle
  /// detection.
  key: String,
  kind: TargetKind,
}

/// Resolves every unresolved import of `sheet` in place.
pub(crate) fn resolve_imports(
  sheet: &mut StyleSheet,
  options: &ImportOptions,
) -> Result<(), Error<ImportError>> {
  let mut options = options.clone();
  if options.base_path.is_none() {
    options.base_path = sheet.options().base_dir.clone();
  }
  if options.base_uri.is_none() {
    options.base_uri = sheet.options().base_uri.clone();
  }
  let fetcher: Rc<dyn ImportFetcher> = options
    .fetcher
    .clone()
    .unwrap_or_else(|| Rc::new(DefaultFetcher));

  let mut ancestors = Vec::new();
  resolve_level(sheet, &options, fetcher.as_ref(), 1, &mut ancestors)
}

fn resolve_level(
  sheet: &mut StyleSheet,
  options: &ImportOptions,
  fetcher: &dyn ImportFetcher,
  depth: u8,
  ancestors: &mut Vec<String>,
) -> Result<(), Error<ImportError>> {
  if sheet.imports.iter().all(|i| i.resolved) {
    return Ok(());
  }
  if depth > options.max_depth {
    return Err(Error::new(ImportError::DepthExceeded));
  }

  let result = resolve_level_inner(sheet, options, fetcher, depth, ancestors);
  // Splices keep ids unique, so renumbering is safe even on a failed pass.
  sheet.renumber();
  result
}

fn resolve_level_inner(
  sheet: &mut StyleSheet,
  options: &ImportOptions,
  fetcher: &dyn ImportFetcher,
  depth: u8,
  ancestors: &mut Vec<String>,
) -> Result<(), Error<ImportError>> {
  let mut offset = 0usize;
  let mut next_temp_id = sheet.rules.len() as u32;

  for index in 0..sheet.imports.len() {
    if sheet.imports[index].resolved {
      continue;
    }

    let url = sheet.imports[index].url.clone();
    let target = normalize(&url, options)?;
    validate(&target, options)?;
    if ancestors.contains(&target.key) {
      return Err(Error::new(ImportError::CircularImport(target.key)));
    }

    debug!("fetching @import {}", target.key);
    let css = fetcher.fetch(&target.key, options)?;

    let mut child_parser_options = sheet.options().clone();
    let mut child_options = options.clone();
    match &target.kind {
      TargetKind::File(path) => {
        let dir = path.parent().map(Path::to_path_buf);
        child_parser_options.base_dir = dir.clone();
        child_parser_options.base_uri = None;
        child_options.base_path = dir;
        child_options.base_uri = None;
      }
      TargetKind::Http => {
        child_parser_options.base_dir = None;
        child_parser_options.base_uri = Some(target.key.clone());
        child_options.base_path = None;
        child_options.base_uri = Some(target.key.clone());
      }
    }

    let mut child = StyleSheet::new(child_parser_options);
    child.add_block(&css)?;

    ancestors.push(target.key.clone());
    let nested = resolve_level(&mut child, &child_options, fetcher, depth + 1, ancestors);
    ancestors.pop();
    nested?;

    if let Some(parent_id) = sheet.imports[index].media_query_id {
      let parent_query = sheet.media_queries[parent_id as usize].clone();
      compose_child_media(&mut child, &parent_query);
    }

    let child_len = child.rules.len();
    let pos = (sheet.imports[index].id as usize + offset).min(sheet.rules.len());
    splice(sheet, child, pos, &mut next_temp_id);
    sheet.imports[index].id = pos as u32;
    sheet.imports[index].resolved = true;
    offset += child_len;
  }

  Ok(())
}

fn normalize(url: &str, options: &ImportOptions) -> Result<Target, Error<ImportError>> {
  match scheme_of(url) {
    Some("file") => {
      let path = PathBuf::from(url.trim_start_matches("file://"));
      Ok(Target {
        key: path.to_string_lossy().into_owned(),
        kind: TargetKind::File(path),
      })
    }
    Some("http") | Some("https") => Ok(Target {
      key: url.to_string(),
      kind: TargetKind::Http,
    }),
    Some(other) => Err(Error::new(ImportError::DisallowedScheme(other.to_string()))),
    None => {
      if let Some(base) = &options.base_uri {
        let resolved = url::Url::parse(base)
          .and_then(|b| b.join(url))
          .map_err(|_| Error::new(ImportError::InvalidUrl(url.to_string())))?;
        Ok(Target {
          key: resolved.to_string(),
          kind: TargetKind::Http,
        })
      } else {
        let path = match &options.base_path {
          Some(base) => base.join(url),
          None => PathBuf::from(url),
        };
        Ok(Target {
          key: path.to_string_lossy().into_owned(),
          kind: TargetKind::File(path),
        })
      }
    }
  }
}

fn validate(target: &Target, options: &ImportOptions) -> Result<(), Error<ImportError>> {
  let scheme = match &target.kind {
    TargetKind::File(path) => {
      let display = path.to_string_lossy();
      if SENSITIVE_PREFIXES.iter().any(|p| display.starts_with(p)) {
        return Err(Error::new(ImportError::SensitivePath(display.into_owned())));
      }
      Schemes::FILE
    }
    TargetKind::Http => {
      if target.key.starts_with("https://") {
        Schemes::HTTPS
      } else {
        Schemes::HTTP
      }
    }
  };
  if !options.allowed_schemes.contains(scheme) {
    let name = if scheme == Schemes::FILE {
      "file"
    } else if scheme == Schemes::HTTP {
      "http"
    } else {
      "https"
    };
    return Err(Error::new(ImportError::DisallowedScheme(name.to_string())));
  }

  let extension = match &target.kind {
    TargetKind::File(path) => path
      .extension()
      .map(|e| e.to_string_lossy().into_owned())
      .unwrap_or_default(),
    TargetKind::Http => url::Url::parse(&target.key)
      .ok()
      .and_then(|u| {
        Path::new(u.path())
          .extension()
          .map(|e| e.to_string_lossy().into_owned())
      })
      .unwrap_or_default(),
  };
  if !extension.is_empty()
    && !options
      .extensions
      .iter()
      .any(|e| e.eq_ignore_ascii_case(&extension))
  {
    return Err(Error::new(ImportError::DisallowedExtension(extension)));
  }

  Ok(())
}

/// Composes the import statement's media query onto every rule of the
/// imported sheet: rules without media take the parent query directly;
/// rules with media get a combined query.
fn compose_child_media(child: &mut StyleSheet, parent: &MediaQuery) {
  let parent_text = parent.text();
  let mut combined: AHashMap<u32, u32> = AHashMap::new();

  for index in 0..child.rules.len() {
    let Some(style) = child.rules[index].as_style() else {
      continue;
    };
    let new_id = match style.media_query_id {
      None => child.intern_media_query(parent.media_type.clone(), parent.conditions.clone()),
      Some(query_id) => match combined.get(&query_id) {
        Some(id) => *id,
        None => {
          let query = child.media_queries[query_id as usize].clone();
          let tail = query.conditions.clone().unwrap_or_else(|| query.text());
          let (ty, cond) = MediaQuery::parse_text(&format!("{} and {}", parent_text, tail));
          let id = child.intern_media_query(ty, cond);
          combined.insert(query_id, id);
          id
        }
      },
    };
    if let CssRule::Style(style) = &mut child.rules[index] {
      style.media_query_id = Some(new_id);
    }
  }
}

/// Inserts the child's rules at `pos`, remapping media queries, selector
/// lists and rule ids into the parent's id spaces. Rule ids become unique
/// temporaries; the caller renumbers once all splices are done.
fn splice(sheet: &mut StyleSheet, child: StyleSheet, pos: usize, next_temp_id: &mut u32) {
  let mut query_map: AHashMap<u32, u32> = AHashMap::new();
  for query in &child.media_queries {
    let new_id = sheet.intern_media_query(query.media_type.clone(), query.conditions.clone());
    query_map.insert(query.id, new_id);
  }
  for ids in child.media_query_lists.values() {
    let new_ids: Vec<u32> = ids.iter().filter_map(|i| query_map.get(i).copied()).collect();
    if new_ids.len() > 1 {
      sheet.allocate_media_query_list(new_ids);
    }
  }

  let base = *next_temp_id;
  *next_temp_id += child.rules.len() as u32;

  let mut list_map: AHashMap<u32, u32> = AHashMap::new();
  let mut spliced: Vec<CssRule> = Vec::with_capacity(child.rules.len());
  for rule in child.rules {
    match rule {
      CssRule::Style(mut style) => {
        style.id += base;
        style.parent_rule_id = style.parent_rule_id.map(|p| p + base);
        style.media_query_id = style.media_query_id.and_then(|q| query_map.get(&q).copied());
        if let Some(list_id) = style.selector_list_id {
          let new_list = *list_map
            .entry(list_id)
            .or_insert_with(|| sheet.allocate_selector_list());
          style.selector_list_id = Some(new_list);
        }
        spliced.push(CssRule::Style(style));
      }
      CssRule::At(mut at) => {
        at.id += base;
        spliced.push(CssRule::At(at));
      }
    }
  }

  sheet.rules.splice(pos..pos, spliced);
  if sheet.charset.is_none() {
    sheet.charset = child.charset;
  }
  sheet.has_nesting |= child.has_nesting;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scheme_detection() {
    assert_eq!(scheme_of("https://x/a.css"), Some("https"));
    assert_eq!(scheme_of("file:///a.css"), Some("file"));
    assert_eq!(scheme_of("a/b.css"), None);
    assert_eq!(scheme_of("a:b.css"), Some("a"));
  }

  #[test]
  fn sensitive_paths_are_refused() {
    let err = read_file(Path::new("/etc/passwd")).unwrap_err();
    assert!(matches!(err.kind, ImportError::SensitivePath(_)));
  }

  #[test]
  fn validation_gates_schemes_and_extensions() {
    let options = ImportOptions::default();
    let https = normalize("https://x.test/a.css", &options).unwrap();
    assert!(validate(&https, &options).is_ok());

    let http = normalize("http://x.test/a.css", &options).unwrap();
    assert!(matches!(
      validate(&http, &options).unwrap_err().kind,
      ImportError::DisallowedScheme(_)
    ));

    let txt = normalize("https://x.test/a.txt", &options).unwrap();
    assert!(matches!(
      validate(&txt, &options).unwrap_err().kind,
      ImportError::DisallowedExtension(_)
    ));

    let bare = normalize("https://x.test/style", &options).unwrap();
    assert!(validate(&bare, &options).is_ok());
  }

  #[test]
  fn relative_urls_resolve_against_base_uri() {
    let options = ImportOptions {
      base_uri: Some("https://x.test/css/main.css".into()),
      ..ImportOptions::default()
    };
    let target = normalize("../theme.css", &options).unwrap();
    assert_eq!(target.key, "https://x.test/theme.css");
    assert_eq!(target.kind, TargetKind::Http);
  }
}
