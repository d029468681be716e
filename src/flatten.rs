//! The cascade/flatten engine.
//!
//! Flattening computes, for every `(selector, media query)` group, the
//! single winning declaration per longhand property, then re-synthesizes
//! shorthands from complete longhand sets. The output contains exactly one
//! rule per non-empty group, in first-appearance order; at-rules pass
//! through at their positions.

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::declaration::Declaration;
use crate::properties;
use crate::rules::{CssRule, StyleRule};
use crate::stylesheet::StyleSheet;

struct Winner {
  value: String,
  important: bool,
  specificity: u32,
  /// Document index of the originating rule.
  index: u32,
}

struct Group {
  selector: String,
  media_query_id: Option<u32>,
  /// Longhand property → current cascade winner, in first-appearance order.
  winners: IndexMap<String, Winner>,
}

enum Slot {
  Group(usize),
  At(u32),
}

pub(crate) fn flatten_sheet(sheet: &StyleSheet) -> StyleSheet {
  let mut groups: Vec<Group> = Vec::new();
  let mut group_index: AHashMap<(String, Option<u32>), usize> = AHashMap::new();
  let mut slots: Vec<Slot> = Vec::new();

  for rule in &sheet.rules {
    let style = match rule {
      CssRule::At(at) => {
        slots.push(Slot::At(at.id));
        continue;
      }
      CssRule::Style(style) => style,
    };

    let key = (style.selector.clone(), style.media_query_id);
    let group_id = match group_index.get(&key) {
      Some(id) => *id,
      None => {
        let id = groups.len();
        groups.push(Group {
          selector: style.selector.clone(),
          media_query_id: style.media_query_id,
          winners: IndexMap::new(),
        });
        group_index.insert(key, id);
        slots.push(Slot::Group(id));
        id
      }
    };

    let specificity = style.specificity();
    for decl in &style.declarations {
      for longhand in properties::expand_fully(decl) {
        apply_candidate(&mut groups[group_id].winners, longhand, specificity, style.id);
      }
    }
  }

  let mut out = StyleSheet::new(sheet.options().clone());
  out.media_queries = sheet.media_queries.clone();
  out.media_query_lists = sheet.media_query_lists.clone();
  out.next_media_query_list_id = sheet.next_media_query_list_id;
  out.charset = sheet.charset.clone();

  for slot in slots {
    match slot {
      Slot::At(id) => {
        let mut at = sheet.rules[id as usize]
          .as_at()
          .expect("slot refers to an at-rule")
          .clone();
        at.id = out.next_rule_id();
        out.rules.push(CssRule::At(at));
      }
      Slot::Group(group_id) => {
        let group = &groups[group_id];
        if group.winners.is_empty() {
          continue;
        }

        let mut declarations: Vec<Declaration> = group
          .winners
          .iter()
          .map(|(property, winner)| {
            Declaration::new(property, &winner.value, winner.important)
          })
          .collect();
        properties::synthesize_shorthands(&mut declarations);

        let mut rule = StyleRule::new(out.next_rule_id(), group.selector.clone());
        rule.declarations = declarations;
        rule.media_query_id = group.media_query_id;
        rule.memoize_specificity();
        out.rules.push(CssRule::Style(rule));
      }
    }
  }

  out
}

/// The cascade comparison: importance first, then specificity, then source
/// order. A candidate from the same rule index replaces the incumbent, so a
/// later duplicate within one rule wins.
fn apply_candidate(
  winners: &mut IndexMap<String, Winner>,
  candidate: Declaration,
  specificity: u32,
  index: u32,
) {
  let entry = Winner {
    value: candidate.value,
    important: candidate.important,
    specificity,
    index,
  };
  match winners.get_mut(&candidate.property) {
    None => {
      winners.insert(candidate.property, entry);
    }
    Some(current) => {
      let wins = if entry.important != current.important {
        entry.important
      } else if entry.specificity != current.specificity {
        entry.specificity > current.specificity
      } else {
        entry.index >= current.index
      };
      if wins {
        *current = entry;
      }
    }
  }
}
