//! Shortcut expansion.
//!
//! A shortcut pattern alternates literal text and `%key%` placeholders:
//! splitting it on `%` puts literals at even positions and keys at odd ones.
//! The input pattern is matched against the text after `@name `, binding each
//! key to the text between its surrounding literals; the output pattern then
//! becomes the new message with every key substituted.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::models::Shortcut;

/// True when `text` can be a command at all: it starts with `@` and has a space
#[must_use]
pub fn is_command(text: &str) -> bool {
    text.starts_with('@') && text.contains(' ')
}

/// Name after the leading `@`, up to the first space
#[must_use]
pub fn target_name(text: &str) -> &str {
    let token = text.split(' ').next().unwrap_or_default();
    token.strip_prefix('@').unwrap_or(token)
}

/// Rewrites messages through the shortcuts known to the host
#[derive(Debug)]
pub struct ShortcutExpander<'a> {
    shortcuts: &'a [Shortcut],
    max_depth: usize,
}

impl<'a> ShortcutExpander<'a> {
    /// Expander over `shortcuts`, applying at most `max_depth` rewrites
    #[must_use]
    pub const fn new(shortcuts: &'a [Shortcut], max_depth: usize) -> Self {
        Self {
            shortcuts,
            max_depth,
        }
    }

    /// Expand `message` until it no longer names a shortcut.
    ///
    /// Each shortcut is applied at most once, so a cycle of shortcuts stops
    /// after one trip around it. The result is trimmed.
    #[must_use]
    pub fn expand(&self, message: &str) -> String {
        let mut current = message.trim().to_string();
        let mut applied: HashSet<&str> = HashSet::new();
        let limit = self.shortcuts.len().min(self.max_depth);

        while applied.len() < limit {
            let name = target_name(&current);
            if applied.contains(name) {
                debug!(shortcut = name, "shortcut already applied, stopping expansion");
                break;
            }
            let Some((shortcut, expanded)) = self
                .shortcuts
                .iter()
                .filter(|s| s.name == name)
                .find_map(|s| {
                    apply_shortcut(&current, s)
                        .filter(|next| is_command(next))
                        .map(|next| (s, next))
                })
            else {
                break;
            };
            debug!(shortcut = %shortcut.name, expanded = %expanded, "applied shortcut");
            applied.insert(shortcut.name.as_str());
            current = expanded.trim().to_string();
        }

        current
    }
}

/// Rewrite `message` through one shortcut, or `None` when its input pattern
/// does not match or its output names a key the input never bound
#[must_use]
pub fn apply_shortcut(message: &str, shortcut: &Shortcut) -> Option<String> {
    let (_, args) = message.split_once(' ')?;
    let bindings = bind_pattern(args, &shortcut.input_pattern)?;

    let mut out = String::with_capacity(shortcut.output_pattern.len() + args.len());
    for (i, segment) in shortcut.output_pattern.split('%').enumerate() {
        if i % 2 == 0 {
            out.push_str(segment);
        } else {
            out.push_str(bindings.get(segment)?);
        }
    }
    Some(out)
}

fn bind_pattern<'m>(text: &'m str, pattern: &str) -> Option<HashMap<String, &'m str>> {
    let segments: Vec<&str> = pattern.split('%').collect();
    let mut bindings = HashMap::new();
    let mut rest = text.strip_prefix(segments[0])?;

    for i in (1..segments.len()).step_by(2) {
        let key = segments[i].to_string();
        match segments.get(i + 1).copied().unwrap_or_default() {
            // A final key takes whatever is left.
            "" if i + 2 >= segments.len() => {
                bindings.insert(key, rest);
                rest = "";
            },
            "" => {
                bindings.insert(key, "");
            },
            literal => {
                let at = rest.find(literal)?;
                bindings.insert(key, &rest[..at]);
                rest = &rest[at + literal.len()..];
            },
        }
    }

    rest.is_empty().then_some(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shortcut(name: &str, input: &str, output: &str) -> Shortcut {
        Shortcut {
            name: name.to_string(),
            input_pattern: input.to_string(),
            output_pattern: output.to_string(),
        }
    }

    #[test]
    fn test_is_command() {
        assert!(is_command("@house ?Name"));
        assert!(!is_command("@house"));
        assert!(!is_command("house ?Name"));
        assert!(!is_command(""));
    }

    #[test]
    fn test_apply_binds_placeholders_between_literals() {
        let sc = shortcut("book", "%who% at %when%", "@house +Name %who% +avail %when%");
        assert_eq!(
            apply_shortcut("@book Joe at 1/12 9am", &sc).as_deref(),
            Some("@house +Name Joe +avail 1/12 9am")
        );
    }

    #[test]
    fn test_apply_fails_when_anchor_missing() {
        let sc = shortcut("book", "%who% at %when%", "@house +Name %who% +avail %when%");
        assert_eq!(apply_shortcut("@book Joe tomorrow", &sc), None);
    }

    #[test]
    fn test_apply_requires_leading_literal() {
        let sc = shortcut("free", "slots %len%", "@house /avail %len%");
        assert_eq!(
            apply_shortcut("@free slots 30m", &sc).as_deref(),
            Some("@house /avail 30m")
        );
        assert_eq!(apply_shortcut("@free 30m", &sc), None);
    }

    #[test]
    fn test_apply_fails_on_unbound_output_key() {
        let sc = shortcut("x", "%a%", "@house ?%b%");
        assert_eq!(apply_shortcut("@x Name", &sc), None);
    }

    #[test]
    fn test_apply_output_may_start_with_placeholder() {
        let sc = shortcut("x", "%t% %c%", "%t% ?%c%");
        assert_eq!(apply_shortcut("@x @house Name", &sc).as_deref(), Some("@house ?Name"));
    }

    #[test]
    fn test_expand_chains_shortcuts() {
        let shortcuts = vec![
            shortcut("a", "%x%", "@b %x%"),
            shortcut("b", "%x%", "@house ?%x%"),
        ];
        let expander = ShortcutExpander::new(&shortcuts, 16);
        assert_eq!(expander.expand("@a Name"), "@house ?Name");
    }

    #[test]
    fn test_expand_stops_on_cycle() {
        let shortcuts = vec![
            shortcut("a", "%x%", "@b %x%"),
            shortcut("b", "%x%", "@a %x%"),
        ];
        let expander = ShortcutExpander::new(&shortcuts, 16);
        assert_eq!(expander.expand("@a Name"), "@a Name");
    }

    #[test]
    fn test_expand_respects_max_depth() {
        let shortcuts = vec![
            shortcut("a", "%x%", "@b %x%"),
            shortcut("b", "%x%", "@c %x%"),
            shortcut("c", "%x%", "@d %x%"),
        ];
        let expander = ShortcutExpander::new(&shortcuts, 2);
        assert_eq!(expander.expand("@a Name"), "@c Name");
    }

    #[test]
    fn test_expand_leaves_plain_commands_alone() {
        let shortcuts = vec![shortcut("a", "%x%", "@b %x%")];
        let expander = ShortcutExpander::new(&shortcuts, 16);
        assert_eq!(expander.expand("  @house ?Name "), "@house ?Name");
    }
}
