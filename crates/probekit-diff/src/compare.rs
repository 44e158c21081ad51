//! Line-oriented rendering of the differences between two trees
//!
//! Each output line starts with a marker: ` ` for shared context, `-` for
//! the first operand ("got") and `+` for the second ("want").

use crate::node::Node;
use std::collections::BTreeSet;

/// Render the differences between `got` and `want`, empty when equivalent
pub(crate) fn diff_nodes(got: &Node, want: &Node) -> String {
    if got.equivalent(want) {
        return String::new();
    }
    let mut comparator = Comparator::default();
    comparator.compare(0, "", got, want, "");
    comparator.lines.join("\n")
}

#[derive(Default)]
struct Comparator {
    lines: Vec<String>,
}

impl Comparator {
    fn emit(&mut self, marker: char, depth: usize, label: &str, lines: Vec<String>, suffix: &str) {
        let count = lines.len();
        for (i, line) in lines.into_iter().enumerate() {
            let mut rendered = String::new();
            rendered.push(marker);
            rendered.push_str(&"  ".repeat(depth));
            if i == 0 {
                rendered.push_str(label);
            }
            rendered.push_str(&line);
            if i + 1 == count {
                rendered.push_str(suffix);
            }
            self.lines.push(rendered);
        }
    }

    fn open(&mut self, depth: usize, label: &str, text: String) {
        self.emit(' ', depth, label, vec![text], "");
    }

    fn close(&mut self, depth: usize, text: &str, suffix: &str) {
        self.emit(' ', depth, "", vec![text.to_string()], suffix);
    }

    fn replace(&mut self, depth: usize, label: &str, got: &Node, want: &Node, suffix: &str) {
        self.emit('-', depth, label, got.render_lines(), suffix);
        self.emit('+', depth, label, want.render_lines(), suffix);
    }

    fn compare(&mut self, depth: usize, label: &str, got: &Node, want: &Node, suffix: &str) {
        if got.equivalent(want) {
            self.emit(' ', depth, label, got.render_lines(), suffix);
            return;
        }

        match (got, want) {
            (Node::Seq(got_items), Node::Seq(want_items)) => {
                self.open(depth, label, "[".to_string());
                let len = got_items.len().max(want_items.len());
                for i in 0..len {
                    match (got_items.get(i), want_items.get(i)) {
                        (Some(g), Some(w)) => self.compare(depth + 1, "", g, w, ","),
                        (Some(g), None) => self.emit('-', depth + 1, "", g.render_lines(), ","),
                        (None, Some(w)) => self.emit('+', depth + 1, "", w.render_lines(), ","),
                        (None, None) => {}
                    }
                }
                self.close(depth, "]", suffix);
            }
            (Node::Map(got_entries), Node::Map(want_entries)) => {
                self.open(depth, label, "{".to_string());
                let keys: BTreeSet<&str> = got_entries
                    .iter()
                    .chain(want_entries)
                    .map(|(key, _)| key.as_str())
                    .collect();
                for key in keys {
                    self.compare_entry(depth + 1, key, got_entries, want_entries);
                }
                self.close(depth, "}", suffix);
            }
            (
                Node::Struct {
                    name,
                    fields: got_fields,
                },
                Node::Struct {
                    name: want_name,
                    fields: want_fields,
                },
            ) if name == want_name => {
                self.open(depth, label, format!("{}{{", name));
                // Declaration order, then fields only present in `want`
                let mut names: Vec<&str> = got_fields.iter().map(|(f, _)| f.as_str()).collect();
                for (field, _) in want_fields {
                    if !names.contains(&field.as_str()) {
                        names.push(field);
                    }
                }
                for field in names {
                    self.compare_entry(depth + 1, field, got_fields, want_fields);
                }
                self.close(depth, "}", suffix);
            }
            _ => self.replace(depth, label, got, want, suffix),
        }
    }

    fn compare_entry(
        &mut self,
        depth: usize,
        key: &str,
        got: &[(String, Node)],
        want: &[(String, Node)],
    ) {
        let label = format!("{}: ", key);
        match (find_entry(got, key), find_entry(want, key)) {
            (Some(g), Some(w)) => self.compare(depth, &label, g, w, ","),
            (Some(g), None) => self.emit('-', depth, &label, g.render_lines(), ","),
            (None, Some(w)) => self.emit('+', depth, &label, w.render_lines(), ","),
            (None, None) => {}
        }
    }
}

fn find_entry<'a>(entries: &'a [(String, Node)], key: &str) -> Option<&'a Node> {
    entries
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, node)| node)
}
