use std::fmt::Write;

use crate::category::Category;
use crate::scorer::ActiveItem;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
const HEADER: &str = "🎯 RELEVANT SKILLS/AGENTS/COMMANDS";
const ACTION: &str = "ACTION: Consider using the above tools BEFORE responding";

/// How the consuming assistant should invoke a matched item.
#[must_use]
pub fn tool_instruction(item: &ActiveItem) -> String {
    match item.category {
        Category::Skill => format!("Skill tool, skill=\"{}\"", item.name),
        Category::Agent => format!("Task tool, subagent_type=\"{}\"", item.name),
        Category::Command => format!("SlashCommand tool, command=\"/{}\"", item.name),
    }
}

fn push_counted(out: &mut String, index: usize, item: &ActiveItem) {
    let _ = writeln!(
        out,
        "{index}. {} ({} matches): {}",
        item.name,
        item.match_count,
        tool_instruction(item)
    );
}

/// Render ranked items as the directive block.
///
/// `items` must already be sorted by descending score. A single item, or a
/// set where every score is equal, renders as one flat list; otherwise the
/// items scoring 1.0 form a "BEST MATCH" tier ahead of the rest. Returns an
/// empty string for no items.
#[must_use]
pub fn format_directive(items: &[ActiveItem]) -> String {
    let Some(first) = items.first() else {
        return String::new();
    };

    let mut out = String::with_capacity(512);
    let _ = write!(out, "{RULE}\n{HEADER}\n{RULE}\n\n");

    #[allow(clippy::float_cmp)]
    let all_same = items.iter().all(|i| i.score == first.score);
    let mut index = 1;

    if all_same || items.len() == 1 {
        for item in items {
            push_counted(&mut out, index, item);
            index += 1;
        }
    } else {
        let (top, rest): (Vec<&ActiveItem>, Vec<&ActiveItem>) =
            items.iter().partition(|i| i.score >= 1.0);

        if let Some(lead) = top.first() {
            let label = if top.len() == 1 {
                "keywords matched"
            } else {
                "keywords matched each"
            };
            let _ = writeln!(out, ">>> BEST MATCH ({} {label}):", lead.match_count);
            for item in &top {
                let _ = writeln!(out, "{index}. {}: {}", item.name, tool_instruction(item));
                index += 1;
            }
        }

        if !rest.is_empty() {
            out.push_str("\nOther matches:\n");
            for item in rest {
                push_counted(&mut out, index, item);
                index += 1;
            }
        }
    }

    let _ = write!(out, "\n{RULE}\n{ACTION}\n{RULE}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::rank;

    fn ranked(items: &[(&str, u64, Category)]) -> Vec<ActiveItem> {
        rank(
            items
                .iter()
                .map(|(name, count, category)| ActiveItem::new(*name, *count, *category))
                .collect(),
        )
        .items
    }

    #[test]
    fn empty_renders_nothing() {
        assert_eq!(format_directive(&[]), "");
    }

    #[test]
    fn instructions_per_category() {
        let skill = ActiveItem::new("pdf", 1, Category::Skill);
        let agent = ActiveItem::new("reviewer", 1, Category::Agent);
        let command = ActiveItem::new("deploy", 1, Category::Command);
        assert_eq!(tool_instruction(&skill), "Skill tool, skill=\"pdf\"");
        assert_eq!(
            tool_instruction(&agent),
            "Task tool, subagent_type=\"reviewer\""
        );
        assert_eq!(
            tool_instruction(&command),
            "SlashCommand tool, command=\"/deploy\""
        );
    }

    #[test]
    fn single_agent_is_flat() {
        let items = ranked(&[("frontend-developer", 2, Category::Agent)]);
        insta::assert_snapshot!(format_directive(&items), @r#"
        ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        🎯 RELEVANT SKILLS/AGENTS/COMMANDS
        ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

        1. frontend-developer (2 matches): Task tool, subagent_type="frontend-developer"

        ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        ACTION: Consider using the above tools BEFORE responding
        ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        "#);
    }

    #[test]
    fn equal_scores_are_flat() {
        let items = ranked(&[
            ("a", 3, Category::Skill),
            ("b", 3, Category::Command),
        ]);
        let text = format_directive(&items);
        assert!(!text.contains("BEST MATCH"));
        assert!(text.contains("1. a (3 matches): Skill tool, skill=\"a\"\n"));
        assert!(text.contains("2. b (3 matches): SlashCommand tool, command=\"/b\"\n"));
    }

    #[test]
    fn mixed_scores_are_tiered() {
        let items = ranked(&[
            ("api", 5, Category::Skill),
            ("db", 2, Category::Agent),
            ("auth", 5, Category::Skill),
        ]);
        insta::assert_snapshot!(format_directive(&items), @r#"
        ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        🎯 RELEVANT SKILLS/AGENTS/COMMANDS
        ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

        >>> BEST MATCH (5 keywords matched each):
        1. api: Skill tool, skill="api"
        2. auth: Skill tool, skill="auth"

        Other matches:
        3. db (2 matches): Task tool, subagent_type="db"

        ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        ACTION: Consider using the above tools BEFORE responding
        ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        "#);
    }

    #[test]
    fn single_best_match_label() {
        let items = ranked(&[("lead", 4, Category::Skill), ("tail", 1, Category::Skill)]);
        let text = format_directive(&items);
        assert!(text.contains(">>> BEST MATCH (4 keywords matched):\n1. lead: "));
        assert!(text.contains("\nOther matches:\n2. tail (1 matches): "));
    }

    #[test]
    fn exact_framing() {
        let items = ranked(&[("x", 1, Category::Skill)]);
        let text = format_directive(&items);
        assert!(text.starts_with(&format!("{RULE}\n{HEADER}\n{RULE}\n\n1. x")));
        assert!(text.ends_with(&format!("\n\n{RULE}\n{ACTION}\n{RULE}")));
        assert_eq!(RULE.chars().count(), 39);
    }

    #[test]
    fn every_item_appears_once() {
        let items = ranked(&[
            ("one", 9, Category::Skill),
            ("two", 3, Category::Agent),
            ("three", 1, Category::Command),
            ("four", 12, Category::Skill),
        ]);
        let text = format_directive(&items);
        for name in ["one", "two", "three", "four"] {
            let needle = format!(". {name}");
            assert_eq!(text.matches(&needle).count(), 1, "{name}");
        }
    }
}
