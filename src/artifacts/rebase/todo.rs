//! Rebase todo list
//!
//! A plan is a plain value: callers may reorder, drop or retag its items before starting
//! the rebase. The text form is one item per line, `#` starting a comment:
//!
//! ```text
//! pick 3f2a91c Add parser
//! reword 8c0d1e4 Parse quoted strings
//! fixup 1b7e5aa typo
//! ```
//!
//! For `reword` the text after the commit is the new message; for every other action it
//! is the commit subject and only informative.

use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TodoAction {
    Pick,
    /// Pick with a replacement message
    Reword(String),
    /// Fold into the previous commit, concatenating messages
    Squash,
    /// Fold into the previous commit, keeping its message
    Fixup,
    Drop,
    /// Pick, then pause so the commit can be amended
    Edit,
}

impl TodoAction {
    pub fn keyword(&self) -> &'static str {
        match self {
            TodoAction::Pick => "pick",
            TodoAction::Reword(_) => "reword",
            TodoAction::Squash => "squash",
            TodoAction::Fixup => "fixup",
            TodoAction::Drop => "drop",
            TodoAction::Edit => "edit",
        }
    }

    pub fn folds(&self) -> bool {
        matches!(self, TodoAction::Squash | TodoAction::Fixup)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub action: TodoAction,
    pub commit: ObjectId,
    pub subject: String,
}

impl std::fmt::Display for TodoItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match &self.action {
            TodoAction::Reword(message) => message.lines().next().unwrap_or_default(),
            _ => self.subject.as_str(),
        };
        write!(f, "{} {} {}", self.action.keyword(), self.commit.to_short_oid(), text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebasePlan {
    pub onto: ObjectId,
    /// Replay order, oldest first
    pub items: Vec<TodoItem>,
}

impl RebasePlan {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace the items with a parsed todo list; `resolve` maps abbreviated IDs
    pub fn parse_items<F>(text: &str, resolve: F) -> anyhow::Result<Vec<TodoItem>>
    where
        F: Fn(&str) -> anyhow::Result<ObjectId>,
    {
        text.lines()
            .enumerate()
            .map(|(number, line)| (number + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
            .map(|(number, line)| {
                parse_line(line, &resolve).with_context(|| format!("todo line {number}: {line}"))
            })
            .collect()
    }

    pub fn render(&self) -> String {
        self.items
            .iter()
            .map(|item| format!("{item}\n"))
            .collect()
    }
}

fn parse_line<F>(line: &str, resolve: &F) -> anyhow::Result<TodoItem>
where
    F: Fn(&str) -> anyhow::Result<ObjectId>,
{
    let mut parts = line.splitn(3, char::is_whitespace);
    let keyword = parts.next().unwrap_or_default();
    let commit = parts
        .next()
        .filter(|commit| !commit.is_empty())
        .context("missing commit")?;
    let text = parts.next().unwrap_or_default().trim().to_string();

    let action = match keyword {
        "pick" | "p" => TodoAction::Pick,
        "reword" | "r" if text.is_empty() => anyhow::bail!("reword needs a message"),
        "reword" | "r" => TodoAction::Reword(text.clone()),
        "squash" | "s" => TodoAction::Squash,
        "fixup" | "f" => TodoAction::Fixup,
        "drop" | "d" => TodoAction::Drop,
        "edit" | "e" => TodoAction::Edit,
        other => anyhow::bail!("unknown action '{other}'"),
    };

    Ok(TodoItem {
        action,
        commit: resolve(commit)?,
        subject: text,
    })
}
