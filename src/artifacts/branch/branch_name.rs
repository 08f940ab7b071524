use anyhow::Context;
use derive_new::new;

pub const HEAD_REF_NAME: &str = "HEAD";
pub const ORIG_HEAD_REF_NAME: &str = "ORIG_HEAD";
pub const STASH_REF_NAME: &str = "refs/stash";
pub const HEADS_PREFIX: &str = "refs/heads/";
pub const TAGS_PREFIX: &str = "refs/tags/";

/// Patterns rejected anywhere in a ref name
const INVALID_REF_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Branch,
    Tag,
}

impl RefKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            RefKind::Branch => HEADS_PREFIX,
            RefKind::Tag => TAGS_PREFIX,
        }
    }
}

impl std::fmt::Display for RefKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefKind::Branch => write!(f, "branch"),
            RefKind::Tag => write!(f, "tag"),
        }
    }
}

/// Full path of a ref relative to `.twig`, e.g. `refs/heads/main` or `HEAD`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord, new)]
pub struct SymRefName(String);

impl SymRefName {
    pub fn head() -> Self {
        SymRefName(HEAD_REF_NAME.to_string())
    }

    pub fn is_head(&self) -> bool {
        self.0 == HEAD_REF_NAME
    }

    pub fn as_ref_path(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> Option<RefKind> {
        if self.0.starts_with(HEADS_PREFIX) {
            Some(RefKind::Branch)
        } else if self.0.starts_with(TAGS_PREFIX) {
            Some(RefKind::Tag)
        } else {
            None
        }
    }

    /// Name without the `refs/heads/` or `refs/tags/` prefix
    pub fn short_name(&self) -> &str {
        self.0
            .strip_prefix(HEADS_PREFIX)
            .or_else(|| self.0.strip_prefix(TAGS_PREFIX))
            .unwrap_or(&self.0)
    }
}

impl std::fmt::Display for SymRefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated short name of a branch or tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct RefName(String);

impl RefName {
    pub fn try_parse(name: String) -> anyhow::Result<Self> {
        if name.is_empty() {
            anyhow::bail!("ref name cannot be empty");
        }

        let re = regex::Regex::new(INVALID_REF_NAME_REGEX)
            .with_context(|| format!("invalid ref name regex: {INVALID_REF_NAME_REGEX}"))?;

        if re.is_match(&name) {
            anyhow::bail!("invalid ref name: {}", name);
        } else {
            Ok(Self(name))
        }
    }

    pub fn qualify(&self, kind: RefKind) -> SymRefName {
        SymRefName(format!("{}{}", kind.prefix(), self.0))
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
