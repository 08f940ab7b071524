use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::RefName;
use crate::artifacts::objects::MIN_OID_PREFIX_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::RepositoryError;
use anyhow::Context;

const PARENT_REGEX: &str = r"^(.+)\^$";
const ANCESTOR_REGEX: &str = r"^(.+)\~(\d+)$";
/// Shorthands accepted wherever a revision is
const REF_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "@" => "HEAD",
};

/// A revision expression naming a commit.
///
/// Supported forms:
/// - ref names, short or full: `main`, `feature/login`, `refs/tags/v1`, `HEAD`, `ORIG_HEAD`
/// - the `@` alias for `HEAD`
/// - full or abbreviated object IDs (at least four hex digits)
/// - `<rev>^` for the first parent and `<rev>~<n>` for the n-th first-parent ancestor
///
/// Hex-looking names are parsed as refs. Resolution falls back to an object ID lookup
/// only when no ref of that name exists, so a branch named `cafe` wins over commit
/// `cafe…`. Annotated tags are peeled to the commit they point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    Ref(RefName),
    /// The n-th ancestor along first parents (`HEAD~3`)
    Ancestor(Box<Revision>, usize),
    /// The first parent (`HEAD^`)
    Parent(Box<Revision>),
}

impl Revision {
    pub fn resolve(&self, repository: &Repository) -> anyhow::Result<ObjectId> {
        match self {
            Revision::Ref(name) => Self::resolve_name(name.as_ref(), repository),
            Revision::Parent(base) => Self::first_parent(&base.resolve(repository)?, repository),
            Revision::Ancestor(base, generations) => {
                let mut oid = base.resolve(repository)?;
                for _ in 0..*generations {
                    oid = Self::first_parent(&oid, repository)?;
                }

                Ok(oid)
            }
        }
    }

    fn resolve_name(name: &str, repository: &Repository) -> anyhow::Result<ObjectId> {
        if let Some(sym_ref) = repository.refs().find_ref(name) {
            let oid = repository
                .refs()
                .read_ref(&sym_ref)?
                .ok_or_else(|| RepositoryError::not_found("revision", name))?;
            return repository.database().peel_to_commit(&oid);
        }

        if ObjectId::looks_like_prefix(name, MIN_OID_PREFIX_LENGTH) {
            let oid = Self::resolve_oid(name, repository)?;
            return repository.database().peel_to_commit(&oid);
        }

        Err(RepositoryError::not_found("revision", name))
    }

    /// Resolve without peeling: a ref or ID naming a tree, blob or tag yields that object
    pub fn resolve_object(name: &str, repository: &Repository) -> anyhow::Result<ObjectId> {
        if let Some(sym_ref) = repository.refs().find_ref(name) {
            return repository
                .refs()
                .read_ref(&sym_ref)?
                .ok_or_else(|| RepositoryError::not_found("revision", name));
        }

        if ObjectId::looks_like_prefix(name, MIN_OID_PREFIX_LENGTH) {
            return Self::resolve_oid(name, repository);
        }

        Self::try_parse(name)?.resolve(repository)
    }

    fn first_parent(oid: &ObjectId, repository: &Repository) -> anyhow::Result<ObjectId> {
        repository
            .database()
            .load_commit(oid)?
            .parent()
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("parent of commit", oid.to_short_oid()))
    }

    fn resolve_oid(prefix: &str, repository: &Repository) -> anyhow::Result<ObjectId> {
        let matches = repository.database().find_objects_by_prefix(prefix)?;

        let candidates = match matches.len() {
            0 => return Err(RepositoryError::not_found("revision", prefix)),
            1 => return Ok(matches[0].clone()),
            _ => matches
                .iter()
                .filter(|oid| {
                    matches!(
                        repository.database().object_type(oid),
                        Ok(ObjectType::Commit | ObjectType::Tag)
                    )
                })
                .collect::<Vec<_>>(),
        };

        match candidates.as_slice() {
            [] => Err(RepositoryError::not_found("revision", prefix)),
            [oid] => Ok((*oid).clone()),
            _ => {
                let mut message = format!("short object ID {prefix} is ambiguous\nhint: The candidates are:");
                for oid in candidates {
                    let object_type = repository.database().object_type(oid)?;
                    message.push_str(&format!("\nhint:   {} {object_type}", oid.to_short_oid()));
                }

                Err(RepositoryError::invalid_state(message))
            }
        }
    }

    pub fn try_parse(revision: &str) -> anyhow::Result<Revision> {
        let parent_regex = regex::Regex::new(PARENT_REGEX)
            .with_context(|| format!("invalid parent regex: {PARENT_REGEX}"))?;
        let ancestor_regex = regex::Regex::new(ANCESTOR_REGEX)
            .with_context(|| format!("invalid ancestor regex: {ANCESTOR_REGEX}"))?;

        if let Some(caps) = parent_regex.captures(revision) {
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Parent(Box::new(base_revision)))
        } else if let Some(caps) = ancestor_regex.captures(revision) {
            let generations: usize = caps[2]
                .parse()
                .with_context(|| format!("failed to parse generations in revision: {revision}"))?;
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Ancestor(Box::new(base_revision), generations))
        } else {
            let resolved_name = *REF_ALIASES.get(revision).unwrap_or(&revision);
            Ok(Revision::Ref(RefName::try_parse(resolved_name.to_string())?))
        }
    }
}
