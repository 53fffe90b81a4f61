//! Node identities and the allocator that hands them out.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;

/// Identity of a node: `(name, id)`.
///
/// Ids come from per-kind counters, so a Problem and a Criterion may share an id.
/// A model rejects two nodes with the same name and id (`DuplicateKey`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub name: String,
    pub id: u64,
}

impl NodeKey {
    pub fn new(name: impl Into<String>, id: u64) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// Parses the `name#id` form. The last `#` separates name from id.
impl FromStr for NodeKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, id) = s
            .rsplit_once('#')
            .ok_or_else(|| DomainError::BadKey(s.to_string()))?;
        if name.is_empty() {
            return Err(DomainError::BadKey(s.to_string()));
        }
        let id = id
            .trim()
            .parse::<u64>()
            .map_err(|_| DomainError::BadKey(s.to_string()))?;
        Ok(NodeKey::new(name, id))
    }
}

/// Root of a hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Problem {
    key: NodeKey,
}

/// Criterion, or a placeholder inserted by depth normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Criterion {
    key: NodeKey,
    placeholder: bool,
}

/// Leaf of every hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Alternative {
    key: NodeKey,
}

impl Problem {
    pub fn key(&self) -> &NodeKey {
        &self.key
    }
}

impl Criterion {
    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

impl Alternative {
    pub fn key(&self) -> &NodeKey {
        &self.key
    }
}

/// Any node value, before the builder has checked where it may go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Problem(Problem),
    Criterion(Criterion),
    Alternative(Alternative),
}

impl Element {
    pub fn key(&self) -> &NodeKey {
        match self {
            Element::Problem(p) => p.key(),
            Element::Criterion(c) => c.key(),
            Element::Alternative(a) => a.key(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Element::Problem(_) => "Problem",
            Element::Criterion(_) => "Criterion",
            Element::Alternative(_) => "Alternative",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind_name(), self.key())
    }
}

impl From<Problem> for Element {
    fn from(p: Problem) -> Self {
        Element::Problem(p)
    }
}

impl From<Criterion> for Element {
    fn from(c: Criterion) -> Self {
        Element::Criterion(c)
    }
}

impl From<Alternative> for Element {
    fn from(a: Alternative) -> Self {
        Element::Alternative(a)
    }
}

/// Hands out monotonically increasing ids, one counter per node kind.
///
/// One allocator is usually shared by everything that goes into a single model.
/// `reset` exists for tests that want deterministic ids.
#[derive(Debug, Default, Clone)]
pub struct IdentityAllocator {
    next_problem: u64,
    next_criterion: u64,
    next_alternative: u64,
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn problem(&mut self, name: impl Into<String>) -> Problem {
        let id = bump(&mut self.next_problem);
        Problem {
            key: NodeKey::new(name, id),
        }
    }

    pub fn unnamed_problem(&mut self) -> Problem {
        let name = format!("Problem{}", self.next_problem);
        self.problem(name)
    }

    pub fn criterion(&mut self, name: impl Into<String>) -> Criterion {
        let id = bump(&mut self.next_criterion);
        Criterion {
            key: NodeKey::new(name, id),
            placeholder: false,
        }
    }

    pub fn unnamed_criterion(&mut self) -> Criterion {
        let name = format!("Criterion{}", self.next_criterion);
        self.criterion(name)
    }

    /// Placeholder criterion used to pad shallow branches.
    pub fn placeholder_criterion(&mut self) -> Criterion {
        let id = bump(&mut self.next_criterion);
        Criterion {
            key: NodeKey::new(format!("Dummy{id}"), id),
            placeholder: true,
        }
    }

    pub fn alternative(&mut self, name: impl Into<String>) -> Alternative {
        let id = bump(&mut self.next_alternative);
        Alternative {
            key: NodeKey::new(name, id),
        }
    }

    pub fn unnamed_alternative(&mut self) -> Alternative {
        let name = format!("Alternative{}", self.next_alternative);
        self.alternative(name)
    }
}

fn bump(counter: &mut u64) -> u64 {
    let id = *counter;
    *counter += 1;
    id
}
