//! Named text fragments emitted in dependency order.
//!
//! Each fragment names the fragments it must follow. A dependency on a
//! fragment that is already present is stored as its index; otherwise the
//! name is kept and resolved when the holder is written, so fragments may be
//! added in any order.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;
use xcnl_ir::{Name, SharedInterner};

use crate::errors::{DependencyError, UnresolvedEntry};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dependency {
    Index(u32),
    Pending(Name),
}

/// One fragment of emitted text.
#[derive(Clone, Debug)]
pub struct NamedText {
    pub id: Name,
    pub content: String,
    /// `(offset, count)` into the holder's dependency list.
    deps: (u32, u32),
}

/// Dependency-ordered collection of text fragments.
#[derive(Clone, Debug)]
pub struct NamedTextHolder {
    interner: SharedInterner,
    texts: Vec<NamedText>,
    deps: Vec<Dependency>,
    index: FxHashMap<Name, u32>,
}

impl NamedTextHolder {
    pub fn new(interner: SharedInterner) -> Self {
        NamedTextHolder {
            interner,
            texts: Vec::new(),
            deps: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.interner
            .get(id)
            .is_some_and(|name| self.index.contains_key(&name))
    }

    pub fn texts(&self) -> &[NamedText] {
        &self.texts
    }

    /// Append a fragment. Fails if `id` is among `deps`.
    pub fn force_add(
        &mut self,
        id: &str,
        content: String,
        deps: &[&str],
    ) -> Result<(), DependencyError> {
        let id_name = self.interner.intern(id);
        let start = self.deps.len();
        let mut resolved: SmallVec<[Dependency; 4]> = SmallVec::with_capacity(deps.len());
        for dep in deps {
            let dep = self.interner.intern(dep);
            if dep == id_name {
                return Err(DependencyError::SelfDependency { id: id.to_string() });
            }
            resolved.push(match self.index.get(&dep) {
                Some(&idx) => Dependency::Index(idx),
                None => Dependency::Pending(dep),
            });
        }
        self.deps.extend(resolved);
        let idx = to_u32(self.texts.len());
        // A later fragment with the same id shadows the earlier one for lookups.
        self.index.insert(id_name, idx);
        self.texts.push(NamedText {
            id: id_name,
            content,
            deps: (to_u32(start), to_u32(deps.len())),
        });
        trace!(id, deps = deps.len(), "named text added");
        Ok(())
    }

    /// Append a fragment unless `id` is already present. Returns whether it
    /// was added.
    pub fn add(
        &mut self,
        id: &str,
        content: String,
        deps: &[&str],
    ) -> Result<bool, DependencyError> {
        if self.contains(id) {
            return Ok(false);
        }
        self.force_add(id, content, deps)?;
        Ok(true)
    }

    fn deps_of(&self, text: &NamedText) -> &[Dependency] {
        let (start, count) = text.deps;
        &self.deps[start as usize..(start + count) as usize]
    }

    fn resolve(&self, dep: Dependency) -> Option<usize> {
        match dep {
            Dependency::Index(idx) => Some(idx as usize),
            Dependency::Pending(name) => self.index.get(&name).map(|&idx| idx as usize),
        }
    }

    /// Emit every fragment after its dependencies, each wrapped in an
    /// injection banner.
    pub fn write(&self, output: &mut String, eol: &str) -> Result<(), DependencyError> {
        if self.deps.is_empty() {
            for text in &self.texts {
                self.write_one(output, text, eol);
            }
            return Ok(());
        }

        let mut emitted = vec![false; self.texts.len()];
        let mut remaining = self.texts.len();
        while remaining > 0 {
            let mut progress = false;
            for (idx, text) in self.texts.iter().enumerate() {
                if emitted[idx] {
                    continue;
                }
                let ready = self
                    .deps_of(text)
                    .iter()
                    .all(|&dep| self.resolve(dep).is_some_and(|target| emitted[target]));
                if ready {
                    self.write_one(output, text, eol);
                    emitted[idx] = true;
                    remaining -= 1;
                    progress = true;
                }
            }
            if !progress {
                return Err(self.unresolved_report(&emitted));
            }
        }
        Ok(())
    }

    fn write_one(&self, output: &mut String, text: &NamedText, eol: &str) {
        let id = self.interner.lookup(text.id);
        output.push_str("    //vvvvvvvv below injected by ");
        output.push_str(id);
        output.push_str(" vvvvvvvv");
        output.push_str(eol);
        output.push_str(&text.content);
        output.push_str(eol);
        output.push_str("    //^^^^^^^^ above injected by ");
        output.push_str(id);
        output.push_str(" ^^^^^^^^");
        output.push_str(eol);
        output.push_str(eol);
    }

    #[cold]
    fn unresolved_report(&self, emitted: &[bool]) -> DependencyError {
        let entries = self
            .texts
            .iter()
            .enumerate()
            .filter(|(idx, _)| !emitted[*idx])
            .map(|(_, text)| {
                let missing = self
                    .deps_of(text)
                    .iter()
                    .filter_map(|&dep| match self.resolve(dep) {
                        Some(target) if emitted[target] => None,
                        Some(target) => Some(self.interner.lookup(self.texts[target].id)),
                        None => match dep {
                            Dependency::Pending(name) => Some(self.interner.lookup(name)),
                            Dependency::Index(_) => None,
                        },
                    })
                    .map(str::to_string)
                    .collect();
                UnresolvedEntry {
                    id: self.interner.lookup(text.id).to_string(),
                    missing,
                }
            })
            .collect();
        DependencyError::Unresolved { entries }
    }
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap holder results")]
mod tests;
