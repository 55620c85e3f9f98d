// Call-name resolution with PL/SQL lookup semantics.
//
// Resolution is a pure function of the index and the call site, so the same
// objects always produce the same edges regardless of input order.

use std::collections::{BTreeSet, HashMap};

use crate::types::{CallReference, CodeObject};

/// Which lookup rule matched a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionRule {
    /// The callee name is exactly an object id.
    ExactId,
    /// `package.name` matched a packaged object.
    Qualified,
    /// Unqualified name found in the caller's own package.
    SamePackage,
    /// Unqualified name found as a schema-level object.
    SchemaLevel,
    /// `schema.package.name` or `schema.name` with the schema prefix dropped.
    CrossSchema,
}

/// Outcome of resolving one call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A single target was found.
    Resolved { target: String, rule: ResolutionRule },
    /// Several overloads matched (or none fit the call); `target` is the
    /// deterministic pick.
    Ambiguous {
        target: String,
        rule: ResolutionRule,
        candidates: Vec<String>,
    },
    /// Nothing matched.
    Unresolved,
}

impl Resolution {
    /// The chosen target id, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Resolved { target, .. } | Self::Ambiguous { target, .. } => Some(target),
            Self::Unresolved => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Signature {
    required: usize,
    arity: usize,
    param_names: BTreeSet<String>,
}

/// Lookup tables over a set of code objects. All keys are lowercase.
#[derive(Debug, Default)]
pub struct ResolutionIndex {
    by_id: HashMap<String, String>,
    /// `package.name` → ids of every overload, sorted.
    packaged: HashMap<String, Vec<String>>,
    /// `name` → ids of schema-level objects with that name, sorted.
    schema_level: HashMap<String, Vec<String>>,
    signatures: HashMap<String, Signature>,
}

impl ResolutionIndex {
    pub fn new<'a>(objects: impl IntoIterator<Item = &'a CodeObject>) -> Self {
        let mut index = Self::default();
        for obj in objects {
            index.insert(obj);
        }
        for ids in index.packaged.values_mut().chain(index.schema_level.values_mut()) {
            ids.sort();
            ids.dedup();
        }
        index
    }

    fn insert(&mut self, obj: &CodeObject) {
        self.by_id.insert(obj.id.to_lowercase(), obj.id.clone());
        let name = obj.name.to_lowercase();
        if obj.package_name.is_empty() {
            self.schema_level
                .entry(name)
                .or_default()
                .push(obj.id.clone());
        } else {
            let key = format!("{}.{name}", obj.package_name.to_lowercase());
            self.packaged.entry(key).or_default().push(obj.id.clone());
        }
        self.signatures.insert(
            obj.id.clone(),
            Signature {
                required: obj.required_arity(),
                arity: obj.arity(),
                param_names: obj.parameters.iter().map(|p| p.name.to_lowercase()).collect(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn fits(&self, id: &str, call: &CallReference) -> bool {
        let Some(sig) = self.signatures.get(id) else {
            return false;
        };
        let args = call.arg_count();
        sig.required <= args
            && args <= sig.arity
            && call
                .named_args
                .keys()
                .all(|n| sig.param_names.contains(&n.to_lowercase()))
    }

    fn pick(&self, candidates: &[String], rule: ResolutionRule, call: &CallReference) -> Resolution {
        if let [only] = candidates {
            return Resolution::Resolved {
                target: only.clone(),
                rule,
            };
        }
        let fitting: Vec<&String> = candidates.iter().filter(|id| self.fits(id, call)).collect();
        match fitting.as_slice() {
            [one] => Resolution::Resolved {
                target: (*one).clone(),
                rule,
            },
            [first, ..] => Resolution::Ambiguous {
                target: (*first).clone(),
                rule,
                candidates: candidates.to_vec(),
            },
            [] => Resolution::Ambiguous {
                target: candidates[0].clone(),
                rule,
                candidates: candidates.to_vec(),
            },
        }
    }

    fn lookup(
        &self,
        table: &HashMap<String, Vec<String>>,
        key: &str,
        rule: ResolutionRule,
        call: &CallReference,
    ) -> Option<Resolution> {
        table
            .get(key)
            .filter(|ids| !ids.is_empty())
            .map(|ids| self.pick(ids, rule, call))
    }
}

/// Resolve one call site made by `caller`.
///
/// Lookup order: exact id, `package.name`, the caller's own package, a
/// schema-level object, then schema-prefixed forms. The first rule that
/// finds any candidate wins.
pub fn resolve_call(index: &ResolutionIndex, caller: &CodeObject, call: &CallReference) -> Resolution {
    let name = call.callee_name.trim().to_lowercase();
    if name.is_empty() {
        return Resolution::Unresolved;
    }

    if let Some(id) = index.by_id.get(&name) {
        return Resolution::Resolved {
            target: id.clone(),
            rule: ResolutionRule::ExactId,
        };
    }

    let segments: Vec<&str> = name.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Resolution::Unresolved;
    }

    match segments.as_slice() {
        [single] => {
            if !caller.package_name.is_empty() {
                let key = format!("{}.{single}", caller.package_name.to_lowercase());
                if let Some(r) = index.lookup(&index.packaged, &key, ResolutionRule::SamePackage, call) {
                    return r;
                }
            }
            index
                .lookup(&index.schema_level, single, ResolutionRule::SchemaLevel, call)
                .unwrap_or(Resolution::Unresolved)
        }
        [_, last] => index
            .lookup(&index.packaged, &name, ResolutionRule::Qualified, call)
            .or_else(|| index.lookup(&index.schema_level, last, ResolutionRule::CrossSchema, call))
            .unwrap_or(Resolution::Unresolved),
        [.., pkg, last] => {
            let key = format!("{pkg}.{last}");
            index
                .lookup(&index.packaged, &key, ResolutionRule::CrossSchema, call)
                .unwrap_or(Resolution::Unresolved)
        }
        [] => Resolution::Unresolved,
    }
}

// ── Tests ──────────────────────────────────────────────────────────
