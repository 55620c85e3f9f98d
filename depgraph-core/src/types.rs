use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Object kinds ───────────────────────────────────────────────────

/// What sort of callable unit a code object is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// A stored or packaged procedure.
    Procedure,
    /// A stored or packaged function.
    Function,
    /// A package specification or body.
    Package,
    /// A database trigger.
    Trigger,
    /// An object type (with member methods).
    Type,
    /// Anything the extractor could not classify.
    Unknown,
}

impl ObjectKind {
    pub const ALL: [Self; 6] = [
        Self::Procedure,
        Self::Function,
        Self::Package,
        Self::Trigger,
        Self::Type,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Procedure => "procedure",
            Self::Function => "function",
            Self::Package => "package",
            Self::Trigger => "trigger",
            Self::Type => "type",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a kind name leniently; unrecognised names map to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "procedure" | "proc" => Self::Procedure,
            "function" | "func" => Self::Function,
            "package" | "package body" | "package_body" => Self::Package,
            "trigger" => Self::Trigger,
            "type" | "type body" | "type_body" => Self::Type,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Signatures ─────────────────────────────────────────────────────

/// Parameter passing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamMode {
    #[default]
    In,
    Out,
    InOut,
}

/// One formal parameter of a procedure or function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub mode: ParamMode,
    /// Default expression, if the parameter is optional.
    #[serde(default)]
    pub default: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            mode: ParamMode::In,
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ParamMode) -> Self {
        self.mode = mode;
        self
    }
}

// ── Call references ────────────────────────────────────────────────

/// A single call site as extracted from source, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallReference {
    /// Callee name exactly as written (`proc`, `pkg.proc`, `schema.pkg.proc`).
    pub callee_name: String,
    /// 1-based line of the call within the object's source.
    #[serde(default)]
    pub line: u32,
    /// Character span `(start, end)` of the call within the source.
    #[serde(default)]
    pub span: (usize, usize),
    #[serde(default)]
    pub positional_args: Vec<String>,
    #[serde(default)]
    pub named_args: BTreeMap<String, String>,
}

impl CallReference {
    pub fn new(callee_name: impl Into<String>) -> Self {
        Self {
            callee_name: callee_name.into(),
            line: 0,
            span: (0, 0),
            positional_args: Vec::new(),
            named_args: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn at_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    #[must_use]
    pub fn with_positional<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.positional_args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_named(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.named_args.insert(name.into(), value.into());
        self
    }

    /// Total number of actual arguments at this call site.
    pub fn arg_count(&self) -> usize {
        self.positional_args.len() + self.named_args.len()
    }
}

// ── Code objects ───────────────────────────────────────────────────

/// An extracted callable unit, as produced by the PL/SQL extractor.
///
/// Records are immutable once extracted; the graph layers only read them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeObject {
    /// `<package>.<name>`, or `<package>.<name>-<hash>` for overloads.
    pub id: String,
    pub name: String,
    /// Empty for schema-level objects.
    #[serde(default)]
    pub package_name: String,
    pub kind: ObjectKind,
    #[serde(default)]
    pub overloaded: bool,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub calls: Vec<CallReference>,
    /// Absent in lightweight loads.
    #[serde(default)]
    pub source_text: Option<String>,
    /// Literal placeholder → original literal. Absent in lightweight loads.
    #[serde(default)]
    pub literal_map: Option<BTreeMap<String, String>>,
}

impl CodeObject {
    /// Create an object with the conventional `<package>.<name>` id.
    pub fn new(package_name: &str, name: &str, kind: ObjectKind) -> Self {
        let id = if package_name.is_empty() {
            name.to_lowercase()
        } else {
            format!("{}.{}", package_name.to_lowercase(), name.to_lowercase())
        };
        Self {
            id,
            name: name.to_string(),
            package_name: package_name.to_string(),
            kind,
            overloaded: false,
            parameters: Vec::new(),
            return_type: None,
            calls: Vec::new(),
            source_text: None,
            literal_map: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub fn with_calls(mut self, calls: Vec<CallReference>) -> Self {
        self.calls = calls;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_text = Some(source.into());
        self
    }

    #[must_use]
    pub fn overloaded(mut self) -> Self {
        self.overloaded = true;
        self
    }

    /// `package.name`, or just `name` for schema-level objects.
    pub fn qualified_name(&self) -> String {
        if self.package_name.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package_name, self.name)
        }
    }

    /// Maximum number of arguments the signature accepts.
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Number of parameters without a default expression.
    pub fn required_arity(&self) -> usize {
        self.parameters.iter().filter(|p| p.default.is_none()).count()
    }

    /// Rough size/complexity measure: non-blank source lines plus call sites
    /// plus parameters. `None` when source text was not loaded.
    pub fn complexity_score(&self) -> Option<usize> {
        let source = self.source_text.as_ref()?;
        let lines = source.lines().filter(|l| !l.trim().is_empty()).count();
        Some(lines + self.calls.len() + self.parameters.len())
    }

    /// A copy without source text and literal map, as returned by lightweight loads.
    #[must_use]
    pub fn lightweight(&self) -> Self {
        Self {
            source_text: None,
            literal_map: None,
            ..self.clone()
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
