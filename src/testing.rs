//! Test doubles for the analysis pipeline.
//!
//! [`ScriptEngine`] understands a tiny line-oriented language that looks
//! enough like Go for unit resolution to work on it:
//!
//! ```text
//! package app
//! import "example.com/ws/util"
//! func Run() { util.Help() }
//! var Count = 1
//! ```
//!
//! Each line holds at most one import or declaration. `q.Name` anywhere on a
//! line is a reference into the unit imported as `q`. `@@` is a syntax
//! error. A file without a package clause, or that is not UTF-8, yields no
//! tree at all.
//!
//! [`StubAnalyzer`] skips parsing entirely and returns canned results.

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::base::{FileId, SourceMap};
use crate::hir::{
    AnalysisError, AnalysisRequest, AnalysisResult, Analyzer, CheckContext, CheckDepth,
    CheckOutcome, Decl, DeclKind, EngineError, ErrorSpan, Import, NameRef, ParseOutcome, Program,
    Reference, SemanticEngine, Symbol, SymbolRef, SyntaxTree, UnitAnalysis, UnitInfo,
};
use crate::project::{AnalysisKey, FileSource, read_unit_clause};

// ============================================================================
// SCRIPT ENGINE
// ============================================================================

/// Line-oriented [`SemanticEngine`] for tests.
#[derive(Debug, Default)]
pub struct ScriptEngine {
    check_delay: Duration,
    parse_calls: AtomicUsize,
    check_calls: AtomicUsize,
}

impl ScriptEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long in every `check` call.
    pub fn with_check_delay(mut self, delay: Duration) -> Self {
        self.check_delay = delay;
        self
    }

    pub fn parse_calls(&self) -> usize {
        self.parse_calls.load(Ordering::SeqCst)
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }
}

const DECL_KEYWORDS: [(&str, DeclKind); 4] = [
    ("func ", DeclKind::Func),
    ("var ", DeclKind::Var),
    ("const ", DeclKind::Const),
    ("type ", DeclKind::Type),
];

impl SemanticEngine for ScriptEngine {
    fn parse(&self, file: FileId, path: &std::path::Path, text: &[u8]) -> ParseOutcome {
        self.parse_calls.fetch_add(1, Ordering::SeqCst);

        let start_of_file = ErrorSpan::at(file, TextSize::new(0));
        let Ok(src) = std::str::from_utf8(text) else {
            return ParseOutcome {
                tree: None,
                errors: vec![EngineError::syntax(start_of_file, "invalid UTF-8 encoding")],
            };
        };
        let Some(unit_name) = read_unit_clause(text) else {
            return ParseOutcome {
                tree: None,
                errors: vec![EngineError::syntax(start_of_file, "expected 'package'")],
            };
        };

        let mut tree = SyntaxTree::new(file, path, unit_name);
        let mut errors = Vec::new();
        let mut line_start = 0;
        for line in src.split_inclusive('\n') {
            let base = line_start;
            line_start += line.len();

            let content = line.trim_end_matches(['\n', '\r']);
            let trimmed = content.trim_start();
            let indent = base + content.len() - trimmed.len();

            if let Some(col) = content.find("@@") {
                errors.push(EngineError::syntax(
                    ErrorSpan::new(file, offset(base + col), offset(base + col + 2)),
                    "unexpected @@",
                ));
            }

            if trimmed.starts_with("package ") {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("import ") {
                let lead = rest.len() - rest.trim_start().len();
                let quoted = rest.trim();
                let start = indent + "import ".len() + lead;
                if quoted.len() >= 2 && quoted.starts_with('"') && quoted.ends_with('"') {
                    tree.imports.push(Import {
                        path: SmolStr::new(&quoted[1..quoted.len() - 1]),
                        range: range(start, start + quoted.len()),
                    });
                } else {
                    errors.push(EngineError::syntax(
                        ErrorSpan::at(file, offset(start)),
                        "expected import path",
                    ));
                }
                continue;
            }

            for (keyword, kind) in DECL_KEYWORDS {
                if let Some(rest) = trimmed.strip_prefix(keyword) {
                    let len = rest.bytes().take_while(|b| is_ident_byte(*b)).count();
                    if len > 0 {
                        let start = indent + keyword.len();
                        let name = &rest[..len];
                        tree.decls.push(Decl {
                            name: SmolStr::new(name),
                            kind,
                            range: range(start, start + len),
                            exported: name.starts_with(|c: char| c.is_ascii_uppercase()),
                        });
                    }
                    break;
                }
            }

            collect_refs(content, base, &mut tree.refs);
        }

        ParseOutcome {
            tree: Some(tree),
            errors,
        }
    }

    fn check(&self, cx: &CheckContext<'_>) -> CheckOutcome {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if !self.check_delay.is_zero() {
            std::thread::sleep(self.check_delay);
        }

        let mut outcome = CheckOutcome::default();
        for tree in cx.trees {
            for decl in &tree.decls {
                let span = ErrorSpan::new(tree.file, decl.range.start(), decl.range.end());
                if outcome.symbols.iter().any(|s| s.name == decl.name) {
                    outcome.errors.push(EngineError::semantic(
                        span,
                        format!("{} redeclared in this block", decl.name),
                    ));
                    continue;
                }
                outcome.symbols.push(Symbol {
                    name: decl.name.clone(),
                    kind: decl.kind,
                    file: tree.file,
                    range: decl.range,
                    exported: decl.exported,
                });
            }
        }

        if cx.depth != CheckDepth::Full {
            return outcome;
        }

        for tree in cx.trees {
            for name_ref in &tree.refs {
                let span = ErrorSpan::new(tree.file, name_ref.range.start(), name_ref.range.end());
                let target = match name_ref.qualifier.as_deref() {
                    Some(qualifier) => match cx.dependency_for(tree, qualifier) {
                        Some(dep) => {
                            let found = dep
                                .symbols
                                .iter()
                                .position(|s| s.exported && s.name == name_ref.name);
                            if found.is_none() {
                                outcome.errors.push(EngineError::semantic(
                                    span,
                                    format!("undefined: {qualifier}.{}", name_ref.name),
                                ));
                            }
                            found.map(|index| SymbolRef {
                                import_path: dep.info.import_path.clone(),
                                index,
                            })
                        }
                        None => {
                            outcome
                                .errors
                                .push(EngineError::semantic(span, format!("undefined: {qualifier}")));
                            None
                        }
                    },
                    None => outcome
                        .symbols
                        .iter()
                        .position(|s| s.name == name_ref.name)
                        .map(|index| SymbolRef {
                            import_path: cx.unit.import_path.clone(),
                            index,
                        }),
                };
                outcome.references.push(Reference {
                    file: tree.file,
                    range: name_ref.range,
                    qualifier: name_ref.qualifier.clone(),
                    name: name_ref.name.clone(),
                    target,
                });
            }
        }
        outcome
    }
}

/// Qualified references (`q.Name`) on one line, outside strings and
/// comments.
fn collect_refs(line: &str, base: usize, refs: &mut Vec<NameRef>) {
    let bytes = line.as_bytes();
    let mut i = 0;
    let mut in_string = false;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'"' {
            in_string = !in_string;
            i += 1;
            continue;
        }
        if !in_string && b == b'/' && bytes.get(i + 1) == Some(&b'/') {
            break;
        }
        if in_string || !is_ident_start(b) {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && is_ident_byte(bytes[i]) {
            i += 1;
        }
        if bytes.get(i) == Some(&b'.') && bytes.get(i + 1).is_some_and(|b| is_ident_start(*b)) {
            let name_start = i + 1;
            let mut end = name_start;
            while end < bytes.len() && is_ident_byte(bytes[end]) {
                end += 1;
            }
            refs.push(NameRef {
                qualifier: Some(SmolStr::new(&line[start..i])),
                name: SmolStr::new(&line[name_start..end]),
                range: range(base + start, base + end),
            });
            i = end;
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn offset(at: usize) -> TextSize {
    TextSize::new(at as u32)
}

fn range(start: usize, end: usize) -> TextRange {
    TextRange::new(offset(start), offset(end))
}

// ============================================================================
// STUB ANALYZER
// ============================================================================

/// What a [`StubAnalyzer`] does when asked to analyze.
#[derive(Clone, Debug, Default)]
pub enum StubBehavior {
    #[default]
    Succeed,
    Fail(AnalysisError),
    Panic,
}

/// [`Analyzer`] returning canned results without parsing anything.
///
/// Successful results register the unit's files in the source map (with
/// their contents if a file source was given) and hold an empty program.
#[derive(Default)]
pub struct StubAnalyzer {
    behavior: StubBehavior,
    latency: Duration,
    latency_by_unit: FxHashMap<SmolStr, Duration>,
    source: Option<Arc<dyn FileSource>>,
    started: Option<Sender<SmolStr>>,
    calls: Mutex<FxHashMap<AnalysisKey, usize>>,
    total_calls: AtomicUsize,
}

impl StubAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: AnalysisError) -> Self {
        Self::new().with_behavior(StubBehavior::Fail(error))
    }

    pub fn panicking() -> Self {
        Self::new().with_behavior(StubBehavior::Panic)
    }

    pub fn with_behavior(mut self, behavior: StubBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Sleep this long in every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Sleep this long when analyzing units named `unit_name`.
    pub fn with_latency_for(mut self, unit_name: &str, latency: Duration) -> Self {
        self.latency_by_unit.insert(SmolStr::new(unit_name), latency);
        self
    }

    pub fn with_source(mut self, source: Arc<dyn FileSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Send the unit name on `started` as each call begins.
    pub fn with_start_signal(mut self, started: Sender<SmolStr>) -> Self {
        self.started = Some(started);
        self
    }

    pub fn calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, key: &AnalysisKey) -> usize {
        self.calls.lock().get(key).copied().unwrap_or(0)
    }
}

impl Analyzer for StubAnalyzer {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let unit = &request.unit;
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().entry(unit.key()).or_default() += 1;
        if let Some(started) = &self.started {
            let _ = started.send(unit.name.clone());
        }

        let latency = self
            .latency_by_unit
            .get(&unit.name)
            .copied()
            .unwrap_or(self.latency);
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }

        match &self.behavior {
            StubBehavior::Succeed => {}
            StubBehavior::Fail(error) => return Err(error.clone()),
            StubBehavior::Panic => panic!("stub analyzer panicked on {}", unit.key()),
        }

        let mut source_map = SourceMap::new();
        for path in unit.analysis_files() {
            let text = self
                .source
                .as_ref()
                .and_then(|source| source.read(&path).ok());
            source_map.add_file(&path, text.as_deref().unwrap_or_default());
        }

        let target = UnitAnalysis {
            info: UnitInfo {
                import_path: unit.import_path.clone(),
                name: unit.name.clone(),
                dir: unit.dir.clone(),
            },
            depth: CheckDepth::Full,
            trees: Vec::new(),
            symbols: Vec::new(),
            references: Vec::new(),
        };
        Ok(AnalysisResult::new(
            unit.clone(),
            source_map,
            Program::new(Arc::new(target), IndexMap::new()),
            Vec::new(),
            None,
        ))
    }
}
