//! Annotation scanner: a line-by-line state machine.
//!
//! Each line first goes through the class registration macros, then to the
//! handler of the current state. Handlers consume the state and return the
//! next one.

use super::enums::{self, RowOutcome, RE_DEFINE};
use crate::error::ScanError;
use crate::model::*;
use crate::synth::{self, LuaFunc};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::{debug, warn};

// -- Regex patterns -----------------------------------------------------------

static RE_REGISTER_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"REGISTER_LUA_CLASS *\( *(.+?) *\)").unwrap());

static RE_REGISTER_SUBCLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"REGISTER_LUA_SUBCLASS *\( *(.+?) *, *(.+?) *\)").unwrap());

static RE_METHODS_DEFINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"define +LUA_METHODS *\(CLASS, *METHOD\)").unwrap());

static RE_METHOD_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"METHOD *\( *CLASS, *(.+?) *,").unwrap());

static RE_GENERATE_METHODS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GENERATE_LUA_METHODS_TABLE *\( *(.+?) *,").unwrap());

static RE_STATIC_METHODS_DEFINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"define +LUA_STATIC_METHODS *\( *METHOD *\)").unwrap());

static RE_STATIC_METHOD_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"METHOD *\( *(.+?) *,").unwrap());

static RE_GENERATE_STATIC_METHODS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GENERATE_LUA_STATIC_METHODS_TABLE *\( *(.+?) *,").unwrap());

static RE_PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(?:mainpage|page)(?:\s|$)").unwrap());

static RE_PAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\s+\\par").unwrap());

static RE_GEOM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@geom\s+(.*)$").unwrap());

static RE_FUNCS_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\*?\s*@luafuncsheader\s+(\w+)").unwrap());

static RE_LUAFUNC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\*?\s*@luafunc\s+(.*)$").unwrap());

static RE_LUACLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@luaclass\s+(\w+)\s*$").unwrap());

static RE_LUAVCLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@luavclass\s+(\w+)\s*$").unwrap());

static RE_DESCR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@descr\s+(.*)$").unwrap());

// -- States -------------------------------------------------------------------

enum State {
    /// Plain source text between everything else.
    Code,
    MethodTable(MethodTable),
    Comment(CommentRegion),
    /// Lives on after the `@luaenum` comment closes, until the last row of
    /// the table that follows it.
    EnumTable(EnumTable),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MethodKind {
    Instance,
    Static,
}

struct MethodTable {
    kind: MethodKind,
    names: Vec<String>,
    /// Enum still waiting for its table when this method table began.
    resume: Option<EnumSpec>,
}

#[derive(Default)]
struct CommentRegion {
    /// `@mainpage` / `@page` seen: free text goes to the main page.
    main_page: bool,
    /// Some tag was recognized; free text is worth keeping from here on.
    has_command: bool,
    /// Enum whose group is open in the enum stream.
    pending_enum: Option<EnumSpec>,
}

struct EnumTable {
    spec: EnumSpec,
    phase: EnumPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumPhase {
    AwaitingDefine,
    Rows,
}

// -- Scanner ------------------------------------------------------------------

pub(super) struct Scanner<'a> {
    dialect: Dialect,
    state: State,
    out: FileFragments,
    acc: &'a mut Accumulators,
}

/// `#define LUA_METHODS(...)` / `#define LUA_STATIC_METHODS(...)`.
fn method_table_start(line: &str, resume: Option<EnumSpec>) -> Option<MethodTable> {
    let kind = if RE_METHODS_DEFINE.is_match(line) {
        MethodKind::Instance
    } else if RE_STATIC_METHODS_DEFINE.is_match(line) {
        MethodKind::Static
    } else {
        return None;
    };
    Some(MethodTable {
        kind,
        names: Vec::new(),
        resume,
    })
}

fn after_method_table(resume: Option<EnumSpec>) -> State {
    match resume {
        Some(spec) => State::EnumTable(EnumTable {
            spec,
            phase: EnumPhase::AwaitingDefine,
        }),
        None => State::Code,
    }
}

impl<'a> Scanner<'a> {
    pub(super) fn new(dialect: Dialect, acc: &'a mut Accumulators) -> Self {
        Scanner {
            dialect,
            state: State::Code,
            out: FileFragments::default(),
            acc,
        }
    }

    pub(super) fn line(&mut self, number: usize, raw: &str) -> Result<(), ScanError> {
        let line: Cow<str> = if self.dialect == Dialect::Bracketed {
            // Lua classes only ever exist in the docs
            Cow::Owned(raw.replace("@luaclass", "@luavclass"))
        } else {
            Cow::Borrowed(raw)
        };

        let in_rows = matches!(
            self.state,
            State::EnumTable(EnumTable { phase: EnumPhase::Rows, .. })
        );
        if !in_rows && self.registration(&line) {
            return Ok(());
        }

        self.state = match std::mem::replace(&mut self.state, State::Code) {
            State::Code => self.code_line(&line),
            State::MethodTable(table) => self.method_table_line(table, &line),
            State::Comment(region) => self.comment_line(region, number, &line)?,
            State::EnumTable(table) => self.enum_table_line(table, &line),
        };
        Ok(())
    }

    /// Close whatever is still open so the next file starts clean.
    pub(super) fn finish(mut self) -> FileFragments {
        match std::mem::replace(&mut self.state, State::Code) {
            State::Code => {}
            State::MethodTable(table) => {
                warn!(
                    "method table never generated; dropping {} names",
                    table.names.len()
                );
                if let Some(spec) = table.resume {
                    warn!("no table found for enum {}", spec.name);
                    self.acc.enums.push(synth::enum_group_abandon());
                }
            }
            State::Comment(region) => {
                warn!("comment still open at end of file");
                self.out.comments.push("*/\n".to_string());
                if region.pending_enum.is_some() {
                    self.acc.enums.push(synth::enum_group_abandon());
                }
            }
            State::EnumTable(table) => match table.phase {
                EnumPhase::AwaitingDefine => {
                    warn!("no table found for enum {}", table.spec.name);
                    self.acc.enums.push(synth::enum_group_abandon());
                }
                EnumPhase::Rows => {
                    warn!("enum table {} still open at end of file", table.spec.name);
                    self.acc.enums.extend(synth::enum_table_end());
                }
            },
        }
        self.out
    }

    /// `REGISTER_LUA_CLASS` / `REGISTER_LUA_SUBCLASS`, recognized anywhere.
    fn registration(&mut self, line: &str) -> bool {
        if let Some(caps) = RE_REGISTER_CLASS.captures(line) {
            let class = &caps[1];
            self.out.class_mut(class).header = synth::class_opening(class, None);
            return true;
        }
        if let Some(caps) = RE_REGISTER_SUBCLASS.captures(line) {
            let class = &caps[1];
            self.out.class_mut(class).header = synth::class_opening(class, Some(&caps[2]));
            return true;
        }
        false
    }

    // -- State handlers -------------------------------------------------------

    fn code_line(&mut self, line: &str) -> State {
        if let Some(table) = method_table_start(line, None) {
            return State::MethodTable(table);
        }
        self.try_open_comment(line, CommentRegion::default())
            .unwrap_or(State::Code)
    }

    fn method_table_line(&mut self, mut table: MethodTable, line: &str) -> State {
        match table.kind {
            MethodKind::Instance => {
                if let Some(caps) = RE_GENERATE_METHODS.captures(line) {
                    let class = self.out.class_mut(&caps[1]);
                    class.body.extend(table.names.iter().map(|m| synth::method_stub(m)));
                    return after_method_table(table.resume);
                }
                if let Some(caps) = RE_METHOD_ROW.captures(line) {
                    table.names.push(caps[1].to_string());
                }
            }
            MethodKind::Static => {
                if let Some(caps) = RE_GENERATE_STATIC_METHODS.captures(line) {
                    let name = caps[1].to_string();
                    let class = self.out.class_mut(&name);
                    class.open_if_unset(synth::class_opening(&name, None));
                    for method in &table.names {
                        // Explicitly documented methods win over the table
                        if !synth::declares_method(&class.body, method) {
                            class.body.push(synth::static_method_stub(method));
                        }
                    }
                    return after_method_table(table.resume);
                }
                if let Some(caps) = RE_STATIC_METHOD_ROW.captures(line) {
                    table.names.push(caps[1].to_string());
                }
            }
        }
        State::MethodTable(table)
    }

    fn comment_line(
        &mut self,
        mut region: CommentRegion,
        number: usize,
        line: &str,
    ) -> Result<State, ScanError> {
        if line.contains(self.dialect.comment_close()) {
            self.out.comments.push("*/\n".to_string());
            return Ok(match region.pending_enum {
                Some(spec) => State::EnumTable(EnumTable {
                    spec,
                    phase: EnumPhase::AwaitingDefine,
                }),
                None => State::Code,
            });
        }

        if RE_PAGE.is_match(line) {
            self.acc.mainpage.push(format!("{}\n", line));
            region.main_page = true;
            region.has_command = true;
            return Ok(State::Comment(region));
        }

        if RE_PAR.is_match(line) {
            region.has_command = true;
            return Ok(State::Comment(region));
        }

        if let Some(spec) = enums::parse_tag(line) {
            if region.pending_enum.take().is_some() {
                self.acc.enums.push(synth::enum_group_abandon());
            }
            debug!("enum {} (value column {})", spec.name, spec.value_column);
            self.acc.enums.push(synth::enum_group_open(&spec));
            region.pending_enum = Some(spec);
            region.has_command = true;
            return Ok(State::Comment(region));
        }

        if let Some(caps) = RE_GEOM.captures(line) {
            self.out.comments.push(synth::geometry_paragraph(&caps[1]));
            return Ok(State::Comment(region));
        }

        if let Some(caps) = RE_FUNCS_HEADER.captures(line) {
            let class = &caps[1];
            self.out.class_mut(class).body.push(synth::marker_stub());
            self.out.comments.push(synth::marker_doc_target(class));
            region.has_command = true;
            return Ok(State::Comment(region));
        }

        if RE_LUAFUNC.is_match(line) {
            self.luafunc(number, line)?;
            region.has_command = true;
            return Ok(State::Comment(region));
        }

        if let Some(caps) = RE_LUACLASS.captures(line) {
            self.out.comments.push(synth::class_doc_target(&caps[1]));
            region.has_command = true;
            return Ok(State::Comment(region));
        }

        if let Some(caps) = RE_LUAVCLASS.captures(line) {
            let class = &caps[1];
            self.out.comments.push(synth::class_doc_target(class));
            self.out
                .class_mut(class)
                .open_if_unset(synth::class_opening(class, None));
            region.has_command = true;
            return Ok(State::Comment(region));
        }

        if let Some(caps) = RE_DESCR.captures(line) {
            self.out.comments.push(synth::description_paragraph(&caps[1]));
            region.has_command = true;
            return Ok(State::Comment(region));
        }

        // Free text
        let text = format!("{}\n", line);
        if region.main_page {
            self.acc.mainpage.push(text);
        } else if region.pending_enum.is_some() {
            self.acc.enums.push(text);
        } else if region.has_command {
            self.out.comments.push(text);
        }
        Ok(State::Comment(region))
    }

    fn enum_table_line(&mut self, table: EnumTable, line: &str) -> State {
        match table.phase {
            EnumPhase::AwaitingDefine => {
                // A method table's #define is not the enum's table
                if let Some(mut methods) = method_table_start(line, None) {
                    methods.resume = Some(table.spec);
                    return State::MethodTable(methods);
                }
                if line.contains(self.dialect.comment_open()) {
                    let region = CommentRegion {
                        pending_enum: Some(table.spec.clone()),
                        ..Default::default()
                    };
                    if let Some(state) = self.try_open_comment(line, region) {
                        return state;
                    }
                }
                if RE_DEFINE.is_match(line) {
                    self.acc.enums.extend(synth::enum_table_start(&table.spec));
                    return State::EnumTable(EnumTable {
                        phase: EnumPhase::Rows,
                        ..table
                    });
                }
                State::EnumTable(table)
            }
            EnumPhase::Rows => match enums::consume_row(&table.spec, line, &mut self.acc.enums) {
                RowOutcome::More => State::EnumTable(table),
                RowOutcome::Last => {
                    self.acc.enums.extend(synth::enum_table_end());
                    State::Code
                }
            },
        }
    }

    // -- Helpers --------------------------------------------------------------

    /// Enter a comment region if `line` opens one. A comment closed on the
    /// same line is not a documentation block.
    fn try_open_comment(&mut self, line: &str, region: CommentRegion) -> Option<State> {
        let open = self.dialect.comment_open();
        let pos = line.find(open)?;
        if line[pos + open.len()..].contains(self.dialect.comment_close()) {
            return None;
        }
        self.out.comments.push("/*!\n".to_string());
        Some(State::Comment(region))
    }

    fn luafunc(&mut self, number: usize, line: &str) -> Result<(), ScanError> {
        let func = LuaFunc::parse(line, self.dialect, number)?;
        self.out.comments.push(func.doc_target());

        if func.is_constructor() {
            self.out.comments.push(func.constructor_example());
        } else if let Some(class) = func.class.as_deref() {
            // The hand-written signature replaces the method table's stub
            if let Some(fragments) = self.out.classes.get_mut(class) {
                fragments.remove_fragment(&synth::method_stub(&func.method));
            }
        }

        let decl = func.declaration(line);
        match func.class.as_deref() {
            Some(class) => self.out.class_mut(class).body.push(decl),
            None => self.out.global_functions.push(decl),
        }
        Ok(())
    }
}
