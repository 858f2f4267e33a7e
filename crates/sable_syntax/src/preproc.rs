//! The SystemVerilog preprocessor: directives, macros, includes, conditionals.
//!
//! Sits between the [`Lexer`] and the parser. Directive text never reaches
//! the parser as tokens; it is converted into [`TriviaKind::Directive`]
//! trivia attached to the next real token, and text inside false conditional
//! branches becomes [`TriviaKind::DisabledText`] trivia, so the preprocessed
//! token stream still reproduces the source file byte-for-byte.
//!
//! Macro expansion is re-entrant: expanded tokens are re-scanned for further
//! macro usages. Tokens produced by expansion are marked `from_macro` and
//! carry no raw bytes of the including file.

use crate::lexer::{Lexer, LexerMode};
use crate::token::{Token, TokenKind, TokenValue, Trivia, TriviaKind};
use sable_diagnostics::{DiagCode, Diagnostic, DiagnosticSink};
use sable_source::{FileId, SourceDb, Span};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// Options controlling preprocessing.
#[derive(Clone, Debug)]
pub struct PreprocessorOptions {
    /// Maximum depth of nested `` `include `` files.
    pub max_include_depth: u32,
    /// Macros predefined on the command line (`-D NAME[=VALUE]`).
    pub predefines: Vec<(String, String)>,
}

impl Default for PreprocessorOptions {
    fn default() -> Self {
        Self {
            max_include_depth: 32,
            predefines: Vec::new(),
        }
    }
}

/// The net type implied for undeclared identifiers, set by
/// `` `default_nettype ``.
#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub enum DefaultNetType {
    /// `wire` (the initial state).
    Wire,
    /// `tri`
    Tri,
    /// `tri0`
    Tri0,
    /// `tri1`
    Tri1,
    /// `wand`
    Wand,
    /// `wor`
    Wor,
    /// `trireg`
    Trireg,
    /// `uwire`
    Uwire,
    /// `none`: implicit net creation is disabled.
    None,
}

impl DefaultNetType {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "wire" => Some(DefaultNetType::Wire),
            "tri" => Some(DefaultNetType::Tri),
            "tri0" => Some(DefaultNetType::Tri0),
            "tri1" => Some(DefaultNetType::Tri1),
            "wand" => Some(DefaultNetType::Wand),
            "wor" => Some(DefaultNetType::Wor),
            "trireg" => Some(DefaultNetType::Trireg),
            "uwire" => Some(DefaultNetType::Uwire),
            "none" => Some(DefaultNetType::None),
            _ => None,
        }
    }
}

/// A formal argument of a function-like macro.
#[derive(Clone, Debug)]
struct MacroFormal {
    name: String,
    default: Option<Vec<Token>>,
}

/// A stored `` `define ``.
#[derive(Clone, Debug)]
struct MacroDef {
    /// Formal arguments; `None` for an object-like macro.
    formals: Option<Vec<MacroFormal>>,
    body: Vec<Token>,
}

/// One frame of the `` `ifdef `` conditional stack.
#[derive(Clone, Copy, Debug)]
struct CondFrame {
    /// Tokens in the current branch are kept.
    active: bool,
    /// Some branch of this conditional has already been taken.
    taken: bool,
    /// An `` `else `` has been seen.
    seen_else: bool,
    span: Span,
}

/// The preprocessor, producing the parser's token stream.
pub struct Preprocessor<'a> {
    source_db: &'a mut SourceDb,
    sink: &'a DiagnosticSink,
    options: PreprocessorOptions,
    macros: HashMap<String, MacroDef>,
    cond_stack: Vec<CondFrame>,
    /// Stack of open files; the last entry is the current lexer.
    lexers: Vec<Lexer<'a>>,
    /// Tokens produced by macro expansion, drained before the lexer.
    expansion: VecDeque<Token>,
    /// Trivia from consumed directives, waiting for the next real token.
    pending_trivia: Vec<Trivia>,
    default_nettype: DefaultNetType,
}

impl<'a> Preprocessor<'a> {
    /// Creates a preprocessor reading from the given file.
    pub fn new(
        source_db: &'a mut SourceDb,
        file: FileId,
        sink: &'a DiagnosticSink,
        options: PreprocessorOptions,
    ) -> Self {
        let source: Rc<str> = Rc::from(source_db.get_file(file).content.as_str());
        let mut pp = Self {
            source_db,
            sink,
            options,
            macros: HashMap::new(),
            cond_stack: Vec::new(),
            lexers: vec![Lexer::new(source, file, sink)],
            expansion: VecDeque::new(),
            pending_trivia: Vec::new(),
            default_nettype: DefaultNetType::Wire,
        };
        for (name, value) in pp.options.predefines.clone() {
            pp.predefine(&name, &value);
        }
        pp
    }

    /// The default nettype in force at the current point of the stream.
    pub fn default_nettype(&self) -> DefaultNetType {
        self.default_nettype
    }

    /// Runs the whole file through, returning the preprocessed token stream.
    pub fn preprocess(mut self) -> (Vec<Token>, DefaultNetType) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, self.default_nettype)
    }

    /// Registers a command-line macro definition.
    fn predefine(&mut self, name: &str, value: &str) {
        let file = self.source_db.add_source("<command-line>", value.to_string());
        let source: Rc<str> = Rc::from(value);
        let mut lexer = Lexer::new(source, file, self.sink);
        let mut body = Vec::new();
        loop {
            let mut tok = lexer.next_token(LexerMode::Normal);
            if tok.kind == TokenKind::Eof {
                break;
            }
            tok.trivia.clear();
            body.push(tok);
        }
        self.macros
            .insert(name.to_string(), MacroDef { formals: None, body });
    }

    /// Produces the next token for the parser.
    pub fn next_token(&mut self) -> Token {
        loop {
            // Expansion queue first: re-scan expanded tokens for nested usages.
            if let Some(token) = self.expansion.pop_front() {
                if token.kind == TokenKind::Directive {
                    self.handle_directive(token);
                    continue;
                }
                return self.finish(token);
            }

            let token = self.current_lexer().next_token(LexerMode::Normal);
            match token.kind {
                TokenKind::Eof => {
                    if self.lexers.len() > 1 {
                        // End of an include file: fold its trailing trivia in
                        // and resume the including file.
                        self.pending_trivia.extend(token.trivia);
                        self.lexers.pop();
                        continue;
                    }
                    for frame in std::mem::take(&mut self.cond_stack) {
                        self.sink.emit(Diagnostic::new(
                            DiagCode::UnbalancedConditional,
                            "conditional directive is never closed",
                            frame.span,
                        ));
                    }
                    return self.finish(token);
                }
                TokenKind::Directive => {
                    self.handle_directive(token);
                }
                _ if self.inactive() => {
                    // Discard, but keep the bytes as disabled-text trivia.
                    self.pending_trivia.extend(token.trivia);
                    self.pending_trivia
                        .push(Trivia::new(TriviaKind::DisabledText, token.span));
                }
                _ => return self.finish(token),
            }
        }
    }

    /// Attaches any pending directive trivia in front of the token's own.
    fn finish(&mut self, mut token: Token) -> Token {
        if !self.pending_trivia.is_empty() {
            let mut trivia = std::mem::take(&mut self.pending_trivia);
            trivia.append(&mut token.trivia);
            token.trivia = trivia;
        }
        token
    }

    fn current_lexer(&mut self) -> &mut Lexer<'a> {
        self.lexers.last_mut().expect("lexer stack is never empty")
    }

    fn inactive(&self) -> bool {
        self.cond_stack.iter().any(|f| !f.active)
    }

    fn directive_name(&self, token: &Token) -> String {
        self.source_db.snippet(token.span)[1..].to_string()
    }

    fn text_of(&self, token: &Token) -> &str {
        self.source_db.snippet(token.span)
    }

    /// Collects the rest of a directive line, returning its tokens and the
    /// span from `start` through the terminating line ending.
    fn read_directive_line(&mut self, start: Span) -> (Vec<Token>, Span) {
        let mut tokens = Vec::new();
        loop {
            let token = self.current_lexer().next_token(LexerMode::Directive);
            if token.kind == TokenKind::EndOfDirective {
                let full = start.merge(token.span);
                return (tokens, full);
            }
            tokens.push(token);
        }
    }

    /// Records directive bytes as trivia for the next real token.
    fn push_directive_trivia(&mut self, token: &Token, full_span: Span) {
        self.pending_trivia.extend(token.trivia.iter().copied());
        let kind = if self.inactive() {
            TriviaKind::DisabledText
        } else {
            TriviaKind::Directive
        };
        self.pending_trivia.push(Trivia::new(kind, full_span));
    }

    /// Dispatches one directive token.
    fn handle_directive(&mut self, token: Token) {
        let name = self.directive_name(&token);

        match name.as_str() {
            // A bare backtick: the lexer already diagnosed it. Surface an
            // unknown token so the parser sees something at this position.
            "" => {
                let mut unknown = token;
                unknown.kind = TokenKind::Unknown;
                self.expansion.push_front(unknown);
            }
            "define" => self.handle_define(token),
            "undef" => {
                let (tokens, span) = self.read_directive_line(token.span);
                if !self.inactive() {
                    if let Some(name_tok) = tokens.first() {
                        let name = self.text_of(name_tok).to_string();
                        self.macros.remove(&name);
                    }
                }
                self.push_directive_trivia(&token, span);
            }
            "undefineall" => {
                let (_, span) = self.read_directive_line(token.span);
                if !self.inactive() {
                    self.macros.clear();
                }
                self.push_directive_trivia(&token, span);
            }
            "ifdef" | "ifndef" => {
                let invert = name == "ifndef";
                let (tokens, span) = self.read_directive_line(token.span);
                let defined = tokens
                    .first()
                    .map(|t| self.macros.contains_key(self.text_of(t)))
                    .unwrap_or(false);
                let parent_active = !self.inactive();
                let active = parent_active && (defined != invert);
                self.cond_stack.push(CondFrame {
                    active,
                    taken: active,
                    seen_else: false,
                    span: token.span,
                });
                self.push_directive_trivia(&token, span);
            }
            "elsif" => {
                let (tokens, span) = self.read_directive_line(token.span);
                let defined = tokens
                    .first()
                    .map(|t| self.macros.contains_key(self.text_of(t)))
                    .unwrap_or(false);
                let parent_active = self
                    .cond_stack
                    .iter()
                    .rev()
                    .skip(1)
                    .all(|f| f.active);
                match self.cond_stack.last_mut() {
                    Some(frame) if !frame.seen_else => {
                        frame.active = parent_active && !frame.taken && defined;
                        frame.taken |= frame.active;
                    }
                    _ => self.sink.emit(Diagnostic::new(
                        DiagCode::UnbalancedConditional,
                        "`elsif without a matching `ifdef",
                        token.span,
                    )),
                }
                self.push_directive_trivia(&token, span);
            }
            "else" => {
                let (_, span) = self.read_directive_line(token.span);
                let parent_active = self
                    .cond_stack
                    .iter()
                    .rev()
                    .skip(1)
                    .all(|f| f.active);
                match self.cond_stack.last_mut() {
                    Some(frame) if !frame.seen_else => {
                        frame.seen_else = true;
                        frame.active = parent_active && !frame.taken;
                        frame.taken |= frame.active;
                    }
                    _ => self.sink.emit(Diagnostic::new(
                        DiagCode::UnbalancedConditional,
                        "`else without a matching `ifdef",
                        token.span,
                    )),
                }
                self.push_directive_trivia(&token, span);
            }
            "endif" => {
                let (_, span) = self.read_directive_line(token.span);
                if self.cond_stack.pop().is_none() {
                    self.sink.emit(Diagnostic::new(
                        DiagCode::UnbalancedConditional,
                        "`endif without a matching `ifdef",
                        token.span,
                    ));
                }
                self.push_directive_trivia(&token, span);
            }
            "include" => self.handle_include(token),
            "default_nettype" => {
                let (tokens, span) = self.read_directive_line(token.span);
                if !self.inactive() {
                    match tokens.first().map(|t| self.text_of(t).to_string()) {
                        Some(text) => match DefaultNetType::from_str(&text) {
                            Some(nt) => self.default_nettype = nt,
                            None => self.sink.emit(Diagnostic::new(
                                DiagCode::UnknownDirective,
                                format!("`{text}` is not a net type"),
                                tokens[0].span,
                            )),
                        },
                        None => self.sink.emit(Diagnostic::new(
                            DiagCode::UnknownDirective,
                            "expected a net type after `default_nettype",
                            token.span,
                        )),
                    }
                }
                self.push_directive_trivia(&token, span);
            }
            "resetall" => {
                let (_, span) = self.read_directive_line(token.span);
                if !self.inactive() {
                    self.default_nettype = DefaultNetType::Wire;
                }
                self.push_directive_trivia(&token, span);
            }
            // Recognized directives whose content has no effect on the
            // semantic model built here; the text is preserved as trivia.
            "line" | "timescale" | "begin_keywords" | "end_keywords" | "celldefine"
            | "endcelldefine" | "pragma" | "unconnected_drive" | "nounconnected_drive" => {
                let (_, span) = self.read_directive_line(token.span);
                self.push_directive_trivia(&token, span);
            }
            "__FILE__" => {
                self.push_directive_trivia(&token, token.span);
                if !self.inactive() {
                    let path = self
                        .source_db
                        .get_file(token.span.file)
                        .path
                        .display()
                        .to_string();
                    let synth = self.synth_token_file(&format!("\"{path}\""));
                    let mut tok = Token::new(TokenKind::StringLiteral, synth);
                    tok.value = Some(TokenValue::Str(path));
                    tok.from_macro = true;
                    self.expansion.push_front(tok);
                }
            }
            "__LINE__" => {
                self.push_directive_trivia(&token, token.span);
                if !self.inactive() {
                    let (line, _) = self
                        .source_db
                        .get_file(token.span.file)
                        .line_col(token.span.start);
                    let synth = self.synth_token_file(&line.to_string());
                    let mut tok = Token::new(TokenKind::IntegerLiteral, synth);
                    tok.value = Some(TokenValue::Integer(line as u64));
                    tok.from_macro = true;
                    self.expansion.push_front(tok);
                }
            }
            _ => {
                if self.inactive() {
                    self.push_directive_trivia(&token, token.span);
                } else if self.macros.contains_key(&name) {
                    self.expand_macro(&name, token);
                } else {
                    self.sink.emit(Diagnostic::new(
                        DiagCode::UnknownDirective,
                        format!("unknown macro or compiler directive `{name}`"),
                        token.span,
                    ));
                    self.push_directive_trivia(&token, token.span);
                }
            }
        }
    }

    fn handle_define(&mut self, token: Token) {
        let (mut tokens, span) = self.read_directive_line(token.span);
        self.push_directive_trivia(&token, span);
        if self.inactive() {
            return;
        }
        if tokens.is_empty() || !tokens[0].kind.is_identifier() {
            self.sink.emit(Diagnostic::new(
                DiagCode::ExpectedIdentifier,
                "expected a macro name after `define",
                span,
            ));
            return;
        }
        let name_tok = tokens.remove(0);
        let name = name_tok
            .identifier_text(self.text_of(&name_tok))
            .to_string();

        // A formal argument list only exists if the paren directly abuts the
        // macro name; `define FOO (x) is object-like with a body of (x).
        let mut formals = None;
        if tokens
            .first()
            .map(|t| t.kind == TokenKind::OpenParen && t.span.start == name_tok.span.end)
            .unwrap_or(false)
        {
            tokens.remove(0);
            let mut list = Vec::new();
            loop {
                match tokens.first().map(|t| t.kind) {
                    Some(TokenKind::CloseParen) => {
                        tokens.remove(0);
                        break;
                    }
                    Some(k) if k.is_identifier() => {
                        let formal_tok = tokens.remove(0);
                        let formal_name = formal_tok
                            .identifier_text(self.text_of(&formal_tok))
                            .to_string();
                        let mut default = None;
                        if tokens.first().map(|t| t.kind) == Some(TokenKind::Equals) {
                            tokens.remove(0);
                            let mut depth = 0u32;
                            let mut value = Vec::new();
                            while let Some(t) = tokens.first() {
                                match t.kind {
                                    TokenKind::Comma | TokenKind::CloseParen if depth == 0 => break,
                                    TokenKind::OpenParen
                                    | TokenKind::OpenBracket
                                    | TokenKind::OpenBrace => depth += 1,
                                    TokenKind::CloseParen
                                    | TokenKind::CloseBracket
                                    | TokenKind::CloseBrace => depth = depth.saturating_sub(1),
                                    _ => {}
                                }
                                value.push(tokens.remove(0));
                            }
                            default = Some(value);
                        }
                        list.push(MacroFormal {
                            name: formal_name,
                            default,
                        });
                        if tokens.first().map(|t| t.kind) == Some(TokenKind::Comma) {
                            tokens.remove(0);
                        }
                    }
                    _ => {
                        self.sink.emit(Diagnostic::new(
                            DiagCode::ExpectedMacroArgs,
                            "malformed macro formal argument list",
                            span,
                        ));
                        break;
                    }
                }
            }
            formals = Some(list);
        }

        self.macros.insert(
            name,
            MacroDef {
                formals,
                body: tokens,
            },
        );
    }

    fn handle_include(&mut self, token: Token) {
        let (tokens, span) = self.read_directive_line(token.span);
        self.push_directive_trivia(&token, span);
        if self.inactive() {
            return;
        }

        // Either a quoted string token or <...> between angle brackets.
        let (name, is_system) = match tokens.first() {
            Some(t) if t.kind == TokenKind::StringLiteral => {
                (t.string_value().unwrap_or("").to_string(), false)
            }
            Some(t) if t.kind == TokenKind::LessThan => {
                let close = tokens.iter().position(|t| t.kind == TokenKind::GreaterThan);
                match close {
                    Some(end) if end > 1 => {
                        let start = tokens[1].span;
                        let stop = tokens[end - 1].span;
                        (self.source_db.snippet(start.merge(stop)).to_string(), true)
                    }
                    _ => {
                        self.sink.emit(Diagnostic::new(
                            DiagCode::ExpectedIncludeFileName,
                            "expected a file name after `include",
                            span,
                        ));
                        return;
                    }
                }
            }
            _ => {
                self.sink.emit(Diagnostic::new(
                    DiagCode::ExpectedIncludeFileName,
                    "expected a file name after `include",
                    span,
                ));
                return;
            }
        };

        if self.lexers.len() as u32 >= self.options.max_include_depth {
            self.sink.emit(Diagnostic::new(
                DiagCode::ExceededMaxIncludeDepth,
                format!(
                    "exceeded maximum include depth of {}",
                    self.options.max_include_depth
                ),
                span,
            ));
            return;
        }

        let including = token.span.file;
        match self.source_db.load_include(&name, is_system, including) {
            Some(file) => {
                let source: Rc<str> = Rc::from(self.source_db.get_file(file).content.as_str());
                self.lexers.push(Lexer::new(source, file, self.sink));
            }
            None => {
                self.sink.emit(Diagnostic::new(
                    DiagCode::CouldNotOpenIncludeFile,
                    format!("could not open include file \"{name}\""),
                    span,
                ));
            }
        }
    }

    /// Pulls the next token for macro-argument parsing, from the expansion
    /// queue or the lexer.
    fn next_raw(&mut self) -> Token {
        if let Some(token) = self.expansion.pop_front() {
            return token;
        }
        self.current_lexer().next_token(LexerMode::Normal)
    }

    /// Consumes a token during macro-usage parsing, preserving its bytes.
    fn consume_as_trivia(&mut self, token: &Token) {
        self.pending_trivia.extend(token.trivia.iter().copied());
        if !token.from_macro {
            self.pending_trivia
                .push(Trivia::new(TriviaKind::Directive, token.span));
        }
    }

    fn expand_macro(&mut self, name: &str, usage: Token) {
        let def = self.macros[name].clone();
        self.consume_as_trivia(&usage);

        let actuals: Option<Vec<Vec<Token>>> = if def.formals.is_some() {
            match self.parse_macro_actuals(&usage) {
                Some(actuals) => Some(actuals),
                None => return,
            }
        } else {
            None
        };

        // Bind formals to actuals, applying defaults.
        let mut bindings: HashMap<&str, Vec<Token>> = HashMap::new();
        if let Some(formals) = &def.formals {
            let actuals = actuals.unwrap_or_default();
            if actuals.len() > formals.len() {
                self.sink.emit(Diagnostic::new(
                    DiagCode::ExpectedMacroArgs,
                    format!(
                        "macro `{name}` takes {} arguments but {} were given",
                        formals.len(),
                        actuals.len()
                    ),
                    usage.span,
                ));
                return;
            }
            for (i, formal) in formals.iter().enumerate() {
                let tokens = match actuals.get(i) {
                    Some(tokens) if !tokens.is_empty() => tokens.clone(),
                    _ => match &formal.default {
                        Some(default) => default.clone(),
                        None => {
                            if actuals.get(i).is_none() {
                                self.sink.emit(Diagnostic::new(
                                    DiagCode::ExpectedMacroArgs,
                                    format!(
                                        "macro `{name}` is missing a value for argument `{}`",
                                        formal.name
                                    ),
                                    usage.span,
                                ));
                            }
                            Vec::new()
                        }
                    },
                };
                bindings.insert(formal.name.as_str(), tokens);
            }
        }

        // Substitute the body.
        let mut result: Vec<Token> = Vec::new();
        let mut i = 0;
        while i < def.body.len() {
            let tok = &def.body[i];
            match tok.kind {
                TokenKind::Identifier | TokenKind::EscapedIdentifier => {
                    let text = tok.identifier_text(self.text_of(tok)).to_string();
                    if let Some(actual) = bindings.get(text.as_str()) {
                        result.extend(actual.iter().cloned().map(mark_expanded));
                    } else {
                        result.push(mark_expanded(tok.clone()));
                    }
                }
                TokenKind::MacroQuote => {
                    // Stringify everything up to the closing `". Spacing
                    // between pieces follows the macro body's own layout.
                    let mut text = String::new();
                    let mut body_prev: Option<(FileId, u32)> = None;
                    i += 1;
                    while i < def.body.len() && def.body[i].kind != TokenKind::MacroQuote {
                        let part = &def.body[i];
                        if !text.is_empty() && !adjacent(body_prev, part) {
                            text.push(' ');
                        }
                        body_prev = Some((part.span.file, part.span.end));
                        match part.kind {
                            TokenKind::MacroEscapedQuote => text.push('"'),
                            TokenKind::Identifier | TokenKind::EscapedIdentifier
                                if bindings.contains_key(
                                    part.identifier_text(self.text_of(part)),
                                ) =>
                            {
                                let key = part.identifier_text(self.text_of(part)).to_string();
                                let mut actual_prev: Option<(FileId, u32)> = None;
                                for (j, actual) in bindings[key.as_str()].iter().enumerate() {
                                    if j > 0 && !adjacent(actual_prev, actual) {
                                        text.push(' ');
                                    }
                                    text.push_str(self.text_of(actual));
                                    actual_prev = Some((actual.span.file, actual.span.end));
                                }
                            }
                            _ => text.push_str(self.text_of(part)),
                        }
                        i += 1;
                    }
                    let span = self.synth_token_file(&format!("\"{text}\""));
                    let mut tok = Token::new(TokenKind::StringLiteral, span);
                    tok.value = Some(TokenValue::Str(text));
                    tok.from_macro = true;
                    result.push(tok);
                }
                TokenKind::MacroPaste => {
                    // Join the previous and next substituted tokens and relex.
                    let prev = result.pop();
                    let next = def.body.get(i + 1).cloned();
                    i += 1;
                    let mut text = String::new();
                    if let Some(prev) = &prev {
                        text.push_str(self.text_of(prev));
                    }
                    if let Some(next) = &next {
                        let next_text = match next.kind {
                            TokenKind::Identifier | TokenKind::EscapedIdentifier => {
                                let key = next.identifier_text(self.text_of(next)).to_string();
                                match bindings.get(key.as_str()) {
                                    Some(actual) => actual
                                        .iter()
                                        .map(|t| self.text_of(t).to_string())
                                        .collect::<String>(),
                                    None => self.text_of(next).to_string(),
                                }
                            }
                            _ => self.text_of(next).to_string(),
                        };
                        text.push_str(&next_text);
                    }
                    for tok in self.relex(&text) {
                        result.push(tok);
                    }
                }
                TokenKind::MacroEscapedQuote => {
                    // Outside stringification this is just a quote character,
                    // which cannot begin a token on its own; drop it.
                }
                _ => result.push(mark_expanded(tok.clone())),
            }
            i += 1;
        }

        for token in result.into_iter().rev() {
            self.expansion.push_front(token);
        }
    }

    /// Parses the parenthesized actual arguments of a function-like usage.
    ///
    /// Commas at depth 0 separate arguments; parens, brackets, and braces
    /// protect nested commas. Returns `None` (after diagnosing) if the next
    /// token is not an opening paren.
    fn parse_macro_actuals(&mut self, usage: &Token) -> Option<Vec<Vec<Token>>> {
        let open = self.next_raw();
        if open.kind != TokenKind::OpenParen {
            self.sink.emit(Diagnostic::new(
                DiagCode::ExpectedMacroArgs,
                "function-like macro requires an argument list",
                usage.span,
            ));
            // Put the token back for the parser.
            self.expansion.push_front(open);
            return None;
        }
        self.consume_as_trivia(&open);

        let mut actuals: Vec<Vec<Token>> = vec![Vec::new()];
        let mut depth = 0u32;
        loop {
            let token = self.next_raw();
            match token.kind {
                TokenKind::Eof => {
                    self.sink.emit(Diagnostic::new(
                        DiagCode::ExpectedMacroArgs,
                        "unterminated macro argument list",
                        usage.span,
                    ));
                    self.expansion.push_front(token);
                    return None;
                }
                TokenKind::CloseParen if depth == 0 => {
                    self.consume_as_trivia(&token);
                    return Some(actuals);
                }
                TokenKind::Comma if depth == 0 => {
                    self.consume_as_trivia(&token);
                    actuals.push(Vec::new());
                }
                _ => {
                    match token.kind {
                        TokenKind::OpenParen | TokenKind::OpenBracket | TokenKind::OpenBrace => {
                            depth += 1
                        }
                        TokenKind::CloseParen
                        | TokenKind::CloseBracket
                        | TokenKind::CloseBrace => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    self.consume_as_trivia(&token);
                    let mut stripped = token;
                    stripped.trivia.clear();
                    actuals.last_mut().unwrap().push(stripped);
                }
            }
        }
    }

    /// Relexes synthesized text (from token pasting) into fresh tokens.
    fn relex(&mut self, text: &str) -> Vec<Token> {
        let span = self.synth_token_file(text);
        let source: Rc<str> = Rc::from(text);
        let mut lexer = Lexer::new(source, span.file, self.sink);
        let mut tokens = Vec::new();
        loop {
            let mut tok = lexer.next_token(LexerMode::Normal);
            if tok.kind == TokenKind::Eof {
                break;
            }
            tok.trivia.clear();
            tok.from_macro = true;
            tokens.push(tok);
        }
        tokens
    }

    /// Adds a synthetic one-token file to the source database so generated
    /// tokens have real spans for snippets and diagnostics.
    fn synth_token_file(&mut self, text: &str) -> Span {
        let file = self.source_db.add_source("<generated>", text.to_string());
        Span::new(file, 0, text.len() as u32)
    }
}

fn mark_expanded(mut token: Token) -> Token {
    token.trivia.clear();
    token.from_macro = true;
    token
}

/// True if `token` directly abuts the previous token's end position.
fn adjacent(prev: Option<(FileId, u32)>, token: &Token) -> bool {
    match prev {
        Some((file, end)) => token.span.file == file && token.span.start == end,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::round_trip;

    fn preprocess(source: &str) -> (Vec<Token>, Vec<Diagnostic>, String) {
        let mut db = SourceDb::new();
        let file = db.add_source("test.sv", source.to_string());
        let sink = DiagnosticSink::new();
        let pp = Preprocessor::new(&mut db, file, &sink, PreprocessorOptions::default());
        let (tokens, _) = pp.preprocess();
        let rt = round_trip(&tokens, source);
        (tokens, sink.take_all(), rt)
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn object_macro_expands() {
        let source = "`define FOO 42\n`FOO";
        let (tokens, diags, rt) = preprocess(source);
        assert_eq!(kinds(&tokens), vec![TokenKind::IntegerLiteral, TokenKind::Eof]);
        assert_eq!(tokens[0].integer_value(), Some(42));
        assert!(tokens[0].from_macro);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(rt, source);
    }

    #[test]
    fn define_then_plain_tokens() {
        let source = "`define FOO (1)\nmodule";
        let (tokens, diags, rt) = preprocess(source);
        assert_eq!(kinds(&tokens), vec![TokenKind::Module, TokenKind::Eof]);
        // The define line rides along as trivia on `module`.
        assert!(tokens[0]
            .trivia
            .iter()
            .any(|t| t.kind == TriviaKind::Directive));
        assert!(diags.is_empty());
        assert_eq!(rt, source);
    }

    #[test]
    fn unknown_macro_diagnosed() {
        let (_, diags, _) = preprocess("`FOO");
        assert!(diags.iter().any(|d| d.code == DiagCode::UnknownDirective));
    }

    #[test]
    fn function_macro_with_args() {
        let source = "`define ADD(a, b) a + b\n`ADD(1, 2)";
        let (tokens, diags, rt) = preprocess(source);
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::IntegerLiteral,
                TokenKind::Plus,
                TokenKind::IntegerLiteral,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[0].integer_value(), Some(1));
        assert_eq!(tokens[2].integer_value(), Some(2));
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(rt, source);
    }

    #[test]
    fn function_macro_default_argument() {
        let source = "`define W(x = 8) x\nlogic [`W() - 1:0] d;";
        let (tokens, diags, _) = preprocess(source);
        assert!(diags.is_empty(), "{diags:?}");
        assert!(tokens.iter().any(|t| t.integer_value() == Some(8)));
    }

    #[test]
    fn function_macro_missing_args_diagnosed() {
        let (_, diags, _) = preprocess("`define F(x) x\n`F");
        assert!(diags.iter().any(|d| d.code == DiagCode::ExpectedMacroArgs));
    }

    #[test]
    fn nested_commas_protected() {
        let source = "`define PICK(a, b) b\n`PICK({1, 2}, 3)";
        let (tokens, diags, _) = preprocess(source);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(tokens[0].integer_value(), Some(3));
    }

    #[test]
    fn reentrant_expansion() {
        let source = "`define A `B\n`define B 7\n`A";
        let (tokens, diags, _) = preprocess(source);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(tokens[0].integer_value(), Some(7));
    }

    #[test]
    fn stringification() {
        let source = "`define MSG(x) `\"value x`\"\n`MSG(hi)";
        let (tokens, diags, _) = preprocess(source);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].string_value(), Some("value hi"));
    }

    #[test]
    fn token_pasting() {
        let source = "`define CAT(a, b) a``b\n`CAT(foo, bar)";
        let (tokens, diags, _) = preprocess(source);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
    }

    #[test]
    fn undef_removes_macro() {
        let (_, diags, _) = preprocess("`define FOO 1\n`undef FOO\n`FOO");
        assert!(diags.iter().any(|d| d.code == DiagCode::UnknownDirective));
    }

    #[test]
    fn undefineall_removes_everything() {
        let (_, diags, _) = preprocess("`define A 1\n`define B 2\n`undefineall\n`A");
        assert!(diags.iter().any(|d| d.code == DiagCode::UnknownDirective));
    }

    #[test]
    fn ifdef_taken_branch() {
        let source = "`define FOO\n`ifdef FOO\nmodule\n`else\npackage\n`endif";
        let (tokens, diags, rt) = preprocess(source);
        assert_eq!(kinds(&tokens), vec![TokenKind::Module, TokenKind::Eof]);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(rt, source);
    }

    #[test]
    fn ifndef_and_else() {
        let source = "`ifndef FOO\nmodule\n`else\npackage\n`endif";
        let (tokens, _, rt) = preprocess(source);
        assert_eq!(kinds(&tokens), vec![TokenKind::Module, TokenKind::Eof]);
        assert_eq!(rt, source);
    }

    #[test]
    fn elsif_chain() {
        let source = "`define B\n`ifdef A\n1\n`elsif B\n2\n`elsif C\n3\n`else\n4\n`endif";
        let (tokens, diags, rt) = preprocess(source);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(tokens[0].integer_value(), Some(2));
        assert_eq!(tokens.len(), 2);
        assert_eq!(rt, source);
    }

    #[test]
    fn nested_conditionals() {
        let source = "`define A\n`ifdef A\n`ifdef B\n1\n`else\n2\n`endif\n`endif";
        let (tokens, diags, rt) = preprocess(source);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(tokens[0].integer_value(), Some(2));
        assert_eq!(rt, source);
    }

    #[test]
    fn disabled_text_is_preserved_as_trivia() {
        let source = "`ifdef MISSING\nskipped tokens here\n`endif\nmodule";
        let (tokens, _, rt) = preprocess(source);
        assert_eq!(tokens[0].kind, TokenKind::Module);
        assert!(tokens[0]
            .trivia
            .iter()
            .any(|t| t.kind == TriviaKind::DisabledText));
        assert_eq!(rt, source);
    }

    #[test]
    fn unbalanced_endif() {
        let (_, diags, _) = preprocess("`endif");
        assert!(diags
            .iter()
            .any(|d| d.code == DiagCode::UnbalancedConditional));
    }

    #[test]
    fn unclosed_ifdef_diagnosed_at_eof() {
        let (_, diags, _) = preprocess("`ifdef FOO\nmodule");
        assert!(diags
            .iter()
            .any(|d| d.code == DiagCode::UnbalancedConditional));
    }

    #[test]
    fn include_missing_file() {
        let (tokens, diags, _) = preprocess("`include \"nonexistent.svh\"\nmodule");
        assert!(diags
            .iter()
            .any(|d| d.code == DiagCode::CouldNotOpenIncludeFile));
        assert_eq!(tokens[0].kind, TokenKind::Module);
    }

    #[test]
    fn include_real_file() {
        let dir = std::env::temp_dir().join("sable_preproc_inc");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("width.svh"), "`define WIDTH 16\n").unwrap();

        let mut db = SourceDb::new();
        db.add_user_dir(&dir);
        let file = db.add_source("main.sv", "`include \"width.svh\"\n`WIDTH".to_string());
        let sink = DiagnosticSink::new();
        let pp = Preprocessor::new(&mut db, file, &sink, PreprocessorOptions::default());
        let (tokens, _) = pp.preprocess();

        assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
        assert_eq!(tokens[0].integer_value(), Some(16));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn default_nettype_tracking() {
        let mut db = SourceDb::new();
        let file = db.add_source("t.sv", "`default_nettype none\nmodule".to_string());
        let sink = DiagnosticSink::new();
        let pp = Preprocessor::new(&mut db, file, &sink, PreprocessorOptions::default());
        let (_, nettype) = pp.preprocess();
        assert_eq!(nettype, DefaultNetType::None);
    }

    #[test]
    fn resetall_restores_wire() {
        let mut db = SourceDb::new();
        let file = db.add_source(
            "t.sv",
            "`default_nettype none\n`resetall\nmodule".to_string(),
        );
        let sink = DiagnosticSink::new();
        let pp = Preprocessor::new(&mut db, file, &sink, PreprocessorOptions::default());
        let (_, nettype) = pp.preprocess();
        assert_eq!(nettype, DefaultNetType::Wire);
    }

    #[test]
    fn predefines_from_command_line() {
        let mut db = SourceDb::new();
        let file = db.add_source("t.sv", "`WIDTH".to_string());
        let sink = DiagnosticSink::new();
        let options = PreprocessorOptions {
            predefines: vec![("WIDTH".to_string(), "32".to_string())],
            ..Default::default()
        };
        let pp = Preprocessor::new(&mut db, file, &sink, options);
        let (tokens, _) = pp.preprocess();
        assert_eq!(tokens[0].integer_value(), Some(32));
    }

    #[test]
    fn line_and_timescale_consumed() {
        let source = "`timescale 1ns/1ps\n`line 5 \"foo.sv\" 0\nmodule";
        let (tokens, diags, rt) = preprocess(source);
        assert_eq!(tokens[0].kind, TokenKind::Module);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(rt, source);
    }

    #[test]
    fn file_and_line_macros() {
        let source = "`__FILE__ `__LINE__";
        let (tokens, diags, _) = preprocess(source);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].string_value(), Some("test.sv"));
        assert_eq!(tokens[1].kind, TokenKind::IntegerLiteral);
        assert_eq!(tokens[1].integer_value(), Some(1));
    }

    #[test]
    fn macro_line_continuation() {
        let source = "`define LONG 1 + \\\n 2\n`LONG";
        let (tokens, diags, rt) = preprocess(source);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::IntegerLiteral,
                TokenKind::Plus,
                TokenKind::IntegerLiteral,
                TokenKind::Eof,
            ]
        );
        assert_eq!(rt, source);
    }

    #[test]
    fn round_trip_with_macro_usage_in_expression() {
        let source = "`define N 4\nlogic [`N-1:0] x;";
        let (tokens, diags, rt) = preprocess(source);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(rt, source);
        // The expanded token is present but contributes no bytes.
        assert!(tokens.iter().any(|t| t.from_macro));
    }
}
