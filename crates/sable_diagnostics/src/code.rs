//! Stable, named diagnostic codes grouped by compilation stage.

use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
///
/// Each category maps to a single-character prefix used in diagnostic code
/// display (e.g., `L005` for a lexical diagnostic, `E009` for an
/// elaboration diagnostic).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Lexical diagnostics, prefixed with `L`.
    Lexical,
    /// Preprocessor diagnostics, prefixed with `P`.
    Preprocessor,
    /// Parser diagnostics, prefixed with `S`.
    Parser,
    /// Name lookup diagnostics, prefixed with `N`.
    Lookup,
    /// Elaboration diagnostics, prefixed with `E`.
    Elaboration,
    /// Type and expression diagnostics, prefixed with `X`.
    Expressions,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Lexical => 'L',
            Category::Preprocessor => 'P',
            Category::Parser => 'S',
            Category::Lookup => 'N',
            Category::Elaboration => 'E',
            Category::Expressions => 'X',
        }
    }
}

/// A stable diagnostic code.
///
/// Every diagnostic the front-end can emit is identified by one of these
/// names. The name never changes once released; tools may match on it.
/// Display renders the category prefix followed by a zero-padded 3-digit
/// number (e.g. `L001`, `E009`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum DiagCode {
    // === Lexical ===
    /// A non-printable character appeared outside a string or comment.
    NonPrintableChar,
    /// A UTF-8 sequence appeared outside a string or comment.
    Utf8Char,
    /// An embedded NUL byte in source text.
    EmbeddedNull,
    /// A Unicode byte-order mark at the start of a file.
    UnicodeBom,
    /// A block comment was still open at end of file.
    UnterminatedBlockComment,
    /// A `/*` appeared inside a block comment.
    NestedBlockComment,
    /// An escaped identifier with no characters before the next whitespace.
    EscapedWhitespace,
    /// A string literal was terminated by a newline or end of file.
    ExpectedClosingQuote,
    /// An octal string escape evaluated to 0x100 or greater.
    OctalEscapeCodeTooBig,
    /// `\x` in a string was not followed by a hex digit.
    InvalidHexEscapeCode,
    /// An unrecognized character followed `\` in a string.
    UnknownEscapeCode,
    /// A real literal had a `.` with no digits after it.
    MissingFractionalDigits,
    /// A backtick that does not begin a directive.
    MisplacedDirectiveChar,

    // === Preprocessor ===
    /// A `` `name `` that is neither a known directive nor a defined macro.
    UnknownDirective,
    /// An included file could not be found or read.
    CouldNotOpenIncludeFile,
    /// A function-like macro was used without an argument list, or with the
    /// wrong number of arguments.
    ExpectedMacroArgs,
    /// An `` `elsif ``/`` `else ``/`` `endif `` with no matching `` `ifdef ``,
    /// or a conditional still open at end of file.
    UnbalancedConditional,
    /// The `` `include `` nesting limit was exceeded.
    ExceededMaxIncludeDepth,
    /// An `` `include `` directive without a quoted or bracketed file name.
    ExpectedIncludeFileName,

    // === Parser ===
    /// A specific token was required but something else was found.
    ExpectedToken,
    /// A token could not start or continue the current construct and was skipped.
    UnexpectedToken,
    /// An identifier was required.
    ExpectedIdentifier,
    /// An expression was required.
    ExpectedExpression,

    // === Lookup ===
    /// A name did not resolve in any visible scope.
    UndeclaredIdentifier,
    /// A member name did not resolve inside the named scope.
    UnknownMember,
    /// An instantiation referenced a definition that does not exist.
    UnknownModule,
    /// A name used as a modport selector resolved to something else.
    NotAModport,
    /// A name was referenced before its declaration in the same scope.
    UsedBeforeDeclared,
    /// A hierarchical name appeared in a constant expression.
    HierarchicalReferenceInConstant,

    // === Elaboration ===
    /// A named parameter assignment did not match any declared parameter.
    ParameterDoesNotExist,
    /// The same parameter was assigned twice in one instantiation.
    DuplicateParamAssignment,
    /// Ordered and named parameter assignments were mixed in one instantiation.
    MixingOrderedAndNamedParams,
    /// A named assignment targeted a localparam in the parameter port list.
    AssignedToLocalPortParam,
    /// A named assignment targeted a localparam in the definition body.
    AssignedToLocalBodyParam,
    /// A parameter with no default was not supplied a value.
    ParamHasNoValue,
    /// More ordered parameter assignments than declared parameters.
    TooManyParamAssignments,
    /// A type parameter was assigned something that is not a type.
    BadTypeParamExpr,
    /// The instance hierarchy exceeded the configured depth limit.
    MaxInstanceDepthExceeded,
    /// A declaration's resolution depends on itself.
    RecursiveResolution,
    /// Two enum members evaluated to the same value.
    DuplicateEnumValue,
    /// Two definitions or members with the same name in one scope.
    DuplicateDefinition,
    /// A forward typedef's category does not match the resolved type.
    ForwardTypedefDoesNotMatch,
    /// No uninstantiated module remained to serve as a hierarchy root.
    NoTopModules,

    // === Type / expression ===
    /// An expression cannot be assigned to the target type.
    BadAssignment,
    /// A non-constant expression appeared in a constant context.
    NotConstant,
    /// Constant division or modulo by zero.
    DivideByZero,
    /// A format specifier does not accept the supplied argument's type.
    FormatMismatchedType,
    /// A format specifier had no corresponding argument.
    FormatNoArgument,
    /// More arguments than format specifiers.
    FormatTooManyArgs,
    /// A system subroutine argument of an unsupported kind.
    BadSystemSubroutineArg,
    /// Too few arguments in a subroutine call.
    TooFewArguments,
    /// Too many arguments in a subroutine call.
    TooManyArguments,
    /// A constant bit or part select lies outside the declared range.
    IndexOutOfRange,
    /// An unknown system function or task name.
    UnknownSystemName,
}

impl DiagCode {
    /// Returns the category this code belongs to.
    pub fn category(self) -> Category {
        use DiagCode::*;
        match self {
            NonPrintableChar | Utf8Char | EmbeddedNull | UnicodeBom | UnterminatedBlockComment
            | NestedBlockComment | EscapedWhitespace | ExpectedClosingQuote
            | OctalEscapeCodeTooBig | InvalidHexEscapeCode | UnknownEscapeCode
            | MissingFractionalDigits | MisplacedDirectiveChar => Category::Lexical,

            UnknownDirective | CouldNotOpenIncludeFile | ExpectedMacroArgs
            | UnbalancedConditional | ExceededMaxIncludeDepth | ExpectedIncludeFileName => {
                Category::Preprocessor
            }

            ExpectedToken | UnexpectedToken | ExpectedIdentifier | ExpectedExpression => {
                Category::Parser
            }

            UndeclaredIdentifier | UnknownMember | UnknownModule | NotAModport
            | UsedBeforeDeclared | HierarchicalReferenceInConstant => Category::Lookup,

            ParameterDoesNotExist | DuplicateParamAssignment | MixingOrderedAndNamedParams
            | AssignedToLocalPortParam | AssignedToLocalBodyParam | ParamHasNoValue
            | TooManyParamAssignments | BadTypeParamExpr | MaxInstanceDepthExceeded
            | RecursiveResolution | DuplicateEnumValue | DuplicateDefinition
            | ForwardTypedefDoesNotMatch | NoTopModules => Category::Elaboration,

            BadAssignment | NotConstant | DivideByZero | FormatMismatchedType
            | FormatNoArgument | FormatTooManyArgs | BadSystemSubroutineArg | TooFewArguments
            | TooManyArguments | IndexOutOfRange | UnknownSystemName => Category::Expressions,
        }
    }

    /// Returns the numeric identifier of this code within its category.
    pub fn number(self) -> u16 {
        use DiagCode::*;
        match self {
            NonPrintableChar => 1,
            Utf8Char => 2,
            EmbeddedNull => 3,
            UnicodeBom => 4,
            UnterminatedBlockComment => 5,
            NestedBlockComment => 6,
            EscapedWhitespace => 7,
            ExpectedClosingQuote => 8,
            OctalEscapeCodeTooBig => 9,
            InvalidHexEscapeCode => 10,
            UnknownEscapeCode => 11,
            MissingFractionalDigits => 12,
            MisplacedDirectiveChar => 13,

            UnknownDirective => 1,
            CouldNotOpenIncludeFile => 2,
            ExpectedMacroArgs => 3,
            UnbalancedConditional => 4,
            ExceededMaxIncludeDepth => 5,
            ExpectedIncludeFileName => 6,

            ExpectedToken => 1,
            UnexpectedToken => 2,
            ExpectedIdentifier => 3,
            ExpectedExpression => 4,

            UndeclaredIdentifier => 1,
            UnknownMember => 2,
            UnknownModule => 3,
            NotAModport => 4,
            UsedBeforeDeclared => 5,
            HierarchicalReferenceInConstant => 6,

            ParameterDoesNotExist => 1,
            DuplicateParamAssignment => 2,
            MixingOrderedAndNamedParams => 3,
            AssignedToLocalPortParam => 4,
            AssignedToLocalBodyParam => 5,
            ParamHasNoValue => 6,
            TooManyParamAssignments => 7,
            BadTypeParamExpr => 8,
            MaxInstanceDepthExceeded => 9,
            RecursiveResolution => 10,
            DuplicateEnumValue => 11,
            DuplicateDefinition => 12,
            ForwardTypedefDoesNotMatch => 13,
            NoTopModules => 14,

            BadAssignment => 1,
            NotConstant => 2,
            DivideByZero => 3,
            FormatMismatchedType => 4,
            FormatNoArgument => 5,
            FormatTooManyArgs => 6,
            BadSystemSubroutineArg => 7,
            TooFewArguments => 8,
            TooManyArguments => 9,
            IndexOutOfRange => 10,
            UnknownSystemName => 11,
        }
    }

    /// Returns the severity this code carries unless overridden.
    pub fn default_severity(self) -> Severity {
        use DiagCode::*;
        match self {
            UnicodeBom | DivideByZero | IndexOutOfRange | NoTopModules | DuplicateEnumValue => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category().prefix(), self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_prefixes() {
        assert_eq!(Category::Lexical.prefix(), 'L');
        assert_eq!(Category::Preprocessor.prefix(), 'P');
        assert_eq!(Category::Parser.prefix(), 'S');
        assert_eq!(Category::Lookup.prefix(), 'N');
        assert_eq!(Category::Elaboration.prefix(), 'E');
        assert_eq!(Category::Expressions.prefix(), 'X');
    }

    #[test]
    fn display_format() {
        assert_eq!(format!("{}", DiagCode::NonPrintableChar), "L001");
        assert_eq!(format!("{}", DiagCode::UnknownDirective), "P001");
        assert_eq!(format!("{}", DiagCode::MaxInstanceDepthExceeded), "E009");
        assert_eq!(format!("{}", DiagCode::DivideByZero), "X003");
    }

    #[test]
    fn default_severities() {
        assert_eq!(
            DiagCode::ExpectedToken.default_severity(),
            Severity::Error
        );
        assert_eq!(DiagCode::DivideByZero.default_severity(), Severity::Warning);
        assert_eq!(DiagCode::UnicodeBom.default_severity(), Severity::Warning);
        assert_eq!(
            DiagCode::DuplicateEnumValue.default_severity(),
            Severity::Warning
        );
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagCode::RecursiveResolution;
        let json = serde_json::to_string(&code).unwrap();
        let back: DiagCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }
}
