//! Standard bindings
//!
//! Everything a program can reference without declaring it first: the special
//! forms, the operators and the functions of the Lua runtime shim. The table is
//! loaded into the root scope of every compilation and is the only privileged
//! state the compiler starts with.
use crate::{
    primitives::Operator,
    symbols::{Binding, Kind, Scope},
};

/// Special forms
///
/// Macros receive their arguments unevaluated and decide on their own how and
/// when to lower each of them.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Macro {
    Def { pure: bool },
    Defn { pure: bool, private: bool },
    Declare,
    Let,
    If,
    When,
    Do,
    For,
    Fn,
    Try,
    Catch,
    ThreeDots,
    Import,
    Module,
    ThreadFirst,
    ThreadLast,
    ThreadParallel,
    ThreadParallelLast,
    Not,
    Operator(Operator),
}

impl Macro {
    /// Definitions are statements and produce no value when used as the last
    /// form of a body
    pub fn is_definition(self) -> bool {
        matches!(
            self,
            Macro::Def { .. } | Macro::Defn { .. } | Macro::Declare | Macro::Import | Macro::Module
        )
    }
}

/// One entry of the standard binding table
pub struct Def {
    pub surface: &'static str,
    pub name: &'static str,
    pub kind: Kind,
    pub fallback: Option<&'static str>,
}

impl Def {
    const fn mac(surface: &'static str, name: &'static str, m: Macro) -> Def {
        Def { surface, name, kind: Kind::Macro(m), fallback: None }
    }

    const fn op(surface: &'static str, name: &'static str, m: Macro, fallback: &'static str) -> Def {
        Def { surface, name, kind: Kind::Macro(m), fallback: Some(fallback) }
    }

    const fn func(surface: &'static str, name: &'static str) -> Def {
        Def { surface, name, kind: Kind::Func, fallback: None }
    }

    const fn impure(surface: &'static str, name: &'static str) -> Def {
        Def { surface, name, kind: Kind::ImpureFunc, fallback: None }
    }

    const fn value(surface: &'static str, name: &'static str) -> Def {
        Def { surface, name, kind: Kind::Local, fallback: None }
    }

    pub fn binding(&self) -> Binding {
        Binding {
            name: self.name.to_string(),
            original: self.surface.to_string(),
            kind: self.kind,
            scope: Scope::Local,
            fallback: self.fallback,
        }
    }
}

pub const STDLIB: &[Def] = &[
    // Definitions
    Def::mac("def", "#def", Macro::Def { pure: true }),
    Def::mac("def!", "#def!", Macro::Def { pure: false }),
    Def::mac("defn", "#defn", Macro::Defn { pure: true, private: false }),
    Def::mac("defn!", "#defn!", Macro::Defn { pure: false, private: false }),
    Def::mac("defn-", "#defn-", Macro::Defn { pure: true, private: true }),
    Def::mac("defn-!", "#defn-!", Macro::Defn { pure: false, private: true }),
    Def::mac("declare", "#declare", Macro::Declare),
    Def::mac("import", "#import", Macro::Import),
    Def::mac("module", "#module", Macro::Module),
    // Control flow
    Def::mac("let", "#let", Macro::Let),
    Def::mac("if", "#if", Macro::If),
    Def::mac("when", "#when", Macro::When),
    Def::mac("do", "#do", Macro::Do),
    Def::mac("for", "#for", Macro::For),
    Def::mac("fn", "#fn", Macro::Fn),
    Def::mac("try", "#try", Macro::Try),
    Def::mac("catch", "#catch", Macro::Catch),
    Def::mac("...", "#three-dots", Macro::ThreeDots),
    // Threading
    Def::mac("->", "#thread-first", Macro::ThreadFirst),
    Def::mac("<-", "#thread-last", Macro::ThreadLast),
    Def::mac("-<", "#thread-parallel", Macro::ThreadParallel),
    Def::mac("->>", "#thread-parallel-last", Macro::ThreadParallelLast),
    // Operators
    Def::op("+", "#plus", Macro::Operator(Operator::Plus), "charon.plus"),
    Def::op("-", "#minus", Macro::Operator(Operator::Minus), "charon.minus"),
    Def::op("/", "#div", Macro::Operator(Operator::Div), "charon.div"),
    Def::op("*", "#mul", Macro::Operator(Operator::Mul), "charon.mul"),
    Def::op("^", "#pow", Macro::Operator(Operator::Pow), "charon.pow"),
    Def::op("=", "#eq", Macro::Operator(Operator::Eq), "charon.eq"),
    Def::op("<>", "#neq", Macro::Operator(Operator::Neq), "charon.neq"),
    Def::op(">", "#gt", Macro::Operator(Operator::Gt), "charon.gt"),
    Def::op("<", "#lt", Macro::Operator(Operator::Lt), "charon.lt"),
    Def::op(">=", "#gteq", Macro::Operator(Operator::GtEq), "charon.gteq"),
    Def::op("<=", "#lteq", Macro::Operator(Operator::LtEq), "charon.lteq"),
    Def::op("and", "#and", Macro::Operator(Operator::And), "charon._and"),
    Def::op("or", "#or", Macro::Operator(Operator::Or), "charon._or"),
    Def::op("not", "#not", Macro::Not, "charon._not"),
    Def::op("nand", "#nand", Macro::Operator(Operator::Nand), "charon.nand"),
    Def::op("nor", "#nor", Macro::Operator(Operator::Nor), "charon.nor"),
    Def::op("xor", "#xor", Macro::Operator(Operator::Xor), "charon.xor"),
    // Values
    Def::value("unit", "charon.Unit"),
    Def::value("true", "charon.True"),
    Def::value("false", "charon.False"),
    // Runtime
    Def::func("throw", "error"),
    Def::func("str", "charon.str"),
    Def::func("range", "charon.range"),
    Def::func("some?", "charon.some"),
    Def::func("or?", "charon.or_coalesce"),
    Def::func(">>=", "charon.compose"),
    Def::func("vector/map", "charon.vector_map"),
    Def::func("vector/each", "charon.vector_each"),
    Def::func("vector/get", "charon.vector_get"),
    Def::func("vector/filter", "charon.vector_filter"),
    Def::func("vector/merge", "charon.vector_merge"),
    Def::func("vector/add", "charon.vector_add"),
    Def::func("vector/drop", "charon.vector_drop"),
    Def::func("vector/drop-left", "charon.vector_drop_left"),
    Def::func("vector/len", "charon.vector_len"),
    Def::func("list/get", "charon.list_get"),
    Def::func("table/get", "charon.table_get"),
    Def::func("table/get?", "charon.table_get_or"),
    Def::func("table/remove", "charon.table_remove"),
    Def::func("table/merge", "charon.table_merge"),
    Def::func("object/new", "charon.object_new"),
    Def::func("object/new-raw", "charon.object_new_raw"),
    Def::impure("object/get", "charon.object_get"),
    Def::impure("object/set", "charon.object_set"),
    Def::func("atom", "charon.atom"),
    Def::impure("atom/reset!", "charon.atom_set"),
    Def::impure("atom/apply!", "charon.atom_apply"),
    Def::impure("atom/get", "charon.atom_get"),
    Def::func("opaque-call", "charon.opaque_call"),
    Def::func("call", "charon.call"),
    Def::impure("println!", "charon.println"),
    Def::impure("print!", "charon.print"),
    Def::impure("file/open", "charon.file_open"),
    Def::impure("file/close", "charon.file_close"),
    Def::impure("file/write", "charon.file_write"),
    Def::impure("file/read", "charon.file_read"),
    // Lua platform functions known to be pure
    Def::func("string/byte", "string.byte"),
    Def::func("string/char", "string.char"),
    Def::func("string/dump", "string.dump"),
    Def::func("string/find", "string.find"),
    Def::func("string/format", "string.format"),
    Def::func("string/gmatch", "string.gmatch"),
    Def::func("string/gsub", "string.gsub"),
    Def::func("string/len", "string.len"),
    Def::func("string/lower", "string.lower"),
    Def::func("string/match", "string.match"),
    Def::func("string/rep", "string.rep"),
    Def::func("string/reverse", "string.reverse"),
    Def::func("string/sub", "string.sub"),
    Def::func("string/upper", "string.upper"),
    Def::func("math/abs", "math.abs"),
    Def::func("math/ceil", "math.ceil"),
    Def::func("math/floor", "math.floor"),
    Def::func("math/max", "math.max"),
    Def::func("math/min", "math.min"),
    Def::func("math/sqrt", "math.sqrt"),
    Def::impure("math/random", "math.random"),
];
