extern crate charon;
extern crate pretty_assertions;
extern crate quickcheck;
extern crate quickcheck_macros;
extern crate rand;

use charon::{cli, compile, core::*, runtime, symbols::mangle};
use quickcheck_macros::quickcheck;
use rand::random;
use std::{fs, process::Command};

const TEST_FOLDER: &str = "/tmp/charon";

const HEADER: &str = "local charon = require 'charon-runtime';\nlocal __local_package = {};\n";
const FOOTER: &str = "\nreturn __local_package;\n";

// Names and scopes
mod names {
    use super::*;
    use pretty_assertions::assert_eq;

    #[quickcheck]
    fn deterministic(name: String) -> bool {
        mangle(&name) == mangle(&name)
    }

    #[quickcheck]
    fn shape(name: String) -> bool {
        let m = mangle(&name);
        m.len() == 14 && m.starts_with("__val_") && m[6..].chars().all(|c| c.is_ascii_hexdigit())
    }

    #[test]
    fn redeclare() {
        let e = compile("(def x 1) (def x 2)", "test.charon", &Options::module()).unwrap_err();
        assert!(matches!(e.cause(), Error::Type { .. }));
    }

    #[test]
    fn undefined() {
        let e = compile("(println! y)", "test.charon", &Options::module()).unwrap_err();
        match e.cause() {
            Error::Reference { name, .. } => assert_eq!(name, "y"),
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn siblings() {
        // Bindings of a let never leak into the next one
        let e = compile("(def a (let [x 1] x)) (def b (let [y 2] x))", "test.charon", &Options::module()).unwrap_err();
        assert!(matches!(e.cause(), Error::Reference { .. }));
    }
}

// Purity
mod purity {
    use super::*;

    #[test]
    fn impure_call() {
        let e = compile(r#"(defn f [] (println! "hi"))"#, "test.charon", &Options::module()).unwrap_err();
        assert!(matches!(e.cause(), Error::Purity { .. }));

        assert!(compile(r#"(defn! f [] (println! "hi"))"#, "test.charon", &Options::module()).is_ok());
    }

    #[test]
    fn nested_definition() {
        let e = compile("(defn f [] (def x 1))", "test.charon", &Options::module()).unwrap_err();
        assert!(matches!(e.cause(), Error::Purity { .. }));
    }

    #[test]
    fn externs() {
        let pure = "(declare fmt :pure) (defn f [x] (fmt x))";
        let impure = "(declare log :impure) (defn f [x] (log x))";

        let out = compile(pure, "test.charon", &Options::module()).unwrap();
        assert!(out.contains(&format!("return fmt({});", mangle("x"))));

        let e = compile(impure, "test.charon", &Options::module()).unwrap_err();
        assert!(matches!(e.cause(), Error::Purity { .. }));
    }
}

// Operators and syntax rewrites
mod operators {
    use super::*;

    #[test]
    fn comparisons() {
        test_many(&[
            ("(< 1 2 3)", "(1<2 and 1<3 and 2<3);"),
            ("(= 1 1)", "(1==1);"),
            ("(+ 1 2 3)", "(1+2+3);"),
            ("(nand true false)", "(not (charon.True and charon.False));"),
        ]);
    }

    #[test]
    fn xor() {
        test1("(xor 1 2)", "(((not 1) and 2) or (1 and (not 2)));");
    }

    #[test]
    fn threading() {
        test_many(&[
            ("(-> 1 (+ 2) (* 3))", "((1+2)*3);"),
            ("(<- 1 (+ 2) (* 3))", "(3*(2+1));"),
            ("(-< 1 (+ 2) (* 3))", "charon.list{ (1+2),(1*3) };"),
            ("(->> 1 (+ 2) (* 3))", "charon.list{ (2+1),(3*1) };"),
        ]);
    }

    #[test]
    fn negative_operands() {
        test1("(- 5 -1)", "(5-(-1));");
    }

    #[test]
    fn arity() {
        let e = compile("(+ 1)", "test.charon", &Options::module()).unwrap_err();
        assert!(matches!(e.cause(), Error::Syntax { .. }));
    }
}

// Loops and bindings
mod forms {
    use super::*;

    #[test]
    fn loops() {
        let (i, k) = (mangle("i"), mangle("k"));

        test_many(&[
            (
                "(for [i (range 1 10)] (println! i))",
                &format!("(function() for {i}=1, 10 do charon.println({i}) end end)();", i = i),
            ),
            (
                "(for [i [1 2]] (println! i))",
                &format!("(function() for _, {i} in pairs(charon.list{{ 1,2 }}) do charon.println({i}) end end)();", i = i),
            ),
            (
                "(for [i k {1 2}] (println! k i))",
                &format!(
                    "(function() for {k}, {i} in pairs(charon.table{{ [1] = 2 }}) do charon.println({k},{i}) end end)();",
                    i = i,
                    k = k
                ),
            ),
        ]);
    }

    #[test]
    fn lets() {
        let x = mangle("x");
        test1("(let [x 1] x)", &format!("(function() local {x} = 1; return {x}; end)();", x = x));
    }

    #[test]
    fn functions() {
        let (a, b) = (mangle("a"), mangle("b"));

        test1(
            "(def add [a b] (+ a b)) (add 1 2)",
            &format!(
                "__local_package[\"add\"] = (function() local __self_ref__; __self_ref__ = function({a}, {b}) return ({a}+{b}); end; return __self_ref__; end)();\n__local_package[\"add\"](1,2);",
                a = a,
                b = b
            ),
        );
    }

    #[test]
    fn values() {
        test1("(def pi 3.14)", "__local_package[\"pi\"] = 3.14;");
        test1(r#"(def s "a;;b")"#, r#"__local_package["s"] = "a;;b";"#);
    }
}

// Output shapes
mod output {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn global_export() {
        let options = Options { global_export: true, ..Options::module() };

        let out = compile("(def x 1)", "app.charon", &options).unwrap();
        assert_eq!(
            out,
            "local charon = require 'charon-runtime';\n_G[\"app\"] = {};\n_G[\"app\"][\"x\"] = 1;\n-- End module _G[\"app\"]"
        );

        let out = compile("(module lib) (def x 1)", "app.charon", &options).unwrap();
        assert!(out.contains("_G[\"lib\"] = {};"));
        assert!(out.ends_with("-- End module _G[\"lib\"]"));
    }

    #[test]
    fn embedded_runtime() {
        let options = Options { embed_runtime: true, ..Options::module() };
        let out = compile("(def x 1)", "app.charon", &options).unwrap();

        assert!(out.starts_with("local charon = {};\ndo\n  -- local charon = {};"));
        assert!(!out.contains("require 'charon-runtime'"));
        assert!(out.ends_with(FOOTER));
    }

    #[test]
    fn no_runtime() {
        let options = Options { no_runtime_require: true, ..Options::module() };
        let out = compile("(def x 1)", "app.charon", &options).unwrap();

        assert_eq!(out, "\nlocal __local_package = {};\n__local_package[\"x\"] = 1;\nreturn __local_package;\n");
    }

    #[test]
    fn diagnostics() {
        let e = compile("(def x 1)\n(println! y)", "app.charon", &Options::module()).unwrap_err();
        let report = e.to_string();

        assert!(report.contains("app.charon"));
        assert!(report.contains("(println! y)"));
    }
}

// Files on disk
mod files {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn compile_file() {
        let base_folder = format!("{}/{:x?}", TEST_FOLDER, random::<u32>());
        fs::create_dir_all(&base_folder).unwrap_or_else(|e| panic!("Failed to create test folder {}", e));

        let src = format!("{}/test.charon", base_folder);
        fs::write(&src, "(def x 1)").unwrap();

        let out = cli::compile_file(&src, None, &Options::module()).unwrap();
        assert_eq!(out, format!("{}/test.lua", base_folder));

        let code = fs::read_to_string(&out).unwrap();
        assert!(code.starts_with(HEADER));

        let dest = format!("{}/renamed.lua", base_folder);
        assert_eq!(cli::compile_file(&src, Some(&dest), &Options::module()).unwrap(), dest);
        assert!(fs::metadata(&dest).is_ok());

        fs::remove_dir_all(base_folder).unwrap();
    }

    #[test]
    fn missing() {
        let e = cli::compile_file("/does/not/exist.charon", None, &Options::module()).unwrap_err();
        assert!(matches!(e, Error::Io { .. }));
    }
}

// Generated code running on the lua interpreter
mod run {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn functions() {
        run1("(def add [a b] (+ a b)) (println! (add 1 2))", "3");
        run1("(defn fact [n] (if (< n 2) 1 (* n (fact (- n 1))))) (println! (fact 5))", "120");
    }

    #[test]
    fn operators() {
        run_many(&[
            ("(println! (- 5 -1))", "6"),
            ("(println! (= (^ 2 3 2) 64))", "true"),
            ("(println! (< 1 2 3))", "true"),
            ("(println! (xor true false))", "true"),
            (r#"(println! "a;;b")"#, "a;;b"),
        ]);
    }

    #[test]
    fn destructuring() {
        run1("(let [[a b] [1 2]] (println! (+ a b)))", "3");
        run1("(let [v [[1 2] 3] [[a b] c] v] (println! a b c))", "123");
    }

    #[test]
    fn loops() {
        run1("(for [i (range 1 3)] (println! i))", "1\n2\n3");
        run1("(let [acc (atom 0)] (for [x [10 20]] (atom/apply! acc + x)) (println! (atom/get acc)))", "30");
    }

    #[test]
    fn patterns() {
        run1(r#"(println! (when 5 [1] "list" _ "other"))"#, "other");
        run1(r#"(println! (when [1 2] [_ 2] "ends in two" _ "other"))"#, "ends in two");
    }

    #[test]
    fn errors() {
        run1(r#"(println! (try (throw "boom" 0) (catch [e] (str "caught " e))))"#, "caught boom");
        run1("(println! (try (+ 1 2) (catch [e] 0)))", "3");
    }

    #[test]
    fn embedded() {
        let options = Options { embed_runtime: true, ..Options::module() };
        if let Some(out) = execute("(println! (vector/map + [1 2]))", &options, false) {
            assert_eq!(out, "[1 2]");
        }
    }
}

fn test_many(tests: &[(&str, &str)]) {
    for (inp, out) in tests.iter() {
        test1(inp, out);
    }
}

// Compile a program and assert on everything between the preamble and the footer
fn test1(input: &str, output: &str) {
    let code = compile(input, "test.charon", &Options::module())
        .unwrap_or_else(|e| panic!("Failed to compile {}: {}", input, e));

    let body = code
        .strip_prefix(HEADER)
        .and_then(|c| c.strip_suffix(FOOTER))
        .unwrap_or_else(|| panic!("Unexpected preamble or footer in {}", code));

    assert_eq!(body, output, "Failed: {}", input);
}

fn run_many(tests: &[(&str, &str)]) {
    for (inp, out) in tests.iter() {
        run1(inp, out);
    }
}

// Compile, run and compare the trimmed stdout
fn run1(input: &str, output: &str) {
    if let Some(out) = execute(input, &Options::module(), true) {
        assert_eq!(out, output, "Failed: {} != {}", input, output);
    }
}

// Run a program in a fresh folder, `None` when there is no lua interpreter
fn execute(input: &str, options: &Options, shim: bool) -> Option<String> {
    if Command::new("lua").arg("-v").output().is_err() {
        eprintln!("lua not found, skipping `{}`", input);
        return None;
    }

    let base_folder = format!("{}/{:x?}", TEST_FOLDER, random::<u32>());
    fs::create_dir_all(&base_folder).unwrap_or_else(|e| panic!("Failed to create test folder {}", e));

    if shim {
        fs::write(format!("{}/charon-runtime.lua", base_folder), runtime::SOURCE).unwrap();
    }

    let config = Config {
        source: format!("{}/test.charon", base_folder),
        program: input.to_string(),
        output: format!("{}/test.lua", base_folder),
        options: options.clone(),
    };

    let result = cli::run(&config, cli::Action::Run);
    fs::remove_dir_all(&base_folder).unwrap();

    match result {
        Ok(Some(out)) => Some(out),
        Ok(None) => panic!("No output from {}", input),
        Err(e) => panic!("Failed to run {}: {}", input, e),
    }
}
