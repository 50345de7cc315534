//! Loading declaration files from a source tree and running what they declare.

use mach::{
    ApplicationContext, Dispatcher, MachError, Outcome, cli::bootstrap,
    internal::declaration::DeclarationFile,
};

use super::*;

const TEST_COMMAND: &str = r#"
[[command]]
name = "test"
description = "Run the test suite"
category = "testing"
run = "true"
"#;

fn dispatcher(root: &Path) -> Dispatcher {
    Dispatcher::new(ApplicationContext::new(root))
}

#[test]
fn test_overlapping_modules_keep_first_registration() {
    let tree = Tree::new();
    let first = tree.write("testing/commands.toml", TEST_COMMAND);
    let second = tree.write(
        "tools/commands.toml",
        "[[command]]\nname = \"lint\"\nrun = \"true\"\n\n[[command]]\nname = \"test\"\nrun = \"false\"\n",
    );

    let mut dispatcher = dispatcher(tree.path());
    let mut loader = dispatcher.loader();
    assert_eq!(loader.load_from(&first).unwrap(), 1);

    let err = loader.load_from(&second).unwrap_err();
    assert!(matches!(err, MachError::DuplicateCommand(ref name) if name == "test"));

    let registry = dispatcher.registry();
    assert_eq!(registry.len(), 1);
    assert!(!registry.contains("lint"));
    let test = registry.lookup("test").unwrap();
    assert_eq!(test.description(), "Run the test suite");
    assert_eq!(test.category(), Some("testing"));
}

#[test]
fn test_missing_module_is_load_error() {
    let tree = Tree::new();
    let path = tree.path().join("absent.toml");

    let mut dispatcher = dispatcher(tree.path());
    let err = dispatcher.loader().load_from(&path).unwrap_err();
    match err {
        MachError::ModuleLoad { path: failed, cause } => {
            assert_eq!(failed, path);
            assert!(cause.contains("cannot read file"), "{cause}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_module_registers_nothing() {
    let tree = Tree::new();
    let path = tree.write(
        "bad.toml",
        "[[command]]\nname = \"ok\"\nrun = \"true\"\n\n[[command]]\nname = \"broken\"\nrun = \"echo {nope}\"\n",
    );

    let mut dispatcher = dispatcher(tree.path());
    let err = dispatcher.loader().load_source(&DeclarationFile::new(&path)).unwrap_err();
    assert!(matches!(err, MachError::ModuleLoad { .. }));
    assert!(err.to_string().contains("broken"), "{err}");
    assert!(dispatcher.registry().is_empty());
}

#[test]
fn test_bootstrap_fails_fast_on_bad_module() {
    let tree = Tree::new();
    tree.write("mach.toml", "modules = [\"a.toml\", \"b.toml\"]\n");
    tree.write("a.toml", TEST_COMMAND);
    tree.write("b.toml", "[[command]]\nname = \"x\"\nrun = \"true\"\nshell = \"bash\"\n");

    let err = bootstrap(tree.path()).unwrap_err();
    let err = err.downcast::<MachError>().unwrap();
    assert_eq!(err.error_code(), "module_load");
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_declared_command_runs_in_root() {
    let tree = Tree::new();
    tree.write("mach.toml", "modules = [\"**/commands.toml\"]\n");
    tree.write(
        "build/commands.toml",
        r#"
[[command]]
name = "stamp"
category = "build"
run = "printf '%s' {label} > stamp.txt"

[[command.argument]]
name = "label"
kind = "string"
required = true
"#,
    );

    let dispatcher = bootstrap(tree.path()).unwrap();
    let outcome = dispatcher.execute("stamp", &["hello world"]).await.unwrap();

    assert_eq!(outcome, Outcome::Completed);
    let stamp = std::fs::read_to_string(tree.path().join("stamp.txt")).unwrap();
    assert_eq!(stamp, "hello world");
}

#[tokio::test]
async fn test_declared_command_exit_status() {
    let tree = Tree::new();
    tree.write("mach.toml", "modules = [\"commands.toml\"]\n");
    tree.write("commands.toml", "[[command]]\nname = \"check\"\nrun = \"exit 5\"\n");

    let dispatcher = bootstrap(tree.path()).unwrap();
    let outcome = dispatcher.execute("check", &[] as &[&str]).await.unwrap();
    assert_eq!(outcome, Outcome::Exited(5));
}

#[tokio::test]
async fn test_configured_default_reaches_command() {
    let tree = Tree::new();
    tree.write(
        "mach.toml",
        "modules = [\"commands.toml\"]\n\n[defaults.stamp]\nlabel = \"configured\"\n",
    );
    tree.write(
        "commands.toml",
        r#"
[[command]]
name = "stamp"
run = "printf '%s' {label} > stamp.txt"

[[command.argument]]
name = "label"
kind = "string"
default = "declared"
"#,
    );

    let dispatcher = bootstrap(tree.path()).unwrap();
    dispatcher.execute("stamp", &[] as &[&str]).await.unwrap();
    let stamp = std::fs::read_to_string(tree.path().join("stamp.txt")).unwrap();
    assert_eq!(stamp, "configured");
}
