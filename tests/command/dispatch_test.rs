//! Dispatch through the public API: exit codes and the single error line.

use mach::{
    ApplicationContext, ArgumentDef, CommandSpec, Dispatcher, MachError, Outcome, handler_fn,
};

use super::*;

#[tokio::test]
async fn test_missing_required_argument() {
    let dispatcher = scenario_dispatcher();
    let (code, out, err) = capture(&dispatcher, "build", &[]).await;

    assert_eq!(code, 2);
    assert!(out.is_empty());
    assert_eq!(err, "error: build: missing required argument: --target\n");

    let e = dispatcher.execute("build", &[] as &[&str]).await.unwrap_err();
    assert_eq!(e.error_code(), "missing_required_argument");
}

#[tokio::test]
async fn test_required_argument_supplied() {
    let dispatcher = scenario_dispatcher();
    let (code, out, err) = capture(&dispatcher, "build", &["--target", "release"]).await;

    assert_eq!(code, 0);
    assert!(out.is_empty());
    assert!(err.is_empty());
}

#[tokio::test]
async fn test_unknown_command() {
    let dispatcher = scenario_dispatcher();
    let (code, _, err) = capture(&dispatcher, "deploy", &[]).await;

    assert_eq!(code, 2);
    assert_eq!(err, "error: deploy: unknown command\n");
}

#[tokio::test]
async fn test_handler_fault() {
    let dispatcher = scenario_dispatcher();
    let (code, _, err) = capture(&dispatcher, "clean", &[]).await;

    assert_eq!(code, 1);
    assert_eq!(err, "error: clean: command failed: object directory is locked\n");
}

#[tokio::test]
async fn test_structured_exit() {
    let dispatcher = scenario_dispatcher();
    let (code, _, err) = capture(&dispatcher, "lint", &[]).await;

    assert_eq!(code, 4);
    assert!(err.is_empty());
}

#[tokio::test]
async fn test_binding_errors_exit_two() {
    let dispatcher = scenario_dispatcher();
    let cases: [(&[&str], &str); 4] = [
        (&["--target", "x", "--mode", "fast"], "invalid choice 'fast' for --mode"),
        (&["--target", "x", "--jobs", "many"], "invalid value 'many' for --jobs"),
        (&["--target", "x", "--force"], "unknown flag: --force"),
        (&["--target"], "invalid value '' for --target"),
    ];
    for (args, expected) in cases {
        let (code, _, err) = capture(&dispatcher, "build", args).await;
        assert_eq!(code, 2, "args: {args:?}");
        assert!(err.starts_with("error: build: "), "{err}");
        assert!(err.contains(expected), "{err}");
        assert_eq!(err.lines().count(), 1);
    }
}

#[tokio::test]
async fn test_choice_accepts_each_allowed_value() {
    let dispatcher = scenario_dispatcher();
    for mode in ["debug", "release"] {
        let outcome = dispatcher
            .execute("build", &["--target", "x", "--mode", mode])
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Completed);
    }
    let err = dispatcher
        .execute("build", &["--target", "x", "--mode", "z"])
        .await
        .unwrap_err();
    match err {
        MachError::InvalidChoice { value, allowed, .. } => {
            assert_eq!(value, "z");
            assert_eq!(allowed, vec!["debug", "release"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_help_flag_prints_usage() {
    let dispatcher = scenario_dispatcher();
    let (code, out, err) = capture(&dispatcher, "build", &["--help"]).await;

    assert_eq!(code, 0);
    assert!(out.starts_with("usage: mach build --target <string>"));
    assert!(err.is_empty());
}

#[tokio::test]
async fn test_failures_leave_dispatcher_usable() {
    let dispatcher = scenario_dispatcher();
    capture(&dispatcher, "deploy", &[]).await;
    capture(&dispatcher, "build", &["--bogus"]).await;
    capture(&dispatcher, "clean", &[]).await;

    let (code, _, _) = capture(&dispatcher, "build", &["--target", "release"]).await;
    assert_eq!(code, 0);
    assert_eq!(dispatcher.registry().len(), 3);
}

#[tokio::test]
async fn test_panicking_handler_is_contained() {
    let mut dispatcher = Dispatcher::new(ApplicationContext::new("/src"));
    dispatcher
        .register(
            CommandSpec::builder("clean", handler_fn(|_, _| panic!("index out of bounds")))
                .build()
                .unwrap(),
        )
        .unwrap();
    dispatcher.freeze();

    let (code, _, err) = capture(&dispatcher, "clean", &[]).await;
    assert_eq!(code, 1);
    assert!(err.contains("clean"));
    assert!(err.contains("command failed"));
    assert!(err.contains("index out of bounds"));
}

#[tokio::test]
async fn test_handler_sees_root_and_bound_values() {
    let mut dispatcher = Dispatcher::new(ApplicationContext::new("/work/tree"));
    dispatcher
        .register(
            CommandSpec::builder(
                "package",
                handler_fn(|ctx, args| {
                    assert_eq!(ctx.root(), Path::new("/work/tree"));
                    assert_eq!(args.get_str("format"), Some("zip"));
                    assert_eq!(args.get_int("level"), Some(9));
                    assert!(args.get_flag("sign"));
                    assert_eq!(args.trailing(), ["extra"]);
                    Ok(())
                }),
            )
            .argument(ArgumentDef::string("format").required())
            .argument(ArgumentDef::integer("level").with_default(6))
            .argument(ArgumentDef::flag("sign"))
            .build()
            .unwrap(),
        )
        .unwrap();
    dispatcher.freeze();

    let outcome = dispatcher
        .execute("package", &["zip", "--level=9", "--sign", "extra"])
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Completed);
}

#[test]
fn test_register_after_freeze_is_rejected() {
    let mut dispatcher = scenario_dispatcher();
    dispatcher.freeze();

    let spec = CommandSpec::builder("late", handler_fn(|_, _| Ok(()))).build().unwrap();
    let err = dispatcher.register(spec).unwrap_err();
    assert!(matches!(err, MachError::RegistryFrozen(ref name) if name == "late"));
}

#[test]
fn test_general_help_lists_every_command() {
    let dispatcher = scenario_dispatcher();
    let help = dispatcher.general_help();
    for name in ["build", "clean", "lint"] {
        assert!(help.contains(&format!("  {name}")), "{help}");
    }
}
