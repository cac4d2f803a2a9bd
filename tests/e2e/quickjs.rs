use crate::common::harness::ConsoleTestHarness;
use cyrepl::channel::evaluator::QuickJsEvaluator;
use cyrepl::channel::ExecutionChannel;

fn harness() -> ConsoleTestHarness {
    let evaluator = QuickJsEvaluator::new(vec!["script.js".to_string()]).unwrap();
    ConsoleTestHarness::with_channel(80, 24, ExecutionChannel::local(Box::new(evaluator))).unwrap()
}

#[test]
fn test_state_persists_between_lines() {
    let mut harness = harness();
    harness.type_text("var o = {a: 41}\no.a + 1\n");
    harness.run().unwrap();

    assert!(harness.stdout().contains("42\n"), "{}", harness.stdout());
}

#[test]
fn test_multiline_function_runs() {
    let mut harness = harness();
    harness.type_text("function twice(x) {\nreturn x * 2\n}\ntwice(21)\n");
    harness.run().unwrap();

    assert!(harness.stdout().contains("42"), "{}", harness.stdout());
}

#[test]
fn test_pretty_and_expand_modes() {
    let mut harness = harness();
    harness.type_text("?pretty\n({a: [1]})\n?expand\n'x\\ny'\n");
    harness.run().unwrap();

    let stdout = harness.stdout();
    assert!(stdout.contains("{\n  \"a\": [\n    1\n  ]\n}"), "{stdout}");
    assert!(stdout.contains("x\ny\n"), "{stdout}");
}

#[test]
fn test_destroy_clears_globals() {
    let mut harness = harness();
    harness.type_text("var kept = 1\n?destroy\nkept\n");
    harness.run().unwrap();

    assert!(harness.stderr().contains("ReferenceError"), "{}", harness.stderr());
}

#[test]
fn test_tab_completes_from_target() {
    let mut harness = harness();
    harness.type_text("Math.flo\t(2.5)\n");
    harness.run().unwrap();

    assert_eq!(harness.history(), ["Math.floor(2.5)"]);
    assert!(harness.stdout().contains('2'));
}
