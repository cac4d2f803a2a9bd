use crate::common::harness::ConsoleTestHarness;

#[test]
fn test_toggles_report_state() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.type_text("?bypass\n?bypass\n?pretty\n");
    harness.run().unwrap();

    let stdout = harness.stdout();
    assert!(stdout.contains("bypass == true"), "{stdout}");
    assert!(stdout.contains("bypass == false"), "{stdout}");
    assert!(stdout.contains("pretty == true"), "{stdout}");
    assert_eq!(harness.history(), ["?bypass", "?bypass", "?pretty"]);
}

#[test]
fn test_gc_and_unknown_command() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.type_text("?gc\n?lower\n");
    harness.run().unwrap();

    assert!(harness.stdout().contains("collecting... done."));
    assert!(harness.stderr().contains("unknown command: ?lower"));
}

#[test]
fn test_exit_stops_the_loop() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.type_text("?exit\n1\n");
    harness.run().unwrap();

    assert_eq!(harness.history(), ["?exit"]);
    assert!(!harness.stdout().contains("\"1\""));
}

#[test]
fn test_debug_echoes_generated_code() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.type_text("?debug\n1+1\n");
    harness.run().unwrap();

    assert!(harness.stdout().contains("cy= 1+1"), "{}", harness.stdout());
}

/// Bypass sends input the parser would reject
#[test]
fn test_bypass_skips_parser() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.type_text("?bypass\nx = )\n");
    harness.run().unwrap();

    assert!(harness.stderr().is_empty(), "{}", harness.stderr());
    assert!(harness.stdout().contains("\"x = )\""));
}

#[test]
fn test_parse_error_shows_carets() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.type_text("x = ))\n");
    harness.run().unwrap();

    let stderr = harness.stderr();
    assert!(stderr.starts_with("...."), "{stderr}");
    assert!(stderr.contains('^'), "{stderr}");
    assert!(stderr.contains("\n  | "), "{stderr}");
    assert_eq!(harness.history(), ["x = ))"]);
}

#[test]
fn test_thrown_errors_go_to_stderr() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.type_text("throw 1\n");
    harness.run().unwrap();

    assert!(harness.stderr().contains("throw new Error(\"boom\")"));
    assert!(!harness.stdout().contains("boom"));
}

/// No value prints nothing; an empty value prints an empty line
#[test]
fn test_no_value_versus_empty_result() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    let mut out = Vec::new();
    let mut err = Vec::new();

    harness
        .console()
        .handle_line("void 0", &mut out, &mut err)
        .unwrap();
    assert!(out.is_empty());

    harness
        .console()
        .handle_line("''", &mut out, &mut err)
        .unwrap();
    assert_eq!(out, b"\n");
    assert!(err.is_empty());
}
