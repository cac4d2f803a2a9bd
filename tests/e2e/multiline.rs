use crate::common::harness::ConsoleTestHarness;
use crossterm::event::{KeyCode, KeyModifiers};

/// An open brace keeps the prompt going; the closing brace submits the unit
#[test]
fn test_function_definition_is_one_unit() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.type_text("function f() {\n}\n");
    harness.run().unwrap();

    assert_eq!(harness.history(), ["function f() {\n}"]);
    harness.assert_screen_contains("cy# function f() {");
    harness.assert_screen_contains("    }");
}

/// An open object literal keeps accepting lines until it is closed
#[test]
fn test_object_literal_is_one_unit() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.type_text("var o = {\na: 1\n}\n");
    harness.run().unwrap();

    assert_eq!(harness.history(), ["var o = {\na: 1\n}"]);
    assert!(harness.stderr().is_empty(), "{}", harness.stderr());
}

/// Open calls and trailing operators continue too
#[test]
fn test_open_call_and_operator_continue() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.type_text("foo(\n1)\nx = 1 +\n2\n");
    harness.run().unwrap();

    assert_eq!(harness.history(), ["foo(\n1)", "x = 1 +\n2"]);
}

/// A complete expression submits on the first Enter
#[test]
fn test_expression_submits_immediately() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.type_text("1+1\n");
    harness.run().unwrap();

    assert_eq!(harness.history(), ["1+1"]);
    assert!(harness.stdout().contains("\"1+1\""), "{}", harness.stdout());
}

/// Tab and Backspace move between indent stops inside a block
#[test]
fn test_indentation_editing_inside_block() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.type_text("{\n");
    harness.send_key(KeyCode::Tab, KeyModifiers::NONE);
    harness.send_key(KeyCode::Tab, KeyModifiers::NONE);
    harness.send_key(KeyCode::Backspace, KeyModifiers::NONE);
    harness.type_text("a\n}\n");
    harness.run().unwrap();

    assert_eq!(harness.history(), ["{\n    a\n    }"]);
}

/// Ctrl-C drops the partial line and the loop carries on
#[test]
fn test_ctrl_c_discards_partial_input() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.type_text("if (x) {\nabc");
    harness.send_key(KeyCode::Char('c'), KeyModifiers::CONTROL);
    harness.type_text("2\n");
    harness.run().unwrap();

    assert_eq!(harness.history(), ["2"]);
}

/// Up recalls the previous entry, which can be submitted again
#[test]
fn test_history_recall() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.type_text("7\n");
    harness.send_key(KeyCode::Up, KeyModifiers::NONE);
    harness.type_text("\n");
    harness.run().unwrap();

    assert_eq!(harness.history(), ["7", "7"]);
    assert_eq!(harness.stdout().matches("\"7\"").count(), 2);
    assert_eq!(harness.history_file(), "7\n7\n");
}

/// Multi-line entries are stored as one record with folded newlines
#[test]
fn test_multiline_entry_is_one_record() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.type_text("if (a) {\nb()\n}\n");
    harness.run().unwrap();

    assert_eq!(harness.history_file(), "if (a) {\x01b()\x01}\n");
}

/// Pasted text keeps its newlines and does not submit
#[test]
fn test_paste_then_submit() {
    let mut harness = ConsoleTestHarness::new(80, 24).unwrap();
    harness.paste("[1,\n\t2]");
    harness.send_key(KeyCode::End, KeyModifiers::NONE);
    harness.type_text("\n");
    harness.run().unwrap();

    assert_eq!(harness.history(), ["[1,\n    2]"]);
}

/// Long input wraps at the terminal width without corrupting the screen
#[test]
fn test_long_line_wraps() {
    let mut harness = ConsoleTestHarness::new(20, 10).unwrap();
    harness.type_text("'abcdefghijklmnopqrstuvwxyz'\n");
    harness.run().unwrap();

    let screen = harness.screen_to_string();
    let rows: Vec<&str> = screen.lines().collect();
    assert_eq!(rows[0], "cy# 'abcdefghijklmno");
    assert!(rows[1].starts_with("pqrstuvwxyz'"), "{screen}");
}
