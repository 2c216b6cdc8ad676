// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "notes.txt" },
    with_dash = { "input-1.json" },
    hidden = { ".env" },
)]
fn validate_filename_accepts(name: &str) {
    assert!(validate_filename(name).is_ok());
}

#[parameterized(
    empty = { "" },
    parent_dir = { "../escape.txt" },
    nested = { "sub/dir.txt" },
    backslash = { "sub\\dir.txt" },
    dot = { "." },
    dotdot = { ".." },
)]
fn validate_filename_rejects(name: &str) {
    assert!(validate_filename(name).is_err());
}

#[test]
fn validate_prompt_rejects_empty() {
    assert_eq!(validate_prompt("", 100), Err(ValidationError::EmptyPrompt));
}

#[test]
fn validate_prompt_rejects_over_max() {
    let prompt = "x".repeat(101);
    assert_eq!(
        validate_prompt(&prompt, 100),
        Err(ValidationError::PromptTooLong { max: 100 })
    );
}

#[test]
fn validate_prompt_accepts_within_bounds() {
    assert!(validate_prompt("do the thing", 100).is_ok());
}
