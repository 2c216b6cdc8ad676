// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn clone_method_display_is_stable() {
    assert_eq!(CloneMethod::Reflink.to_string(), "reflink");
    assert_eq!(CloneMethod::SubvolumeSnapshot.to_string(), "subvolume-snapshot");
    assert_eq!(CloneMethod::Hardlink.to_string(), "hardlink");
    assert_eq!(CloneMethod::FullCopy.to_string(), "full-copy");
}
