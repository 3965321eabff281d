// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_have_no_valid_node() {
    let g = GlobalRequestInfo::default();
    assert_eq!(g.main_node_id, -1);
    assert_eq!(g.primary_node_id, -1);
    assert!(!g.switching);
    assert_eq!(g.follow_primary_count, 0);
}
