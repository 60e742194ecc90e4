// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generated_ids_carry_prefix() {
    assert!(GroupId::generate().as_str().starts_with("grp_"));
    assert!(ProjectId::generate().as_str().starts_with("prj_"));
    assert!(SessionId::generate().as_str().starts_with("ses_"));
}

#[test]
fn generated_ids_are_unique() {
    let a = ProjectId::generate();
    let b = ProjectId::generate();
    assert_ne!(a, b);
}

#[test]
fn id_roundtrips_through_serde() {
    let id = SessionId::new("ses_abc123");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"ses_abc123\"");
    let parsed: SessionId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn id_from_str_is_verbatim() {
    let id: GroupId = "imported-id".into();
    assert_eq!(id.as_str(), "imported-id");
    assert_eq!(id.to_string(), "imported-id");
}
