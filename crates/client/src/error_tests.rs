// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use uuid::Uuid;

use super::{BadNews, OperationError};

#[test]
fn server_error_display_includes_reason() {
    let err = OperationError::ServerError("stream deleted".to_owned());
    assert_eq!(err.to_string(), "SERVER_ERROR: stream deleted");
    assert_eq!(err.as_str(), "SERVER_ERROR");
}

#[test]
fn bad_news_display_names_correlation() {
    let bad = BadNews::aborted(Uuid::from_u128(7));
    assert_eq!(bad.error, OperationError::Aborted);
    assert!(bad.to_string().contains("ABORTED"));
    assert!(bad.to_string().contains(&Uuid::from_u128(7).to_string()));
}
