use inkpost_types::CancelToken;

#[test]
fn fresh_token_is_active() {
    let token = CancelToken::new();
    assert!(!token.is_cancelled());
    assert!(token.ensure_active().is_ok());
}

#[test]
fn cancel_is_visible_to_all_clones() {
    let token = CancelToken::new();
    let clone = token.clone();

    token.cancel();

    assert!(clone.is_cancelled());
    assert!(clone.ensure_active().is_err());
}

#[test]
fn cancel_is_sticky() {
    let token = CancelToken::new();
    token.cancel();
    token.cancel();
    assert!(token.is_cancelled());
}
