use super::*;

#[test]
fn plain_select_is_accepted() {
    assert!(validate_read_only_query("SELECT 1").is_ok());
}

#[test]
fn select_with_trailing_second_statement_is_rejected() {
    assert!(validate_read_only_query("SELECT 1; DROP TABLE images").is_err());
}

#[test]
fn non_select_verb_is_rejected() {
    assert!(validate_read_only_query("DELETE FROM images").is_err());
    assert!(validate_read_only_query("UPDATE images SET status = 'pending'").is_err());
    assert!(validate_read_only_query("DROP TABLE images").is_err());
}

#[test]
fn comment_hiding_a_second_statement_is_rejected() {
    assert!(validate_read_only_query("SELECT 1 -- ; DROP TABLE images\n; DELETE FROM images").is_err());
}

#[test]
fn empty_query_is_rejected() {
    assert!(validate_read_only_query("").is_err());
}

#[test]
fn unparseable_query_is_rejected() {
    assert!(validate_read_only_query("SELEKT 1").is_err());
}
