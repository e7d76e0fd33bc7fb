use super::*;

fn multiline() -> Rope {
    Rope::from_str("abc\ndéf\nghï\n")
}

#[test]
fn char_to_byte_accounts_for_multibyte() {
    let r = multiline();
    // 'é' in "déf" is 2 bytes; line starts at char 4 ("d"), byte 4.
    assert_eq!(r.char_to_byte(4).unwrap(), 4);
    assert_eq!(r.char_to_byte(5).unwrap(), 5); // 'é' starts here
    assert_eq!(r.char_to_byte(6).unwrap(), 7); // after 'é' (2 bytes)
}

#[test]
fn byte_to_char_inverts_char_to_byte() {
    let r = multiline();
    for c in 0..=r.len_chars() {
        let b = r.char_to_byte(c).unwrap();
        assert_eq!(r.byte_to_char(b).unwrap(), c, "round trip at char {c}");
    }
}

#[test]
fn char_to_byte_out_of_bounds() {
    let r = Rope::from_str("abc");
    assert!(r.char_to_byte(4).is_err());
    assert!(r.char_to_byte(3).is_ok(), "one-past-end is valid");
}

#[test]
fn len_lines_counts_line_feeds_only() {
    assert_eq!(Rope::from_str("").len_lines(), 0);
    assert_eq!(Rope::from_str("abc").len_lines(), 0);
    assert_eq!(Rope::from_str("a\nb").len_lines(), 1);
    assert_eq!(Rope::from_str("a\nb\n").len_lines(), 2);
}

#[test]
fn line_at_char_locates_containing_line() {
    let r = Rope::from_str("abc\ndef\nghi");
    assert_eq!(r.line_at_char(0).unwrap(), 0);
    assert_eq!(r.line_at_char(3).unwrap(), 0); // the newline itself is on line 0
    assert_eq!(r.line_at_char(4).unwrap(), 1);
    assert_eq!(r.line_at_char(10).unwrap(), 2);
}

#[test]
fn line_start_and_end_char_bracket_each_line() {
    let r = Rope::from_str("abc\ndef\nghi");
    assert_eq!(r.line_start_char(0).unwrap(), 0);
    assert_eq!(r.line_end_char(0).unwrap(), 3);
    assert_eq!(r.line_start_char(1).unwrap(), 4);
    assert_eq!(r.line_end_char(1).unwrap(), 7);
    assert_eq!(r.line_start_char(2).unwrap(), 8);
    assert_eq!(r.line_end_char(2).unwrap(), 11);
}

#[test]
fn line_queries_out_of_bounds_error() {
    let r = Rope::from_str("abc");
    assert!(r.line_start_char(5).is_err());
    assert!(r.line_end_char(5).is_err());
}

#[test]
fn byte_at_matches_underlying_bytes() {
    let r = Rope::from_str("abc");
    assert_eq!(r.byte_at(0).unwrap(), b'a');
    assert!(r.byte_at(3).is_err());
}

#[test]
fn conversions_hold_across_a_leaf_boundary() {
    // Force multiple leaves by exceeding MAX_LEAF, then check conversions
    // still agree at a position that falls in a later leaf.
    let left = "x".repeat(MAX_LEAF + 10);
    let right = "é".repeat(50);
    let r = Rope::from_str(&left).insert(left.chars().count(), &right).unwrap();
    let total_chars = left.chars().count() + right.chars().count();
    assert_eq!(r.len_chars(), total_chars);
    let mid = left.chars().count() + 10;
    let byte = r.char_to_byte(mid).unwrap();
    assert_eq!(r.byte_to_char(byte).unwrap(), mid);
}
