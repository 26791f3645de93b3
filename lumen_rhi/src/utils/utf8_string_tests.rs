//! Unit tests for utf8_string.rs

use crate::utils::Utf8String;

#[test]
fn test_empty_string_has_only_terminator() {
    let s = Utf8String::new();
    assert!(s.is_empty());
    assert_eq!(s.as_bytes_with_nul(), vec![0]);
    assert_eq!(s.to_utf16(), vec![0]);
}

#[test]
fn test_terminator_after_every_mutation() {
    let mut s = Utf8String::from("ab");
    s.push('c');
    s.push_str("def");
    s.resize(10, 'x');
    s += "!";
    s.resize(4, ' ');
    s += &Utf8String::from("é");
    let bytes = s.as_bytes_with_nul();
    assert_eq!(bytes.len(), s.len() + 1);
    assert_eq!(bytes[s.len()], 0);
    assert!(!bytes[..s.len()].contains(&0));
    assert_eq!(s, "abcdé");
}

#[test]
fn test_resize_counts_characters() {
    let mut s = Utf8String::from("héllo");
    s.resize(2, ' ');
    assert_eq!(s.as_str(), "hé");
    s.resize(4, '-');
    assert_eq!(s.as_str(), "hé--");
}

#[test]
fn test_bmp_utf16_round_trip() {
    let units: Vec<u16> = (0x0001u16..0xD800).step_by(97).chain((0xE000u16..=0xFFFF).step_by(89)).collect();
    let s = Utf8String::from(units.as_slice());
    let mut back = s.to_utf16();
    assert_eq!(back.pop(), Some(0));
    assert_eq!(back, units);
}

#[test]
fn test_surrogate_pairs_decode_to_one_code_point() {
    // U+1F600
    let s = Utf8String::from_utf16(&[0xD83D, 0xDE00]);
    assert_eq!(s.as_str(), "\u{1F600}");
    assert_eq!(s.len(), 4);
    assert_eq!(s.to_utf16(), vec![0xD83D, 0xDE00, 0]);
}

#[test]
fn test_lone_surrogate_becomes_replacement_character() {
    let s = Utf8String::from_utf16(&[0x41, 0xD800, 0x42]);
    assert_eq!(s.as_str(), "A\u{FFFD}B");
}

#[test]
fn test_push_utf16_appends() {
    let mut s = Utf8String::from("x=");
    s.push_utf16(&[0x3C0]);
    assert_eq!(s, "x=π");
}

#[test]
fn test_substr_clips_count() {
    let s = Utf8String::from("render system");
    assert_eq!(s.substr(7, 100).as_str(), "system");
    assert_eq!(s.substr(0, 6).as_str(), "render");
    assert!(s.substr(13, 5).is_empty());
}

#[test]
#[should_panic]
fn test_substr_past_end_panics() {
    let s = Utf8String::from("abc");
    let _ = s.substr(4, 1);
}

#[test]
fn test_compare_and_ordering() {
    let s = Utf8String::from("vulkan");
    assert_eq!(s.compare("vulkan"), 0);
    assert!(s.compare("metal") > 0);
    assert!(s.compare("zzz") < 0);
    assert!(s < "zzz");
    assert!(Utf8String::from("a") < Utf8String::from("b"));
}

#[test]
fn test_cstring_stops_at_interior_nul() {
    let s = Utf8String::from("ab\0cd");
    assert_eq!(s.to_cstring().as_bytes(), b"ab");
    assert_eq!(Utf8String::from("VK_LAYER").to_cstring().as_bytes_with_nul(), b"VK_LAYER\0");
}

#[test]
fn test_clear_and_add() {
    let mut s = Utf8String::from("old");
    s.clear();
    assert!(s.is_empty());
    let s = s + "new";
    assert_eq!(s.to_string(), "new");
}
