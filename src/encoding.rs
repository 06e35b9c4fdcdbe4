use std::borrow::Cow;

/// Decode raw roster bytes as ISO-8859-1.
///
/// Every byte maps directly to the code point of the same value, so this
/// never fails. Note this is true Latin-1, not the WHATWG "iso-8859-1" label
/// (which aliases to windows-1252): the double-decode repair below only
/// round-trips when bytes 0x80..=0x9F survive as U+0080..=U+009F.
pub fn decode_latin1(bytes: &[u8]) -> Cow<'_, str> {
    encoding_rs::mem::decode_latin1(bytes)
}

/// Recover a field that holds UTF-8 bytes mis-decoded as Latin-1, e.g.
/// "CatolÃ©" back to "Catolé".
///
/// Each char of the input is reinterpreted as the byte of its code point and
/// the byte sequence is decoded as UTF-8. If any char is above U+00FF, or the
/// bytes are not valid UTF-8, the input was not double-decoded text and is
/// returned unchanged. Plain ASCII is a fixed point.
pub fn repair_double_encoding(field: &str) -> String {
    let mut bytes = Vec::with_capacity(field.len());
    for ch in field.chars() {
        match u8::try_from(u32::from(ch)) {
            Ok(byte) => bytes.push(byte),
            Err(_) => return field.to_string(),
        }
    }
    match String::from_utf8(bytes) {
        Ok(repaired) => repaired,
        Err(_) => field.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_maps_every_byte() {
        assert_eq!(decode_latin1(b"Jos\xE9"), "José");
        assert_eq!(decode_latin1(b"plain ascii"), "plain ascii");
        // High-control range must stay as U+0080..=U+009F code points.
        assert_eq!(decode_latin1(&[0x93]), "\u{93}");
    }

    #[test]
    fn repairs_double_decoded_utf8() {
        // "José" as UTF-8 bytes read back as Latin-1 chars.
        assert_eq!(repair_double_encoding("Jos\u{C3}\u{A9}"), "José");
        assert_eq!(repair_double_encoding("Catol\u{C3}\u{A9}"), "Catolé");
        assert_eq!(repair_double_encoding("C\u{C3}\u{B3}digo"), "Código");
    }

    #[test]
    fn ascii_is_a_fixed_point() {
        assert_eq!(repair_double_encoding("Ana Souza"), "Ana Souza");
        assert_eq!(repair_double_encoding("1234"), "1234");
        assert_eq!(repair_double_encoding(""), "");
    }

    #[test]
    fn invalid_utf8_is_left_alone() {
        // A lone 0xC3 is a truncated UTF-8 sequence.
        assert_eq!(repair_double_encoding("Jos\u{C3}"), "Jos\u{C3}");
    }

    #[test]
    fn non_latin1_chars_are_left_alone() {
        assert_eq!(repair_double_encoding("日本語"), "日本語");
        assert_eq!(repair_double_encoding("José já correto"), "José já correto");
    }
}
