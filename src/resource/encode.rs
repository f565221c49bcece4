/// Percent-encode a URI component.
///
/// Leaves `A-Z a-z 0-9 - _ . ! ~ * ' ( )` untouched and encodes every other
/// byte of the UTF-8 input.
pub fn encode_component(input: &str) -> String {
    let encoded = urlencoding::encode(input);
    if !encoded.contains('%') {
        return encoded.into_owned();
    }

    // urlencoding escapes the sub-delimiters that a component keeps literal.
    encoded
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}
