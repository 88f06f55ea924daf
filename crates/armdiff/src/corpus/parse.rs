use std::sync::OnceLock;

use regex::Regex;

use super::CorpusEntry;

/// Parse one corpus line. `Ok(None)` for blank and comment lines.
pub(super) fn parse_line(line: &str) -> Result<Option<CorpusEntry>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    // `08 68 | ldr r0, [r1]`
    let hex_pattern = HEX_PATTERN.get_or_init(|| {
        Regex::new(r"^((?:[0-9a-fA-F]{2}\s*)+)\|\s*(.*?)\s*$").unwrap()
    });
    if let Some(caps) = hex_pattern.captures(line) {
        let digits: String = caps[1].chars().filter(|c| !c.is_whitespace()).collect();
        let opcode = (0..digits.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|e| format!("bad opcode byte: {e}"))?;
        return entry(opcode, &caps[2]).map(Some);
    }

    // `(b"\x08\x68", "ldr r0, [r1]"),`
    let tuple_pattern = TUPLE_PATTERN.get_or_init(|| {
        Regex::new(r#"^\(\s*b"((?:\\x[0-9a-fA-F]{2})+)"\s*,\s*"([^"]*)"\s*\)\s*,?$"#).unwrap()
    });
    if let Some(caps) = tuple_pattern.captures(line) {
        let byte_pattern =
            BYTE_PATTERN.get_or_init(|| Regex::new(r"\\x([0-9a-fA-F]{2})").unwrap());
        let opcode = byte_pattern
            .captures_iter(&caps[1])
            .map(|b| u8::from_str_radix(&b[1], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|e| format!("bad opcode byte: {e}"))?;
        return entry(opcode, &caps[2]).map(Some);
    }

    Err(format!("unrecognised entry: {line}"))
}

fn entry(opcode: Vec<u8>, mnemonic: &str) -> Result<CorpusEntry, String> {
    let mnemonic = mnemonic.trim();
    if mnemonic.is_empty() {
        return Err("missing mnemonic".to_string());
    }
    Ok(CorpusEntry::new(opcode, mnemonic))
}

static HEX_PATTERN: OnceLock<Regex> = OnceLock::new();
static TUPLE_PATTERN: OnceLock<Regex> = OnceLock::new();
static BYTE_PATTERN: OnceLock<Regex> = OnceLock::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_form() {
        let entry = parse_line("  51 f8 04 0c | ldr r0, [r1, #-0x4]  ").unwrap().unwrap();
        assert_eq!(entry.opcode(), b"\x51\xf8\x04\x0c");
        assert_eq!(entry.mnemonic(), "ldr r0, [r1, #-0x4]");

        let packed = parse_line("51F8040C|ldr r0, [r1, #-0x4]").unwrap().unwrap();
        assert_eq!(packed, entry);
    }

    #[test]
    fn test_tuple_form() {
        let entry = parse_line(r#"    (b"\x08\x68",         "ldr r0, [r1]"),"#)
            .unwrap()
            .unwrap();
        assert_eq!(entry.opcode(), b"\x08\x68");
        assert_eq!(entry.mnemonic(), "ldr r0, [r1]");
    }

    #[test]
    fn test_skips_comments_and_blanks() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   # LDR - Offset addressing ---- #").unwrap(), None);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse_line("08 6 | ldr r0, [r1]").is_err());
        assert!(parse_line("08 68 |   ").is_err());
        assert!(parse_line("ldr r0, [r1]").is_err());
        assert!(parse_line(r#"(b"", "nop")"#).is_err());
    }
}
