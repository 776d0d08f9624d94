/// Formats bytes as a comma separated hex dump (`x02,x30,x45`) for frame tracing.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("x{:02X}", byte))
        .collect::<Vec<_>>()
        .join(",")
}

/// Renders a frame as printable text: control bytes are replaced by their `<xNN>` code.
pub fn to_printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&byte| match byte {
            0x20..=0x7E => (byte as char).to_string(),
            _ => format!("<x{:02X}>", byte),
        })
        .collect()
}
