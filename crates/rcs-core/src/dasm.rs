//! Disassembly statements and their text rendering.

/// One decoded statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stmt {
    /// Address of the first byte.
    pub addr: usize,
    /// Optional label.
    pub label: String,
    /// Mnemonic and operands.
    pub op: String,
    /// Raw bytes consumed during decode.
    pub bytes: Vec<u8>,
    /// Optional trailing comment.
    pub comment: String,
}

/// Rendering options for [`format_stmt`].
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    /// Minimum width of the hex byte column. The 6502 uses 8 (three
    /// bytes), the Z80 uses 11 (four bytes).
    pub bytes_width: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { bytes_width: 8 }
    }
}

/// Render a statement as `$hhhh:  bb bb bb  op`.
#[must_use]
pub fn format_stmt(stmt: &Stmt, options: FormatOptions) -> String {
    let bytes = stmt
        .bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ");
    let mut line = format!(
        "${:04x}:  {:<width$}  {}",
        stmt.addr,
        bytes,
        stmt.op,
        width = options.bytes_width
    );
    if !stmt.comment.is_empty() {
        line.push_str("  ; ");
        line.push_str(&stmt.comment);
    }
    line
}
