//! Line completion for the monitor REPL.
//!
//! A pure function over the line buffer: the caller supplies the
//! dynamic name lists and receives the candidates for the word being
//! typed at the end of the line.

/// Names only the live machine knows.
#[derive(Debug, Default, Clone)]
pub struct Candidates {
    pub registers: Vec<String>,
    pub flags: Vec<String>,
    pub encodings: Vec<String>,
    /// File names under the state directory, for export and import.
    pub state_files: Vec<String>,
}

const COMMANDS: &[&str] = &[
    "b", "bp", "bpc", "bpn", "bps", "break", "cpu", "d", "dasm", "export", "g", "go", "import",
    "m", "mem", "n", "next", "p", "pause", "peek", "poke", "q", "quit", "s", "sleep", "step", "t",
    "trace", "w", "watch", "wc", "wl", "wn", "ws",
];

fn subcommands(cmd: &str) -> &'static [&'static str] {
    match cmd {
        "b" | "break" | "w" | "watch" => &["clear", "clear-all", "list", "set"],
        "m" | "mem" => &["dump", "encoding", "fill", "lines"],
        "d" | "dasm" => &["lines", "list"],
        "cpu" => &["flag", "reg", "select"],
        _ => &[],
    }
}

/// Completions for the final word of `line`. A line ending in
/// whitespace starts a new word with an empty prefix.
#[must_use]
pub fn complete(line: &str, dynamic: &Candidates) -> Vec<String> {
    let open = line.is_empty() || line.ends_with(char::is_whitespace);
    let words: Vec<&str> = line.split_whitespace().collect();
    let (done, prefix) = if open {
        (words.as_slice(), "")
    } else {
        match words.split_last() {
            Some((last, rest)) => (rest, *last),
            None => (&[][..], ""),
        }
    };
    let pool: Vec<String> = match done {
        [] => COMMANDS.iter().map(ToString::to_string).collect(),
        ["export" | "import"] => dynamic.state_files.clone(),
        ["cpu", "reg"] => dynamic.registers.clone(),
        ["cpu", "flag"] => dynamic.flags.clone(),
        ["m" | "mem", "encoding"] => dynamic.encodings.clone(),
        [cmd] => subcommands(cmd).iter().map(ToString::to_string).collect(),
        _ => Vec::new(),
    };
    let mut out: Vec<String> = pool.into_iter().filter(|c| c.starts_with(prefix)).collect();
    out.sort();
    out
}
