//! Command batch tokenizer
//!
//! A batch is the payload of one transport packet. It holds command lines
//! separated by `;` or `\n`; the first NUL byte (or the end of the buffer)
//! ends the batch, so the last line needs no terminator.
//!
//! Each line is split on spaces into `name [arg]...`. A first token of the
//! form `X.name` carries the tag `X`, which is echoed on the response line.

/// Lines of this many bytes or more are rejected
pub const MAX_LINE_LEN: usize = 256;

/// Errors detected while splitting a line, before any command runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Line is [`MAX_LINE_LEN`] bytes or longer
    TooLong,
    /// Line holds only spaces
    NoCommand,
    /// Line is not valid UTF-8
    NotText,
}

impl LineError {
    /// Text reported on the `BAD` response line
    pub fn message(self) -> &'static str {
        match self {
            LineError::TooLong => "cmd too big",
            LineError::NoCommand => "no cmd",
            LineError::NotText => "unknown cmd",
        }
    }
}

impl core::fmt::Display for LineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

/// One tokenized command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLine<'a> {
    /// Correlation tag (`X` in `X.cmd`)
    pub tag: Option<char>,
    /// Command name with the tag removed (`m0`, `pa3-7`, `halt`, ...)
    pub name: &'a str,
    rest: &'a str,
}

impl<'a> CommandLine<'a> {
    /// Tokenize a single line (without its terminator)
    pub fn parse(line: &'a [u8]) -> Result<Self, LineError> {
        if line.len() >= MAX_LINE_LEN {
            return Err(LineError::TooLong);
        }
        let text = core::str::from_utf8(line).map_err(|_| LineError::NotText)?;

        let text = text.trim_start_matches(' ');
        if text.is_empty() {
            return Err(LineError::NoCommand);
        }
        let (first, rest) = text.split_once(' ').unwrap_or((text, ""));

        let bytes = first.as_bytes();
        let (tag, name) = if bytes.len() >= 2 && bytes[0].is_ascii() && bytes[1] == b'.' {
            (Some(bytes[0] as char), &first[2..])
        } else {
            (None, first)
        };

        Ok(Self { tag, name, rest })
    }

    /// Arguments following the command name
    pub fn args(&self) -> Args<'a> {
        Args {
            inner: self.rest.split(' '),
        }
    }
}

/// Iterator over space separated arguments; runs of spaces are skipped
#[derive(Debug, Clone)]
pub struct Args<'a> {
    inner: core::str::Split<'a, char>,
}

impl<'a> Iterator for Args<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.inner.by_ref().find(|token| !token.is_empty())
    }
}

/// Iterator over the command lines of a batch
///
/// Empty lines (including a lone `\r` left by CRLF line endings) are skipped.
#[derive(Debug, Clone)]
pub struct Batch<'a> {
    rest: &'a [u8],
}

impl<'a> Batch<'a> {
    /// Start iterating over a raw batch buffer
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { rest: bytes }
    }
}

impl<'a> Iterator for Batch<'a> {
    type Item = Result<CommandLine<'a>, LineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.rest.first().map_or(true, |&b| b == 0) {
                return None;
            }

            let end = self
                .rest
                .iter()
                .position(|&b| b == b';' || b == b'\n' || b == 0)
                .unwrap_or(self.rest.len());
            let mut line = &self.rest[..end];

            // Keep a NUL terminator in place so the next call stops on it
            self.rest = match self.rest.get(end) {
                Some(&b) if b != 0 => &self.rest[end + 1..],
                _ => &self.rest[end..],
            };

            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            if line.is_empty() {
                continue;
            }
            return Some(CommandLine::parse(line));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn collect(batch: &[u8]) -> Vec<Result<CommandLine<'_>, LineError>> {
        Batch::new(batch).collect()
    }

    #[test]
    fn test_split_on_separators() {
        let lines = collect(b"m0 stat;m1 pos 5\nver");
        assert_eq!(lines.len(), 3);

        let first = lines[0].unwrap();
        assert_eq!(first.name, "m0");
        assert_eq!(first.args().collect::<Vec<_>>(), ["stat"]);

        let second = lines[1].unwrap();
        assert_eq!(second.name, "m1");
        assert_eq!(second.args().collect::<Vec<_>>(), ["pos", "5"]);

        let third = lines[2].unwrap();
        assert_eq!(third.name, "ver");
        assert_eq!(third.args().next(), None);
    }

    #[test]
    fn test_nul_ends_batch() {
        let lines = collect(b"nop\0m0 stat;ver");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].unwrap().name, "nop");

        let mut packet = [0u8; 64];
        packet[..7].copy_from_slice(b"m2 halt");
        assert_eq!(collect(&packet).len(), 1);
    }

    #[test]
    fn test_tag_extraction() {
        let line = CommandLine::parse(b"A.m0 stat").unwrap();
        assert_eq!(line.tag, Some('A'));
        assert_eq!(line.name, "m0");

        let untagged = CommandLine::parse(b"m0.stat").unwrap();
        assert_eq!(untagged.tag, None);
        assert_eq!(untagged.name, "m0.stat");

        let bare = CommandLine::parse(b"7.").unwrap();
        assert_eq!(bare.tag, Some('7'));
        assert_eq!(bare.name, "");
    }

    #[test]
    fn test_repeated_spaces() {
        let line = CommandLine::parse(b"  m0   step  1000   200 ").unwrap();
        assert_eq!(line.name, "m0");
        assert_eq!(line.args().collect::<Vec<_>>(), ["step", "1000", "200"]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let lines = collect(b";;m0 stat\r\n\n;nop;");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].unwrap().args().next(), Some("stat"));
        assert_eq!(lines[1].unwrap().name, "nop");
    }

    #[test]
    fn test_line_errors() {
        assert_eq!(collect(b"   ;nop")[0], Err(LineError::NoCommand));

        let mut long = [b'x'; MAX_LINE_LEN + 4];
        long[MAX_LINE_LEN + 1] = b';';
        long[MAX_LINE_LEN + 2] = b'o';
        long[MAX_LINE_LEN + 3] = b'k';
        let lines = collect(&long);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], Err(LineError::TooLong));
        assert_eq!(lines[1].unwrap().name, "ok");

        assert!(CommandLine::parse(&[b'x'; MAX_LINE_LEN - 1]).is_ok());
        assert_eq!(CommandLine::parse(&[0xff, 0xfe]), Err(LineError::NotText));
        assert_eq!(LineError::TooLong.message(), "cmd too big");
    }

    fn command() -> impl Strategy<Value = (Option<char>, std::string::String, Vec<std::string::String>)> {
        (
            proptest::option::of(proptest::char::range('A', 'Z')),
            "[a-z][a-z0-9-]{0,7}",
            proptest::collection::vec("[a-z0-9+-]{1,8}", 0..5),
        )
    }

    proptest! {
        #[test]
        fn test_batch_keeps_tags_and_arguments(
            commands in proptest::collection::vec(command(), 1..6),
            newline in any::<bool>(),
            padding in 1usize..4,
        ) {
            let gap = " ".repeat(padding);
            let text = commands
                .iter()
                .map(|(tag, name, args)| {
                    let mut line = std::string::String::new();
                    if let Some(tag) = tag {
                        line.push(*tag);
                        line.push('.');
                    }
                    line.push_str(name);
                    for arg in args {
                        line.push_str(&gap);
                        line.push_str(arg);
                    }
                    line
                })
                .collect::<Vec<_>>()
                .join(if newline { "\n" } else { ";" });

            let mut packet = text.into_bytes();
            packet.extend_from_slice(&[0, b'n', b'o', b'p']);
            let lines = collect(&packet);
            prop_assert_eq!(lines.len(), commands.len());

            for (line, (tag, name, args)) in lines.iter().zip(&commands) {
                let line = line.unwrap();
                prop_assert_eq!(line.tag, *tag);
                prop_assert_eq!(line.name, name.as_str());
                let expected: Vec<&str> = args.iter().map(|a| a.as_str()).collect();
                prop_assert_eq!(line.args().collect::<Vec<_>>(), expected);
            }
        }
    }
}
