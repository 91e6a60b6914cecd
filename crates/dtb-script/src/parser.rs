//! Script line parser.
//!
//! One command per line, whitespace separated. `#` starts a comment. Numbers
//! are decimal or `0x` hex; chip lists are comma separated (`0,1,2`).

use dtb_emulator::{ChipScope, DacAxes, DacAxis, PixelExtent, SweepSpec};

/// A parsed script command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `daq_open <ch> <bytes>`
    DaqOpen {
        /// Channel index.
        channel: u8,
        /// Requested buffer size in bytes.
        bytes: u32,
    },
    /// `daq_start <ch>`
    DaqStart(u8),
    /// `daq_stop <ch>`
    DaqStop(u8),
    /// `daq_close <ch>`
    DaqClose(u8),
    /// `roc_i2c_addr <addr>`
    RocI2cAddr(u8),
    /// `tbm_enable <0|1>`
    TbmEnable(bool),
    /// `trigger_select <mask>`
    TriggerSelect(u16),
    /// `pg_triggers <n> [period]`
    PgTriggers {
        /// Trigger count.
        count: u32,
        /// Trigger period in clock cycles.
        period: u16,
    },
    /// `calibrate <chips> <n> [flags]`
    Calibrate {
        /// Chip addresses.
        chips: Vec<u8>,
        /// Triggers per pixel.
        triggers: u16,
        /// Calibration flags.
        flags: u16,
    },
    /// `sweep <chips> <n> [pixel <col> <row>] [dac <reg> <min> <max> [step]]... [flags <f>]`
    Sweep(SweepSpec),
    /// `read <ch> <bytes>`
    Read {
        /// Channel index.
        channel: u8,
        /// Maximum bytes to drain.
        bytes: u32,
    },
    /// `expect_size <ch> <words>`
    ExpectSize {
        /// Channel index.
        channel: u8,
        /// Expected queued word count.
        words: u32,
    },
    /// `expect_events <ch> <count>`
    ExpectEvents {
        /// Channel index.
        channel: u8,
        /// Expected number of events decoded from the channel so far.
        count: usize,
    },
}

/// A command with the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    /// 1-indexed line number.
    pub line: usize,
    /// The command.
    pub command: Command,
}

/// Source location for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed column number.
    pub column: usize,
}

/// Parse error with source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Location of the error.
    pub location: SourceLocation,
    /// Kind of parse error.
    pub kind: ParseErrorKind,
}

/// Classification of parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unknown command name.
    UnknownCommand(String),
    /// Malformed number.
    InvalidNumber(String),
    /// Number does not fit the argument type.
    ValueOutOfRange(String),
    /// Required argument missing.
    MissingArgument(&'static str),
    /// Argument provided where none expected.
    UnexpectedArgument(String),
    /// Malformed sweep clause.
    InvalidSweep(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCommand(c) => write!(f, "unknown command: {c}"),
            Self::InvalidNumber(v) => write!(f, "invalid number: {v}"),
            Self::ValueOutOfRange(v) => write!(f, "value out of range: {v}"),
            Self::MissingArgument(a) => write!(f, "missing argument: {a}"),
            Self::UnexpectedArgument(a) => write!(f, "unexpected argument: {a}"),
            Self::InvalidSweep(s) => write!(f, "invalid sweep: {s}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// One whitespace-separated token and its 1-indexed column.
#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    column: usize,
}

fn tokenize(line: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (index, ch) in line.char_indices() {
        if ch.is_whitespace() {
            if let Some(begin) = start.take() {
                tokens.push(Token {
                    text: &line[begin..index],
                    column: begin + 1,
                });
            }
        } else if start.is_none() {
            start = Some(index);
        }
    }
    if let Some(begin) = start {
        tokens.push(Token {
            text: &line[begin..],
            column: begin + 1,
        });
    }
    tokens
}

fn strip_comment(line: &str) -> &str {
    line.find('#').map_or(line, |pos| &line[..pos])
}

/// Cursor over the argument tokens of one line.
struct Args<'a> {
    tokens: std::iter::Peekable<std::vec::IntoIter<Token<'a>>>,
    line: usize,
    end_column: usize,
}

impl<'a> Args<'a> {
    const fn error_at(&self, column: usize, kind: ParseErrorKind) -> ParseError {
        ParseError {
            location: SourceLocation {
                line: self.line,
                column,
            },
            kind,
        }
    }

    fn required(&mut self, name: &'static str) -> Result<Token<'a>, ParseError> {
        self.tokens
            .next()
            .ok_or_else(|| self.error_at(self.end_column, ParseErrorKind::MissingArgument(name)))
    }

    fn peek_text(&mut self) -> Option<&'a str> {
        self.tokens.peek().map(|token| token.text)
    }

    fn number<T: TryFrom<u64>>(&mut self, name: &'static str) -> Result<T, ParseError> {
        let token = self.required(name)?;
        self.convert(token)
    }

    fn optional_number<T: TryFrom<u64>>(&mut self) -> Result<Option<T>, ParseError> {
        match self.tokens.next() {
            Some(token) => self.convert(token).map(Some),
            None => Ok(None),
        }
    }

    fn convert<T: TryFrom<u64>>(&self, token: Token<'a>) -> Result<T, ParseError> {
        let value = parse_number(token.text).ok_or_else(|| {
            self.error_at(
                token.column,
                ParseErrorKind::InvalidNumber(token.text.to_string()),
            )
        })?;
        T::try_from(value).map_err(|_| {
            self.error_at(
                token.column,
                ParseErrorKind::ValueOutOfRange(token.text.to_string()),
            )
        })
    }

    fn chip_list(&mut self) -> Result<Vec<u8>, ParseError> {
        let token = self.required("chips")?;
        let mut chips = Vec::new();
        let mut column = token.column;
        for part in token.text.split(',') {
            let piece = Token { text: part, column };
            chips.push(self.convert::<u8>(piece)?);
            column += part.len() + 1;
        }
        Ok(chips)
    }

    fn finish(mut self) -> Result<(), ParseError> {
        match self.tokens.next() {
            Some(token) => Err(self.error_at(
                token.column,
                ParseErrorKind::UnexpectedArgument(token.text.to_string()),
            )),
            None => Ok(()),
        }
    }
}

fn parse_number(text: &str) -> Option<u64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Parses one script line. Blank and comment-only lines yield `None`.
///
/// # Errors
///
/// Returns a `ParseError` for unknown commands and malformed arguments.
pub fn parse_line(line: &str, line_number: usize) -> Result<Option<Command>, ParseError> {
    let text = strip_comment(line);
    let mut tokens = tokenize(text).into_iter();
    let Some(name) = tokens.next() else {
        return Ok(None);
    };

    let mut args = Args {
        tokens: tokens.peekable(),
        line: line_number,
        end_column: text.trim_end().len() + 1,
    };

    let command = match name.text {
        "daq_open" => Command::DaqOpen {
            channel: args.number("channel")?,
            bytes: args.number("bytes")?,
        },
        "daq_start" => Command::DaqStart(args.number("channel")?),
        "daq_stop" => Command::DaqStop(args.number("channel")?),
        "daq_close" => Command::DaqClose(args.number("channel")?),
        "roc_i2c_addr" => Command::RocI2cAddr(args.number("address")?),
        "tbm_enable" => {
            let token = args.required("enable")?;
            match token.text {
                "0" => Command::TbmEnable(false),
                "1" => Command::TbmEnable(true),
                other => {
                    return Err(args.error_at(
                        token.column,
                        ParseErrorKind::InvalidNumber(other.to_string()),
                    ))
                }
            }
        }
        "trigger_select" => Command::TriggerSelect(args.number("mask")?),
        "pg_triggers" => Command::PgTriggers {
            count: args.number("count")?,
            period: args.optional_number()?.unwrap_or(0),
        },
        "calibrate" => Command::Calibrate {
            chips: args.chip_list()?,
            triggers: args.number("triggers")?,
            flags: args.optional_number()?.unwrap_or(0),
        },
        "sweep" => Command::Sweep(parse_sweep(&mut args)?),
        "read" => Command::Read {
            channel: args.number("channel")?,
            bytes: args.number("bytes")?,
        },
        "expect_size" => Command::ExpectSize {
            channel: args.number("channel")?,
            words: args.number("words")?,
        },
        "expect_events" => Command::ExpectEvents {
            channel: args.number("channel")?,
            count: args.number("count")?,
        },
        other => {
            return Err(args.error_at(
                name.column,
                ParseErrorKind::UnknownCommand(other.to_string()),
            ))
        }
    };

    args.finish()?;
    Ok(Some(command))
}

fn parse_sweep(args: &mut Args<'_>) -> Result<SweepSpec, ParseError> {
    let chips = args.chip_list()?;
    let triggers = args.number("triggers")?;

    let mut extent = PixelExtent::AllPixels;
    let mut axes: Vec<DacAxis> = Vec::new();
    let mut flags = 0;

    while let Some(keyword) = args.tokens.next() {
        match keyword.text {
            "pixel" => {
                extent = PixelExtent::OnePixel {
                    column: args.number("column")?,
                    row: args.number("row")?,
                };
            }
            "dac" => {
                if axes.len() == 2 {
                    return Err(args.error_at(
                        keyword.column,
                        ParseErrorKind::InvalidSweep("at most two dac axes".to_string()),
                    ));
                }
                let mut axis = DacAxis::new(
                    args.number("register")?,
                    args.number("min")?,
                    args.number("max")?,
                );
                if args.peek_text().and_then(parse_number).is_some() {
                    axis.step = args.number("step")?;
                }
                axes.push(axis);
            }
            "flags" => flags = args.number("flags")?,
            other => {
                return Err(args.error_at(
                    keyword.column,
                    ParseErrorKind::InvalidSweep(format!("unknown clause {other}")),
                ))
            }
        }
    }

    let dacs = match axes.as_slice() {
        [] => DacAxes::None,
        [one] => DacAxes::One(*one),
        [outer, inner, ..] => DacAxes::Two(*outer, *inner),
    };
    let scope = match chips.as_slice() {
        [single] => ChipScope::Single(*single),
        _ => ChipScope::Multi(chips),
    };

    Ok(SweepSpec {
        scope,
        extent,
        dacs,
        triggers,
        flags,
    })
}

/// Parses a whole script.
///
/// # Errors
///
/// Returns the first `ParseError` encountered.
pub fn parse_script(source: &str) -> Result<Vec<ScriptLine>, ParseError> {
    let mut lines = Vec::new();
    for (index, line) in source.lines().enumerate() {
        if let Some(command) = parse_line(line, index + 1)? {
            lines.push(ScriptLine {
                line: index + 1,
                command,
            });
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        parse_line(line, 1)
            .expect("line should parse")
            .expect("line should carry a command")
    }

    fn parse_err(line: &str) -> ParseError {
        parse_line(line, 7).expect_err("line should fail")
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(parse_line("", 1), Ok(None));
        assert_eq!(parse_line("   # open channels", 1), Ok(None));
    }

    #[test]
    fn parses_daq_commands() {
        assert_eq!(
            parse("daq_open 0 0x1000"),
            Command::DaqOpen {
                channel: 0,
                bytes: 4096
            }
        );
        assert_eq!(parse("daq_start 1 # go"), Command::DaqStart(1));
        assert_eq!(
            parse("read 2 100"),
            Command::Read {
                channel: 2,
                bytes: 100
            }
        );
    }

    #[test]
    fn optional_arguments_default_to_zero() {
        assert_eq!(
            parse("pg_triggers 5"),
            Command::PgTriggers {
                count: 5,
                period: 0
            }
        );
        assert_eq!(
            parse("calibrate 0,1,2 3"),
            Command::Calibrate {
                chips: vec![0, 1, 2],
                triggers: 3,
                flags: 0
            }
        );
    }

    #[test]
    fn parses_full_sweep() {
        let command = parse("sweep 0,1 2 pixel 4 5 dac 12 0 100 10 dac 25 3 4 flags 0x4");
        assert_eq!(
            command,
            Command::Sweep(SweepSpec {
                scope: ChipScope::Multi(vec![0, 1]),
                extent: PixelExtent::OnePixel { column: 4, row: 5 },
                dacs: DacAxes::Two(
                    DacAxis {
                        register: 12,
                        min: 0,
                        max: 100,
                        step: 10
                    },
                    DacAxis::new(25, 3, 4)
                ),
                triggers: 2,
                flags: 4,
            })
        );
    }

    #[test]
    fn single_chip_sweep_uses_single_scope() {
        let Command::Sweep(spec) = parse("sweep 3 1") else {
            panic!("expected sweep");
        };
        assert_eq!(spec.scope, ChipScope::Single(3));
        assert_eq!(spec.extent, PixelExtent::AllPixels);
        assert_eq!(spec.dacs, DacAxes::None);
    }

    #[test]
    fn unknown_command_reports_column() {
        let error = parse_err("  launch 1");
        assert_eq!(error.location, SourceLocation { line: 7, column: 3 });
        assert_eq!(
            error.kind,
            ParseErrorKind::UnknownCommand("launch".to_string())
        );
    }

    #[test]
    fn value_out_of_range_points_at_token() {
        let error = parse_err("daq_start 256");
        assert_eq!(error.location.column, 11);
        assert_eq!(error.kind, ParseErrorKind::ValueOutOfRange("256".to_string()));
    }

    #[test]
    fn bad_chip_list_entry_points_inside_list() {
        let error = parse_err("calibrate 0,x,2 1");
        assert_eq!(error.location.column, 13);
        assert_eq!(error.kind, ParseErrorKind::InvalidNumber("x".to_string()));
    }

    #[test]
    fn missing_and_extra_arguments_are_rejected() {
        assert_eq!(
            parse_err("daq_open 0").kind,
            ParseErrorKind::MissingArgument("bytes")
        );
        assert_eq!(
            parse_err("daq_close 0 1").kind,
            ParseErrorKind::UnexpectedArgument("1".to_string())
        );
        assert_eq!(
            parse_err("tbm_enable yes").kind,
            ParseErrorKind::InvalidNumber("yes".to_string())
        );
    }

    #[test]
    fn third_dac_axis_is_rejected() {
        let error = parse_err("sweep 0 1 dac 1 0 1 dac 2 0 1 dac 3 0 1");
        assert!(matches!(error.kind, ParseErrorKind::InvalidSweep(_)));
    }

    #[test]
    fn parse_script_keeps_line_numbers() {
        let script = parse_script("# header\n\ndaq_start 0\npg_triggers 2\n")
            .expect("script should parse");
        assert_eq!(script.len(), 2);
        assert_eq!(script[0].line, 3);
        assert_eq!(script[1].line, 4);
    }
}
