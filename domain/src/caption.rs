//! Timed-caption (WebVTT style) parsing into ordered transcript segments.
//!
//! Vendor caption files are a sequence of blank-line separated blocks:
//!
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:03,000
//! Hello world
//! ```
//!
//! Blocks that do not have this shape are skipped and reported as warnings; the parse
//! only fails when no block survives. Output indices are renumbered `1..=N` in emission
//! order and timecodes are rendered in one canonical form (`HH:MM:SS.mmm`).

use std::fmt;
use std::str::FromStr;

use log::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;

use crate::error::{malformed_transcript, Error};

const TIMING_SEPARATOR: &str = "-->";

/// How many skipped blocks are spelled out in the aggregated warning line.
const MAX_WARNINGS_LOGGED: usize = 5;

/// Header and metadata blocks that carry no cue and are skipped without a warning.
const NON_CUE_BLOCK_PREFIXES: &[&str] = &["WEBVTT", "NOTE", "STYLE", "REGION"];

/// A caption timestamp with millisecond precision.
///
/// Accepts `HH:MM:SS.mmm` and `HH:MM:SS,mmm` (hours may be wider than two digits) and
/// always displays as `HH:MM:SS.mmm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timecode {
    millis: u64,
}

impl Timecode {
    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    pub fn as_millis(&self) -> u64 {
        self.millis
    }
}

/// Why a timecode failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimecodeError;

impl fmt::Display for TimecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "expected a timecode of the form HH:MM:SS.mmm or HH:MM:SS,mmm")
    }
}

impl std::error::Error for TimecodeError {}

fn digits(value: &str, min_len: usize, max_len: usize) -> Result<u64, TimecodeError> {
    if value.len() < min_len
        || value.len() > max_len
        || !value.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(TimecodeError);
    }
    value.parse().map_err(|_| TimecodeError)
}

impl FromStr for Timecode {
    type Err = TimecodeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (clock, fraction) = value
            .rsplit_once(['.', ','])
            .ok_or(TimecodeError)?;

        let mut parts = clock.split(':');
        let (Some(hours), Some(minutes), Some(seconds), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TimecodeError);
        };

        let hours = digits(hours, 2, 4)?;
        let minutes = digits(minutes, 2, 2)?;
        let seconds = digits(seconds, 2, 2)?;
        let millis = digits(fraction, 3, 3)?;
        if minutes > 59 || seconds > 59 {
            return Err(TimecodeError);
        }

        Ok(Timecode::from_millis(
            ((hours * 60 + minutes) * 60 + seconds) * 1000 + millis,
        ))
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let millis = self.millis % 1000;
        let total_seconds = self.millis / 1000;
        let seconds = total_seconds % 60;
        let minutes = (total_seconds / 60) % 60;
        let hours = total_seconds / 3600;
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
    }
}

impl Serialize for Timecode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timecode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// One caption block of a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TranscriptSegment {
    /// 1-based position in the transcript, contiguous and ascending.
    pub index: u32,
    #[schema(value_type = String, example = "00:00:01.000")]
    pub start: Timecode,
    #[schema(value_type = String, example = "00:00:03.000")]
    pub end: Timecode,
    pub text: String,
}

/// A caption block that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockWarning {
    /// 1-based line number where the block starts.
    pub line: usize,
    pub reason: &'static str,
}

/// Everything a parse produced, including what it skipped.
#[derive(Debug, Default)]
pub struct ParseReport {
    pub segments: Vec<TranscriptSegment>,
    pub warnings: Vec<BlockWarning>,
}

/// Parse raw caption text into ordered segments.
///
/// Malformed blocks are skipped and logged as one aggregated warning. Fails with a
/// malformed-transcript error only when no block could be parsed.
pub fn parse(raw: &str) -> Result<Vec<TranscriptSegment>, Error> {
    let report = parse_with_report(raw);

    if !report.warnings.is_empty() {
        let details = report
            .warnings
            .iter()
            .take(MAX_WARNINGS_LOGGED)
            .map(|w| format!("line {}: {}", w.line, w.reason))
            .collect::<Vec<_>>()
            .join("; ");
        warn!(
            "Skipped {} malformed caption block(s) out of {}: {}",
            report.warnings.len(),
            report.warnings.len() + report.segments.len(),
            details
        );
    }

    if report.segments.is_empty() {
        return Err(malformed_transcript(
            "Transcript contains no valid caption blocks",
        ));
    }

    debug!("Parsed {} transcript segments", report.segments.len());
    Ok(report.segments)
}

/// Parse raw caption text, returning the segments together with the skipped blocks.
pub fn parse_with_report(raw: &str) -> ParseReport {
    let normalized = raw
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut report = ParseReport::default();

    for (line, block) in blocks(&normalized) {
        if is_non_cue_block(block[0]) {
            continue;
        }

        match parse_block(&block) {
            Ok((start, end, text)) => {
                let index = report.segments.len() as u32 + 1;
                report.segments.push(TranscriptSegment {
                    index,
                    start,
                    end,
                    text,
                });
            }
            Err(reason) => report.warnings.push(BlockWarning { line, reason }),
        }
    }

    report
}

/// Render segments back to canonical caption text.
///
/// The output starts with a `WEBVTT` header, uses `.` as the millisecond separator and
/// escapes `&`, `<` and `>`, so parsing it again yields the same segments.
pub fn render(segments: &[TranscriptSegment]) -> String {
    let mut out = String::from("WEBVTT\n");
    for (position, segment) in segments.iter().enumerate() {
        out.push_str(&format!(
            "\n{}\n{} {} {}\n{}\n",
            position + 1,
            segment.start,
            TIMING_SEPARATOR,
            segment.end,
            escape_text(&segment.text)
        ));
    }
    out
}

/// Split normalized text into non-empty blocks, each tagged with its first line number.
fn blocks(text: &str) -> Vec<(usize, Vec<&str>)> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start_line = 0;

    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push((start_line, std::mem::take(&mut current)));
            }
        } else {
            if current.is_empty() {
                start_line = number + 1;
            }
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push((start_line, current));
    }

    blocks
}

fn is_non_cue_block(first_line: &str) -> bool {
    let first = first_line.trim();
    NON_CUE_BLOCK_PREFIXES.iter().any(|prefix| {
        first == *prefix
            || first
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with([' ', '\t']))
    })
}

fn parse_block(block: &[&str]) -> Result<(Timecode, Timecode, String), &'static str> {
    if block.len() < 3 {
        return Err("expected an index line, a timing line and at least one text line");
    }

    block[0]
        .trim()
        .parse::<u64>()
        .map_err(|_| "index line is not a number")?;

    let (start, end) = parse_timing(block[1])?;

    let joined = block[2..]
        .iter()
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join(" ");
    let text = collapse_whitespace(&decode_entities(&joined));
    if text.is_empty() {
        return Err("caption text is empty");
    }

    Ok((start, end, text))
}

fn parse_timing(line: &str) -> Result<(Timecode, Timecode), &'static str> {
    let (start, rest) = line
        .split_once(TIMING_SEPARATOR)
        .ok_or("timing line has no --> separator")?;

    // Cue settings (e.g. `align:start`) may follow the end timecode.
    let end = rest
        .split_whitespace()
        .next()
        .ok_or("timing line has no end timecode")?;

    let start: Timecode = start
        .trim()
        .parse()
        .map_err(|_| "start timecode is malformed")?;
    let end: Timecode = end.parse().map_err(|_| "end timecode is malformed")?;

    if end < start {
        return Err("end timecode precedes start timecode");
    }
    Ok((start, end))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the character references WebVTT allows in cue text.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];

        match candidate
            .find(';')
            .filter(|semi| *semi <= 10)
            .and_then(|semi| decode_entity(&candidate[1..semi]).map(|c| (c, semi)))
        {
            Some((decoded, semi)) => {
                out.push(decoded);
                rest = &candidate[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "lrm" => Some('\u{200e}'),
        "rlm" => Some('\u{200f}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, InternalErrorKind, ValidationErrorKind};

    fn tc(value: &str) -> Timecode {
        value.parse().unwrap()
    }

    #[test]
    fn test_two_block_scenario() {
        let raw = "1\n00:00:01,000 --> 00:00:03,000\nHello world\n\n2\n00:00:03,500 --> 00:00:05,000\nGoodbye\n";

        let segments = parse(raw).unwrap();

        assert_eq!(
            segments,
            vec![
                TranscriptSegment {
                    index: 1,
                    start: tc("00:00:01.000"),
                    end: tc("00:00:03.000"),
                    text: "Hello world".to_string(),
                },
                TranscriptSegment {
                    index: 2,
                    start: tc("00:00:03.500"),
                    end: tc("00:00:05.000"),
                    text: "Goodbye".to_string(),
                },
            ]
        );
        assert_eq!(segments[0].start.to_string(), "00:00:01.000");
        assert_eq!(segments[1].end.to_string(), "00:00:05.000");
    }

    #[test]
    fn test_segments_serialize_with_canonical_timecodes() {
        let segments = parse("1\n00:00:01,000 --> 00:00:03,000\nHello world\n").unwrap();
        let json = serde_json::to_value(&segments).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "index": 1,
                "start": "00:00:01.000",
                "end": "00:00:03.000",
                "text": "Hello world"
            }])
        );
    }

    #[test]
    fn test_zoom_webvtt_with_crlf_and_header() {
        let raw = "WEBVTT\r\n\r\n1\r\n00:00:00.480 --> 00:00:02.130\r\nAda Lovelace: Good morning, everyone.\r\n\r\n2\r\n00:00:02.700 --> 00:00:04.000\r\nAlan Turing: Morning!\r\n";

        let segments = parse(raw).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Ada Lovelace: Good morning, everyone.");
        assert_eq!(segments[1].start, tc("00:00:02.700"));
    }

    #[test]
    fn test_multiline_text_is_joined_with_single_spaces() {
        let raw = "1\n00:00:01.000 --> 00:00:02.000\n  first   line \nsecond line\n";
        let segments = parse(raw).unwrap();
        assert_eq!(segments[0].text, "first line second line");
    }

    #[test]
    fn test_indices_are_renumbered_despite_gaps_and_duplicates() {
        let raw = "7\n00:00:01.000 --> 00:00:02.000\na\n\n7\n00:00:02.000 --> 00:00:03.000\nb\n\n42\n00:00:03.000 --> 00:00:04.000\nc\n";
        let indices: Vec<u32> = parse(raw).unwrap().iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_malformed_blocks_are_skipped_with_warnings() {
        let raw = "1\n00:00:01.000 --> 00:00:02.000\nkept\n\nnot-a-number\n00:00:02.000 --> 00:00:03.000\ndropped\n\n3\n00:00:03.000 -> 00:00:04.000\ndropped\n\n4\n00:00:04.000 --> 00:00:05.000\n\n5\n00:00:05.000 --> 00:00:06.000\nalso kept\n";

        let report = parse_with_report(raw);

        let texts: Vec<&str> = report.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["kept", "also kept"]);
        assert_eq!(report.segments[1].index, 2);
        assert_eq!(report.warnings.len(), 3);
        assert_eq!(report.warnings[0].line, 5);
        assert_eq!(report.warnings[0].reason, "index line is not a number");
    }

    #[test]
    fn test_zero_valid_blocks_fails() {
        for raw in ["", "WEBVTT\n", "garbage\n\nmore garbage", "1\n00:00:01.000 --> 00:00:02.000\n"] {
            let err = parse(raw).unwrap_err();
            assert!(
                matches!(
                    err.error_kind,
                    DomainErrorKind::Internal(InternalErrorKind::Validation(
                        ValidationErrorKind::MalformedTranscript(_)
                    ))
                ),
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn test_header_and_note_blocks_do_not_warn() {
        let raw = "WEBVTT - Zoom transcript\n\nNOTE produced by the vendor\n\n1\n00:00:01.000 --> 00:00:02.000\nhi\n";
        let report = parse_with_report(raw);
        assert_eq!(report.segments.len(), 1);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_cue_settings_after_end_timecode_are_ignored() {
        let raw = "1\n00:00:01.000 --> 00:00:02.000 align:start position:10%\nhi\n";
        let segments = parse(raw).unwrap();
        assert_eq!(segments[0].end, tc("00:00:02.000"));
    }

    #[test]
    fn test_end_before_start_is_skipped() {
        let raw = "1\n00:00:05.000 --> 00:00:02.000\nbackwards\n\n2\n00:00:05.000 --> 00:00:06.000\nforwards\n";
        let report = parse_with_report(raw);
        assert_eq!(report.segments.len(), 1);
        assert_eq!(
            report.warnings[0].reason,
            "end timecode precedes start timecode"
        );
    }

    #[test]
    fn test_entities_are_decoded() {
        let raw = "1\n00:00:01.000 --> 00:00:02.000\nQ&amp;A &lt;b&gt; it&#39;s &quot;fine&quot;&nbsp;&nbsp;ok &unknown; & done\n";
        let segments = parse(raw).unwrap();
        assert_eq!(
            segments[0].text,
            "Q&A <b> it's \"fine\" ok &unknown; & done"
        );
    }

    #[test]
    fn test_bom_is_stripped() {
        let raw = "\u{feff}WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.000\nhi\n";
        let report = parse_with_report(raw);
        assert_eq!(report.segments.len(), 1);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_indices_contiguous_and_starts_non_decreasing() {
        let raw = "WEBVTT\n\n1\n00:00:00.000 --> 00:00:01.000\na\n\nbad\n\n2\n00:00:01.000 --> 00:00:02.500\nb\n\n3\n00:00:02.500 --> 00:00:02.500\nc\n\n4\n01:00:00.000 --> 01:00:01.000\nd\n";
        let segments = parse(raw).unwrap();

        for (position, segment) in segments.iter().enumerate() {
            assert_eq!(segment.index as usize, position + 1);
        }
        for pair in segments.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
    }

    #[test]
    fn test_reparsing_rendered_output_is_idempotent() {
        let raw = "1\n00:00:01,000 --> 00:00:03,000\nTom &amp; Jerry\nsay &lt;hi&gt;\n\nbroken block\n\n9\n00:00:03,500 --> 00:00:05,000\nGoodbye\n";
        let first = parse(raw).unwrap();

        let rendered = render(&first);
        let second = parse(&rendered).unwrap();

        assert_eq!(first, second);
        assert_eq!(render(&second), rendered);
        assert!(rendered.starts_with("WEBVTT\n\n1\n00:00:01.000 --> 00:00:03.000\nTom &amp; Jerry say &lt;hi&gt;\n"));
    }

    #[test]
    fn test_timecode_grammar() {
        assert_eq!(tc("00:00:01.000").as_millis(), 1_000);
        assert_eq!(tc("01:02:03,456").as_millis(), 3_723_456);
        assert_eq!(tc("100:00:00.001").to_string(), "100:00:00.001");

        for bad in ["1:00:00.000", "00:00:01", "00:00:01.00", "00:60:00.000", "00:00:61.000", "00:00.000", "aa:bb:cc.ddd", "00:00:01.0000"] {
            assert!(bad.parse::<Timecode>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_timecode_deserializes_from_either_separator() {
        let from_comma: Timecode = serde_json::from_str("\"00:00:03,500\"").unwrap();
        let from_dot: Timecode = serde_json::from_str("\"00:00:03.500\"").unwrap();
        assert_eq!(from_comma, from_dot);
        assert!(serde_json::from_str::<Timecode>("\"3.5\"").is_err());
    }
}
