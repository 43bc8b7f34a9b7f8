use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::util::{entropy_bits, min_max_rescale};

pub mod constants {
    // these constants describe indices of transitions
    pub const HMM_MATCH_TO_MATCH: usize = 0;
    pub const HMM_MATCH_TO_INSERT: usize = 1;
    pub const HMM_MATCH_TO_DELETE: usize = 2;
    pub const HMM_INSERT_TO_MATCH: usize = 3;
    pub const HMM_INSERT_TO_INSERT: usize = 4;
    pub const HMM_DELETE_TO_MATCH: usize = 5;
    pub const HMM_DELETE_TO_DELETE: usize = 6;
    pub const HMM_NUM_TRANSITIONS: usize = 7;
}

lazy_static! {
    // the model section header, e.g. `HMM          A        C        G        T`
    static ref MODEL_START_RE: Regex = Regex::new(r"^HMM\s+A\s+").unwrap();
    // the background residue composition row
    static ref COMPO_RE: Regex = Regex::new(r"^\s+COMPO\s+").unwrap();
    // the end-of-model marker
    static ref MODEL_END_RE: Regex = Regex::new(r"^//").unwrap();
    // match emission rows carry the model position, one log probability per
    // residue, and the MAP, CONS, RF, MM, and CS annotation columns
    static ref AMINO_MATCH_RE: Regex = Regex::new(
        r"^ +(\d+)( +\d+\.\d+){20} +(\d+|-) ([a-zA-Z.]|-) ([a-zA-Z.]|-) [m-] ([a-zA-Z.]|-)$"
    )
    .unwrap();
    static ref DNA_MATCH_RE: Regex = Regex::new(
        r"^ +(\d+)( +\d+\.\d+){4} +(\d+|-) ([a-zA-Z.]|-) ([a-zA-Z.]|-) [m-] ([a-zA-Z.]|-)$"
    )
    .unwrap();
    // insert emission rows carry no annotation columns
    static ref AMINO_INSERT_RE: Regex = Regex::new(r"^ +( +\d+\.\d+){20}$").unwrap();
    static ref DNA_INSERT_RE: Regex = Regex::new(r"^ +( +\d+\.\d+){4}$").unwrap();
    // seven transition fields; the `*` sentinel is only legal for m->d and d->d
    static ref TRANSITION_RE: Regex = Regex::new(
        r"^ +( +\d+\.\d+){2} +(\d+\.\d+|\*)( +\d+\.\d+){3} +(\d+\.\d+|\*)$"
    )
    .unwrap();
}

/// The alphabet of the emission distributions in a P7HMM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    Amino,
    Dna,
}

// emission row grammars are tried in this order; the first that matches wins
const ALPHABET_CANDIDATES: [Alphabet; 2] = [Alphabet::Amino, Alphabet::Dna];

impl Alphabet {
    pub const fn size(&self) -> usize {
        match self {
            Alphabet::Amino => 20,
            Alphabet::Dna => 4,
        }
    }

    fn match_grammar(&self) -> &'static Regex {
        match self {
            Alphabet::Amino => &AMINO_MATCH_RE,
            Alphabet::Dna => &DNA_MATCH_RE,
        }
    }

    fn insert_grammar(&self) -> &'static Regex {
        match self {
            Alphabet::Amino => &AMINO_INSERT_RE,
            Alphabet::Dna => &DNA_INSERT_RE,
        }
    }
}

/// Errors produced while parsing a HMMER3 hmm file.
///
/// The first error aborts the parse; there is no recovery.
#[derive(Error, Debug)]
pub enum HmmParseError {
    #[error("line {line_number}: invalid match emission row for model position {position}: '{line}'")]
    MatchEmissionRow {
        position: usize,
        line_number: usize,
        line: String,
    },
    #[error("line {line_number}: invalid insert emission row: '{line}'")]
    InsertEmissionRow { line_number: usize, line: String },
    #[error("line {line_number}: invalid transition row: '{line}'")]
    TransitionRow { line_number: usize, line: String },
    #[error("no model section header found")]
    HeaderNotFound,
    #[error("model body truncated at line {line_number}")]
    TruncatedBody { line_number: usize },
    #[error("line {line_number}: failed to decode numeric token '{token}'")]
    NumericDecode { line_number: usize, token: String },
    #[error("failed to read input")]
    Io(#[from] std::io::Error),
}

/// The match, insert, and delete states anchored at one model position.
///
/// Emissions and transitions are stored as they appear on disk: negative
/// natural log probabilities, with `f32::INFINITY` marking an impossible
/// transition. The begin state (position 0) has no match state.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub match_emissions: Option<Vec<f32>>,
    pub insert_emissions: Vec<f32>,
    pub transitions: Vec<f32>,
    pub match_entropy: Option<f32>,
    pub insert_entropy: f32,
}

/// A parsed profile HMM with derived per-position statistics.
///
/// `nodes[0]` is the begin state; `nodes[i]` is model position i. The
/// normalized entropy vectors are aligned with `nodes` and hold `None`
/// exactly where the underlying entropy is undefined.
#[derive(Debug, Clone, Serialize)]
pub struct Hmm {
    pub nodes: Vec<Node>,
    pub norm_match_entropy: Vec<Option<f32>>,
    pub norm_insert_entropy: Vec<Option<f32>>,
}

/// Parses a profile HMM from a file on disk.
pub fn parse_hmm_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Hmm> {
    let file = File::open(&path).with_context(|| {
        format!(
            "failed to open hmm file: {}",
            path.as_ref().to_string_lossy()
        )
    })?;

    parse_hmm(BufReader::new(file)).with_context(|| {
        format!(
            "failed to parse hmm file: {}",
            path.as_ref().to_string_lossy()
        )
    })
}

/// Parses a profile HMM from any buffered reader.
///
/// The entire input is read before model construction begins.
pub fn parse_hmm<R: BufRead>(reader: R) -> Result<Hmm, HmmParseError> {
    let lines = reader.lines().collect::<Result<Vec<_>, _>>()?;
    build_model(&lines)
}

fn build_model(lines: &[String]) -> Result<Hmm, HmmParseError> {
    // scan forward for the `HMM  A ...` marker, then step over the
    // transition column header line that always follows it
    let header_idx = lines
        .iter()
        .position(|line| MODEL_START_RE.is_match(line))
        .ok_or(HmmParseError::HeaderNotFound)?;

    let mut cursor = header_idx + 2;

    // the background composition row is optional
    if let Some(line) = lines.get(cursor) {
        if COMPO_RE.is_match(line) {
            cursor += 1;
        }
    }

    // the begin state has insert emissions and transitions, but no match state
    let line = next_line(lines, cursor)?;
    let (insert_emissions, alphabet) = decode_insert_row(line, None, cursor + 1)?;
    let line = next_line(lines, cursor + 1)?;
    let transitions = decode_transition_row(line, cursor + 2)?;
    cursor += 2;

    let mut nodes = vec![Node {
        match_emissions: None,
        insert_entropy: entropy_bits(&insert_emissions),
        insert_emissions,
        transitions,
        match_entropy: None,
    }];

    // the body is groups of exactly three rows, one group per model
    // position, terminated by the `//` marker
    let mut position: usize = 1;
    while let Some(match_line) = lines.get(cursor) {
        if MODEL_END_RE.is_match(match_line) {
            break;
        }

        let insert_line = lines
            .get(cursor + 1)
            .filter(|line| !MODEL_END_RE.is_match(line))
            .ok_or(HmmParseError::TruncatedBody {
                line_number: cursor + 2,
            })?;
        let transition_line = lines
            .get(cursor + 2)
            .filter(|line| !MODEL_END_RE.is_match(line))
            .ok_or(HmmParseError::TruncatedBody {
                line_number: cursor + 3,
            })?;

        let match_emissions = decode_match_row(match_line, position, alphabet, cursor + 1)?;
        let (insert_emissions, _) = decode_insert_row(insert_line, Some(alphabet), cursor + 2)?;
        let transitions = decode_transition_row(transition_line, cursor + 3)?;

        nodes.push(Node {
            match_entropy: Some(entropy_bits(&match_emissions)),
            insert_entropy: entropy_bits(&insert_emissions),
            match_emissions: Some(match_emissions),
            insert_emissions,
            transitions,
        });

        position += 1;
        cursor += 3;
    }

    let norm_match_entropy = min_max_rescale(&nodes, |node| node.match_entropy);
    let norm_insert_entropy = min_max_rescale(&nodes, |node| Some(node.insert_entropy));

    Ok(Hmm {
        nodes,
        norm_match_entropy,
        norm_insert_entropy,
    })
}

fn next_line(lines: &[String], idx: usize) -> Result<&String, HmmParseError> {
    lines.get(idx).ok_or(HmmParseError::TruncatedBody {
        line_number: idx + 1,
    })
}

/// Validates a match emission row and decodes its log probabilities.
///
/// The embedded position field must agree with the running position counter.
fn decode_match_row(
    line: &str,
    position: usize,
    alphabet: Alphabet,
    line_number: usize,
) -> Result<Vec<f32>, HmmParseError> {
    let grammar_violation = || HmmParseError::MatchEmissionRow {
        position,
        line_number,
        line: line.to_string(),
    };

    let captures = alphabet
        .match_grammar()
        .captures(line)
        .ok_or_else(grammar_violation)?;

    if &captures[1] != position.to_string() {
        return Err(grammar_violation());
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    decode_tokens(&tokens[1..=alphabet.size()], line_number)
}

/// Validates an insert emission row and decodes its log probabilities.
///
/// When no alphabet has been established yet, the candidate grammars are
/// tried in order and the first that matches decides the alphabet for the
/// rest of the parse; emission rows of mixed sizes within one model are
/// rejected.
fn decode_insert_row(
    line: &str,
    alphabet: Option<Alphabet>,
    line_number: usize,
) -> Result<(Vec<f32>, Alphabet), HmmParseError> {
    let row_alphabet = ALPHABET_CANDIDATES
        .iter()
        .copied()
        .filter(|&candidate| alphabet.map_or(true, |locked| locked == candidate))
        .find(|candidate| candidate.insert_grammar().is_match(line))
        .ok_or_else(|| HmmParseError::InsertEmissionRow {
            line_number,
            line: line.to_string(),
        })?;

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let probs = decode_tokens(&tokens, line_number)?;

    Ok((probs, row_alphabet))
}

/// Validates a transition row and decodes its seven log probabilities.
fn decode_transition_row(line: &str, line_number: usize) -> Result<Vec<f32>, HmmParseError> {
    if !TRANSITION_RE.is_match(line) {
        return Err(HmmParseError::TransitionRow {
            line_number,
            line: line.to_string(),
        });
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    decode_tokens(&tokens, line_number)
}

/// Decodes whitespace separated probability tokens from a validated row.
///
/// The `*` sentinel marks an impossible transition, i.e. a probability of
/// exactly zero, and decodes to positive infinity.
fn decode_tokens(tokens: &[&str], line_number: usize) -> Result<Vec<f32>, HmmParseError> {
    tokens
        .iter()
        .map(|&token| {
            if token == "*" {
                Ok(f32::INFINITY)
            } else {
                token
                    .parse::<f32>()
                    .map_err(|_| HmmParseError::NumericDecode {
                        line_number,
                        token: token.to_string(),
                    })
            }
        })
        .collect()
}
