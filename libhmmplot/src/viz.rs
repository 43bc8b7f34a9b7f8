use std::io::Write;

use anyhow::Result;

use crate::alphabet::{AMINO_ALPHABET, DNA_ALPHABET};
use crate::structs::hmm::constants::{
    HMM_DELETE_TO_DELETE, HMM_DELETE_TO_MATCH, HMM_INSERT_TO_INSERT, HMM_INSERT_TO_MATCH,
    HMM_MATCH_TO_DELETE, HMM_MATCH_TO_INSERT, HMM_MATCH_TO_MATCH,
};
use crate::structs::Hmm;

const DOCUMENT_HEADER: &str = r"\documentclass[tikz,crop,10pt]{standalone}
\usetikzlibrary{positioning}
\usetikzlibrary{matrix}
\usetikzlibrary{arrows.meta}
\usetikzlibrary{shapes.geometric}
\newlength\hdist
\newlength\vdist
\newlength\lwidth
\setlength\hdist{1mm}
\setlength\vdist{1mm}
\setlength\lwidth{.0125mm}
\colorlet{mcolor}{orange}
\colorlet{icolor}{green}
\begin{document}
    \begin{tikzpicture}
";

const PICTURE_SETTINGS: &str = r"    [
    % Overall settings
    every node/.append style={scale=0.05},
    font=\small,
    line width=.0125mm,
    % Probability text nodes
    prob/.style={inner sep=.5mm, fill=white, midway},
    loopprob/.style={prob, above=.03mm},
    dprob/.style={prob, near end},
    % General states
    state/.style={minimum size=2.0em, inner sep=0mm, draw},
    % General emitting states
    emitting/.style={state, circle},
    % General non-emitting states
    nonemitting/.style={state, diamond},
    % m-state settings
    mstate/.style={emitting, minimum size=2.0em},
    % i-state settings
    istate/.style={emitting},
    % d-state settings
    dstate/.style={nonemitting, fill=red},
    % Arrows
    arr/.tip={Triangle[scale=.1]},
    % Transitions
    trans/.style=[-arr],
    ]
";

const DOCUMENT_FOOTER: &str = "    \\end{tikzpicture}\n\\end{document}\n";

/// Writes a complete standalone TikZ document that draws `hmm` as a state
/// diagram: one column of match/insert/delete states per model position,
/// emission probability tables, and transition arcs.
///
/// State fills are driven by the normalized entropies: low entropy means
/// high color intensity. The input is taken to satisfy the `Hmm`
/// invariants; no validation happens here.
pub fn write_document<W: Write>(out: &mut W, hmm: &Hmm) -> Result<()> {
    out.write_all(DOCUMENT_HEADER.as_bytes())?;
    out.write_all(PICTURE_SETTINGS.as_bytes())?;

    for pos in 0..=hmm.nodes.len() {
        write_position(out, hmm, pos)?;
    }
    for pos in 0..hmm.nodes.len() {
        write_transitions(out, hmm, pos)?;
    }

    out.write_all(DOCUMENT_FOOTER.as_bytes())?;
    Ok(())
}

/// Color intensity percentage for a normalized entropy value.
fn intensity(norm_entropy: Option<f32>) -> u32 {
    (100.0 * (1.0 - norm_entropy.unwrap_or(1.0))).floor() as u32
}

/// Writes the state nodes and emission tables anchored at one position.
///
/// Position 0 is the begin state `B`; the position one past the last node
/// is the end state `E`. Both are silent and drawn gray.
fn write_position<W: Write>(out: &mut W, hmm: &Hmm, pos: usize) -> Result<()> {
    let num_nodes = hmm.nodes.len();

    let (m_text, m_fill) = if pos == 0 {
        ("B".to_string(), "gray!50".to_string())
    } else if pos == num_nodes {
        ("E".to_string(), "gray!50".to_string())
    } else {
        (
            format!("$m_{{{pos}}}$"),
            format!("mcolor!{}", intensity(hmm.norm_match_entropy[pos])),
        )
    };

    let placement = if pos == 0 {
        String::new()
    } else {
        format!(", right=\\hdist of m{}", pos - 1)
    };

    writeln!(
        out,
        "        \\node[mstate, fill={m_fill}{placement}] (m{pos}) {{{m_text}}};"
    )?;

    if pos < num_nodes {
        let i_fill = format!("icolor!{}", intensity(hmm.norm_insert_entropy[pos]));
        writeln!(
            out,
            "        \\node[istate, fill = {i_fill}, above right=\\vdist and .5\\hdist of m{pos}] (i{pos}) {{$i_{{{pos}}}$}};"
        )?;
        writeln!(
            out,
            "        \\node[dstate, below=\\vdist of m{pos}] (d{pos}) {{$d_{{{pos}}}$}};"
        )?;
    }

    if pos > 0 && pos < num_nodes {
        if let Some(emissions) = &hmm.nodes[pos].match_emissions {
            write_emission_table(out, emissions, &format!("below=1.8mm of m{pos}"), "mcolor")?;
        }
    }

    if pos < num_nodes {
        write_emission_table(
            out,
            &hmm.nodes[pos].insert_emissions,
            &format!("above=.8mm of i{pos}"),
            "icolor",
        )?;
    }

    Ok(())
}

/// Writes the emission probability table for one state: a residue symbol
/// with a fill proportional to its probability, next to the probability
/// itself. The 20-symbol alphabet is laid out as two columns of ten rows,
/// the 4-symbol alphabet as a single column.
fn write_emission_table<W: Write>(
    out: &mut W,
    neg_ln_probs: &[f32],
    anchor: &str,
    color: &str,
) -> Result<()> {
    let probs: Vec<f32> = neg_ln_probs.iter().map(|&val| (-val).exp()).collect();

    let cell = |idx: usize, symbol: &str| {
        format!(
            "|[circle, fill={}!{}]|{} & ${:.3}$",
            color,
            (100.0 * probs[idx]).floor() as u32,
            symbol,
            probs[idx]
        )
    };

    writeln!(
        out,
        "        \\matrix [inner sep=.05mm, outer sep=0pt, {anchor}, matrix of nodes, nodes={{inner sep=.2mm, font=\\tiny, minimum size=1.0em}}, row sep=.04mm] (m) {{%"
    )?;

    if probs.len() == AMINO_ALPHABET.len() {
        for row in 0..10 {
            writeln!(
                out,
                "            {} & {}\\\\",
                cell(row, AMINO_ALPHABET[row]),
                cell(row + 10, AMINO_ALPHABET[row + 10]),
            )?;
        }
    } else {
        for (idx, symbol) in DNA_ALPHABET.iter().enumerate() {
            writeln!(out, "            {}\\\\", cell(idx, symbol))?;
        }
    }

    writeln!(out, "        }};")?;
    writeln!(
        out,
        "        \\draw [rounded corners=.1mm] (m.south west) rectangle (m.north east);"
    )?;

    Ok(())
}

/// Writes the transition arcs leaving the states of one position.
///
/// Impossible transitions (probability zero, `*` on disk) draw nothing.
fn write_transitions<W: Write>(out: &mut W, hmm: &Hmm, pos: usize) -> Result<()> {
    let probs: Vec<f32> = hmm.nodes[pos]
        .transitions
        .iter()
        .map(|&val| (-val).exp())
        .collect();

    let next = pos + 1;

    write_arc(out, probs[HMM_MATCH_TO_MATCH], &format!("(m{pos}) -- (m{next})"), "prob")?;
    write_arc(out, probs[HMM_MATCH_TO_INSERT], &format!("(m{pos}) -- (i{pos})"), "prob")?;
    write_arc(out, probs[HMM_MATCH_TO_DELETE], &format!("(m{pos}) -- (d{next})"), "dprob")?;
    write_arc(out, probs[HMM_INSERT_TO_MATCH], &format!("(i{pos}) -- (m{next})"), "prob")?;

    // the insert state loops back onto itself
    let p = probs[HMM_INSERT_TO_INSERT];
    if p > 0.0 {
        writeln!(
            out,
            "        \\draw [trans, line width={}\\lwidth] (i{pos}) to [out=60,in=120,looseness=8] node [loopprob] {{${p:.3}$}} (i{pos}) ;",
            1.0 + 2.0 * p
        )?;
    }

    write_arc(out, probs[HMM_DELETE_TO_MATCH], &format!("(d{pos}) -- (m{next})"), "dprob")?;
    write_arc(out, probs[HMM_DELETE_TO_DELETE], &format!("(d{pos}) -- (d{next})"), "prob")?;

    Ok(())
}

fn write_arc<W: Write>(out: &mut W, p: f32, path: &str, label_style: &str) -> Result<()> {
    if p > 0.0 {
        writeln!(
            out,
            "        \\draw [trans, line width={}\\lwidth] {path} node [{label_style}] {{${p:.3}$}};",
            1.0 + 2.0 * p
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::hmm::parse_hmm;

    const MINI_DNA_HMM: &str = "\
HMM          A        C        G        T
            m->m     m->i     m->d     i->m     i->i     d->m     d->d
          1.38629  1.38629  1.38629  1.38629
          0.03526  3.71669  4.43854  0.61958  0.77255  0.00000        *
      1   0.01467  5.21954  5.38964  4.66521      1 a - - -
          1.38629  1.38629  1.38629  1.38629
          0.05129  3.31703        *  0.61958  0.77255  0.00000        *
//
";

    #[test]
    fn test_write_document() -> anyhow::Result<()> {
        let hmm = parse_hmm(MINI_DNA_HMM.as_bytes())?;

        let mut buffer: Vec<u8> = vec![];
        write_document(&mut buffer, &hmm)?;
        let tex = String::from_utf8(buffer)?;

        assert!(tex.starts_with("\\documentclass"));
        assert!(tex.ends_with("\\end{document}\n"));

        // begin, one model position, end
        assert!(tex.contains("(m0) {B};"));
        assert!(tex.contains("(m1) {$m_{1}$};"));
        assert!(tex.contains("(m2) {E};"));

        // the 4-symbol emission tables list exactly the nucleotide symbols
        assert!(tex.contains("|A &"));
        assert!(tex.contains("|T &"));
        assert!(!tex.contains("|Y &"));

        Ok(())
    }

    #[test]
    fn test_impossible_transitions_draw_nothing() -> anyhow::Result<()> {
        let hmm = parse_hmm(MINI_DNA_HMM.as_bytes())?;

        let mut buffer: Vec<u8> = vec![];
        write_document(&mut buffer, &hmm)?;
        let tex = String::from_utf8(buffer)?;

        // both d->d transitions are `*`, so no d -- d arc may appear
        assert!(!tex.contains("(d0) -- (d1)"));
        assert!(!tex.contains("(d1) -- (d2)"));

        // the m->m arcs have probability near 1 and must appear
        assert!(tex.contains("(m0) -- (m1) node [prob]"));
        assert!(tex.contains("(m1) -- (m2) node [prob]"));

        Ok(())
    }

    #[test]
    fn test_amino_emission_table_layout() -> anyhow::Result<()> {
        let uniform = vec![2.99573f32; 20];

        let mut buffer: Vec<u8> = vec![];
        write_emission_table(&mut buffer, &uniform, "below=1.8mm of m1", "mcolor")?;
        let tex = String::from_utf8(buffer)?;

        // two columns of ten rows, first row pairs A with M
        assert_eq!(tex.matches("\\\\").count(), 10);
        assert!(tex.contains("|A &"));
        assert!(tex.contains("|M &"));
        assert!(tex.contains("$0.050$"));

        Ok(())
    }
}
