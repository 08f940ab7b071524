//! Line-level three-way merge
//!
//! Both sides are aligned against the base with an LCS diff (`similar`). Walking the
//! three files together splits them into stable chunks, where all three agree, and
//! unstable chunks in between. An unstable chunk changed on one side only takes that
//! side; one changed identically on both sides takes either; anything else is a
//! conflict and is rendered between markers.

use crate::areas::config::ConflictStyle;
use similar::{Algorithm, DiffOp, capture_diff_slices};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk<'a> {
    Clean(Vec<&'a [u8]>),
    Conflict {
        base: Vec<&'a [u8]>,
        ours: Vec<&'a [u8]>,
        theirs: Vec<&'a [u8]>,
    },
}

/// Names printed after the conflict markers
#[derive(Debug, Clone)]
pub struct ConflictLabels {
    pub ours: String,
    pub base: String,
    pub theirs: String,
}

impl Default for ConflictLabels {
    fn default() -> Self {
        ConflictLabels {
            ours: "ours".to_string(),
            base: "base".to_string(),
            theirs: "theirs".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedText<'a> {
    chunks: Vec<Chunk<'a>>,
}

impl<'a> MergedText<'a> {
    pub fn is_clean(&self) -> bool {
        self.chunks
            .iter()
            .all(|chunk| matches!(chunk, Chunk::Clean(_)))
    }

    pub fn chunks(&self) -> &[Chunk<'a>] {
        &self.chunks
    }

    pub fn conflict_count(&self) -> usize {
        self.chunks.len()
            - self
                .chunks
                .iter()
                .filter(|chunk| matches!(chunk, Chunk::Clean(_)))
                .count()
    }

    pub fn render(&self, labels: &ConflictLabels, style: ConflictStyle) -> Vec<u8> {
        let mut output = Vec::new();

        for chunk in &self.chunks {
            match chunk {
                Chunk::Clean(lines) => lines.iter().for_each(|line| output.extend_from_slice(line)),
                Chunk::Conflict { base, ours, theirs } => {
                    write_marker(&mut output, "<<<<<<<", &labels.ours);
                    write_lines(&mut output, ours);
                    if style == ConflictStyle::Diff3 {
                        write_marker(&mut output, "|||||||", &labels.base);
                        write_lines(&mut output, base);
                    }
                    output.extend_from_slice(b"=======\n");
                    write_lines(&mut output, theirs);
                    write_marker(&mut output, ">>>>>>>", &labels.theirs);
                }
            }
        }

        output
    }
}

fn write_marker(output: &mut Vec<u8>, marker: &str, label: &str) {
    output.extend_from_slice(format!("{marker} {label}\n").as_bytes());
}

fn write_lines(output: &mut Vec<u8>, lines: &[&[u8]]) {
    for line in lines {
        output.extend_from_slice(line);
    }
    // markers must start on their own line
    if lines.last().is_some_and(|line| !line.ends_with(b"\n")) {
        output.push(b'\n');
    }
}

pub fn split_lines(content: &[u8]) -> Vec<&[u8]> {
    content.split_inclusive(|&byte| byte == b'\n').collect()
}

/// 1-based base line number -> 1-based line number on the other side, for matched lines
fn line_matches(base: &[&[u8]], other: &[&[u8]]) -> HashMap<usize, usize> {
    let mut matches = HashMap::new();
    for op in capture_diff_slices(Algorithm::Lcs, base, other) {
        if let DiffOp::Equal {
            old_index,
            new_index,
            len,
        } = op
        {
            for offset in 0..len {
                matches.insert(old_index + offset + 1, new_index + offset + 1);
            }
        }
    }

    matches
}

pub fn merge<'a>(base: &'a [u8], ours: &'a [u8], theirs: &'a [u8]) -> MergedText<'a> {
    Diff3::new(split_lines(base), split_lines(ours), split_lines(theirs)).merge()
}

struct Diff3<'a> {
    base: Vec<&'a [u8]>,
    ours: Vec<&'a [u8]>,
    theirs: Vec<&'a [u8]>,
    match_ours: HashMap<usize, usize>,
    match_theirs: HashMap<usize, usize>,
    /// Lines consumed so far in each file
    line_base: usize,
    line_ours: usize,
    line_theirs: usize,
    chunks: Vec<Chunk<'a>>,
}

impl<'a> Diff3<'a> {
    fn new(base: Vec<&'a [u8]>, ours: Vec<&'a [u8]>, theirs: Vec<&'a [u8]>) -> Self {
        let match_ours = line_matches(&base, &ours);
        let match_theirs = line_matches(&base, &theirs);

        Diff3 {
            base,
            ours,
            theirs,
            match_ours,
            match_theirs,
            line_base: 0,
            line_ours: 0,
            line_theirs: 0,
            chunks: Vec::new(),
        }
    }

    fn merge(mut self) -> MergedText<'a> {
        loop {
            match self.find_next_mismatch() {
                Some(1) => match self.find_next_match() {
                    Some((base, ours, theirs)) => self.emit_chunk(base, ours, theirs),
                    None => {
                        self.emit_final_chunk();
                        break;
                    }
                },
                Some(offset) => self.emit_chunk(
                    self.line_base + offset,
                    self.line_ours + offset,
                    self.line_theirs + offset,
                ),
                None => {
                    self.emit_final_chunk();
                    break;
                }
            }
        }

        MergedText {
            chunks: self.chunks,
        }
    }

    fn in_bounds(&self, offset: usize) -> bool {
        self.line_base + offset <= self.base.len()
            || self.line_ours + offset <= self.ours.len()
            || self.line_theirs + offset <= self.theirs.len()
    }

    fn is_match(&self, matches: &HashMap<usize, usize>, consumed: usize, offset: usize) -> bool {
        matches.get(&(self.line_base + offset)) == Some(&(consumed + offset))
    }

    /// Offset of the first line after the current position where the three files stop
    /// agreeing; `None` once everything left is stable
    fn find_next_mismatch(&self) -> Option<usize> {
        let mut offset = 1;
        while self.in_bounds(offset)
            && self.is_match(&self.match_ours, self.line_ours, offset)
            && self.is_match(&self.match_theirs, self.line_theirs, offset)
        {
            offset += 1;
        }

        self.in_bounds(offset).then_some(offset)
    }

    /// Next base line matched on both sides, as 1-based line numbers in each file
    fn find_next_match(&self) -> Option<(usize, usize, usize)> {
        ((self.line_base + 1)..=self.base.len()).find_map(|base_line| {
            let ours = self.match_ours.get(&base_line)?;
            let theirs = self.match_theirs.get(&base_line)?;
            Some((base_line, *ours, *theirs))
        })
    }

    /// Emit everything before the given 1-based lines and move past it
    fn emit_chunk(&mut self, base: usize, ours: usize, theirs: usize) {
        self.write_chunk(
            self.base[self.line_base..base - 1].to_vec(),
            self.ours[self.line_ours..ours - 1].to_vec(),
            self.theirs[self.line_theirs..theirs - 1].to_vec(),
        );

        self.line_base = base - 1;
        self.line_ours = ours - 1;
        self.line_theirs = theirs - 1;
    }

    fn emit_final_chunk(&mut self) {
        self.write_chunk(
            self.base[self.line_base..].to_vec(),
            self.ours[self.line_ours..].to_vec(),
            self.theirs[self.line_theirs..].to_vec(),
        );
    }

    fn write_chunk(&mut self, base: Vec<&'a [u8]>, ours: Vec<&'a [u8]>, theirs: Vec<&'a [u8]>) {
        if base.is_empty() && ours.is_empty() && theirs.is_empty() {
            return;
        }

        let chunk = if ours == base || ours == theirs {
            Chunk::Clean(theirs)
        } else if theirs == base {
            Chunk::Clean(ours)
        } else {
            Chunk::Conflict { base, ours, theirs }
        };

        // keep adjacent clean runs together
        match (self.chunks.last_mut(), chunk) {
            (Some(Chunk::Clean(previous)), Chunk::Clean(lines)) => previous.extend(lines),
            (_, chunk) => self.chunks.push(chunk),
        }
    }
}
