use std::{
    convert::TryFrom,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::{hmm::Model, Error, Result};

/// One observation sequence, optionally with its reference state labels.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Sequence {
    pub symbols: Vec<String>,
    /// Reference states; empty for unlabeled sequences.
    pub states: Vec<String>,
}

impl Sequence {
    pub fn push(&mut self, symbol: &str, state: Option<&str>) {
        match state {
            Some(state) if self.states.len() == self.symbols.len() => {
                self.states.push(state.to_string())
            }
            Some(_) => log::warn!(
                "labeled item after unlabeled ones at position {}, label ignored",
                self.symbols.len()
            ),
            None if !self.states.is_empty() => {
                log::warn!(
                    "unlabeled item at position {}, dropping the labels of this sequence",
                    self.symbols.len()
                );
                self.states.clear();
            }
            None => {}
        }
        self.symbols.push(symbol.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_labeled(&self) -> bool {
        !self.is_empty() && self.states.len() == self.symbols.len()
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
        self.states.clear();
    }

    /// Symbol ids of this sequence under `model`.
    pub fn observations(&self, model: &Model) -> Result<Vec<usize>> {
        model.observations(self.symbols.as_slice())
    }
}

/// A corpus of observation sequences.
///
/// The text format has one item per line, `SYMBOL` or `STATE<TAB>SYMBOL`,
/// and an empty line after each sequence.
#[derive(Debug, Default)]
pub struct Dataset {
    pub seqs: Vec<Sequence>,
}

impl Dataset {
    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let mut ds = Dataset::default();
        let mut seq = Sequence::default();
        for line in reader.lines() {
            ds.feed(&mut seq, &line?);
        }
        ds.finish(seq);
        log::info!(
            "read {} sequences, {} items",
            ds.len(),
            ds.total_items()
        );
        Ok(ds)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("reading dataset from {}", path.display());
        Self::read(BufReader::new(File::open(path)?))
    }

    fn feed(&mut self, seq: &mut Sequence, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            self.finish(std::mem::take(seq));
            return;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        match *fields.as_slice() {
            [symbol] => seq.push(symbol, None),
            [state, symbol] => seq.push(symbol, Some(state)),
            _ => log::warn!("invalid line: {line}"),
        }
    }

    fn finish(&mut self, seq: Sequence) {
        if !seq.is_empty() {
            self.seqs.push(seq);
        }
    }

    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    pub fn max_length(&self) -> usize {
        self.seqs.iter().map(|x| x.len()).max().unwrap_or_default()
    }

    pub fn total_items(&self) -> usize {
        self.seqs.iter().map(|x| x.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sequence> {
        self.seqs.iter()
    }
}

impl TryFrom<File> for Dataset {
    type Error = Error;

    fn try_from(f: File) -> Result<Self> {
        Self::read(BufReader::new(f))
    }
}

impl<'a> From<std::str::Lines<'a>> for Dataset {
    fn from(lines: std::str::Lines<'a>) -> Self {
        let mut ds = Dataset::default();
        let mut seq = Sequence::default();
        for line in lines {
            ds.feed(&mut seq, line);
        }
        ds.finish(seq);
        ds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_lines() {
        let s = "rainy\twalk
        sunny\tshop

        walk
        clean\n\n";
        let ds = Dataset::from(s.lines());
        assert_eq!(ds.len(), 2);
        assert!(ds.seqs[0].is_labeled());
        assert_eq!(ds.seqs[0].states, vec!["rainy", "sunny"]);
        assert!(!ds.seqs[1].is_labeled());
        assert_eq!(ds.seqs[1].symbols, vec!["walk", "clean"]);
        assert_eq!(ds.max_length(), 2);
        assert_eq!(ds.total_items(), 4);
    }

    #[test]
    fn last_sequence_without_blank_line() {
        let ds = Dataset::read("a\nb\n\nc".as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.seqs[1].symbols, vec!["c"]);
    }

    #[test]
    fn mixed_labels_are_dropped() {
        let ds = Dataset::from("s\tx\ny\ns\tz".lines());
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.seqs[0].len(), 3);
        assert!(!ds.seqs[0].is_labeled());
    }

    #[test]
    fn skip_invalid_lines() {
        let ds = Dataset::from("s\tx\textra\ns\ty".lines());
        assert_eq!(ds.seqs[0].symbols, vec!["y"]);
        assert!(ds.seqs[0].is_labeled());
    }
}
