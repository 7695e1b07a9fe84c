use std::collections::HashMap;

pub trait StringTable {
    fn to_str(&self, id: usize) -> Option<&str>;
    fn to_id(&self, s: &str) -> Option<usize>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait TextVectorizer {
    fn find_or_insert(&mut self, key: &str) -> usize;
}

/// Dense, insertion-ordered mapping between labels and indices.
///
/// States and symbols are identified by their label everywhere outside the
/// inference code; inside it they are plain indices into the probability
/// tables. The index of a label is its declaration order, which is also the
/// order used for Viterbi tie-breaking.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Quark {
    v: Vec<String>,
    m: HashMap<String, usize>,
}

impl StringTable for Quark {
    fn to_str(&self, id: usize) -> Option<&str> {
        self.v.get(id).map(|x| x.as_str())
    }

    fn to_id(&self, s: &str) -> Option<usize> {
        self.m.get(s).copied()
    }

    fn len(&self) -> usize {
        self.v.len()
    }
}

impl TextVectorizer for Quark {
    fn find_or_insert(&mut self, key: &str) -> usize {
        if let Some(&idx) = self.m.get(key) {
            return idx;
        }
        let idx = self.v.len();
        self.m.insert(key.to_string(), idx);
        self.v.push(key.to_string());
        idx
    }
}

impl Quark {
    /// Builds a table from labels that must all be distinct.
    ///
    /// Returns the first repeated label on failure.
    pub fn unique<S: AsRef<str>>(labels: &[S]) -> std::result::Result<Self, String> {
        let mut quark = Quark::default();
        for s in labels {
            let s = s.as_ref();
            if quark.to_id(s).is_some() {
                return Err(s.to_string());
            }
            quark.find_or_insert(s);
        }
        Ok(quark)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.v.iter().map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.v
    }
}
