use std::{
    collections::BTreeMap,
    convert::TryFrom,
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{hmm::Model, Error, Result};

type Row = BTreeMap<String, f64>;

/// The persisted, label-keyed form of a [`Model`].
///
/// ```json
/// {
///   "states": ["rainy", "sunny"],
///   "vocabulary": ["walk", "shop", "clean"],
///   "initial_probabilities": {"rainy": 0.6, "sunny": 0.4},
///   "transition_probabilities": {"rainy": {"rainy": 0.7, "sunny": 0.3}, ...},
///   "emission_probabilities": {"rainy": {"walk": 0.1, ...}, ...}
/// }
/// ```
/// Omitted entries are zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub states: Vec<String>,
    pub vocabulary: Vec<String>,
    #[serde(default)]
    pub initial_probabilities: Row,
    #[serde(default)]
    pub transition_probabilities: BTreeMap<String, Row>,
    #[serde(default)]
    pub emission_probabilities: BTreeMap<String, Row>,
}

/// Scatters a label-keyed row into a dense one.
fn dense(
    table: &str,
    row: &Row,
    columns: &[String],
    index: impl Fn(&str) -> Option<usize>,
) -> Result<Vec<f64>> {
    let mut v = vec![0.0; columns.len()];
    for (key, &p) in row {
        let idx = index(key.as_str()).ok_or_else(|| {
            Error::MalformedModel(format!("{table} refers to undeclared '{key}'"))
        })?;
        v[idx] = p;
    }
    Ok(v)
}

impl TryFrom<&ModelRecord> for Model {
    type Error = Error;

    fn try_from(record: &ModelRecord) -> Result<Self> {
        let state_index = |s: &str| record.states.iter().position(|x| x == s);
        let symbol_index = |s: &str| record.vocabulary.iter().position(|x| x == s);
        let empty = Row::new();

        for (kind, table) in [
            ("transition_probabilities", &record.transition_probabilities),
            ("emission_probabilities", &record.emission_probabilities),
        ] {
            if let Some(key) = table.keys().find(|k| state_index(k.as_str()).is_none()) {
                return Err(Error::MalformedModel(format!(
                    "{kind} has a row for undeclared state '{key}'"
                )));
            }
        }

        let initial = dense(
            "initial_probabilities",
            &record.initial_probabilities,
            &record.states,
            state_index,
        )?;
        let mut transition = Vec::with_capacity(record.states.len() * record.states.len());
        let mut emission = Vec::with_capacity(record.states.len() * record.vocabulary.len());
        for s in &record.states {
            let row = record.transition_probabilities.get(s).unwrap_or(&empty);
            transition.extend(dense(
                &format!("transition row '{s}'"),
                row,
                &record.states,
                state_index,
            )?);
            let row = record.emission_probabilities.get(s).unwrap_or(&empty);
            emission.extend(dense(
                &format!("emission row '{s}'"),
                row,
                &record.vocabulary,
                symbol_index,
            )?);
        }
        Model::new(
            record.states.as_slice(),
            record.vocabulary.as_slice(),
            initial,
            transition,
            emission,
        )
    }
}

impl TryFrom<ModelRecord> for Model {
    type Error = Error;

    fn try_from(record: ModelRecord) -> Result<Self> {
        Model::try_from(&record)
    }
}

impl From<&Model> for ModelRecord {
    fn from(model: &Model) -> Self {
        let states = model.states().labels().to_vec();
        let vocabulary = model.vocabulary().labels().to_vec();
        let keyed = |labels: &[String], row: &[f64]| -> Row {
            labels.iter().cloned().zip(row.iter().copied()).collect()
        };
        let initial_probabilities = keyed(&states, model.initial_probabilities());
        let transition_probabilities = states
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), keyed(&states, model.transition_row(i))))
            .collect();
        let emission_probabilities = states
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), keyed(&vocabulary, model.emission_row(i))))
            .collect();
        Self {
            states,
            vocabulary,
            initial_probabilities,
            transition_probabilities,
            emission_probabilities,
        }
    }
}

impl Model {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let record: ModelRecord = serde_json::from_reader(reader)?;
        Model::try_from(record)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("reading model from {}", path.display());
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &ModelRecord::from(self))?;
        Ok(())
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        log::info!("writing model to {}", path.display());
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
