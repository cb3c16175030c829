use serde::Serialize;

use crate::metrics::{Payload, Row};

/// A validated row with the prediction that sits at its position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub row: Row,
    pub prediction: Option<f64>,
}

/// One payload in chronological order, ready for the history window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub samples: Vec<Sample>,
    /// Rows dropped because they failed validation.
    pub dropped: usize,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> + '_ {
        self.samples.iter().map(|sample| &sample.row)
    }
}

/// Turns a newest-first payload into a chronological batch.
///
/// Rows and predictions are reversed independently and then paired by
/// position; a prediction stream shorter than the rows leaves the trailing
/// samples without one. An invalid row is dropped together with the
/// prediction at its position so the pairs after it stay aligned.
pub fn ingest(payload: Payload) -> Batch {
    let Payload {
        mut rows,
        mut predictions,
    } = payload;
    rows.reverse();
    predictions.reverse();

    let mut batch = Batch::default();
    for (position, row) in rows.into_iter().enumerate() {
        let prediction = predictions.get(position).copied().flatten();
        match row {
            Some(row) => batch.samples.push(Sample { row, prediction }),
            None => batch.dropped += 1,
        }
    }
    batch
}
