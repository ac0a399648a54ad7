//! Rank a database of sequences by how well a reference-trained
//! finite-context model compresses each of them. The model is built once
//! and shared read-only; the database is split into disjoint contiguous
//! partitions, one worker per partition, so scoring needs no locks at
//! all. Scores are normalized compression ratios: lower is closer to the
//! reference.
#[macro_use]
extern crate log;
extern crate context_model;
extern crate rayon;
use context_model::FiniteContextModel;
use std::io;
use std::io::Write;

/// One database record. `score` stays `None` until the dispatcher has
/// scored the record; 0 is a legitimate score, not an unset marker.
#[derive(Debug, Clone)]
pub struct SequenceRecord {
    pub name: String,
    pub seq: Vec<u8>,
    pub score: Option<f64>,
}

impl SequenceRecord {
    pub fn new(name: String, seq: Vec<u8>) -> Self {
        Self {
            name,
            seq,
            score: None,
        }
    }
}

/// Keep only the upper-case DNA bases; every other byte is dropped.
pub fn filter_bases(text: &[u8]) -> Vec<u8> {
    text.iter()
        .copied()
        .filter(|base| match base {
            b'A' | b'C' | b'G' | b'T' => true,
            _ => false,
        })
        .collect()
}

/// Split raw database text into records. A record starts at a `@`; the
/// rest of that line is the identifier, and the following lines up to the
/// next `@` are sequence text, concatenated and filtered to the DNA
/// alphabet. Bytes before the first `@` are ignored.
pub fn parse_database(text: &[u8]) -> Vec<SequenceRecord> {
    let mut chunks = text.split(|&b| b == b'@');
    chunks.next();
    chunks
        .map(|chunk| {
            let mut lines = chunk.splitn(2, |&b| b == b'\n');
            let name = String::from_utf8_lossy(lines.next().unwrap_or(&[]))
                .trim()
                .to_string();
            let seq = filter_bases(lines.next().unwrap_or(&[]));
            SequenceRecord::new(name, seq)
        })
        .collect()
}

// Size of each worker's contiguous partition. The first `len % workers`
// workers take one record more than the rest; together the partitions
// cover the records exactly once, in order.
fn partition_sizes(len: usize, workers: usize) -> Vec<usize> {
    let chunk = len / workers;
    let remainder = len % workers;
    (0..workers)
        .map(|w| chunk + if w < remainder { 1 } else { 0 })
        .collect()
}

/// Score every record in place against the shared model. `workers` is
/// clamped to the record count so no worker holds an empty partition.
/// Returns only after every worker has finished; afterwards every
/// record's score is set, exactly once, by exactly one worker.
pub fn score_records(records: &mut [SequenceRecord], model: &FiniteContextModel, workers: usize) {
    if records.is_empty() {
        return;
    }
    let workers = workers.max(1).min(records.len());
    debug!("Scoring {} records on {} workers.", records.len(), workers);
    rayon::scope(|scope| {
        let mut rest = records;
        for size in partition_sizes(rest.len(), workers) {
            let (part, tail) = rest.split_at_mut(size);
            rest = tail;
            scope.spawn(move |_| {
                for record in part.iter_mut() {
                    record.score = Some(model.nrc(&record.seq));
                }
            });
        }
    });
}

/// Sort ascending by score and keep the first `top` records. The sort is
/// stable, so records with equal scores keep their database order; `top`
/// beyond the database size reports everything.
pub fn rank(mut records: Vec<SequenceRecord>, top: usize) -> Vec<SequenceRecord> {
    records.sort_by(|a, b| {
        let x = a.score.unwrap_or(std::f64::INFINITY);
        let y = b.score.unwrap_or(std::f64::INFINITY);
        x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal)
    });
    records.truncate(top);
    records
}

/// One line per record: score, separator, identifier.
pub fn write_results<W: Write>(
    out: &mut W,
    records: &[SequenceRecord],
    csv: bool,
) -> io::Result<()> {
    let separator = if csv { ',' } else { '\t' };
    for record in records {
        if let Some(score) = record.score {
            writeln!(out, "{:.6}{}{}", score, separator, record.name)?;
        }
    }
    Ok(())
}
