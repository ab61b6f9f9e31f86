//! Fixed-width DNE logradouro line decoder
//!
//! Decodes one raw line of a `*_LOGRADOUROS.TXT` snapshot file into an
//! [`AddressRecord`], or rejects it. The DNE "GU" release mixes several
//! record types in one file; only logradouro records (leading `D`) carry
//! addresses, everything else is ignored.
//!
//! # Line format
//!
//! Latin-1 (ISO-8859-1) text, one record per line, fields at fixed byte
//! offsets. The offset table below is the published format of the file and
//! must not be adjusted: it is an external contract, byte for byte.

use std::ops::Range;

use crate::record::{normalize_spaces, AddressRecord};

/// Record-type marker of a logradouro line.
const SENTINEL: u8 = b'D';

// Byte offsets of the fields we extract (half-open ranges).
const REGION: Range<usize> = 1..3;
const CITY: Range<usize> = 17..89;
const NEIGHBORHOOD_INITIAL: Range<usize> = 102..174;
const NEIGHBORHOOD_FINAL: Range<usize> = 187..259;
const STREET_TYPE: Range<usize> = 259..285;
const STREET_PREPOSITION: Range<usize> = 285..288;
const STREET_TITLE: Range<usize> = 288..360;
const STREET_NAME: Range<usize> = 374..446;
const CEP: Range<usize> = 518..526;

/// Decode one raw snapshot line.
///
/// Returns `None` for empty lines, non-logradouro record types, and lines
/// without a postcode. "Not a valid record" is an expected, high-frequency
/// outcome here, not an error.
pub fn decode(raw: &[u8]) -> Option<AddressRecord> {
    if raw.first() != Some(&SENTINEL) {
        return None;
    }

    let cep = field(raw, CEP);
    if cep.is_empty() {
        return None;
    }

    let neighborhood_initial = field(raw, NEIGHBORHOOD_INITIAL);
    let neighborhood = if neighborhood_initial.is_empty() {
        field(raw, NEIGHBORHOOD_FINAL)
    } else {
        neighborhood_initial
    };

    let street_parts = [
        field(raw, STREET_TYPE),
        field(raw, STREET_PREPOSITION),
        field(raw, STREET_TITLE),
        field(raw, STREET_NAME),
    ];
    let street = normalize_spaces(
        &street_parts
            .iter()
            .filter(|part| !part.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" "),
    );

    Some(AddressRecord {
        cep,
        street,
        city: field(raw, CITY),
        region: field(raw, REGION),
        neighborhood,
    })
}

/// Extract a fixed-offset field: clamp the range to the line length, decode
/// Latin-1, normalize whitespace. A line too short for the field yields an
/// empty string.
fn field(raw: &[u8], range: Range<usize>) -> String {
    let start = range.start.min(raw.len());
    let end = range.end.min(raw.len());
    normalize_spaces(&latin1(&raw[start..end]))
}

/// Decode Latin-1 bytes. Every byte maps directly to the code point of the
/// same value, so this never fails and never drops input.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a 540-byte logradouro line with the given Latin-1 strings
    /// placed at their byte offsets.
    fn golden_line(fields: &[(usize, &[u8])]) -> Vec<u8> {
        let mut line = vec![b' '; 540];
        line[0] = SENTINEL;
        for &(offset, bytes) in fields {
            line[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        line
    }

    fn full_line() -> Vec<u8> {
        golden_line(&[
            (REGION.start, b"SP"),
            (CITY.start, b"Sao Paulo"),
            (NEIGHBORHOOD_INITIAL.start, b"Se"),
            (NEIGHBORHOOD_FINAL.start, b"Centro"),
            (STREET_TYPE.start, b"Praca"),
            (STREET_TITLE.start, b"Doutor"),
            (STREET_NAME.start, b"Joao Mendes"),
            (CEP.start, b"01501000"),
        ])
    }

    #[test]
    fn rejects_empty_line() {
        assert_eq!(decode(b""), None);
    }

    #[test]
    fn rejects_non_sentinel_record_types() {
        for sentinel in [b'A', b'C', b'E', b'N'] {
            let mut line = full_line();
            line[0] = sentinel;
            assert_eq!(decode(&line), None, "type {} must be ignored", sentinel as char);
        }
    }

    #[test]
    fn rejects_missing_cep() {
        let line = golden_line(&[(CITY.start, b"Sao Paulo")]);
        assert_eq!(decode(&line), None);
    }

    #[test]
    fn rejects_line_too_short_for_cep() {
        let mut line = full_line();
        line.truncate(500);
        assert_eq!(decode(&line), None);
    }

    #[test]
    fn extracts_fields_at_offsets() {
        let record = decode(&full_line()).unwrap();
        assert_eq!(record.cep, "01501000");
        assert_eq!(record.region, "SP");
        assert_eq!(record.city, "Sao Paulo");
        assert_eq!(record.neighborhood, "Se");
        assert_eq!(record.street, "Praca Doutor Joao Mendes");
    }

    #[test]
    fn street_skips_empty_subfields() {
        // No preposition and no title: remaining parts join with one space.
        let line = golden_line(&[
            (STREET_TYPE.start, b"Rua"),
            (STREET_NAME.start, b"Direita"),
            (CEP.start, b"01002000"),
        ]);
        let record = decode(&line).unwrap();
        assert_eq!(record.street, "Rua Direita");
    }

    #[test]
    fn street_keeps_preposition_when_present() {
        let line = golden_line(&[
            (STREET_TYPE.start, b"Largo"),
            (STREET_PREPOSITION.start, b"do"),
            (STREET_NAME.start, b"Arouche"),
            (CEP.start, b"01219010"),
        ]);
        let record = decode(&line).unwrap();
        assert_eq!(record.street, "Largo do Arouche");
    }

    #[test]
    fn neighborhood_falls_back_to_final_field() {
        let line = golden_line(&[
            (NEIGHBORHOOD_FINAL.start, b"Bela Vista"),
            (CEP.start, b"01310100"),
        ]);
        let record = decode(&line).unwrap();
        assert_eq!(record.neighborhood, "Bela Vista");
    }

    #[test]
    fn neighborhood_initial_wins_over_final() {
        let record = decode(&full_line()).unwrap();
        assert_eq!(record.neighborhood, "Se");
    }

    #[test]
    fn normalizes_internal_whitespace() {
        let line = golden_line(&[
            (CITY.start, b"Rio  de   Janeiro"),
            (CEP.start, b"20010000"),
        ]);
        let record = decode(&line).unwrap();
        assert_eq!(record.city, "Rio de Janeiro");
    }

    #[test]
    fn decodes_latin1_bytes() {
        // "São Paulo" and "Sé" in Latin-1 (0xE3 = ã, 0xE9 = é).
        let line = golden_line(&[
            (CITY.start, b"S\xe3o Paulo"),
            (NEIGHBORHOOD_INITIAL.start, b"S\xe9"),
            (CEP.start, b"01001000"),
        ]);
        let record = decode(&line).unwrap();
        assert_eq!(record.city, "São Paulo");
        assert_eq!(record.neighborhood, "Sé");
    }

    #[test]
    fn cep_is_trimmed() {
        let mut line = full_line();
        line[CEP.start] = b' ';
        let record = decode(&line).unwrap();
        assert_eq!(record.cep, "1501000");
    }
}
