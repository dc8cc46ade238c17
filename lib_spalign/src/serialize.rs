//! Compact byte-buffer format for caching aligned compartments.
//!
//! All integers are little-endian; strings are NUL-terminated. Each segment
//! is framed by a u32 length so a reader can skip records without decoding
//! them.

use hit_filter::Strand;

use crate::engine::AlignedCompartment;
use crate::error::{Error, Result};
use crate::segment::{Exon, Gap, GAP_TAG, Segment};

pub fn encode(compartment: &AlignedCompartment) -> Vec<u8> {
    let mut buffer = Vec::new();
    put_u32(&mut buffer, compartment.id);
    put_u8(&mut buffer, compartment.error as u8);
    put_cstr(&mut buffer, &compartment.message);
    put_u8(&mut buffer, strand_to_u8(compartment.query_strand));
    put_u8(&mut buffer, strand_to_u8(compartment.subj_strand));

    for segment in &compartment.segments {
        let body = encode_segment(segment);
        put_u32(&mut buffer, body.len() as u32);
        buffer.extend_from_slice(&body);
    }
    buffer
}

pub fn decode(buffer: &[u8]) -> Result<AlignedCompartment> {
    let mut reader = Reader::new(buffer);
    let id = reader.take_u32()?;
    let error = reader.take_u8()? != 0;
    let message = reader.take_cstr()?;
    let query_strand = strand_from_u8(reader.take_u8()?);
    let subj_strand = strand_from_u8(reader.take_u8()?);

    let mut segments = Vec::new();
    while !reader.is_empty() {
        let frame_len = reader.take_u32()? as usize;
        let frame = reader.take_bytes(frame_len)?;
        segments.push(decode_segment(frame)?);
    }

    Ok(AlignedCompartment {
        id,
        error,
        message,
        query_strand,
        subj_strand,
        segments,
    })
}

fn encode_segment(segment: &Segment) -> Vec<u8> {
    let mut body = Vec::new();
    match segment {
        Segment::Exon(exon) => {
            put_u8(&mut body, 1);
            put_f64(&mut body, exon.idty);
            put_u32(&mut body, exon.len as u32);
            put_box(&mut body, exon.q_box, exon.s_box);
            put_cstr(&mut body, &exon.annot);
            put_cstr(&mut body, &exon.details);
            put_i32(&mut body, exon.score);
        }
        Segment::Gap(gap) => {
            put_u8(&mut body, 0);
            put_f64(&mut body, 0.0);
            put_u32(&mut body, gap.len as u32);
            put_box(&mut body, gap.q_box, gap.s_box);
            put_cstr(&mut body, GAP_TAG);
            put_cstr(&mut body, "");
            put_i32(&mut body, 0);
        }
    }
    body
}

fn decode_segment(frame: &[u8]) -> Result<Segment> {
    let mut reader = Reader::new(frame);
    let is_exon = reader.take_u8()? != 0;
    let idty = reader.take_f64()?;
    let len = reader.take_u32()? as usize;
    let q_box = (reader.take_i32()? as usize, reader.take_i32()? as usize);
    let s_box = (reader.take_i32()? as usize, reader.take_i32()? as usize);
    let annot = reader.take_cstr()?;
    let details = reader.take_cstr()?;
    let score = reader.take_i32()?;

    Ok(if is_exon {
        Segment::Exon(Exon {
            q_box,
            s_box,
            details,
            annot,
            idty,
            len,
            score,
        })
    } else {
        Segment::Gap(Gap {
            q_box,
            s_box,
            len,
        })
    })
}

fn strand_to_u8(strand: Strand) -> u8 {
    match strand {
        Strand::Minus => 0,
        Strand::Plus => 1,
    }
}

fn strand_from_u8(value: u8) -> Strand {
    if value == 0 { Strand::Minus } else { Strand::Plus }
}

fn put_box(buffer: &mut Vec<u8>, q_box: (usize, usize), s_box: (usize, usize)) {
    for value in [q_box.0, q_box.1, s_box.0, s_box.1] {
        put_i32(buffer, value as i32);
    }
}

fn put_u8(buffer: &mut Vec<u8>, value: u8) {
    buffer.push(value);
}

fn put_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn put_i32(buffer: &mut Vec<u8>, value: i32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn put_f64(buffer: &mut Vec<u8>, value: f64) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn put_cstr(buffer: &mut Vec<u8>, value: &str) {
    buffer.extend_from_slice(value.as_bytes());
    buffer.push(0);
}

struct Reader<'a> {
    buffer: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Self { buffer }
    }

    fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn take_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.buffer.len() < count {
            return Err(Error::SerializationIncomplete);
        }
        let (taken, rest) = self.buffer.split_at(count);
        self.buffer = rest;
        Ok(taken)
    }

    fn take_u8(&mut self) -> Result<u8> {
        Ok(self.take_bytes(1)?[0])
    }

    fn take_u32(&mut self) -> Result<u32> {
        let bytes = self.take_bytes(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn take_i32(&mut self) -> Result<i32> {
        let bytes = self.take_bytes(4)?;
        Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn take_f64(&mut self) -> Result<f64> {
        let bytes = self.take_bytes(8)?;
        Ok(f64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn take_cstr(&mut self) -> Result<String> {
        let end = self
            .buffer
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::SerializationIncomplete)?;
        let bytes = self.take_bytes(end + 1)?;
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}
