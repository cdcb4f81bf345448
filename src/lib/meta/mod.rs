/*
pmrecovery library & toolset
Copyright (C) 2018 Steve Muller <steve.muller@outlook.com>

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/

// The _PFC._PS layout is undocumented. Everything below was inferred from real
// cabinets and only recognises the parts that carry names and page numbers.

mod window;

use self::window::Window;
use std::io::{copy, sink, BufReader, ErrorKind, Read};
use super::error::Error;
use super::ident::{is_identifier_bytes, sanitize, IDENTIFIER_LEN};
use super::io::Debug;

/// "NAME", big endian. Found at a 32-byte boundary somewhere in the file.
pub const NAME_MARKER: u32 = 0x4E41_4D45;

const MARKER_ALIGNMENT: u64 = 32;

/// 24 zero bytes followed by `02 00 18 00`. Marks the start of a page table.
pub const PAGE_TABLE_HEADER: [u8; 28] = [
	0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
	0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
	0x02, 0x00, 0x18, 0x00,
];

const PAGE_TAG: u8 = 0x20;
const ANNOTATION_TAG: u8 = 0x25;

/// Bytes following the page tag.
const PAGE_RECORD_LEN: usize = 31;
/// Bytes following the annotation tag.
const ANNOTATION_LEN: usize = 36;

/// The stated length byte is a `u8`, so an accepted run is at most 253 bytes,
/// which leaves room for the 4-byte preamble in front of it.
const NAME_WINDOW: usize = 260;

#[derive(Clone, Debug, PartialEq)]
pub enum MetadataRecord {
	/// A drawer, folder or document name (already sanitized).
	Name { identifier: String, label: String },
	/// A page. `order` counts from 0. `position` is a second, redundant counter
	/// kept in the record; it is only ever logged.
	Page { identifier: String, order: u32, position: i32 },
	/// An annotation record. Its content is not understood and is skipped.
	Annotation,
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Section {
	Names,
	Pages,
	Done,
}

pub struct Decoder<TFile> where TFile: Read {
	input: TFile,
	offset: u64,
	lookahead: Window,
	section: Section,
}

impl<TFile> Decoder<TFile> where TFile: Read {
	/// Positions the decoder right after the `NAME` marker.
	/// The marker is only looked for at 32-byte boundaries; a chunk that does not start with it is skipped whole.
	pub fn new(mut input: TFile, debug: &mut Debug) -> Result<Decoder<TFile>, Error> {
		debug.log(1, format!("[new] Seeking NAME marker ... "));
		let mut offset = 0u64;
		loop {
			let mut chunk = [0; 4];
			match input.read_exact(&mut chunk) {
				Ok(()) => {},
				Err(ref e) if e.kind() == ErrorKind::UnexpectedEof => {
					debug.logln(1, format!("not found!"));
					return Err(Error::MissingNameMarker);
				},
				Err(e) => return Err(Error::Io(e)),
			}
			offset += 4;
			if u32::from_be_bytes(chunk) == NAME_MARKER {
				break;
			}
			let mut rest = (&mut input).take(MARKER_ALIGNMENT - 4);
			offset += copy(&mut rest, &mut sink())?;
		}
		debug.logln(1, format!("found at offset {}.", offset - 4));

		Ok(Decoder {
			input,
			offset,
			lookahead: Window::new(PAGE_TABLE_HEADER.len()),
			section: Section::Names,
		})
	}

	/// Number of bytes consumed from the input so far.
	pub fn offset(&self) -> u64 {
		self.offset
	}

	/// Returns the next record, or `None` once the stream is exhausted.
	/// Fails with a format violation when a page table holds a record it cannot parse.
	pub fn next_record(&mut self, debug: &mut Debug) -> Result<Option<MetadataRecord>, Error> {
		loop {
			match self.section {
				Section::Done => return Ok(None),
				Section::Pages => {
					match self.read_page_record(debug)? {
						Some(record) => return Ok(Some(record)),
						None => self.section = Section::Done,
					}
				},
				Section::Names => {
					let byte = match self.read_byte()? {
						Some(byte) => byte,
						None => {
							self.section = Section::Done;
							continue;
						},
					};
					self.lookahead.push(byte);

					let candidate = self.lookahead.tail(IDENTIFIER_LEN)
						.filter(|tail| is_identifier_bytes(tail))
						.map(latin1);
					if let Some(identifier) = candidate {
						debug.logln(2, format!("[next_record] Identifier {} ends at offset {}.", identifier, self.offset));
						match self.read_name(debug)? {
							Some(label) => return Ok(Some(MetadataRecord::Name { identifier, label })),
							None => {
								debug.logln(1, format!("[next_record] Stream ended before a name for {} was found.", identifier));
								self.section = Section::Done;
							},
						}
					}
					else if self.lookahead.tail(PAGE_TABLE_HEADER.len()) == Some(&PAGE_TABLE_HEADER[..]) {
						debug.logln(2, format!("[next_record] Page table starts at offset {}.", self.offset));
						self.section = Section::Pages;
					}
				},
			}
		}
	}

	/// Scans forward until a zero byte closes a run that matches the length-prefix pattern
	/// (see `accepted_name_len`). Bytes read here also feed the lookahead window.
	fn read_name(&mut self, debug: &mut Debug) -> Result<Option<String>, Error> {
		let mut scanned = Window::new(NAME_WINDOW);
		loop {
			let byte = match self.read_byte()? {
				Some(byte) => byte,
				None => return Ok(None),
			};
			self.lookahead.push(byte);
			if byte == 0x00 {
				let buffer = scanned.as_slice();
				if let Some(len) = accepted_name_len(buffer) {
					debug.logln(3, format!("[read_name] Accepted {} byte name ending at offset {}.", len, self.offset));
					return Ok(Some(sanitize(&latin1(&buffer[buffer.len() - len..]))));
				}
			}
			scanned.push(byte);
		}
	}

	fn read_page_record(&mut self, debug: &mut Debug) -> Result<Option<MetadataRecord>, Error> {
		let tag_offset = self.offset;
		let tag = match self.read_byte()? {
			Some(tag) => tag,
			None => return Ok(None),
		};

		match tag {
			PAGE_TAG => {
				// skip 1 | position counter (2) | skip 4 | identifier (8) | skip 10 | page order (5) | skip 1
				let mut record = [0; PAGE_RECORD_LEN];
				if !self.read_bytes(&mut record)? {
					debug.logln(1, format!("[read_page_record] Page record at offset {} is truncated.", tag_offset));
					return Ok(None);
				}

				// Starts at A0 00, steps by 0x20 and wraps into the second byte. The decimal order below is authoritative.
				let position = (record[1] / 32) as i32 + record[2] as i32 * 8 - 5;
				let identifier = latin1(&record[7..15]);
				let digits = &record[25..30];
				if !digits.iter().all(u8::is_ascii_digit) {
					return Err(Error::MalformedPageOrder { text: latin1(digits), offset: tag_offset + 26 });
				}
				let order = digits.iter().fold(0u32, |acc, d| acc * 10 + (d - b'0') as u32);
				debug.logln(2, format!("[read_page_record] {} has page order {} (position counter {}).", identifier, order, position));
				Ok(Some(MetadataRecord::Page { identifier, order, position }))
			},
			ANNOTATION_TAG => {
				debug.logln(2, format!("[read_page_record] Skipping annotation at offset {}.", tag_offset));
				let mut annotation = [0; ANNOTATION_LEN];
				if !self.read_bytes(&mut annotation)? {
					return Ok(None);
				}
				Ok(Some(MetadataRecord::Annotation))
			},
			_ => {
				debug.logln(0, format!("[read_page_record] Unknown record tag 0x{:02X} at offset {}!", tag, tag_offset));
				Err(Error::UnknownRecordTag { tag, offset: tag_offset })
			},
		}
	}

	fn read_byte(&mut self) -> Result<Option<u8>, Error> {
		let mut buffer = [0; 1];
		loop {
			match self.input.read(&mut buffer) {
				Ok(0) => return Ok(None),
				Ok(_) => {
					self.offset += 1;
					return Ok(Some(buffer[0]));
				},
				Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
				Err(e) => return Err(Error::Io(e)),
			}
		}
	}

	/// Fills `buffer`; returns `false` if the stream ended first.
	fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<bool, Error> {
		for slot in buffer.iter_mut() {
			match self.read_byte()? {
				Some(byte) => *slot = byte,
				None => return Ok(false),
			}
		}
		Ok(true)
	}
}

/// Decodes a whole metadata stream.
pub fn decode(input: impl Read, debug: &mut Debug) -> Result<Vec<MetadataRecord>, Error> {
	let mut decoder = Decoder::new(BufReader::new(input), debug)?;
	let mut records = Vec::new();
	while let Some(record) = decoder.next_record(debug)? {
		records.push(record);
	}
	Ok(records)
}

/// Tests whether `buffer` (everything scanned since the identifier, up to but excluding
/// a zero byte) ends in a name, and returns the name length if so.
///
/// The name is the run of non-zero bytes at the end of `buffer`. It must be preceded by
/// `00 00 <len> 00`, where `len` is the name length plus 2 or plus 3. Why the slack
/// varies is not known. A missed name promotes its entry one level up in the output tree;
/// a false match adds a spurious level. Neither loses data.
pub fn accepted_name_len(buffer: &[u8]) -> Option<usize> {
	let run = buffer.iter().rev().take_while(|&&b| b != 0x00).count();
	if run == 0 || buffer.len() < run + 4 {
		return None;
	}
	let zero = buffer.len() - run - 1;
	let stated = buffer[zero - 1] as usize;
	if buffer[zero - 2] == 0x00 && buffer[zero - 3] == 0x00 && (stated == run + 2 || stated == run + 3) {
		Some(run)
	}
	else {
		None
	}
}

fn latin1(bytes: &[u8]) -> String {
	bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use super::super::ident::IdentifierTable;
	use std::io::stderr;

	fn quiet() -> Debug {
		Debug::new(stderr(), -1)
	}

	fn stream(body: &[u8]) -> Vec<u8> {
		let mut bytes = vec![0xAB; 32];
		bytes.extend_from_slice(b"NAME");
		bytes.extend_from_slice(body);
		bytes
	}

	fn name_record(identifier: &str, text: &[u8], slack: u8) -> Vec<u8> {
		let mut bytes = identifier.as_bytes().to_vec();
		bytes.extend_from_slice(&[0x00, 0x00, text.len() as u8 + slack, 0x00]);
		bytes.extend_from_slice(text);
		bytes.push(0x00);
		bytes
	}

	fn page_record(identifier: &str, order: &str, position: [u8; 2]) -> Vec<u8> {
		let mut bytes = vec![PAGE_TAG, 0x00, position[0], position[1], 0x00, 0x00, 0x00, 0x00];
		bytes.extend_from_slice(identifier.as_bytes());
		bytes.extend_from_slice(&[0x00; 10]);
		bytes.extend_from_slice(order.as_bytes());
		bytes.push(0x00);
		bytes
	}

	#[test]
	fn accepts_name_with_slack_of_two_or_three() {
		assert_eq!(accepted_name_len(&[0x00, 0x00, 7, 0x00, b'B', b'i', b'l', b'l', b's']), Some(5));
		assert_eq!(accepted_name_len(&[0x00, 0x00, 8, 0x00, b'B', b'i', b'l', b'l', b's']), Some(5));
		assert_eq!(accepted_name_len(&[0xFF, 0x10, 0x00, 0x00, 3, 0x00, b'X']), Some(1));
	}

	#[test]
	fn rejects_other_length_bytes() {
		assert_eq!(accepted_name_len(&[0x00, 0x00, 9, 0x00, b'B', b'i', b'l', b'l', b's']), None);
		assert_eq!(accepted_name_len(&[0x00, 0x00, 6, 0x00, b'B', b'i', b'l', b'l', b's']), None);
	}

	#[test]
	fn rejects_incomplete_preamble() {
		assert_eq!(accepted_name_len(&[]), None);
		assert_eq!(accepted_name_len(&[0x00, 0x00, 7, 0x00]), None);
		assert_eq!(accepted_name_len(&[0x00, 3, 0x00, b'X']), None);
		assert_eq!(accepted_name_len(&[0x01, 0x00, 3, 0x00, b'X']), None);
		assert_eq!(accepted_name_len(&[b'A', b'B', b'C']), None);
	}

	#[test]
	fn skips_unaligned_chunks_until_marker() {
		let mut bytes = vec![0x11; 64];
		bytes.extend_from_slice(b"NAME");
		let decoder = Decoder::new(&bytes[..], &mut quiet()).unwrap();
		assert_eq!(decoder.offset(), 68);
	}

	#[test]
	fn marker_inside_a_chunk_is_not_found() {
		let mut bytes = vec![0xAB; 2];
		bytes.extend_from_slice(b"NAME");
		bytes.extend_from_slice(&[0x00; 26]);
		match decode(&bytes[..], &mut quiet()) {
			Err(Error::MissingNameMarker) => {},
			other => panic!("unexpected result {:?}", other),
		}
	}

	#[test]
	fn decodes_sanitized_names() {
		let mut body = name_record("00000002", b"Taxes", 2);
		body.extend(name_record("00000003", b"2014: Q1.Q2", 3));
		let records = decode(&stream(&body)[..], &mut quiet()).unwrap();
		assert_eq!(records, vec![
			MetadataRecord::Name { identifier: "00000002".to_owned(), label: "Taxes".to_owned() },
			MetadataRecord::Name { identifier: "00000003".to_owned(), label: "2014_ Q1_Q2".to_owned() },
		]);
	}

	#[test]
	fn rejected_length_keeps_scanning_for_the_name() {
		let mut body = name_record("00000002", b"Taxes", 4);
		body.extend_from_slice(&[0x00, 0x00, 7, 0x00]);
		body.extend_from_slice(b"Bills");
		body.push(0x00);
		let records = decode(&stream(&body)[..], &mut quiet()).unwrap();
		assert_eq!(records, vec![
			MetadataRecord::Name { identifier: "00000002".to_owned(), label: "Bills".to_owned() },
		]);
	}

	#[test]
	fn unterminated_name_ends_the_stream() {
		let body = name_record("00000002", b"Taxes", 4);
		let records = decode(&stream(&body)[..], &mut quiet()).unwrap();
		assert!(records.is_empty());
	}

	#[test]
	fn non_ascii_names_are_read_as_latin1() {
		let body = name_record("0000000A", &[b'K', 0xF6, b'l', b'n'], 2);
		let records = decode(&stream(&body)[..], &mut quiet()).unwrap();
		assert_eq!(records, vec![
			MetadataRecord::Name { identifier: "0000000A".to_owned(), label: "K\u{f6}ln".to_owned() },
		]);
	}

	#[test]
	fn decodes_page_table() {
		let mut body = PAGE_TABLE_HEADER.to_vec();
		body.extend(page_record("00000010", "00000", [0xA0, 0x00]));
		body.extend(page_record("00000011", "00041", [0x00, 0x01]));
		let records = decode(&stream(&body)[..], &mut quiet()).unwrap();
		assert_eq!(records, vec![
			MetadataRecord::Page { identifier: "00000010".to_owned(), order: 0, position: 0 },
			MetadataRecord::Page { identifier: "00000011".to_owned(), order: 41, position: 3 },
		]);

		let mut table = IdentifierTable::new();
		for record in &records {
			table.apply(record);
		}
		assert_eq!(table.get("00000010"), Some("Page00001"));
		assert_eq!(table.get("00000011"), Some("Page00042"));
	}

	#[test]
	fn names_then_page_table() {
		let mut body = name_record("00000004", b"Receipt", 2);
		body.extend_from_slice(&PAGE_TABLE_HEADER);
		body.extend(page_record("00000005", "00002", [0xA0, 0x00]));
		let records = decode(&stream(&body)[..], &mut quiet()).unwrap();
		assert_eq!(records, vec![
			MetadataRecord::Name { identifier: "00000004".to_owned(), label: "Receipt".to_owned() },
			MetadataRecord::Page { identifier: "00000005".to_owned(), order: 2, position: 0 },
		]);
	}

	#[test]
	fn annotations_are_skipped() {
		let mut body = PAGE_TABLE_HEADER.to_vec();
		body.push(ANNOTATION_TAG);
		body.extend_from_slice(&[0x5A; ANNOTATION_LEN]);
		body.extend(page_record("00000010", "00003", [0xA0, 0x00]));
		let records = decode(&stream(&body)[..], &mut quiet()).unwrap();
		assert_eq!(records, vec![
			MetadataRecord::Annotation,
			MetadataRecord::Page { identifier: "00000010".to_owned(), order: 3, position: 0 },
		]);
	}

	#[test]
	fn unknown_tag_is_a_format_violation() {
		let mut body = PAGE_TABLE_HEADER.to_vec();
		body.extend(page_record("00000010", "00000", [0xA0, 0x00]));
		body.push(0x99);
		body.extend(page_record("00000011", "00001", [0xC0, 0x00]));
		let bytes = stream(&body);

		let mut debug = quiet();
		let mut decoder = Decoder::new(&bytes[..], &mut debug).unwrap();
		assert!(decoder.next_record(&mut debug).unwrap().is_some());
		match decoder.next_record(&mut debug) {
			Err(e @ Error::UnknownRecordTag { .. }) => {
				assert!(e.is_format_violation());
				match e {
					Error::UnknownRecordTag { tag, offset } => {
						assert_eq!(tag, 0x99);
						assert_eq!(offset, 96);
					},
					_ => unreachable!(),
				}
			},
			other => panic!("unexpected result {:?}", other),
		}
	}

	#[test]
	fn non_decimal_page_order_is_a_format_violation() {
		let mut body = PAGE_TABLE_HEADER.to_vec();
		body.extend(page_record("00000010", "12a45", [0xA0, 0x00]));
		match decode(&stream(&body)[..], &mut quiet()) {
			Err(Error::MalformedPageOrder { text, .. }) => assert_eq!(text, "12a45"),
			other => panic!("unexpected result {:?}", other),
		}
	}

	#[test]
	fn truncated_page_record_ends_the_stream() {
		let mut body = PAGE_TABLE_HEADER.to_vec();
		body.extend_from_slice(&[PAGE_TAG, 0x00, 0xA0]);
		let records = decode(&stream(&body)[..], &mut quiet()).unwrap();
		assert!(records.is_empty());
	}

	#[test]
	fn later_name_for_same_identifier_wins() {
		let mut body = name_record("00000002", b"Taxes", 2);
		body.extend(name_record("00000002", b"Bills", 3));
		let mut table = IdentifierTable::new();
		for record in decode(&stream(&body)[..], &mut quiet()).unwrap() {
			table.apply(&record);
		}
		assert_eq!(table.get("00000002"), Some("Bills"));
		assert_eq!(table.len(), 1);
	}
}
