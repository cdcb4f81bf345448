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

// Page files carry a vendor header of varying length (for TIFFs usually "DMFILE" and some padding)
// in front of an otherwise untouched image. The header is never decoded, only skipped.

use std::io::{copy, Error, Read, Write};
use std::path::{Path, PathBuf};
use super::io::Debug;

/// Little-endian TIFF signature ("II*").
pub const TIFF_MAGIC: [u8; 3] = [0x49, 0x49, 0x2A];
/// JPEG start-of-image marker.
pub const JPEG_MAGIC: [u8; 2] = [0xFF, 0xD8];

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ImageKind {
	Tiff,
	Jpeg,
}

impl ImageKind {
	pub fn magic(self) -> &'static [u8] {
		match self {
			ImageKind::Tiff => &TIFF_MAGIC,
			ImageKind::Jpeg => &JPEG_MAGIC,
		}
	}

	pub fn extension(self) -> &'static str {
		match self {
			ImageKind::Tiff => "tiff",
			ImageKind::Jpeg => "jpg",
		}
	}
}

/// Where the embedded image starts inside a container blob.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Payload {
	pub kind: ImageKind,
	/// Offset of the first magic byte.
	pub offset: u64,
}

/// Reads `input` up to and including the first TIFF or JPEG magic sequence.
/// Returns `None` if the input ends without one.
pub fn locate(input: &mut impl Read, debug: &mut Debug) -> Result<Option<Payload>, Error> {
	let mut window = [0u8; 3];
	let mut consumed: u64 = 0;
	for byte in input.bytes() {
		window = [window[1], window[2], byte?];
		consumed += 1;

		let kind = if consumed >= 3 && window == TIFF_MAGIC {
			ImageKind::Tiff
		}
		else if consumed >= 2 && window[1..] == JPEG_MAGIC {
			ImageKind::Jpeg
		}
		else {
			continue;
		};

		let offset = consumed - kind.magic().len() as u64;
		debug.logln(2, format!("[locate] Found {} magic at offset {}.", kind.extension(), offset));
		return Ok(Some(Payload { kind, offset }));
	}
	debug.logln(2, format!("[locate] No image magic in {} bytes.", consumed));
	Ok(None)
}

/// Copies the embedded image from `input` to the writer returned by `open_output`.
/// The writer is only opened once the image kind is known, so a blob without an image produces no output at all.
/// The magic bytes are written first, then the rest of the blob, byte for byte.
pub fn extract<TFile, TOutput, F>(mut input: TFile, open_output: F, debug: &mut Debug) -> Result<Option<(Payload, TOutput)>, Error>
	where TFile: Read, TOutput: Write, F: FnOnce(ImageKind) -> Result<TOutput, Error> {
	let payload = match locate(&mut input, debug)? {
		Some(payload) => payload,
		None => return Ok(None),
	};

	let mut output = open_output(payload.kind)?;
	output.write_all(payload.kind.magic())?;
	let copied = copy(&mut input, &mut output)?;
	output.flush()?;
	debug.logln(2, format!("[extract] Copied {} bytes after the magic.", copied));
	Ok(Some((payload, output)))
}

/// The files produced for one page.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionResult {
	pub kind: ImageKind,
	pub offset: u64,
	pub image: PathBuf,
	/// OCR text of the page in the cabinet. May not exist.
	pub ocr_source: PathBuf,
	/// TIFF pages keep their OCR text in an `OCR` subdirectory, JPEG pages right next to the image.
	pub ocr_destination: PathBuf,
}

impl ExtractionResult {
	pub fn new(payload: Payload, source_dir: &Path, identifier: &str, target_dir: &Path, label: &str) -> ExtractionResult {
		let image = target_dir.join(image_file_name(label, payload.kind));
		let ocr_name = format!("{}.txt", label);
		let ocr_destination = match payload.kind {
			ImageKind::Tiff => target_dir.join("OCR").join(ocr_name),
			ImageKind::Jpeg => target_dir.join(ocr_name),
		};
		ExtractionResult {
			kind: payload.kind,
			offset: payload.offset,
			image,
			ocr_source: ocr_source(source_dir, identifier),
			ocr_destination,
		}
	}
}

pub fn image_file_name(label: &str, kind: ImageKind) -> String {
	format!("{}.{}", label, kind.extension())
}

/// `<identifier>.TXT` as written by the cabinet, or `<identifier>.txt` on case-sensitive copies.
fn ocr_source(source_dir: &Path, identifier: &str) -> PathBuf {
	let upper = source_dir.join(format!("{}.TXT", identifier));
	if upper.is_file() {
		upper
	}
	else {
		source_dir.join(format!("{}.txt", identifier))
	}
}
