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

// A cabinet is converted in two passes. The first pass reads every _PFC._PS file and builds
// one table of identifier -> label. The second pass walks all files and writes them to the
// target directory under their human names. The second pass must only start once the table
// is complete, otherwise files would silently land under the wrong name.

use std::fs::{copy as copy_file, create_dir_all, File};
use std::io::{BufReader, BufWriter};
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};
use super::error::Error;
use super::ident::{is_identifier, page_label, IdentifierTable};
use super::image::{extract, image_file_name, ExtractionResult, ImageKind};
use super::io::Debug;
use super::meta::{Decoder, MetadataRecord};

pub const METADATA_FILE_NAME: &str = "_PFC._PS";
/// Label of the Inbox drawer. It is left out of output paths, which moves the Inbox up one level.
pub const SYSTEM_DRAWER_LABEL: &str = "___system_drawer_1___";
pub const DEFAULT_LABEL: &str = "Default";
/// Directory holding the images referenced by an HTML native file.
const EMBEDDED_IMAGE_DIR: &str = "I";

#[derive(Clone, Debug)]
pub struct Options {
	/// Name used for identifiers that no metadata file mentions.
	pub default_label: String,
}

impl Default for Options {
	fn default() -> Options {
		Options { default_label: DEFAULT_LABEL.to_owned() }
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Summary {
	pub images: usize,
	/// Container blobs without a TIFF or JPEG inside.
	pub unrecognised: usize,
	pub native: usize,
	pub embedded: usize,
	pub ocr: usize,
	pub ignored: usize,
	pub errors: usize,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum EntryKind {
	/// Inside an ICONS or AF_DATA directory, or an extension-less file inside an `I` directory.
	Special,
	/// Extension-less page file with an embedded image.
	Container,
	/// `NATIVE.<ext>`: the original document, stored as is.
	Native,
	/// Image referenced by an HTML native file.
	Embedded,
	Thumbnail,
	/// OCR text, word indexes, metadata and everything else that is not converted on its own.
	Other,
}

pub fn is_cabinet(dir: &Path) -> bool {
	dir.join(METADATA_FILE_NAME).is_file()
}

pub fn classify(path: &Path) -> EntryKind {
	let name = name_of(path);
	let parent = name_of(parent_of(path)).to_uppercase();
	let in_embedded_dir = parent == EMBEDDED_IMAGE_DIR;

	if parent.ends_with("ICONS") || parent.ends_with("AF_DATA") {
		EntryKind::Special
	}
	else if !name.contains('.') {
		if in_embedded_dir { EntryKind::Special } else { EntryKind::Container }
	}
	else if name.to_uppercase().starts_with("NATIVE") {
		EntryKind::Native
	}
	else if in_embedded_dir {
		EntryKind::Embedded
	}
	else if name.splitn(2, '.').nth(1).map_or(false, |ext| ext.eq_ignore_ascii_case("THM")) {
		EntryKind::Thumbnail
	}
	else {
		EntryKind::Other
	}
}

/// Runs both passes over the cabinet at `root`, writing the result below `target`.
/// Only a format violation in a metadata file stops the conversion; all other problems are logged and counted.
pub fn convert(root: &Path, target: &Path, options: Options, debug: &mut Debug) -> Result<Summary, Error> {
	if !is_cabinet(root) {
		return Err(Error::NotACabinet(root.to_path_buf()));
	}

	debug.logln(0, format!("Scanning directories for naming structure information ..."));
	let table = build_table(root, debug)?;
	debug.logln(0, format!("Found {} names.", table.len()));

	debug.logln(0, format!("Processing files ..."));
	let summary = Converter::new(root, target, &table, options).run(debug);
	debug.logln(0, format!("Images converted: {}", summary.images));
	Ok(summary)
}

/// First pass: decodes the root metadata file, then those of all directories below it.
pub fn build_table(root: &Path, debug: &mut Debug) -> Result<IdentifierTable, Error> {
	let mut dirs = vec![root.to_path_buf()];
	dirs.extend(walk(root, debug).filter(|e| e.file_type().is_dir()).map(DirEntry::into_path));

	let mut table = IdentifierTable::new();
	for dir in dirs {
		let path = dir.join(METADATA_FILE_NAME);
		if path.is_file() {
			read_metadata_file(&path, &mut table, debug)?;
		}
	}
	Ok(table)
}

/// Adds all records of one metadata file to `table` and returns how many were read.
/// Unreadable files are skipped with a warning; format violations are returned.
pub fn read_metadata_file(path: &Path, table: &mut IdentifierTable, debug: &mut Debug) -> Result<usize, Error> {
	debug.journal(format!("Getting name information in {}", path.display()));
	let mut decoder = match File::open(path).map_err(Error::from).and_then(|file| Decoder::new(BufReader::new(file), debug)) {
		Ok(decoder) => decoder,
		Err(e) => {
			debug.warn(format!("Skipping metadata file {}: {}", path.display(), e));
			return Ok(0);
		},
	};

	let mut count = 0;
	loop {
		match decoder.next_record(debug) {
			Ok(Some(record)) => {
				match &record {
					MetadataRecord::Name { identifier, label } => debug.journal(format!("{} is {}", identifier, label)),
					MetadataRecord::Page { identifier, order, .. } => debug.journal(format!("{} is {}", identifier, page_label(*order))),
					MetadataRecord::Annotation => {},
				}
				table.apply(&record);
				count += 1;
			},
			Ok(None) => break,
			Err(e) => {
				if e.is_format_violation() {
					debug.journal(format!("Format violation in {}: {}", path.display(), e));
					return Err(e);
				}
				debug.warn(format!("Stopped reading {}: {}", path.display(), e));
				break;
			},
		}
	}
	Ok(count)
}

/// Second pass. Holds the finished table by shared reference only.
pub struct Converter<'a> {
	root: PathBuf,
	target: PathBuf,
	table: &'a IdentifierTable,
	options: Options,
	summary: Summary,
}

impl<'a> Converter<'a> {
	pub fn new(root: &Path, target: &Path, table: &'a IdentifierTable, options: Options) -> Converter<'a> {
		Converter {
			root: root.to_path_buf(),
			target: target.to_path_buf(),
			table,
			options,
			summary: Summary::default(),
		}
	}

	/// Maps a cabinet directory to its output directory by replacing every identifier below the root with its label.
	pub fn human_dir(&self, dir: &Path) -> PathBuf {
		let mut result = self.target.clone();
		if let Ok(relative) = dir.strip_prefix(&self.root) {
			for component in relative.components() {
				if let Component::Normal(name) = component {
					match self.table.get(&name.to_string_lossy()) {
						Some(SYSTEM_DRAWER_LABEL) => {},
						Some(label) => result.push(label),
						None => result.push(&self.options.default_label),
					}
				}
			}
		}
		result
	}

	pub fn run(mut self, debug: &mut Debug) -> Summary {
		let files: Vec<PathBuf> = walk(&self.root, debug)
			.filter(|e| !e.file_type().is_dir())
			.map(DirEntry::into_path)
			.collect();

		for path in files {
			if let Err(e) = self.process(&path, debug) {
				self.summary.errors += 1;
				debug.warn(format!("File error on {}: {}", path.display(), e));
			}
		}
		self.summary
	}

	fn process(&mut self, path: &Path, debug: &mut Debug) -> Result<(), Error> {
		match classify(path) {
			EntryKind::Container => self.convert_image(path, debug),
			EntryKind::Native => self.copy_native(path, debug),
			EntryKind::Embedded => self.copy_embedded(path, debug),
			kind => {
				debug.logln(2, format!("[process] Ignoring {} ({:?}).", path.display(), kind));
				self.summary.ignored += 1;
				Ok(())
			},
		}
	}

	fn convert_image(&mut self, path: &Path, debug: &mut Debug) -> Result<(), Error> {
		let source_dir = parent_of(path);
		let identifier = name_of(path);
		if !is_identifier(&identifier) {
			debug.warn(format!("{} in directory {} does not fit expected naming convention", identifier, source_dir.display()));
		}
		let label = self.table.label_or(&identifier, &self.options.default_label).to_owned();
		let target_dir = self.human_dir(source_dir);

		debug.journal(format!("Converting image from {} in {}", identifier, source_dir.display()));
		let input = BufReader::new(File::open(path)?);
		let open_output = |kind: ImageKind| -> Result<BufWriter<File>, std::io::Error> {
			create_dir_all(&target_dir)?;
			File::create(target_dir.join(image_file_name(&label, kind))).map(BufWriter::new)
		};
		let extracted = extract(input, open_output, debug)?;
		let payload = match extracted {
			Some((payload, _)) => payload,
			None => {
				self.summary.unrecognised += 1;
				debug.warn(format!("No TIFF or JPEG image found in {}", path.display()));
				return Ok(());
			},
		};

		let result = ExtractionResult::new(payload, source_dir, &identifier, &target_dir, &label);
		debug.journal(format!("producing {} in {}", image_file_name(&label, result.kind), target_dir.display()));
		self.summary.images += 1;
		self.copy_ocr(&result, debug)
	}

	fn copy_ocr(&mut self, result: &ExtractionResult, debug: &mut Debug) -> Result<(), Error> {
		if !result.ocr_source.is_file() {
			return Ok(());
		}
		if let Some(dir) = result.ocr_destination.parent() {
			create_dir_all(dir)?;
		}
		debug.journal(format!("Copying associated OCR text file"));
		copy_file(&result.ocr_source, &result.ocr_destination)?;
		self.summary.ocr += 1;
		Ok(())
	}

	/// A native file is named after the document directory it sits in, keeping its own extension.
	fn copy_native(&mut self, path: &Path, debug: &mut Debug) -> Result<(), Error> {
		let source_dir = parent_of(path);
		let name = name_of(path);
		let extension = &name[name.find('.').unwrap_or(name.len())..];
		let label = self.table.label_or(&name_of(source_dir), &self.options.default_label).to_owned();
		let target_dir = self.human_dir(source_dir);

		debug.journal(format!("Found native {}", path.display()));
		create_dir_all(&target_dir)?;
		copy_file(path, target_dir.join(format!("{}{}", label, extension)))?;
		debug.journal(format!("Produced native {}{}", label, extension));
		self.summary.native += 1;
		Ok(())
	}

	/// The `I` directory has no identifier of its own, so it is recreated next to the document's files.
	fn copy_embedded(&mut self, path: &Path, debug: &mut Debug) -> Result<(), Error> {
		let target_dir = self.human_dir(parent_of(parent_of(path))).join(EMBEDDED_IMAGE_DIR);
		debug.journal(format!("Copying HTM embedded image {} into {}", name_of(path), target_dir.display()));
		create_dir_all(&target_dir)?;
		copy_file(path, target_dir.join(name_of(path)))?;
		self.summary.embedded += 1;
		Ok(())
	}
}

fn walk<'a>(root: &Path, debug: &'a mut Debug) -> impl Iterator<Item = DirEntry> + 'a {
	WalkDir::new(root)
		.min_depth(1)
		.sort_by(|a, b| a.file_name().cmp(b.file_name()))
		.into_iter()
		.filter_map(move |entry| match entry {
			Ok(entry) => Some(entry),
			Err(e) => {
				debug.warn(format!("Cannot read directory entry: {}", e));
				None
			},
		})
}

fn parent_of(path: &Path) -> &Path {
	path.parent().unwrap_or_else(|| Path::new(""))
}

fn name_of(path: &Path) -> String {
	path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
}
