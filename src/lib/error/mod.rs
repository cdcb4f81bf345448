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

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("{0}")]
	Io(#[from] std::io::Error),

	/// The metadata stream never contains the 32-byte aligned `NAME` marker.
	#[error("no NAME marker found in metadata stream")]
	MissingNameMarker,

	/// A page table contains a record tag other than 0x20 or 0x25.
	#[error("unknown record tag 0x{tag:02X} at offset {offset}")]
	UnknownRecordTag { tag: u8, offset: u64 },

	/// A page record whose order field is not five decimal digits.
	#[error("page order {text:?} at offset {offset} is not a decimal number")]
	MalformedPageOrder { text: String, offset: u64 },

	#[error("directory {0:?} does not contain a _PFC._PS file")]
	NotACabinet(PathBuf),
}

impl Error {
	/// Whether this error means the metadata layout is not what the decoder expects.
	/// Such errors must stop the whole conversion, not just the current file.
	pub fn is_format_violation(&self) -> bool {
		match self {
			Error::UnknownRecordTag { .. } | Error::MalformedPageOrder { .. } => true,
			_ => false,
		}
	}
}
